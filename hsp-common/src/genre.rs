//! Genre normalization
//!
//! Genres use one-hot encoding with drop-first: the reference genre has no
//! column of its own. A label activates `Genre_<label>` only when the schema
//! contains that exact column; anything else, including genres the model
//! never saw, falls back to the reference level with every genre dummy at 0.

use crate::schema::FeatureSchema;

/// Prefix of every genre dummy column in the feature schema
pub const GENRE_PREFIX: &str = "Genre_";

/// Catch-all choice offered alongside the schema's genres
pub const OTHER_GENRE: &str = "Other";

pub fn genre_column(label: &str) -> String {
    format!("{}{}", GENRE_PREFIX, label)
}

/// Schema column to activate for `label`, if any
pub fn dummy_for<'s>(label: &str, schema: &'s FeatureSchema) -> Option<&'s str> {
    if label.is_empty() {
        return None;
    }
    let column = genre_column(label);
    schema
        .position(&column)
        .map(|position| schema.names()[position].as_str())
}

/// Genre levels the model knows, in schema order
pub fn known_genres(schema: &FeatureSchema) -> Vec<String> {
    schema
        .with_prefix(GENRE_PREFIX)
        .map(|(_, label)| label.to_string())
        .collect()
}

/// Sorted selector choices: every known genre plus [`OTHER_GENRE`]
pub fn genre_choices(schema: &FeatureSchema) -> Vec<String> {
    let mut choices = known_genres(schema);
    if !choices.iter().any(|g| g == OTHER_GENRE) {
        choices.push(OTHER_GENRE.to_string());
    }
    choices.sort();
    choices
}
