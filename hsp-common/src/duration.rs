//! Duration binning
//!
//! Maps a track length in minutes onto five ordered, half-open bins covering
//! `[0, +inf)`. Every bin includes its lower edge:
//!
//! | Bin        | Interval    |
//! |------------|-------------|
//! | Very Short | `[0, 2)`    |
//! | Short      | `[2, 3)`    |
//! | Standard   | `[3, 4.5)`  |
//! | Long       | `[4.5, 6)`  |
//! | Very Long  | `[6, +inf)` |
//!
//! `Very Short` is the reference level of the one-hot encoding and never owns
//! a dummy column; the other four map to `Duration_<label>`.

use serde::{Deserialize, Serialize};

/// Prefix of every duration dummy column in the feature schema
pub const DURATION_PREFIX: &str = "Duration_";

/// Build the dummy column name for a duration label
pub fn duration_column(label: &str) -> String {
    format!("{}{}", DURATION_PREFIX, label)
}

/// Ordered duration bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DurationBin {
    #[serde(rename = "Very Short")]
    VeryShort,
    #[serde(rename = "Short")]
    Short,
    #[serde(rename = "Standard")]
    Standard,
    #[serde(rename = "Long")]
    Long,
    #[serde(rename = "Very Long")]
    VeryLong,
}

impl DurationBin {
    /// All bins, ascending
    pub const ALL: [DurationBin; 5] = [
        DurationBin::VeryShort,
        DurationBin::Short,
        DurationBin::Standard,
        DurationBin::Long,
        DurationBin::VeryLong,
    ];

    /// Bin a duration given in minutes
    ///
    /// Returns `None` for negative, NaN or infinite input; such values never
    /// activate a duration dummy.
    pub fn from_minutes(minutes: f64) -> Option<DurationBin> {
        if !minutes.is_finite() || minutes < 0.0 {
            return None;
        }

        Self::ALL.into_iter().find(|bin| {
            minutes >= bin.lower_bound() && bin.upper_bound().map_or(true, |upper| minutes < upper)
        })
    }

    /// Inclusive lower edge in minutes
    pub fn lower_bound(self) -> f64 {
        match self {
            DurationBin::VeryShort => 0.0,
            DurationBin::Short => 2.0,
            DurationBin::Standard => 3.0,
            DurationBin::Long => 4.5,
            DurationBin::VeryLong => 6.0,
        }
    }

    /// Exclusive upper edge in minutes (`None` for the open-ended top bin)
    pub fn upper_bound(self) -> Option<f64> {
        match self {
            DurationBin::VeryLong => None,
            other => Some(Self::ALL[other as usize + 1].lower_bound()),
        }
    }

    /// Human-readable label, as used in dummy column names
    pub fn label(self) -> &'static str {
        match self {
            DurationBin::VeryShort => "Very Short",
            DurationBin::Short => "Short",
            DurationBin::Standard => "Standard",
            DurationBin::Long => "Long",
            DurationBin::VeryLong => "Very Long",
        }
    }

    /// Whether this bin is the reference level (all duration dummies zero)
    pub fn is_reference(self) -> bool {
        self == DurationBin::VeryShort
    }

    /// Dummy column activated by this bin, `None` for the reference level
    pub fn dummy_column(self) -> Option<String> {
        if self.is_reference() {
            None
        } else {
            Some(duration_column(self.label()))
        }
    }
}

impl std::fmt::Display for DurationBin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Length guidance shown next to an interactive prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationAdvice {
    /// Under two minutes: the model penalises very short tracks
    TooShort,
    /// Between 3:00 and 4:30 inclusive
    SweetSpot,
    Neutral,
}

impl DurationAdvice {
    pub fn from_minutes(minutes: f64) -> DurationAdvice {
        if minutes < DurationBin::Short.lower_bound() {
            DurationAdvice::TooShort
        } else if (3.0..=4.5).contains(&minutes) {
            DurationAdvice::SweetSpot
        } else {
            DurationAdvice::Neutral
        }
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            DurationAdvice::TooShort => Some(
                "Your song is under 2 minutes. The model predicts a ~20 point penalty for tracks that are too short.",
            ),
            DurationAdvice::SweetSpot => Some(
                "You are in the ideal duration range (3:00 - 4:30) for maximum popularity.",
            ),
            DurationAdvice::Neutral => None,
        }
    }
}
