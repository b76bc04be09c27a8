//! Integration tests for the hsp-studio HTTP API
//!
//! Drives the router in-process with `oneshot`; no socket is bound.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use hsp_common::{ModelArtifact, Predictor};
use hsp_studio::{build_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt;

fn test_router() -> Router {
    let artifact = ModelArtifact::from_json_str(
        r#"{
            "columns": ["const", "artistPopularity", "prevTrackPopularity",
                        "Genre_Pop", "Genre_Rock", "Duration_Standard"],
            "coefficients": [5.0, 0.5, 0.4, 10.0, -5.0, 8.0],
            "name": "test-linear"
        }"#,
    )
    .expect("valid artifact");
    let predictor = Predictor::from_artifact(&artifact).expect("predictor");
    build_router(AppState::new(Arc::new(predictor)))
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec()
}

async fn extract_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

async fn post_json(app: Router, uri: &str, body: Value) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn post_csv(app: Router, body: &str) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/api/batch")
            .header(header::CONTENT_TYPE, "text/csv")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = get(test_router(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "hsp-studio");
    assert_eq!(body["model"], "test-linear");
    assert_eq!(body["features"], 6);
}

#[tokio::test]
async fn test_schema_in_model_order() {
    let body = extract_json(get(test_router(), "/api/schema").await).await;
    assert_eq!(
        body["columns"],
        json!([
            "const",
            "artistPopularity",
            "prevTrackPopularity",
            "Genre_Pop",
            "Genre_Rock",
            "Duration_Standard"
        ])
    );
}

#[tokio::test]
async fn test_genre_choices_include_other() {
    let body = extract_json(get(test_router(), "/api/genres").await).await;
    assert_eq!(body["genres"], json!(["Other", "Pop", "Rock"]));
}

#[tokio::test]
async fn test_predict_single() {
    let response = post_json(
        test_router(),
        "/api/predict",
        json!({"fame": 70, "momentum": 55, "duration": 3.5, "genre": "Pop"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // 5 + 35 + 22 + 10 + 8
    let body = extract_json(response).await;
    assert_eq!(body["score"], 80.0);
    assert_eq!(body["tier"], "Solid Performance");
    assert_eq!(body["duration_bin"], "Standard");
    assert_eq!(body["advice"], "sweet_spot");
    assert_eq!(body["momentum_trend"], "down");
    assert!(body.get("explain").is_none());
}

#[tokio::test]
async fn test_predict_explain_lists_schema_columns() {
    let response = post_json(
        test_router(),
        "/api/predict?explain=true",
        json!({"fame": 90, "momentum": 80, "duration": 1.5, "genre": "Jazz"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["advice"], "too_short");
    assert_eq!(body["momentum_trend"], "up");

    let explain = body["explain"].as_array().expect("explain array");
    let names: Vec<&str> = explain.iter().filter_map(|f| f["name"].as_str()).collect();
    assert_eq!(
        names,
        vec![
            "const",
            "artistPopularity",
            "prevTrackPopularity",
            "Genre_Pop",
            "Genre_Rock",
            "Duration_Standard"
        ]
    );
    let values: Vec<f64> = explain.iter().filter_map(|f| f["value"].as_f64()).collect();
    assert_eq!(values, vec![1.0, 90.0, 80.0, 0.0, 0.0, 0.0]);
}

#[tokio::test]
async fn test_predict_out_of_range_is_bad_request() {
    let response = post_json(
        test_router(),
        "/api/predict",
        json!({"fame": 120, "momentum": 55, "duration": 3.5, "genre": "Pop"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("fame"));
}

#[tokio::test]
async fn test_batch_scores_and_sorts() {
    let csv = "trackName,artistName,primaryGenreName,durationMins,artistPopularity\n\
               Quiet,A,Rock,1.5,10\n\
               Loud,B,Pop,3.5,60\n";
    let response = post_csv(test_router(), csv).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let text = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "trackName,artistName,primaryGenreName,durationMins,artistPopularity,Predicted_Score"
    );
    // Loud: 5 + 30 + 10 + 8; Quiet: 5 + 5 - 5
    assert_eq!(lines[1], "Loud,B,Pop,3.5,60,53");
    assert_eq!(lines[2], "Quiet,A,Rock,1.5,10,5");
}

#[tokio::test]
async fn test_batch_missing_genre_is_unprocessable() {
    let response = post_csv(test_router(), "trackName,durationMins\nA,3.0\n").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = extract_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("primaryGenreName"));
}

#[tokio::test]
async fn test_batch_missing_duration_is_unprocessable() {
    let response = post_csv(test_router(), "trackName,primaryGenreName\nA,Pop\n").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_batch_empty_upload_is_bad_request() {
    let response = post_csv(test_router(), "  \n").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_ragged_rows_are_bad_request() {
    let response = post_csv(test_router(), "primaryGenreName,durationMins\nPop\n").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
