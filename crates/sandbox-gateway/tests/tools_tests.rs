//! Integration tests for the `/api/tools/search` wire contract: the
//! response shape here is fixed by the tool's own contract, not the
//! gateway's general `ApiError` envelope.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::Value;

#[tokio::test]
async fn search_tool_rejects_missing_query_field() {
    let app = TestApp::new().await;
    let req = TestApp::post_request("/api/tools/search", "{}");
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let value: Value = TestApp::parse_json(&body);
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"], "Missing or empty 'query' parameter");
}

#[tokio::test]
async fn search_tool_rejects_blank_query() {
    let app = TestApp::new().await;
    let req = TestApp::post_request("/api/tools/search", r#"{"query": "   "}"#);
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let value: Value = TestApp::parse_json(&body);
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"], "Missing or empty 'query' parameter");
}
