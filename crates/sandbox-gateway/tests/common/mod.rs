//! Shared integration-test harness: an in-memory-DB `AppState` driven
//! through `routes::create_app` with `tower::ServiceExt::oneshot`, the same
//! pattern `skill-http`'s own integration tests use.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use sandbox_core::SandboxConfig;
use sandbox_gateway::AppState;
use tower::ServiceExt;

pub struct TestApp {
    pub state: Arc<AppState>,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = SandboxConfig { db_path: ":memory:".to_string(), ..SandboxConfig::default() };
        let state = Arc::new(AppState::new(&config).await.expect("AppState should build against :memory:"));
        Self { state }
    }

    pub async fn request(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let app = sandbox_gateway::routes::create_app(self.state.clone());
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    pub fn get_request(path: &str) -> Request<Body> {
        Request::builder().method("GET").uri(path).body(Body::empty()).unwrap()
    }

    pub fn post_request(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn post_markdown(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "text/markdown")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> T {
        serde_json::from_slice(body).expect("response body should be valid JSON")
    }
}

/// A minimal skill document the parser accepts: a name heading plus enough
/// body content to produce a non-empty `ParsedData`.
pub fn sample_skill_markdown() -> &'static str {
    "# Weather Lookup\n\n\
     A skill that looks up the current weather for a city.\n\n\
     ## Tools\n\n\
     - `get_weather(city: str) -> str`: returns the current conditions.\n"
}
