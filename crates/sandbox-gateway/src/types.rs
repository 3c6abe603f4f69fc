//! Request/response DTOs for the HTTP API. Most read endpoints return
//! `sandbox-core` entity types directly; these are the shapes that don't
//! have a natural entity counterpart.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// `POST /api/pipelines` body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartPipelineRequest {
    pub skill_id: Uuid,
}

/// `POST /api/pipelines` response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StartPipelineResponse {
    pub run_id: Uuid,
}

/// `POST /api/tools/search` body — the `web_search` tool's parameter
/// contract from the tool manifest (`query`, optional `max_results`).
/// `query` defaults to empty rather than failing deserialization when the
/// key is absent, so a missing `query` is reported as the spec's literal
/// "Missing or empty 'query' parameter" error rather than a generic 422.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    pub max_results: Option<u32>,
}

/// One search hit, mirrored here (rather than reused from `sandbox-context`)
/// purely so `utoipa` can derive a schema for it without that crate taking
/// a dependency on `utoipa` itself.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchResultDto {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl From<sandbox_context::SearchResult> for SearchResultDto {
    fn from(r: sandbox_context::SearchResult) -> Self {
        Self { title: r.title, url: r.url, snippet: r.snippet }
    }
}

/// `POST /api/tools/search` success body — the literal
/// `{"status":"ok","results":…}` contract containers parse.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchResponse {
    pub status: String,
    pub results: Vec<SearchResultDto>,
}

impl SearchResponse {
    pub fn ok(results: Vec<SearchResultDto>) -> Self {
        Self { status: "ok".to_string(), results }
    }
}

/// `POST /api/tools/search` error body — the literal
/// `{"status":"error","error":…}` contract, distinct from [`ApiError`]
/// since this endpoint's wire shape is fixed by the tool contract rather
/// than the gateway's own error convention.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchErrorResponse {
    pub status: String,
    pub error: String,
}

impl SearchErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { status: "error".to_string(), error: message.into() }
    }
}

/// `GET /api/sandboxes/:id/logs` response: the monitor's ring-buffer
/// snapshot at the time of the request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogsResponse {
    pub lines: Vec<String>,
}

/// `GET /api/health` response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub docker_available: bool,
}

/// Uniform error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}
