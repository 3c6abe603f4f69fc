//! OpenAPI 3.1 documentation for the gateway's REST API.
//!
//! Only the request/response DTOs in [`crate::types`] are registered here.
//! Read endpoints that return a `sandbox-core` entity directly (`Skill`,
//! `SandboxSpec`, `Sandbox`, `PipelineRun`) are documented in prose rather
//! than schema, since `sandbox-core` doesn't take a `utoipa` dependency
//! purely to annotate its entities (see DESIGN.md).

use utoipa::OpenApi;

use crate::types::{
    ApiError, HealthResponse, LogsResponse, SearchErrorResponse, SearchRequest, SearchResponse,
    SearchResultDto, StartPipelineRequest, StartPipelineResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sandbox Gateway API",
        version = "1.0.0",
        description = "Turns a skill definition into a monitored Docker sandbox",
        license(name = "Apache-2.0", url = "https://www.apache.org/licenses/LICENSE-2.0")
    ),
    servers(
        (url = "http://localhost:8088/api", description = "Local development server"),
    ),
    components(
        schemas(
            StartPipelineRequest,
            StartPipelineResponse,
            SearchRequest,
            SearchResultDto,
            SearchResponse,
            SearchErrorResponse,
            LogsResponse,
            HealthResponse,
            ApiError,
        )
    ),
    tags(
        (name = "skills", description = "Skill upload and retrieval"),
        (name = "pipelines", description = "Pipeline run lifecycle"),
        (name = "sandboxes", description = "Sandbox lifecycle and log streaming"),
        (name = "tools", description = "Host-side tool proxies"),
        (name = "system", description = "Health checks"),
    )
)]
pub struct ApiDoc;

/// Renders the OpenAPI specification as pretty-printed JSON, served at
/// `/api/openapi.json`.
pub fn generate_openapi_json() -> String {
    ApiDoc::openapi().to_pretty_json().expect("OpenAPI spec should always serialize")
}
