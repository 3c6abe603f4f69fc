//! API route definitions

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::openapi::ApiDoc;
use crate::server::AppState;

/// Routes mounted under `/api`.
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/skills", post(handlers::upload_skill))
        .route("/skills", get(handlers::list_skills))
        .route("/skills/:id", get(handlers::get_skill))
        .route("/pipelines", post(handlers::start_pipeline))
        .route("/pipelines/:id", get(handlers::get_pipeline_status))
        .route("/pipelines/:id/events", get(handlers::pipeline_events))
        .route("/pipelines/:id/approve", post(handlers::approve_pipeline))
        .route("/pipelines/:id/re-analyze", post(handlers::re_analyze_pipeline))
        .route("/pipelines/:id/retry", post(handlers::retry_pipeline))
        .route("/sandboxes/:id", get(handlers::get_sandbox))
        .route("/sandboxes/:id/logs", get(handlers::get_sandbox_logs))
        .route("/sandboxes/:id/events", get(handlers::sandbox_events))
        .route("/sandboxes/:id/stop", post(handlers::stop_sandbox))
        .route("/sandboxes/:id/restart", post(handlers::restart_sandbox))
        .route("/sandboxes/:id/destroy", post(handlers::destroy_sandbox))
        .route("/tools/search", post(handlers::search_tool))
        .route("/health", get(handlers::health_check))
        .with_state(state)
}

/// The full application router: the API nested under `/api`, a Swagger UI
/// at `/docs/api`, and a JSON 404 fallback for everything else.
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs/api").url("/api/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes(state))
        .fallback(handlers::not_found)
}
