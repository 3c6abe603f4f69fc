//! Route handlers. One function per endpoint in `crate::routes`, each
//! taking the shared [`AppState`] and returning either the body type
//! directly or [`AppError`] — the same thin-handler, `From`-based error
//! conversion style as `skill-http`'s own handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::Stream;
use futures::StreamExt as _;
use sandbox_core::events::{PipelineUpdate, SandboxEvent};
use sandbox_core::{PipelineRun, Sandbox, Skill};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::middleware::AppError;
use crate::server::AppState;
use crate::types::{
    ApiError, HealthResponse, LogsResponse, SearchErrorResponse, SearchRequest, SearchResponse,
    SearchResultDto, StartPipelineRequest, StartPipelineResponse,
};

// ---------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------

/// `POST /api/skills` — parse the raw Markdown body and persist a [`Skill`].
pub async fn upload_skill(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<(StatusCode, Json<Skill>), AppError> {
    let parsed = sandbox_core::parser::parse(&body).map_err(|e| AppError::bad_request(e.to_string()))?;

    let now = chrono::Utc::now();
    let skill = Skill {
        id: Uuid::new_v4(),
        name: parsed.name.clone(),
        description: parsed.description.clone(),
        source_url: None,
        raw_content: body,
        parsed_data: parsed,
        created_at: now,
        updated_at: now,
    };

    state.db.insert_skill(&skill).await?;
    Ok((StatusCode::CREATED, Json(skill)))
}

/// `GET /api/skills/:id`
pub async fn get_skill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Skill>, AppError> {
    let skill = state.db.get_skill(id).await?.ok_or_else(|| AppError::not_found("skill"))?;
    Ok(Json(skill))
}

/// `GET /api/skills`
pub async fn list_skills(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Skill>>, AppError> {
    Ok(Json(state.db.list_skills().await?))
}

// ---------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------

/// `POST /api/pipelines` — start a run via the supervisor.
pub async fn start_pipeline(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartPipelineRequest>,
) -> Result<(StatusCode, Json<StartPipelineResponse>), AppError> {
    if state.db.get_skill(req.skill_id).await?.is_none() {
        return Err(AppError::not_found("skill"));
    }
    let run_id = state.supervisor.start_pipeline(req.skill_id).await?;
    Ok((StatusCode::CREATED, Json(StartPipelineResponse { run_id })))
}

/// `GET /api/pipelines/:id` — a synchronous status snapshot. Prefers the
/// live runner's mailbox (never torn mid-transition); falls back to the
/// persisted row if the runner isn't registered in this process — e.g.
/// the gateway restarted and recovery hasn't reached this run yet.
pub async fn get_pipeline_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PipelineRun>, AppError> {
    match state.supervisor.get_status(id).await {
        Ok(run) => Ok(Json(run)),
        Err(_) => {
            let run = state.db.get_run(id).await?.ok_or_else(|| AppError::not_found("pipeline run"))?;
            Ok(Json(run))
        }
    }
}

/// `GET /api/pipelines/:id/events` — SSE stream of `pipeline_update` events.
pub async fn pipeline_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe_pipeline(id);
    let stream = BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(update) => Some(Ok(to_sse_event("pipeline_update", &update))),
            Err(_) => None,
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// `POST /api/pipelines/:id/approve`
pub async fn approve_pipeline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.supervisor.approve_spec(id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// `POST /api/pipelines/:id/re-analyze`
pub async fn re_analyze_pipeline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.supervisor.re_analyze(id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// `POST /api/pipelines/:id/retry`
pub async fn retry_pipeline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.supervisor.retry(id).await?;
    Ok(StatusCode::ACCEPTED)
}

// ---------------------------------------------------------------------
// Sandboxes
// ---------------------------------------------------------------------

/// `GET /api/sandboxes/:id`
pub async fn get_sandbox(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sandbox>, AppError> {
    let sandbox = state.db.get_sandbox(id).await?.ok_or_else(|| AppError::not_found("sandbox"))?;
    Ok(Json(sandbox))
}

/// `GET /api/sandboxes/:id/logs` — the monitor's in-memory ring buffer, if
/// the sandbox's monitor is alive in this process.
pub async fn get_sandbox_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LogsResponse>, AppError> {
    let lines = state.monitors.get_logs(id).await.ok_or_else(|| AppError::not_found("sandbox"))?;
    Ok(Json(LogsResponse { lines }))
}

/// `GET /api/sandboxes/:id/events` — SSE stream of log lines and status
/// changes.
pub async fn sandbox_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe_sandbox(id);
    let stream = BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(event) => Some(Ok(to_sse_event(sandbox_event_name(&event), &event))),
            Err(_) => None,
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// `POST /api/sandboxes/:id/stop`
pub async fn stop_sandbox(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.monitors.stop(id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// `POST /api/sandboxes/:id/restart`
pub async fn restart_sandbox(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.monitors.restart(id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// `POST /api/sandboxes/:id/destroy`
pub async fn destroy_sandbox(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.monitors.destroy(id).await?;
    Ok(StatusCode::ACCEPTED)
}

// ---------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------

/// `POST /api/tools/search` — the host-side half of the `web_search` tool:
/// sandboxes curl this route at `host.docker.internal`; it forwards to the
/// configured search provider and returns real results. The response shape
/// is fixed by the tool's own contract (`{"status":"ok","results":…}` or
/// `{"status":"error","error":…}`), not the gateway's general `ApiError`
/// envelope, since `web_search.sh` parses `status` directly.
pub async fn search_tool(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> axum::response::Response {
    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SearchErrorResponse::new("Missing or empty 'query' parameter")),
        )
            .into_response();
    }

    match state.search.search(&req.query, req.max_results).await {
        Ok(results) => {
            let results = results.into_iter().map(SearchResultDto::from).collect();
            (StatusCode::OK, Json(SearchResponse::ok(results))).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(SearchErrorResponse::new(e.to_string()))).into_response(),
    }
}

// ---------------------------------------------------------------------
// System
// ---------------------------------------------------------------------

/// `GET /api/health`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        docker_available: state.docker.is_available().await,
    })
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ApiError::not_found("route")))
}

// ---------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------

fn to_sse_event<T: serde::Serialize>(event_name: &str, payload: &T) -> Event {
    match serde_json::to_string(payload) {
        Ok(data) => Event::default().event(event_name).data(data),
        Err(e) => Event::default().event("error").data(e.to_string()),
    }
}

fn sandbox_event_name(event: &SandboxEvent) -> &'static str {
    match event {
        SandboxEvent::LogLine { .. } => "log_line",
        SandboxEvent::StatusChange { .. } => "status_change",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_event_names_match_wire_contract() {
        assert_eq!(sandbox_event_name(&SandboxEvent::LogLine { text: "x".into() }), "log_line");
        assert_eq!(
            sandbox_event_name(&SandboxEvent::StatusChange { raw_status: "running".into() }),
            "status_change"
        );
    }

    #[test]
    fn to_sse_event_serializes_payload_as_json_data() {
        let update = PipelineUpdate {
            run_id: Uuid::nil(),
            status: "ready".to_string(),
            current_step: 6,
            error_message: None,
            sandbox_spec_id: None,
            sandbox_id: None,
        };
        let event = to_sse_event("pipeline_update", &update);
        assert!(format!("{event:?}").contains("ready"));
    }
}
