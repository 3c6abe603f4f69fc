//! HTTP server: `AppState` construction and the `axum::serve` loop.
//!
//! Grounded on the `AppState`/`HttpServer::run` pattern in
//! `skill-http/src/server.rs` — shared state built once at startup, CORS
//! and `TraceLayer` applied the same way, `axum::serve` over a bound
//! `TcpListener`.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use sandbox_context::{SearchClient, SearchProviderConfig};
use sandbox_core::monitor::MonitorRegistry;
use sandbox_core::pipeline::{PipelineRegistry, PipelineSupervisor};
use sandbox_core::{Db, DockerDriver, EventBus, LlmClient, SandboxConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes::create_app;

/// HTTP server configuration. Separate from [`SandboxConfig`] because it's
/// only the bind address and CORS/tracing toggles — the rest of
/// `SandboxConfig` is consumed while building [`AppState`].
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub enable_tracing: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8088, enable_cors: true, enable_tracing: true }
    }
}

impl From<&SandboxConfig> for HttpServerConfig {
    fn from(config: &SandboxConfig) -> Self {
        Self {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
            enable_cors: true,
            enable_tracing: true,
        }
    }
}

/// Shared application state handed to every handler.
pub struct AppState {
    pub started_at: Instant,
    pub db: Arc<Db>,
    pub events: Arc<EventBus>,
    pub docker: Arc<DockerDriver>,
    pub monitors: Arc<MonitorRegistry>,
    pub supervisor: Arc<PipelineSupervisor>,
    pub search: Arc<SearchClient>,
}

impl AppState {
    /// Wires up the full engine: DB connection, event bus, Docker driver,
    /// LLM client, monitor registry, and pipeline supervisor, then recovers
    /// any pipeline runs left non-terminal by a previous crash.
    pub async fn new(config: &SandboxConfig) -> Result<Self> {
        let db = Arc::new(Db::connect(&config.expanded_db_path()).await?);
        let events = Arc::new(EventBus::new());
        let docker = Arc::new(DockerDriver::new());
        let llm = Arc::new(LlmClient::new(&config.llm)?);
        let monitors = Arc::new(MonitorRegistry::new(
            docker.clone(),
            db.clone(),
            events.clone(),
            config.monitor.poll_interval,
            config.monitor.log_buffer_lines,
        ));
        let supervisor = Arc::new(PipelineSupervisor::new(
            Arc::new(PipelineRegistry::new()),
            db.clone(),
            events.clone(),
            llm,
            docker.clone(),
            config.docker.clone(),
            monitors.clone(),
        ));
        supervisor.recover().await?;

        let search_config = SearchProviderConfig::default().with_env_overrides();
        let search = Arc::new(SearchClient::new(search_config));

        Ok(Self { started_at: Instant::now(), db, events, docker, monitors, supervisor, search })
    }
}

/// HTTP server that exposes the pipeline engine over the routes of
/// `crate::routes`.
pub struct HttpServer {
    http_config: HttpServerConfig,
    sandbox_config: SandboxConfig,
}

impl HttpServer {
    pub fn new(sandbox_config: SandboxConfig) -> Self {
        let http_config = HttpServerConfig::from(&sandbox_config);
        Self { http_config, sandbox_config }
    }

    pub fn with_config(sandbox_config: SandboxConfig, http_config: HttpServerConfig) -> Self {
        Self { http_config, sandbox_config }
    }

    pub async fn run(&self) -> Result<()> {
        let state = Arc::new(AppState::new(&self.sandbox_config).await?);

        let mut app = create_app(state);

        if self.http_config.enable_cors {
            let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
            app = app.layer(cors);
        }
        if self.http_config.enable_tracing {
            app = app.layer(TraceLayer::new_for_http());
        }

        let addr = format!("{}:{}", self.http_config.host, self.http_config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "sandbox gateway listening");
        axum::serve(listener, app).await?;

        Ok(())
    }
}
