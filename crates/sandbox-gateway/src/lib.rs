//! HTTP gateway over the pipeline engine in `sandbox-core`.
//!
//! ## API
//!
//! ### Skills
//! - `POST /api/skills` — upload a skill (raw Markdown body), parse it, persist it
//! - `GET /api/skills` — list all skills
//! - `GET /api/skills/{id}` — fetch one
//!
//! ### Pipelines
//! - `POST /api/pipelines` — start a run for a skill
//! - `GET /api/pipelines/{id}` — status snapshot
//! - `GET /api/pipelines/{id}/events` — SSE stream of status transitions
//! - `POST /api/pipelines/{id}/approve` — approve a pending spec
//! - `POST /api/pipelines/{id}/re-analyze` — re-run the analyzer on a rejected spec
//! - `POST /api/pipelines/{id}/retry` — retry a failed run from its last step
//!
//! ### Sandboxes
//! - `GET /api/sandboxes/{id}` — sandbox record
//! - `GET /api/sandboxes/{id}/logs` — buffered log lines
//! - `GET /api/sandboxes/{id}/events` — SSE stream of log lines and status changes
//! - `POST /api/sandboxes/{id}/stop` / `/restart` / `/destroy` — lifecycle control
//!
//! ### Tools
//! - `POST /api/tools/search` — the `web_search` tool's host-side proxy
//!
//! ### System
//! - `GET /api/health`
//!
//! ## Example
//!
//! ```ignore
//! use sandbox_gateway::{HttpServer, HttpServerConfig};
//! use sandbox_core::SandboxConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = HttpServer::new(SandboxConfig::default());
//!     server.run().await
//! }
//! ```

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod types;

pub use routes::create_app;
pub use server::{AppState, HttpServer, HttpServerConfig};

use anyhow::Result;
use sandbox_core::SandboxConfig;

/// Starts the gateway with default host/port/CORS/tracing settings,
/// overriding host and port. Used by `sandbox serve` in the CLI.
pub async fn serve(sandbox_config: SandboxConfig, host: &str, port: u16) -> Result<()> {
    let http_config = HttpServerConfig { host: host.to_string(), port, ..HttpServerConfig::default() };
    HttpServer::with_config(sandbox_config, http_config).run().await
}
