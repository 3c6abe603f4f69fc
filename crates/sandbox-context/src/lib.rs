//! Host-side secrets, resource limits, and the web-search proxy client
//! shared by `sandbox-gateway` and `sandbox-cli`.
//!
//! `sandbox-core` builds Dockerfiles and drives containers without ever
//! touching a real credential — the `web_search` tool's shell script inside
//! the container only knows how to reach `host.docker.internal`. This
//! crate is what answers on the other end: it holds the configured search
//! provider's API key, performs the actual outbound HTTP request, and
//! provides the redaction heuristic the gateway uses before echoing a
//! `SandboxSpec`'s `tool_configs` back over the API or into a log line.
//!
//! - [`secrets`] — the `is_likely_secret` naming heuristic, `${VAR}`
//!   expansion, and JSON redaction.
//! - [`resources`] — CPU/memory/network limits for a sandbox container.
//! - [`search`] — the `web_search` tool's host-side HTTP client.

pub mod resources;
pub mod search;
pub mod secrets;

pub use resources::ResourceLimits;
pub use search::{SearchClient, SearchProviderConfig, SearchResult};
pub use secrets::{expand_vars, is_likely_secret, redact, redact_json, SecretDeclaration};

use thiserror::Error;

/// Errors from this crate's search client and secret resolution.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("search provider is not configured with an API key")]
    MissingApiKey,

    #[error("search provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search provider error: {0}")]
    Provider(String),
}

pub type Result<T> = std::result::Result<T, ContextError>;
