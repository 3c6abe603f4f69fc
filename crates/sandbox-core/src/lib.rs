//! sandbox-core — the pipeline's engine.
//!
//! Converts a human-authored skill definition (Markdown with optional YAML
//! front-matter) into a running, isolated Docker sandbox equipped with a
//! manifest of callable tools. Four subsystems do the work:
//!
//! - [`parser`] — pure Markdown/front-matter parsing into [`types::ParsedData`].
//! - [`analyzer`] and [`llm`] — prompt construction, a retrying HTTP client
//!   over the Anthropic/OpenAI chat dialects, and schema validation of the
//!   resulting [`types::SandboxSpec`].
//! - [`dockerfile`], [`build_context`], and [`docker`] — deterministic
//!   Dockerfile generation, build-context assembly, and a timeout-wrapped
//!   Docker CLI driver.
//! - [`pipeline`] and [`monitor`] — the per-run state machine and the
//!   per-container log/health actor.
//!
//! [`db`] persists the four entity tables and [`events`] fans out their
//! transitions to subscribers; [`config`] loads runtime configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn run() -> anyhow::Result<()> {
//! use sandbox_core::{SandboxConfig, Db, LlmClient, DockerDriver, EventBus};
//! use sandbox_core::pipeline::{PipelineRegistry, PipelineSupervisor};
//! use sandbox_core::monitor::MonitorRegistry;
//! use std::sync::Arc;
//!
//! let config = SandboxConfig::default();
//! let db = Arc::new(Db::connect(&config.expanded_db_path()).await?);
//! let events = Arc::new(EventBus::new());
//! let docker = Arc::new(DockerDriver::new());
//! let llm = Arc::new(LlmClient::new(&config.llm)?);
//! let monitors = Arc::new(MonitorRegistry::new(
//!     docker.clone(), db.clone(), events.clone(),
//!     config.monitor.poll_interval, config.monitor.log_buffer_lines,
//! ));
//! let supervisor = PipelineSupervisor::new(
//!     Arc::new(PipelineRegistry::new()), db, events, llm, docker,
//!     config.docker.clone(), monitors,
//! );
//! supervisor.recover().await?;
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod build_context;
pub mod config;
pub mod db;
pub mod docker;
pub mod dockerfile;
pub mod errors;
pub mod events;
pub mod llm;
pub mod monitor;
pub mod parser;
pub mod pipeline;
pub mod tools;
pub mod types;

pub use config::{DockerConfig, GatewayConfig, LlmConfig, MonitorConfig, SandboxConfig};
pub use db::Db;
pub use docker::{DockerDriver, DockerTimeouts, LogStream, RunOpts};
pub use errors::{CoreError, Result};
pub use events::{EventBus, PipelineUpdate, SandboxEvent, SandboxStatusUpdate};
pub use llm::{ChatMessage, CompletionRequest, LlmClient, Provider, Role};
pub use monitor::MonitorRegistry;
pub use pipeline::{PipelineRegistry, PipelineSupervisor};
pub use types::{
    PackageManager, ParsedData, PipelineRun, RunStatus, RuntimeDeps, Sandbox, SandboxSpec,
    SandboxStatus, Skill, SpecStatus, Tool,
};
