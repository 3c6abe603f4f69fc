//! Error taxonomy for every subsystem in this crate.
//!
//! Each component gets its own variant set so call sites can match on the
//! kind of failure without downcasting; [`CoreError`] is the crate-wide
//! enum that subsystem errors convert into at their boundary.

use thiserror::Error;

/// Errors raised by [`crate::parser::parse`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("skill content is empty")]
    EmptyContent,

    #[error("invalid frontmatter: {0}")]
    InvalidFrontmatter(String),
}

/// Errors raised by the LLM HTTP client.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("server error: {0}")]
    ServerError(String),

    #[error("request timed out")]
    Timeout,

    #[error("authentication failed")]
    AuthFailed,

    #[error("unexpected response: {preview}")]
    UnexpectedResponse { preview: String },

    #[error("request error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl LlmError {
    /// Truncate a response body to at most 500 characters for error display.
    pub fn preview(body: &str) -> String {
        if body.len() <= 500 {
            body.to_string()
        } else {
            let mut truncated: String = body.chars().take(500).collect();
            truncated.push('…');
            truncated
        }
    }

    /// Transient classes the LLM client retries: rate limits, server errors, timeouts.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. } | LlmError::ServerError(_) | LlmError::Timeout
        )
    }
}

/// Errors raised by the web-search host proxy.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search provider is not configured")]
    Unconfigured,

    #[error("search provider returned HTTP {0}")]
    Http(u16),
}

/// Errors raised while validating an analyzer response against the
/// `SandboxSpec` schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{field}` has the wrong type: expected {expected}")]
    WrongType { field: String, expected: String },

    #[error("eval_goals has {found} entries, at least 5 are required")]
    InsufficientEvalGoals { found: usize },

    #[error("`{0}` must be a JSON object")]
    NotAnObject(String),
}

/// Errors raised by [`crate::analyzer::analyze`].
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("analyzer response was not valid JSON: {0}")]
    InvalidJson(String),

    #[error("analyzer response was not a JSON object")]
    NotAnObject,

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors raised by the Docker driver.
#[derive(Error, Debug)]
pub enum DockerError {
    #[error("docker binary not found on PATH")]
    BinaryMissing,

    #[error("docker {command} exited with code {code}: {detail}")]
    CommandFailed {
        command: String,
        code: i32,
        detail: String,
    },

    #[error("docker {command} timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("io error running docker: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised assembling a build context directory.
#[derive(Error, Debug)]
pub enum BuildContextError {
    #[error("failed to create build context directory: {0}")]
    CreateDir(std::io::Error),

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },
}

/// Lifecycle errors from the pipeline runner and sandbox monitor.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("background task crashed: {0}")]
    TaskCrashed(String),

    #[error(transparent)]
    Docker(#[from] DockerError),

    #[error(transparent)]
    BuildContext(#[from] BuildContextError),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Crate-wide error, used at persistence and gateway boundaries.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error(transparent)]
    Docker(#[from] DockerError),

    #[error(transparent)]
    BuildContext(#[from] BuildContextError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state for this operation: {0}")]
    InvalidState(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
