//! The five core entities: [`Skill`], [`SandboxSpec`], [`PipelineRun`],
//! [`Sandbox`], and the static [`Tool`] registry entry type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A Markdown-defined specification of an agent's role, tools, and environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub source_url: Option<String>,
    pub raw_content: String,
    pub parsed_data: ParsedData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Output of [`crate::parser::parse`]: the skill's frontmatter plus every
/// fact the keyword scan could extract from the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParsedData {
    pub name: String,
    pub description: String,
    pub frontmatter: HashMap<String, serde_yaml::Value>,
    pub sections: Vec<String>,
    pub mentioned_tools: Vec<String>,
    pub mentioned_frameworks: Vec<String>,
    pub mentioned_dependencies: Vec<String>,
    pub raw_guidelines: String,
}

/// Status of a [`SandboxSpec`]. Advances monotonically; `Failed` is a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecStatus {
    Draft,
    Approved,
    Building,
    Built,
    Failed,
}

impl std::fmt::Display for SpecStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SpecStatus::Draft => "draft",
            SpecStatus::Approved => "approved",
            SpecStatus::Building => "building",
            SpecStatus::Built => "built",
            SpecStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Package manager dispatched on by the Dockerfile builder. A closed set
/// with an explicit "unsupported" fallback, same tagged-union style as
/// [`crate::llm::Provider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Pip,
    Pip3,
    #[serde(other)]
    Unsupported,
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Pip => "pip",
            PackageManager::Pip3 => "pip3",
            PackageManager::Unsupported => "unsupported",
        };
        write!(f, "{s}")
    }
}

/// `runtime_deps`: a package manager plus a name → version-string mapping.
/// Kept as an ordered `Vec` of pairs (rather than a `HashMap`) because
/// `required_context_files` must emit `requirements.txt` lines in the same
/// order the packages were declared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeDeps {
    pub manager: PackageManager,
    pub packages: Vec<(String, String)>,
}

impl Default for PackageManager {
    fn default() -> Self {
        PackageManager::Unsupported
    }
}

/// The structured, validated plan produced by the analyzer from a [`Skill`];
/// the input to the Dockerfile builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxSpec {
    pub id: Uuid,
    pub skill_id: Uuid,
    pub base_image: String,
    pub system_packages: Vec<String>,
    pub runtime_deps: RuntimeDeps,
    /// At minimum contains `cli` and `web_search` sub-maps.
    pub tool_configs: serde_json::Value,
    pub eval_goals: Vec<String>,
    pub dockerfile_content: Option<String>,
    pub status: SpecStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of a live [`Sandbox`] container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxStatus {
    Building,
    Running,
    Stopped,
    Error,
}

impl std::fmt::Display for SandboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SandboxStatus::Building => "building",
            SandboxStatus::Running => "running",
            SandboxStatus::Stopped => "stopped",
            SandboxStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// A live container built from a [`SandboxSpec`], plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sandbox {
    pub id: Uuid,
    pub sandbox_spec_id: Uuid,
    pub container_id: Option<String>,
    pub image_id: Option<String>,
    pub status: SandboxStatus,
    pub port_mappings: HashMap<String, String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of a [`PipelineRun`]. See [`crate::pipeline`] for the full state
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Parsing,
    Analyzing,
    Reviewing,
    Building,
    Configuring,
    Ready,
    Failed,
}

impl RunStatus {
    /// Step index used for UI progress and persistence; -1 for `failed`.
    pub fn step_index(self) -> i32 {
        match self {
            RunStatus::Pending => 0,
            RunStatus::Parsing => 1,
            RunStatus::Analyzing => 2,
            RunStatus::Reviewing => 3,
            RunStatus::Building => 4,
            RunStatus::Configuring => 5,
            RunStatus::Ready => 6,
            RunStatus::Failed => -1,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Ready | RunStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Parsing => "parsing",
            RunStatus::Analyzing => "analyzing",
            RunStatus::Reviewing => "reviewing",
            RunStatus::Building => "building",
            RunStatus::Configuring => "configuring",
            RunStatus::Ready => "ready",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One invocation of the analyze-and-build state machine over a [`Skill`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub skill_id: Uuid,
    pub sandbox_spec_id: Option<Uuid>,
    pub sandbox_id: Option<Uuid>,
    pub status: RunStatus,
    pub current_step: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// step-name → elapsed milliseconds, written only when that step completes.
    pub step_timings: HashMap<String, u64>,
}

impl PipelineRun {
    pub fn new(skill_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            skill_id,
            sandbox_spec_id: None,
            sandbox_id: None,
            status: RunStatus::Pending,
            current_step: RunStatus::Pending.step_index(),
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
            step_timings: HashMap::new(),
        }
    }
}

/// A statically registered tool. Not persisted: declared in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing accepted parameters.
    pub parameter_schema: serde_json::Value,
    /// Shell script installed at `/tools/<name>.sh` inside the container.
    pub container_setup_script: String,
}
