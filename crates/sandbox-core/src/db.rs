//! SQLite persistence for the four entity tables: `skills`,
//! `sandbox_specs`, `sandboxes`, `pipeline_runs`.
//!
//! Grounded on `skill-http/execution_history/db.rs`'s style: a connection
//! pool behind a plain struct, `setup()` creating tables/indexes with
//! `CREATE TABLE IF NOT EXISTS`, runtime `sqlx::query`/`query_as` (not the
//! compile-time-checked `query!` macros, which need a live `DATABASE_URL` at
//! build time) and manual row-to-struct mapping functions. JSON columns are
//! `TEXT` holding `serde_json`-encoded values, decoded on read, since their
//! shape varies per package manager / tool configuration.

use crate::errors::{CoreError, Result};
use crate::types::{
    PackageManager, ParsedData, PipelineRun, RunStatus, RuntimeDeps, Sandbox, SandboxSpec,
    SandboxStatus, Skill, SpecStatus,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// Connection pool plus the schema migrations applied at startup.
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Connect to (and create, if absent) the SQLite database at `path`.
    /// `path` may be `:memory:` for tests.
    pub async fn connect(path: &str) -> Result<Self> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        CoreError::Database(sqlx::Error::Io(e))
                    })?;
                }
            }
            format!("sqlite:{path}?mode=rwc")
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await?;
        let db = Self { pool };
        db.setup().await?;
        Ok(db)
    }

    async fn setup(&self) -> Result<()> {
        sqlx::query("PRAGMA foreign_keys = ON;").execute(&self.pool).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS skills (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                source_url TEXT,
                raw_content TEXT NOT NULL,
                parsed_data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sandbox_specs (
                id TEXT PRIMARY KEY,
                skill_id TEXT NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
                base_image TEXT NOT NULL,
                system_packages TEXT NOT NULL,
                runtime_deps TEXT NOT NULL,
                tool_configs TEXT NOT NULL,
                eval_goals TEXT NOT NULL,
                dockerfile_content TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sandboxes (
                id TEXT PRIMARY KEY,
                sandbox_spec_id TEXT REFERENCES sandbox_specs(id) ON DELETE SET NULL,
                container_id TEXT,
                image_id TEXT,
                status TEXT NOT NULL,
                port_mappings TEXT NOT NULL,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pipeline_runs (
                id TEXT PRIMARY KEY,
                skill_id TEXT NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
                sandbox_spec_id TEXT,
                sandbox_id TEXT,
                status TEXT NOT NULL,
                current_step INTEGER NOT NULL,
                error_message TEXT,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                step_timings TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sandbox_specs_skill ON sandbox_specs(skill_id);")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_pipeline_runs_skill ON pipeline_runs(skill_id);")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_pipeline_runs_status ON pipeline_runs(status);")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---- skills ----------------------------------------------------

    pub async fn insert_skill(&self, skill: &Skill) -> Result<()> {
        sqlx::query(
            "INSERT INTO skills (id, name, description, source_url, raw_content, parsed_data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(skill.id.to_string())
        .bind(&skill.name)
        .bind(&skill.description)
        .bind(&skill.source_url)
        .bind(&skill.raw_content)
        .bind(serde_json::to_string(&skill.parsed_data)?)
        .bind(skill.created_at.to_rfc3339())
        .bind(skill.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_skill(&self, id: Uuid) -> Result<Option<Skill>> {
        let row = sqlx::query("SELECT * FROM skills WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_skill).transpose()
    }

    pub async fn list_skills(&self) -> Result<Vec<Skill>> {
        let rows = sqlx::query("SELECT * FROM skills ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_skill).collect()
    }

    pub async fn update_skill_parsed_data(&self, id: Uuid, parsed: &ParsedData) -> Result<()> {
        sqlx::query("UPDATE skills SET parsed_data = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(parsed)?)
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_skill(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM skills WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- sandbox_specs ----------------------------------------------

    pub async fn insert_spec(&self, spec: &SandboxSpec) -> Result<()> {
        sqlx::query(
            "INSERT INTO sandbox_specs
             (id, skill_id, base_image, system_packages, runtime_deps, tool_configs, eval_goals, dockerfile_content, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(spec.id.to_string())
        .bind(spec.skill_id.to_string())
        .bind(&spec.base_image)
        .bind(serde_json::to_string(&spec.system_packages)?)
        .bind(serde_json::to_string(&spec.runtime_deps)?)
        .bind(serde_json::to_string(&spec.tool_configs)?)
        .bind(serde_json::to_string(&spec.eval_goals)?)
        .bind(&spec.dockerfile_content)
        .bind(spec.status.to_string())
        .bind(spec.created_at.to_rfc3339())
        .bind(spec.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_spec(&self, id: Uuid) -> Result<Option<SandboxSpec>> {
        let row = sqlx::query("SELECT * FROM sandbox_specs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_spec).transpose()
    }

    /// Mark a spec `approved`. Fails with [`CoreError::InvalidState`] unless
    /// the spec is currently `draft` — status only ever moves forward.
    pub async fn approve_spec(&self, id: Uuid) -> Result<()> {
        let spec = self.get_spec(id).await?.ok_or_else(|| CoreError::NotFound(format!("sandbox spec {id}")))?;
        if spec.status != SpecStatus::Draft {
            return Err(CoreError::InvalidState(format!(
                "cannot approve spec {id} from status {}",
                spec.status
            )));
        }
        self.update_spec_status(id, SpecStatus::Approved).await
    }

    pub async fn update_spec_status(&self, id: Uuid, status: SpecStatus) -> Result<()> {
        sqlx::query("UPDATE sandbox_specs SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_spec_dockerfile(&self, id: Uuid, dockerfile_content: &str) -> Result<()> {
        sqlx::query("UPDATE sandbox_specs SET dockerfile_content = ?, status = ?, updated_at = ? WHERE id = ?")
            .bind(dockerfile_content)
            .bind(SpecStatus::Building.to_string())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- pipeline_runs ------------------------------------------------

    pub async fn insert_run(&self, run: &PipelineRun) -> Result<()> {
        sqlx::query(
            "INSERT INTO pipeline_runs
             (id, skill_id, sandbox_spec_id, sandbox_id, status, current_step, error_message, started_at, completed_at, step_timings)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run.id.to_string())
        .bind(run.skill_id.to_string())
        .bind(run.sandbox_spec_id.map(|u| u.to_string()))
        .bind(run.sandbox_id.map(|u| u.to_string()))
        .bind(run.status.as_str())
        .bind(run.current_step)
        .bind(&run.error_message)
        .bind(run.started_at.to_rfc3339())
        .bind(run.completed_at.map(|t| t.to_rfc3339()))
        .bind(serde_json::to_string(&run.step_timings)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_run(&self, id: Uuid) -> Result<Option<PipelineRun>> {
        let row = sqlx::query("SELECT * FROM pipeline_runs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_run).transpose()
    }

    /// Every transition in the pipeline runner persists the full row; this
    /// is the "persist" half of the persist-then-publish contract.
    pub async fn update_run(&self, run: &PipelineRun) -> Result<()> {
        sqlx::query(
            "UPDATE pipeline_runs SET
                sandbox_spec_id = ?, sandbox_id = ?, status = ?, current_step = ?,
                error_message = ?, completed_at = ?, step_timings = ?
             WHERE id = ?",
        )
        .bind(run.sandbox_spec_id.map(|u| u.to_string()))
        .bind(run.sandbox_id.map(|u| u.to_string()))
        .bind(run.status.as_str())
        .bind(run.current_step)
        .bind(&run.error_message)
        .bind(run.completed_at.map(|t| t.to_rfc3339()))
        .bind(serde_json::to_string(&run.step_timings)?)
        .bind(run.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Runs whose status is not `ready` or `failed`: the startup recovery
    /// candidate set.
    pub async fn list_nonterminal_runs(&self) -> Result<Vec<PipelineRun>> {
        let rows = sqlx::query("SELECT * FROM pipeline_runs WHERE status NOT IN ('ready', 'failed')")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_run).collect()
    }

    pub async fn list_runs(&self) -> Result<Vec<PipelineRun>> {
        let rows = sqlx::query("SELECT * FROM pipeline_runs ORDER BY started_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_run).collect()
    }

    // ---- sandboxes ------------------------------------------------------

    pub async fn insert_sandbox(&self, sandbox: &Sandbox) -> Result<()> {
        sqlx::query(
            "INSERT INTO sandboxes
             (id, sandbox_spec_id, container_id, image_id, status, port_mappings, error_message, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(sandbox.id.to_string())
        .bind(sandbox.sandbox_spec_id.to_string())
        .bind(&sandbox.container_id)
        .bind(&sandbox.image_id)
        .bind(sandbox.status.to_string())
        .bind(serde_json::to_string(&sandbox.port_mappings)?)
        .bind(&sandbox.error_message)
        .bind(sandbox.created_at.to_rfc3339())
        .bind(sandbox.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_sandbox(&self, id: Uuid) -> Result<Option<Sandbox>> {
        let row = sqlx::query("SELECT * FROM sandboxes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_sandbox).transpose()
    }

    pub async fn list_sandboxes(&self) -> Result<Vec<Sandbox>> {
        let rows = sqlx::query("SELECT * FROM sandboxes ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_sandbox).collect()
    }

    pub async fn update_sandbox_status(
        &self,
        id: Uuid,
        status: SandboxStatus,
        error_message: Option<String>,
    ) -> Result<()> {
        sqlx::query("UPDATE sandboxes SET status = ?, error_message = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(error_message)
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn row_to_skill(row: SqliteRow) -> Result<Skill> {
    let id: String = row.get("id");
    let parsed_data: String = row.get("parsed_data");
    Ok(Skill {
        id: Uuid::parse_str(&id).map_err(|e| CoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        name: row.get("name"),
        description: row.get("description"),
        source_url: row.get("source_url"),
        raw_content: row.get("raw_content"),
        parsed_data: serde_json::from_str(&parsed_data)?,
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

fn row_to_spec(row: SqliteRow) -> Result<SandboxSpec> {
    let id: String = row.get("id");
    let skill_id: String = row.get("skill_id");
    let system_packages: String = row.get("system_packages");
    let runtime_deps: String = row.get("runtime_deps");
    let tool_configs: String = row.get("tool_configs");
    let eval_goals: String = row.get("eval_goals");
    let status: String = row.get("status");

    Ok(SandboxSpec {
        id: Uuid::parse_str(&id).map_err(|e| CoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        skill_id: Uuid::parse_str(&skill_id).map_err(|e| CoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        base_image: row.get("base_image"),
        system_packages: serde_json::from_str(&system_packages)?,
        runtime_deps: serde_json::from_str::<RuntimeDeps>(&runtime_deps).unwrap_or(RuntimeDeps {
            manager: PackageManager::Unsupported,
            packages: Vec::new(),
        }),
        tool_configs: serde_json::from_str(&tool_configs)?,
        eval_goals: serde_json::from_str(&eval_goals)?,
        dockerfile_content: row.get("dockerfile_content"),
        status: status_from_str(&status),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

fn status_from_str(s: &str) -> SpecStatus {
    match s {
        "approved" => SpecStatus::Approved,
        "building" => SpecStatus::Building,
        "built" => SpecStatus::Built,
        "failed" => SpecStatus::Failed,
        _ => SpecStatus::Draft,
    }
}

fn run_status_from_str(s: &str) -> RunStatus {
    match s {
        "parsing" => RunStatus::Parsing,
        "analyzing" => RunStatus::Analyzing,
        "reviewing" => RunStatus::Reviewing,
        "building" => RunStatus::Building,
        "configuring" => RunStatus::Configuring,
        "ready" => RunStatus::Ready,
        "failed" => RunStatus::Failed,
        _ => RunStatus::Pending,
    }
}

fn sandbox_status_from_str(s: &str) -> SandboxStatus {
    match s {
        "running" => SandboxStatus::Running,
        "stopped" => SandboxStatus::Stopped,
        "error" => SandboxStatus::Error,
        _ => SandboxStatus::Building,
    }
}

fn row_to_run(row: SqliteRow) -> Result<PipelineRun> {
    let id: String = row.get("id");
    let skill_id: String = row.get("skill_id");
    let sandbox_spec_id: Option<String> = row.get("sandbox_spec_id");
    let sandbox_id: Option<String> = row.get("sandbox_id");
    let status: String = row.get("status");
    let step_timings: String = row.get("step_timings");
    let completed_at: Option<String> = row.get("completed_at");

    Ok(PipelineRun {
        id: Uuid::parse_str(&id).map_err(|e| CoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        skill_id: Uuid::parse_str(&skill_id).map_err(|e| CoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        sandbox_spec_id: sandbox_spec_id.map(|s| Uuid::parse_str(&s)).transpose().map_err(|e| CoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        sandbox_id: sandbox_id.map(|s| Uuid::parse_str(&s)).transpose().map_err(|e| CoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        status: run_status_from_str(&status),
        current_step: row.get("current_step"),
        error_message: row.get("error_message"),
        started_at: parse_ts(&row.get::<String, _>("started_at"))?,
        completed_at: completed_at.map(|s| parse_ts(&s)).transpose()?,
        step_timings: serde_json::from_str::<HashMap<String, u64>>(&step_timings)?,
    })
}

fn row_to_sandbox(row: SqliteRow) -> Result<Sandbox> {
    let id: String = row.get("id");
    let sandbox_spec_id: String = row.get("sandbox_spec_id");
    let status: String = row.get("status");
    let port_mappings: String = row.get("port_mappings");

    Ok(Sandbox {
        id: Uuid::parse_str(&id).map_err(|e| CoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        sandbox_spec_id: Uuid::parse_str(&sandbox_spec_id).map_err(|e| CoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        container_id: row.get("container_id"),
        image_id: row.get("image_id"),
        status: sandbox_status_from_str(&status),
        port_mappings: serde_json::from_str(&port_mappings)?,
        error_message: row.get("error_message"),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RunStatus, SandboxStatus};

    async fn memory_db() -> Db {
        Db::connect(":memory:").await.unwrap()
    }

    fn sample_skill() -> Skill {
        Skill {
            id: Uuid::new_v4(),
            name: "demo".into(),
            description: "a demo skill".into(),
            source_url: None,
            raw_content: "# demo\n\nbody".into(),
            parsed_data: ParsedData::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn skill_round_trips() {
        let db = memory_db().await;
        let skill = sample_skill();
        db.insert_skill(&skill).await.unwrap();
        let fetched = db.get_skill(skill.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "demo");
        assert_eq!(db.list_skills().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_skill_cascades_to_runs() {
        let db = memory_db().await;
        let skill = sample_skill();
        db.insert_skill(&skill).await.unwrap();
        let run = PipelineRun::new(skill.id);
        db.insert_run(&run).await.unwrap();

        db.delete_skill(skill.id).await.unwrap();
        assert!(db.get_run(run.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn approve_spec_requires_draft_status() {
        let db = memory_db().await;
        let skill = sample_skill();
        db.insert_skill(&skill).await.unwrap();
        let spec = SandboxSpec {
            id: Uuid::new_v4(),
            skill_id: skill.id,
            base_image: "node:20-slim".into(),
            system_packages: vec![],
            runtime_deps: RuntimeDeps::default(),
            tool_configs: serde_json::json!({"cli": {}, "web_search": {}}),
            eval_goals: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            dockerfile_content: None,
            status: SpecStatus::Draft,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.insert_spec(&spec).await.unwrap();
        db.approve_spec(spec.id).await.unwrap();
        assert_eq!(db.get_spec(spec.id).await.unwrap().unwrap().status, SpecStatus::Approved);
        assert!(db.approve_spec(spec.id).await.is_err());
    }

    #[tokio::test]
    async fn nonterminal_runs_excludes_ready_and_failed() {
        let db = memory_db().await;
        let skill = sample_skill();
        db.insert_skill(&skill).await.unwrap();

        let mut reviewing = PipelineRun::new(skill.id);
        reviewing.status = RunStatus::Reviewing;
        db.insert_run(&reviewing).await.unwrap();

        let mut ready = PipelineRun::new(skill.id);
        ready.status = RunStatus::Ready;
        db.insert_run(&ready).await.unwrap();

        let nonterminal = db.list_nonterminal_runs().await.unwrap();
        assert_eq!(nonterminal.len(), 1);
        assert_eq!(nonterminal[0].id, reviewing.id);
    }

    #[tokio::test]
    async fn sandbox_status_updates_persist() {
        let db = memory_db().await;
        let skill = sample_skill();
        db.insert_skill(&skill).await.unwrap();
        let spec = SandboxSpec {
            id: Uuid::new_v4(),
            skill_id: skill.id,
            base_image: "python:3.12-slim".into(),
            system_packages: vec![],
            runtime_deps: RuntimeDeps::default(),
            tool_configs: serde_json::json!({"cli": {}, "web_search": {}}),
            eval_goals: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            dockerfile_content: None,
            status: SpecStatus::Approved,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.insert_spec(&spec).await.unwrap();
        let sandbox = Sandbox {
            id: Uuid::new_v4(),
            sandbox_spec_id: spec.id,
            container_id: Some("abc123".into()),
            image_id: Some("sandbox-run-1".into()),
            status: SandboxStatus::Running,
            port_mappings: HashMap::new(),
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.insert_sandbox(&sandbox).await.unwrap();
        db.update_sandbox_status(sandbox.id, SandboxStatus::Stopped, None).await.unwrap();
        let fetched = db.get_sandbox(sandbox.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, SandboxStatus::Stopped);
    }

    #[tokio::test]
    async fn spec_status_reaches_built_after_verification() {
        let db = memory_db().await;
        let skill = sample_skill();
        db.insert_skill(&skill).await.unwrap();
        let spec = SandboxSpec {
            id: Uuid::new_v4(),
            skill_id: skill.id,
            base_image: "node:20-slim".into(),
            system_packages: vec![],
            runtime_deps: RuntimeDeps::default(),
            tool_configs: serde_json::json!({"cli": {}, "web_search": {}}),
            eval_goals: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            dockerfile_content: None,
            status: SpecStatus::Building,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.insert_spec(&spec).await.unwrap();
        db.update_spec_status(spec.id, SpecStatus::Built).await.unwrap();
        assert_eq!(db.get_spec(spec.id).await.unwrap().unwrap().status, SpecStatus::Built);
    }
}
