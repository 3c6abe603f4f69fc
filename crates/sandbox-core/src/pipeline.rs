//! The pipeline runner — the hardest part of the system. One actor
//! per [`PipelineRun`], addressed through a [`PipelineRegistry`] keyed by
//! run id, generalising `jobs/worker.rs`'s worker-loop-with-mailbox
//! pattern from "pull jobs off a shared queue" to "own one run's entire
//! state machine, dispatching background work and waiting on a private
//! mailbox for both external events and task completions."

use crate::config::DockerConfig;
use crate::db::Db;
use crate::docker::{DockerDriver, RunOpts};
use crate::errors::CoreError;
use crate::events::{EventBus, PipelineUpdate};
use crate::monitor::MonitorRegistry;
use crate::llm::LlmClient;
use crate::types::{PipelineRun, RunStatus, Sandbox, SandboxSpec, SandboxStatus, Skill};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Messages a runner's mailbox accepts. External events and background-task
/// completions share one channel so message handling stays strictly serial.
pub enum RunMessage {
    Approve,
    ReAnalyze,
    Retry,
    GetStatus(oneshot::Sender<PipelineRun>),
    TaskDone { correlation: u64, outcome: StepOutcome },
}

/// The result of a background task, tagged by which step produced it.
/// `Crashed` is a single cross-cutting variant for a panicked background
/// task, regardless of which step it crashed in: a task crash is treated
/// equivalently to a task error.
pub enum StepOutcome {
    AnalyzeDone(Box<SandboxSpec>),
    AnalyzeFailed(String),
    BuildDone(Box<Sandbox>),
    BuildFailed(String),
    ConfigureDone,
    ConfigureFailed(String),
    Crashed(String),
}

/// Keyed registry of live runner mailboxes: the "pipeline-run registry"
/// shared resource.
pub struct PipelineRegistry {
    inner: Mutex<HashMap<Uuid, mpsc::Sender<RunMessage>>>,
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    fn insert(&self, id: Uuid, tx: mpsc::Sender<RunMessage>) {
        self.inner.lock().unwrap().insert(id, tx);
    }

    fn get(&self, id: Uuid) -> Option<mpsc::Sender<RunMessage>> {
        self.inner.lock().unwrap().get(&id).cloned()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.inner.lock().unwrap().contains_key(&id)
    }
}

/// One actor's worth of state. Not `Clone` — a runner owns exactly one
/// `PipelineRun` for its whole lifetime.
pub struct PipelineRunner {
    run: PipelineRun,
    skill: Skill,
    mailbox: mpsc::Receiver<RunMessage>,
    self_tx: mpsc::Sender<RunMessage>,
    db: Arc<Db>,
    events: Arc<EventBus>,
    llm_client: Arc<LlmClient>,
    docker: Arc<DockerDriver>,
    docker_config: DockerConfig,
    monitors: Arc<MonitorRegistry>,
    resume_mode: bool,
    state_entered_at: Instant,
    next_correlation: u64,
    outstanding_correlation: Option<u64>,
}

impl PipelineRunner {
    #[allow(clippy::too_many_arguments)]
    fn new(
        run: PipelineRun,
        skill: Skill,
        mailbox: mpsc::Receiver<RunMessage>,
        self_tx: mpsc::Sender<RunMessage>,
        db: Arc<Db>,
        events: Arc<EventBus>,
        llm_client: Arc<LlmClient>,
        docker: Arc<DockerDriver>,
        docker_config: DockerConfig,
        monitors: Arc<MonitorRegistry>,
        resume_mode: bool,
    ) -> Self {
        Self {
            run,
            skill,
            mailbox,
            self_tx,
            db,
            events,
            llm_client,
            docker,
            docker_config,
            monitors,
            resume_mode,
            state_entered_at: Instant::now(),
            next_correlation: 0,
            outstanding_correlation: None,
        }
    }

    fn next_correlation(&mut self) -> u64 {
        self.next_correlation += 1;
        self.next_correlation
    }

    /// Persist, then publish, then mutate: the atomic transition sequence
    /// every state change goes through. `clear_timings` is set only on
    /// `failed → parsing` (an external `retry`), which clears
    /// `step_timings` instead of recording one more entry for the state
    /// being left.
    async fn enter(&mut self, new_status: RunStatus, error_message: Option<String>, clear_timings: bool) {
        if clear_timings {
            self.run.step_timings.clear();
        } else {
            let elapsed_ms = self.state_entered_at.elapsed().as_millis() as u64;
            self.run.step_timings.insert(self.run.status.as_str().to_string(), elapsed_ms);
        }

        self.run.status = new_status;
        self.run.current_step = new_status.step_index();
        self.run.error_message = error_message;
        if new_status.is_terminal() {
            self.run.completed_at = Some(Utc::now());
        }

        if let Err(e) = self.db.update_run(&self.run).await {
            warn!(run_id = %self.run.id, error = %e, "failed to persist pipeline run transition");
        }

        self.events.publish_pipeline(
            self.run.id,
            PipelineUpdate {
                run_id: self.run.id,
                status: new_status.as_str().to_string(),
                current_step: self.run.current_step,
                error_message: self.run.error_message.clone(),
                sandbox_spec_id: self.run.sandbox_spec_id,
                sandbox_id: self.run.sandbox_id,
            },
        );

        self.state_entered_at = Instant::now();
    }

    /// Drive this run to completion. Consumes `self`; the mailbox loop is
    /// the runner's entire lifetime.
    pub async fn run(mut self) {
        if self.resume_mode {
            match self.run.status {
                RunStatus::Pending => self.dispatch_parsing().await,
                RunStatus::Parsing => self.dispatch_parsing().await,
                RunStatus::Analyzing => self.dispatch_analyzing().await,
                RunStatus::Reviewing => {}
                _ => {}
            }
        } else {
            self.enter(RunStatus::Parsing, None, false).await;
            self.dispatch_parsing().await;
        }

        while let Some(msg) = self.mailbox.recv().await {
            self.handle_message(msg).await;
        }
    }

    async fn handle_message(&mut self, msg: RunMessage) {
        match msg {
            RunMessage::GetStatus(reply) => {
                let _ = reply.send(self.run.clone());
            }
            RunMessage::Approve => {
                if self.run.status == RunStatus::Reviewing {
                    let spec_id = self.run.sandbox_spec_id.expect("reviewing run always has a spec");
                    match self.db.approve_spec(spec_id).await {
                        Ok(()) => {
                            self.enter(RunStatus::Building, None, false).await;
                            self.dispatch_building().await;
                        }
                        Err(e) => warn!(run_id = %self.run.id, error = %e, "approve_spec rejected"),
                    }
                } else {
                    warn!(run_id = %self.run.id, status = %self.run.status, "approve ignored: run is not reviewing");
                }
            }
            RunMessage::ReAnalyze => {
                if self.run.status == RunStatus::Reviewing {
                    self.enter(RunStatus::Analyzing, None, false).await;
                    self.dispatch_analyzing().await;
                } else {
                    warn!(run_id = %self.run.id, status = %self.run.status, "re_analyze ignored: run is not reviewing");
                }
            }
            RunMessage::Retry => {
                if self.run.status == RunStatus::Failed {
                    self.enter(RunStatus::Parsing, None, true).await;
                    self.dispatch_parsing().await;
                } else {
                    warn!(run_id = %self.run.id, status = %self.run.status, "retry ignored: run has not failed");
                }
            }
            RunMessage::TaskDone { correlation, outcome } => {
                if Some(correlation) != self.outstanding_correlation {
                    debug!(run_id = %self.run.id, correlation, "dropping stale background task result");
                    return;
                }
                self.outstanding_correlation = None;
                self.handle_outcome(outcome).await;
            }
        }
    }

    async fn handle_outcome(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::AnalyzeDone(spec) => {
                if let Err(e) = self.db.insert_spec(&spec).await {
                    self.enter(RunStatus::Failed, Some(e.to_string()), false).await;
                    return;
                }
                self.run.sandbox_spec_id = Some(spec.id);
                self.enter(RunStatus::Reviewing, None, false).await;
            }
            StepOutcome::AnalyzeFailed(message) => {
                self.enter(RunStatus::Failed, Some(message), false).await;
            }
            StepOutcome::BuildDone(sandbox) => {
                self.run.sandbox_id = Some(sandbox.id);
                self.monitors.spawn(*sandbox);
                self.enter(RunStatus::Configuring, None, false).await;
                self.dispatch_configuring().await;
            }
            StepOutcome::BuildFailed(message) => {
                self.enter(RunStatus::Failed, Some(message), false).await;
            }
            StepOutcome::ConfigureDone => {
                self.enter(RunStatus::Ready, None, false).await;
            }
            StepOutcome::ConfigureFailed(message) => {
                self.enter(RunStatus::Failed, Some(message), false).await;
            }
            StepOutcome::Crashed(message) => {
                self.enter(RunStatus::Failed, Some(format!("background task crashed: {message}")), false).await;
            }
        }
    }

    /// Parsing runs inline: it is pure, CPU-bound, and fast enough not to
    /// need a background task (unlike analyzing/building/configuring,
    /// which are always dispatched to a background task).
    async fn dispatch_parsing(&mut self) {
        match crate::parser::parse(&self.skill.raw_content) {
            Ok(parsed) => {
                if self.skill.parsed_data == crate::types::ParsedData::default() {
                    self.skill.parsed_data = parsed.clone();
                    if let Err(e) = self.db.update_skill_parsed_data(self.skill.id, &parsed).await {
                        warn!(run_id = %self.run.id, error = %e, "failed to persist parsed skill data");
                    }
                }
                self.enter(RunStatus::Analyzing, None, false).await;
                self.dispatch_analyzing().await;
            }
            Err(e) => {
                self.enter(RunStatus::Failed, Some(e.to_string()), false).await;
            }
        }
    }

    async fn dispatch_analyzing(&mut self) {
        let correlation = self.next_correlation();
        let skill = self.skill.clone();
        let llm_client = self.llm_client.clone();
        let tx = self.self_tx.clone();
        spawn_with_crash_handling(tx, correlation, async move {
            match crate::analyzer::analyze(&skill, &llm_client).await {
                Ok(spec) => StepOutcome::AnalyzeDone(Box::new(spec)),
                Err(e) => StepOutcome::AnalyzeFailed(e.to_string()),
            }
        });
        self.outstanding_correlation = Some(correlation);
    }

    async fn dispatch_building(&mut self) {
        let correlation = self.next_correlation();
        let run_id = self.run.id;
        let spec_id = self.run.sandbox_spec_id.expect("building requires an approved spec");
        let db = self.db.clone();
        let docker = self.docker.clone();
        let docker_config = self.docker_config.clone();
        let tx = self.self_tx.clone();
        spawn_with_crash_handling(tx, correlation, async move {
            run_build_task(run_id, spec_id, db, docker, docker_config).await
        });
        self.outstanding_correlation = Some(correlation);
    }

    async fn dispatch_configuring(&mut self) {
        let correlation = self.next_correlation();
        let sandbox_id = self.run.sandbox_id.expect("configuring requires a built sandbox");
        let db = self.db.clone();
        let docker = self.docker.clone();
        let tx = self.self_tx.clone();
        spawn_with_crash_handling(tx, correlation, async move {
            run_verify_task(sandbox_id, db, docker).await
        });
        self.outstanding_correlation = Some(correlation);
    }
}

/// Spawn a background task, converting a panic inside it into
/// `StepOutcome::Crashed` rather than silently dropping the run's mailbox
/// message. `tokio::spawn`'s `JoinHandle` is awaited from a second,
/// detached task so the caller never blocks.
fn spawn_with_crash_handling<F>(tx: mpsc::Sender<RunMessage>, correlation: u64, future: F)
where
    F: std::future::Future<Output = StepOutcome> + Send + 'static,
{
    tokio::spawn(async move {
        let outcome = match tokio::spawn(future).await {
            Ok(outcome) => outcome,
            Err(join_error) => StepOutcome::Crashed(join_error.to_string()),
        };
        let _ = tx.send(RunMessage::TaskDone { correlation, outcome }).await;
    });
}

/// Assemble the build context, build the image, run the container, and
/// record the resulting sandbox: the five-step build task.
async fn run_build_task(
    run_id: Uuid,
    spec_id: Uuid,
    db: Arc<Db>,
    docker: Arc<DockerDriver>,
    docker_config: DockerConfig,
) -> StepOutcome {
    let spec = match db.get_spec(spec_id).await {
        Ok(Some(spec)) => spec,
        Ok(None) => return StepOutcome::BuildFailed(format!("sandbox spec {spec_id} not found")),
        Err(e) => return StepOutcome::BuildFailed(e.to_string()),
    };

    let ctx = match crate::build_context::assemble(&spec) {
        Ok(ctx) => ctx,
        Err(e) => return StepOutcome::BuildFailed(format!("assembling build context: {e}")),
    };

    if let Err(e) = db.update_spec_dockerfile(spec.id, &ctx.dockerfile_content).await {
        crate::build_context::cleanup(ctx);
        return StepOutcome::BuildFailed(format!("persisting dockerfile content: {e}"));
    }

    let suffix = Uuid::new_v4().simple().to_string()[..8].to_string();
    let tag = format!("sandbox-{run_id}-{suffix}");
    if let Err(e) = docker.build_image(ctx.path(), &tag).await {
        crate::build_context::cleanup(ctx);
        return StepOutcome::BuildFailed(format!("image build failed: {e}"));
    }

    let container_name = format!("sandbox-run-{run_id}");
    let run_opts = RunOpts {
        memory_limit: docker_config.memory_limit.clone(),
        cpu_limit: docker_config.cpu_limit.clone(),
        port_mappings: Vec::new(),
        add_host_gateway: true,
    };
    let container_id = match docker.run_container(&tag, &container_name, &run_opts).await {
        Ok(id) => id,
        Err(e) => {
            crate::build_context::cleanup(ctx);
            return StepOutcome::BuildFailed(format!("container run failed: {e}"));
        }
    };

    let now = Utc::now();
    let sandbox = Sandbox {
        id: Uuid::new_v4(),
        sandbox_spec_id: spec.id,
        container_id: Some(container_id),
        image_id: Some(tag),
        status: SandboxStatus::Running,
        port_mappings: HashMap::new(),
        error_message: None,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = db.insert_sandbox(&sandbox).await {
        crate::build_context::cleanup(ctx);
        return StepOutcome::BuildFailed(format!("persisting sandbox record: {e}"));
    }

    crate::build_context::cleanup(ctx);
    StepOutcome::BuildDone(Box::new(sandbox))
}

/// Confirm the container is running and its tool manifest is reachable:
/// the verification task.
async fn run_verify_task(sandbox_id: Uuid, db: Arc<Db>, docker: Arc<DockerDriver>) -> StepOutcome {
    let sandbox = match db.get_sandbox(sandbox_id).await {
        Ok(Some(sandbox)) => sandbox,
        Ok(None) => return StepOutcome::ConfigureFailed(format!("sandbox {sandbox_id} not found")),
        Err(e) => return StepOutcome::ConfigureFailed(e.to_string()),
    };
    let container_id = match &sandbox.container_id {
        Some(id) => id.clone(),
        None => return StepOutcome::ConfigureFailed("sandbox has no container id".to_string()),
    };

    match docker.container_status(&container_id).await {
        Ok(status) if status == "running" => {}
        Ok(other) => return StepOutcome::ConfigureFailed(format!("container status is {other}, expected running")),
        Err(e) => return StepOutcome::ConfigureFailed(e.to_string()),
    }

    let output = match docker
        .exec_in_container(&container_id, "test -f /workspace/tool_manifest.json && echo OK", None, Duration::from_secs(10))
        .await
    {
        Ok(output) => output,
        Err(e) => return StepOutcome::ConfigureFailed(e.to_string()),
    };

    if output.trim() == "OK" {
        if let Err(e) = db.update_spec_status(sandbox.sandbox_spec_id, crate::types::SpecStatus::Built).await {
            return StepOutcome::ConfigureFailed(format!("persisting built spec status: {e}"));
        }
        StepOutcome::ConfigureDone
    } else {
        StepOutcome::ConfigureFailed(format!("tool manifest verification failed: unexpected output {output:?}"))
    }
}

/// Starts/resumes runners and recovers interrupted runs on boot.
pub struct PipelineSupervisor {
    registry: Arc<PipelineRegistry>,
    db: Arc<Db>,
    events: Arc<EventBus>,
    llm_client: Arc<LlmClient>,
    docker: Arc<DockerDriver>,
    docker_config: DockerConfig,
    monitors: Arc<MonitorRegistry>,
}

impl PipelineSupervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<PipelineRegistry>,
        db: Arc<Db>,
        events: Arc<EventBus>,
        llm_client: Arc<LlmClient>,
        docker: Arc<DockerDriver>,
        docker_config: DockerConfig,
        monitors: Arc<MonitorRegistry>,
    ) -> Self {
        Self {
            registry,
            db,
            events,
            llm_client,
            docker,
            docker_config,
            monitors,
        }
    }

    pub async fn start_pipeline(&self, skill_id: Uuid) -> Result<Uuid, CoreError> {
        let mut run = PipelineRun::new(skill_id);
        self.db.insert_run(&run).await?;

        match self.spawn_runner(run.clone(), false).await {
            Ok(()) => Ok(run.id),
            Err(e) => {
                run.status = RunStatus::Failed;
                run.current_step = -1;
                run.error_message = Some(format!("failed to start pipeline: {e}"));
                run.completed_at = Some(Utc::now());
                let _ = self.db.update_run(&run).await;
                Err(e)
            }
        }
    }

    pub async fn resume_pipeline(&self, run_id: Uuid) -> Result<(), CoreError> {
        if self.registry.contains(run_id) {
            return Ok(());
        }
        let run = self
            .db
            .get_run(run_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("pipeline run {run_id}")))?;
        self.spawn_runner(run, true).await
    }

    async fn spawn_runner(&self, run: PipelineRun, resume: bool) -> Result<(), CoreError> {
        let skill = self
            .db
            .get_skill(run.skill_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("skill {}", run.skill_id)))?;

        let (tx, rx) = mpsc::channel(32);
        self.registry.insert(run.id, tx.clone());

        let runner = PipelineRunner::new(
            run,
            skill,
            rx,
            tx,
            self.db.clone(),
            self.events.clone(),
            self.llm_client.clone(),
            self.docker.clone(),
            self.docker_config.clone(),
            self.monitors.clone(),
            resume,
        );
        tokio::spawn(runner.run());
        Ok(())
    }

    pub async fn approve_spec(&self, run_id: Uuid) -> Result<(), CoreError> {
        self.send(run_id, RunMessage::Approve).await
    }

    pub async fn re_analyze(&self, run_id: Uuid) -> Result<(), CoreError> {
        self.send(run_id, RunMessage::ReAnalyze).await
    }

    pub async fn retry(&self, run_id: Uuid) -> Result<(), CoreError> {
        self.send(run_id, RunMessage::Retry).await
    }

    async fn send(&self, run_id: Uuid, message: RunMessage) -> Result<(), CoreError> {
        let tx = self
            .registry
            .get(run_id)
            .ok_or_else(|| CoreError::NotFound(format!("pipeline run {run_id}")))?;
        tx.send(message)
            .await
            .map_err(|_| CoreError::InvalidState("pipeline runner is no longer running".to_string()))
    }

    pub async fn get_status(&self, run_id: Uuid) -> Result<PipelineRun, CoreError> {
        let tx = self
            .registry
            .get(run_id)
            .ok_or_else(|| CoreError::NotFound(format!("pipeline run {run_id}")))?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(RunMessage::GetStatus(reply_tx))
            .await
            .map_err(|_| CoreError::InvalidState("pipeline runner is no longer running".to_string()))?;
        reply_rx
            .await
            .map_err(|_| CoreError::InvalidState("pipeline runner dropped its reply".to_string()))
    }

    /// Startup recovery: after a brief warm-up, resume non-terminal runs
    /// whose in-flight work can be safely re-dispatched, and force-fail
    /// the ones that can't.
    pub async fn recover(&self) -> Result<(), CoreError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let runs = self.db.list_nonterminal_runs().await?;
        for run in runs {
            match run.status {
                RunStatus::Pending | RunStatus::Parsing | RunStatus::Analyzing | RunStatus::Reviewing => {
                    if let Err(e) = self.resume_pipeline(run.id).await {
                        warn!(run_id = %run.id, error = %e, "failed to resume pipeline run on recovery");
                    } else {
                        info!(run_id = %run.id, status = %run.status, "resumed pipeline run on recovery");
                    }
                }
                RunStatus::Building | RunStatus::Configuring => {
                    let mut run = run;
                    let message = format!("Interrupted by application restart during {}. Please retry.", run.status);
                    run.status = RunStatus::Failed;
                    run.current_step = -1;
                    run.error_message = Some(message);
                    run.completed_at = Some(Utc::now());
                    if let Err(e) = self.db.update_run(&run).await {
                        warn!(run_id = %run.id, error = %e, "failed to force-fail interrupted run");
                    }
                }
                RunStatus::Ready | RunStatus::Failed => {}
            }
        }
        Ok(())
    }
}
