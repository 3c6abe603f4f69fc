//! The sandbox monitor: one actor per live container, streaming
//! logs, polling health every 5s, and servicing lifecycle commands.
//! Grounded on `jobs/worker.rs`'s per-worker actor loop, generalised from
//! "poll a job queue" to "poll a container plus read a log subprocess
//! concurrently" via `tokio::select!` — the concurrency model `jobs/
//! worker.rs` uses a loop-and-sleep for, this module needs a proper
//! multiplexed select over a timer, a log stream, and a command mailbox.

use crate::db::Db;
use crate::docker::DockerDriver;
use crate::errors::CoreError;
use crate::events::{EventBus, SandboxEvent, SandboxStatusUpdate};
use crate::types::{Sandbox, SandboxStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

enum MonitorCommand {
    GetLogs(oneshot::Sender<Vec<String>>),
    /// Replies with the last *raw* Docker status observed by the poller
    /// (e.g. `"exited"`), not the translated [`SandboxStatus`] domain value
    /// — S6 requires `get_status` to surface the literal Docker state.
    GetStatus(oneshot::Sender<String>),
    Stop(oneshot::Sender<Result<(), CoreError>>),
    Restart(oneshot::Sender<Result<(), CoreError>>),
    Destroy(oneshot::Sender<Result<(), CoreError>>),
}

/// The registry of live monitor actors, keyed by sandbox id.
pub struct MonitorRegistry {
    handles: Mutex<HashMap<Uuid, mpsc::Sender<MonitorCommand>>>,
    docker: Arc<DockerDriver>,
    db: Arc<Db>,
    events: Arc<EventBus>,
    poll_interval: Duration,
    log_buffer_lines: usize,
}

impl MonitorRegistry {
    pub fn new(
        docker: Arc<DockerDriver>,
        db: Arc<Db>,
        events: Arc<EventBus>,
        poll_interval: Duration,
        log_buffer_lines: usize,
    ) -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            docker,
            db,
            events,
            poll_interval,
            log_buffer_lines,
        }
    }

    /// Start a monitor actor for a newly built (or recovered) sandbox.
    pub fn spawn(&self, sandbox: Sandbox) {
        let (tx, rx) = mpsc::channel(32);
        self.handles.lock().unwrap().insert(sandbox.id, tx);
        let docker = self.docker.clone();
        let db = self.db.clone();
        let events = self.events.clone();
        let poll_interval = self.poll_interval;
        let cap = self.log_buffer_lines;
        tokio::spawn(async move {
            run_monitor(sandbox, docker, db, events, rx, poll_interval, cap).await;
        });
    }

    /// True iff a monitor is currently registered for `sandbox_id`.
    pub fn alive(&self, sandbox_id: Uuid) -> bool {
        self.handles.lock().unwrap().contains_key(&sandbox_id)
    }

    pub async fn get_logs(&self, sandbox_id: Uuid) -> Option<Vec<String>> {
        self.query(sandbox_id, MonitorCommand::GetLogs).await
    }

    /// The last raw Docker status string observed by this sandbox's
    /// monitor (e.g. `"running"`, `"exited"`), not the translated
    /// [`SandboxStatus`] domain value.
    pub async fn get_status(&self, sandbox_id: Uuid) -> Option<String> {
        self.query(sandbox_id, MonitorCommand::GetStatus).await
    }

    pub async fn stop(&self, sandbox_id: Uuid) -> Result<(), CoreError> {
        self.dispatch(sandbox_id, MonitorCommand::Stop).await
    }

    pub async fn restart(&self, sandbox_id: Uuid) -> Result<(), CoreError> {
        self.dispatch(sandbox_id, MonitorCommand::Restart).await
    }

    pub async fn destroy(&self, sandbox_id: Uuid) -> Result<(), CoreError> {
        let result = self.dispatch(sandbox_id, MonitorCommand::Destroy).await;
        self.handles.lock().unwrap().remove(&sandbox_id);
        result
    }

    async fn query<T>(&self, sandbox_id: Uuid, make_command: impl FnOnce(oneshot::Sender<T>) -> MonitorCommand) -> Option<T> {
        let tx = self.handles.lock().unwrap().get(&sandbox_id).cloned()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(make_command(reply_tx)).await.ok()?;
        reply_rx.await.ok()
    }

    async fn dispatch(
        &self,
        sandbox_id: Uuid,
        make_command: impl FnOnce(oneshot::Sender<Result<(), CoreError>>) -> MonitorCommand,
    ) -> Result<(), CoreError> {
        let tx = self
            .handles
            .lock()
            .unwrap()
            .get(&sandbox_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("sandbox monitor {sandbox_id}")))?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(make_command(reply_tx))
            .await
            .map_err(|_| CoreError::InvalidState("sandbox monitor is no longer running".to_string()))?;
        reply_rx
            .await
            .map_err(|_| CoreError::InvalidState("sandbox monitor dropped its reply".to_string()))?
    }
}

fn translate_status(raw: &str) -> SandboxStatus {
    match raw {
        "running" => SandboxStatus::Running,
        "exited" | "stopped" | "removing" => SandboxStatus::Stopped,
        "created" => SandboxStatus::Building,
        "dead" => SandboxStatus::Error,
        _ => SandboxStatus::Error,
    }
}

async fn run_monitor(
    mut sandbox: Sandbox,
    docker: Arc<DockerDriver>,
    db: Arc<Db>,
    events: Arc<EventBus>,
    mut cmd_rx: mpsc::Receiver<MonitorCommand>,
    poll_interval: Duration,
    log_buffer_lines: usize,
) {
    let container_id = sandbox.container_id.clone().unwrap_or_default();
    let mut log_stream = docker.stream_logs(&container_id).await.ok();
    let mut buffer: VecDeque<String> = VecDeque::with_capacity(log_buffer_lines);
    let mut last_raw_status: Option<String> = None;

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        let next_line = async {
            match log_stream.as_mut() {
                Some(stream) => stream.next_line().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ticker.tick() => {
                poll_status(&mut sandbox, &container_id, &docker, &db, &events, &mut last_raw_status).await;
            }
            line = next_line => {
                match line {
                    Some(text) if !text.trim().is_empty() => {
                        if buffer.len() >= log_buffer_lines {
                            buffer.pop_front();
                        }
                        buffer.push_back(text.clone());
                        events.publish_sandbox(sandbox.id, SandboxEvent::LogLine { text });
                    }
                    Some(_) => {}
                    None => {
                        info!(sandbox_id = %sandbox.id, "log stream subprocess exited");
                        log_stream = None;
                    }
                }
            }
            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    MonitorCommand::GetLogs(reply) => {
                        let _ = reply.send(buffer.iter().cloned().collect());
                    }
                    MonitorCommand::GetStatus(reply) => {
                        let raw = last_raw_status.clone().unwrap_or_else(|| sandbox.status.to_string());
                        let _ = reply.send(raw);
                    }
                    MonitorCommand::Stop(reply) => {
                        if let Some(stream) = log_stream.take() {
                            stream.kill().await;
                        }
                        let result = docker.stop_container(&container_id).await;
                        apply_lifecycle_result(&mut sandbox, &db, &events, &result, SandboxStatus::Stopped).await;
                        let _ = reply.send(result.map_err(CoreError::from));
                    }
                    MonitorCommand::Restart(reply) => {
                        if let Some(stream) = log_stream.take() {
                            stream.kill().await;
                        }
                        let result = docker.restart_container(&container_id).await;
                        if result.is_ok() {
                            buffer.clear();
                            log_stream = docker.stream_logs(&container_id).await.ok();
                        }
                        apply_lifecycle_result(&mut sandbox, &db, &events, &result, SandboxStatus::Running).await;
                        let _ = reply.send(result.map_err(CoreError::from));
                    }
                    MonitorCommand::Destroy(reply) => {
                        if let Some(stream) = log_stream.take() {
                            stream.kill().await;
                        }
                        let result = docker.remove_container(&container_id).await;
                        apply_lifecycle_result(&mut sandbox, &db, &events, &result, SandboxStatus::Stopped).await;
                        let _ = reply.send(result.map_err(CoreError::from));
                        return;
                    }
                }
            }
        }
    }
}

async fn apply_lifecycle_result(
    sandbox: &mut Sandbox,
    db: &Db,
    events: &EventBus,
    result: &Result<(), crate::errors::DockerError>,
    success_status: SandboxStatus,
) {
    sandbox.status = if result.is_ok() { success_status } else { SandboxStatus::Error };
    let error_message = result.as_ref().err().map(|e| e.to_string());
    if let Err(e) = db.update_sandbox_status(sandbox.id, sandbox.status, error_message).await {
        warn!(sandbox_id = %sandbox.id, error = %e, "failed to persist sandbox status");
    }
    events.publish_sandbox(sandbox.id, SandboxEvent::StatusChange { raw_status: sandbox.status.to_string() });
    events.publish_global_sandbox_update(SandboxStatusUpdate {
        sandbox_id: sandbox.id,
        raw_status: sandbox.status.to_string(),
    });
}

async fn poll_status(
    sandbox: &mut Sandbox,
    container_id: &str,
    docker: &DockerDriver,
    db: &Db,
    events: &EventBus,
    last_raw_status: &mut Option<String>,
) {
    let raw_status = match docker.container_status(container_id).await {
        Ok(status) => status,
        Err(_) => "error".to_string(),
    };
    if last_raw_status.as_deref() == Some(raw_status.as_str()) {
        return;
    }
    *last_raw_status = Some(raw_status.clone());

    sandbox.status = translate_status(&raw_status);
    if let Err(e) = db.update_sandbox_status(sandbox.id, sandbox.status, None).await {
        warn!(sandbox_id = %sandbox.id, error = %e, "failed to persist polled sandbox status");
    }
    events.publish_sandbox(sandbox.id, SandboxEvent::StatusChange { raw_status: raw_status.clone() });
    events.publish_global_sandbox_update(SandboxStatusUpdate {
        sandbox_id: sandbox.id,
        raw_status,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_status_maps_known_docker_states() {
        assert_eq!(translate_status("running"), SandboxStatus::Running);
        assert_eq!(translate_status("exited"), SandboxStatus::Stopped);
        assert_eq!(translate_status("removing"), SandboxStatus::Stopped);
        assert_eq!(translate_status("created"), SandboxStatus::Building);
        assert_eq!(translate_status("dead"), SandboxStatus::Error);
        assert_eq!(translate_status("some-unknown-state"), SandboxStatus::Error);
    }
}
