//! The event bus: per-run and per-sandbox topics plus one global
//! `sandboxes:updates` topic, each a `tokio::sync::broadcast` channel
//! created lazily on first subscribe/publish. Subscribers tolerate
//! arbitrary re-delivery, so publishing to a topic nobody is listening to
//! yet is not an error — the lazily created sender just has zero
//! receivers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

const TOPIC_CAPACITY: usize = 256;

/// Published on `pipeline:<run_id>` at every state transition, after the
/// row has been persisted (persist-then-publish).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineUpdate {
    pub run_id: Uuid,
    pub status: String,
    pub current_step: i32,
    pub error_message: Option<String>,
    pub sandbox_spec_id: Option<Uuid>,
    pub sandbox_id: Option<Uuid>,
}

/// Published on `sandbox:<sandbox_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SandboxEvent {
    LogLine { text: String },
    StatusChange { raw_status: String },
}

/// Published on the global `sandboxes:updates` topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxStatusUpdate {
    pub sandbox_id: Uuid,
    pub raw_status: String,
}

pub struct EventBus {
    pipeline_topics: Mutex<HashMap<Uuid, broadcast::Sender<PipelineUpdate>>>,
    sandbox_topics: Mutex<HashMap<Uuid, broadcast::Sender<SandboxEvent>>>,
    global_sandbox_updates: broadcast::Sender<SandboxStatusUpdate>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(TOPIC_CAPACITY);
        Self {
            pipeline_topics: Mutex::new(HashMap::new()),
            sandbox_topics: Mutex::new(HashMap::new()),
            global_sandbox_updates: global_tx,
        }
    }

    pub fn subscribe_pipeline(&self, run_id: Uuid) -> broadcast::Receiver<PipelineUpdate> {
        let mut topics = self.pipeline_topics.lock().unwrap();
        topics
            .entry(run_id)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    pub fn publish_pipeline(&self, run_id: Uuid, event: PipelineUpdate) {
        let mut topics = self.pipeline_topics.lock().unwrap();
        let sender = topics.entry(run_id).or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0);
        let _ = sender.send(event);
    }

    pub fn subscribe_sandbox(&self, sandbox_id: Uuid) -> broadcast::Receiver<SandboxEvent> {
        let mut topics = self.sandbox_topics.lock().unwrap();
        topics
            .entry(sandbox_id)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    pub fn publish_sandbox(&self, sandbox_id: Uuid, event: SandboxEvent) {
        let mut topics = self.sandbox_topics.lock().unwrap();
        let sender = topics.entry(sandbox_id).or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0);
        let _ = sender.send(event);
    }

    pub fn subscribe_global_sandbox_updates(&self) -> broadcast::Receiver<SandboxStatusUpdate> {
        self.global_sandbox_updates.subscribe()
    }

    pub fn publish_global_sandbox_update(&self, update: SandboxStatusUpdate) {
        let _ = self.global_sandbox_updates.send(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pipeline_subscriber_receives_published_update() {
        let bus = EventBus::new();
        let run_id = Uuid::new_v4();
        let mut rx = bus.subscribe_pipeline(run_id);
        bus.publish_pipeline(
            run_id,
            PipelineUpdate {
                run_id,
                status: "parsing".to_string(),
                current_step: 1,
                error_message: None,
                sandbox_spec_id: None,
                sandbox_id: None,
            },
        );
        let update = rx.recv().await.unwrap();
        assert_eq!(update.status, "parsing");
    }

    #[tokio::test]
    async fn sandbox_and_global_topics_are_independent() {
        let bus = EventBus::new();
        let sandbox_id = Uuid::new_v4();
        let mut sandbox_rx = bus.subscribe_sandbox(sandbox_id);
        let mut global_rx = bus.subscribe_global_sandbox_updates();

        bus.publish_sandbox(sandbox_id, SandboxEvent::StatusChange { raw_status: "exited".to_string() });
        bus.publish_global_sandbox_update(SandboxStatusUpdate { sandbox_id, raw_status: "exited".to_string() });

        assert!(matches!(sandbox_rx.recv().await.unwrap(), SandboxEvent::StatusChange { .. }));
        assert_eq!(global_rx.recv().await.unwrap().sandbox_id, sandbox_id);
    }

    #[test]
    fn publishing_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish_pipeline(
            Uuid::new_v4(),
            PipelineUpdate {
                run_id: Uuid::new_v4(),
                status: "pending".to_string(),
                current_step: 0,
                error_message: None,
                sandbox_spec_id: None,
                sandbox_id: None,
            },
        );
    }
}
