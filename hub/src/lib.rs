//! `qe-hub` — the inter-agent communication hub used within a single
//! orchestrator phase.
//!
//! One [`CommunicationHub`] is created per `(phase_id, run_id)` pair by the
//! orchestrator, started for the duration of that phase's agent fan-out,
//! and dropped once every agent has joined. There is no process-global
//! registry of hubs — the orchestrator owns the `Arc<CommunicationHub>`
//! and hands it to each agent task explicitly, which is the Rust-native
//! replacement for a module-level `_communication_hubs` dict.
//!
//! Delivery is FIFO per subscriber and best-effort: a subscriber that has
//! stopped polling its channel (or dropped it) simply misses messages,
//! and a publish to a message type with no subscribers is a no-op other
//! than being recorded in history.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use qe_core::{Message, Priority, Target};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A subscriber's registered interest in one or more message types.
struct Subscription {
    agent_id: String,
    sender: mpsc::UnboundedSender<Message>,
}

struct AgentRecord {
    metadata: serde_json::Value,
    status: String,
    registered_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

#[derive(Default)]
struct HubState {
    agents: HashMap<String, AgentRecord>,
    subscriptions: HashMap<String, Vec<Subscription>>,
    history: Vec<Message>,
}

/// Snapshot of hub status, mirroring `get_hub_status()`'s shape.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HubStatus {
    pub hub_id: String,
    pub phase_id: String,
    pub run_id: String,
    pub hub_active: bool,
    pub active_agents: HashMap<String, String>,
    pub total_messages: usize,
    pub subscription_count: usize,
    pub message_types: Vec<String>,
}

/// Real-time message bus for the agents running within one phase.
pub struct CommunicationHub {
    phase_id: String,
    run_id: String,
    hub_id: String,
    active: AtomicBool,
    sequence: AtomicU64,
    state: Mutex<HubState>,
    queue_tx: mpsc::UnboundedSender<Message>,
    queue_rx: Mutex<Option<mpsc::UnboundedReceiver<Message>>>,
}

impl CommunicationHub {
    pub fn new(phase_id: impl Into<String>, run_id: impl Into<String>) -> Arc<Self> {
        let phase_id = phase_id.into();
        let run_id = run_id.into();
        let hub_id = format!("{}_{}_{}", phase_id, run_id, uuid::Uuid::new_v4().simple());
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        info!(hub_id = %hub_id, "communication hub initialized");

        Arc::new(Self {
            phase_id,
            run_id,
            hub_id,
            active: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            state: Mutex::new(HubState::default()),
            queue_tx,
            queue_rx: Mutex::new(Some(queue_rx)),
        })
    }

    pub fn hub_id(&self) -> &str {
        &self.hub_id
    }

    /// Start the background routing loop. Calling this twice on the same
    /// hub is a no-op the second time (the receiver has already been taken).
    pub fn start(self: &Arc<Self>) {
        let mut rx_slot = self.queue_rx.lock();
        let Some(mut rx) = rx_slot.take() else {
            return;
        };
        drop(rx_slot);

        self.active.store(true, Ordering::SeqCst);
        let hub = Arc::clone(self);

        tokio::spawn(async move {
            info!(hub_id = %hub.hub_id, "message processor started");
            while hub.active.load(Ordering::SeqCst) {
                match rx.recv().await {
                    Some(message) => hub.route_message(message),
                    None => break,
                }
            }
            info!(hub_id = %hub.hub_id, "message processor stopped");
        });
    }

    /// Stop the hub. In-flight messages already queued are dropped rather
    /// than drained — callers that need a drained queue should `publish`
    /// and then `await` a response via `requires_response` bookkeeping at
    /// a higher layer, which this crate does not implement.
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        info!(hub_id = %self.hub_id, phase_id = %self.phase_id, "communication hub stopped");
    }

    pub fn register_agent(&self, agent_id: impl Into<String>, metadata: serde_json::Value) {
        let agent_id = agent_id.into();
        let now = Utc::now();
        let mut state = self.state.lock();
        state.agents.insert(
            agent_id.clone(),
            AgentRecord {
                metadata,
                status: "starting".to_string(),
                registered_at: now,
                last_activity: now,
            },
        );
        drop(state);
        info!(hub_id = %self.hub_id, %agent_id, "agent registered with communication hub");
    }

    pub fn update_agent_status(&self, agent_id: &str, status: impl Into<String>) {
        let status = status.into();
        let mut state = self.state.lock();
        if let Some(record) = state.agents.get_mut(agent_id) {
            record.status = status.clone();
            record.last_activity = Utc::now();
        }
        drop(state);
        debug!(hub_id = %self.hub_id, %agent_id, %status, "agent status updated");
    }

    /// Subscribe to one or more message types, returning a receiver the
    /// caller polls for delivered messages. The hub keeps the returned
    /// channel's sending half; dropping the receiver silently stops
    /// delivery to that subscription (best-effort semantics).
    pub fn subscribe(&self, agent_id: impl Into<String>, message_types: &[&str]) -> mpsc::UnboundedReceiver<Message> {
        let agent_id = agent_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        for message_type in message_types {
            state
                .subscriptions
                .entry((*message_type).to_string())
                .or_default()
                .push(Subscription {
                    agent_id: agent_id.clone(),
                    sender: tx.clone(),
                });
        }
        drop(state);
        info!(hub_id = %self.hub_id, %agent_id, ?message_types, "agent subscribed to message types");
        rx
    }

    /// Publish a message. Returns the assigned message id. The message is
    /// recorded in history synchronously; routing to live subscribers
    /// happens asynchronously once the background processor (started via
    /// [`Self::start`]) picks it up from the queue.
    pub fn publish(
        &self,
        sender: impl Into<String>,
        target: Target,
        message_type: impl Into<String>,
        payload: serde_json::Value,
        priority: Priority,
        requires_response: bool,
    ) -> String {
        let sender = sender.into();
        let message_type = message_type.into();
        let id = uuid::Uuid::new_v4().simple().to_string();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        let message = Message {
            id: id.clone(),
            sender: sender.clone(),
            target,
            message_type: message_type.clone(),
            payload,
            sequence,
            timestamp: Utc::now(),
            priority,
            requires_response,
            correlation_id: None,
        };

        {
            let mut state = self.state.lock();
            state.history.push(message.clone());
            if let Some(record) = state.agents.get_mut(&sender) {
                record.last_activity = Utc::now();
            }
        }

        if self.queue_tx.send(message).is_err() {
            warn!(hub_id = %self.hub_id, "publish failed: message processor not running");
        } else {
            info!(hub_id = %self.hub_id, %sender, %message_type, "message published");
        }

        id
    }

    /// Deliver `message` to every live subscriber of its message type whose
    /// target matches. A subscriber whose channel has been dropped is
    /// logged and skipped — it never prevents delivery to the others
    /// (subscriber-exception isolation).
    fn route_message(&self, message: Message) {
        let subscribers: Vec<mpsc::UnboundedSender<Message>> = {
            let state = self.state.lock();
            match state.subscriptions.get(&message.message_type) {
                Some(subs) => subs
                    .iter()
                    .filter(|s| message.target.matches(&s.agent_id))
                    .map(|s| s.sender.clone())
                    .collect(),
                None => Vec::new(),
            }
        };

        for sender in subscribers {
            if sender.send(message.clone()).is_err() {
                warn!(hub_id = %self.hub_id, message_id = %message.id, "failed to deliver message to a dropped subscriber");
            }
        }
    }

    pub fn get_hub_status(&self) -> HubStatus {
        let state = self.state.lock();
        HubStatus {
            hub_id: self.hub_id.clone(),
            phase_id: self.phase_id.clone(),
            run_id: self.run_id.clone(),
            hub_active: self.active.load(Ordering::SeqCst),
            active_agents: state.agents.iter().map(|(k, v)| (k.clone(), v.status.clone())).collect(),
            total_messages: state.history.len(),
            subscription_count: state.subscriptions.values().map(|v| v.len()).sum(),
            message_types: state.subscriptions.keys().cloned().collect(),
        }
    }

    pub fn get_message_history(&self, agent_id: Option<&str>, message_type: Option<&str>) -> Vec<Message> {
        let state = self.state.lock();
        state
            .history
            .iter()
            .filter(|m| agent_id.map_or(true, |id| m.sender == id || m.target.matches(id)))
            .filter(|m| message_type.map_or(true, |t| m.message_type == t))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn broadcast_message_reaches_every_subscriber() {
        let hub = CommunicationHub::new("phase_1", "run_abc");
        hub.start();

        let mut rx_a = hub.subscribe("agent_a", &["pr_discovery"]);
        let mut rx_b = hub.subscribe("agent_b", &["pr_discovery"]);

        hub.publish("agent_c", Target::Broadcast, "pr_discovery", json!({"pr": 1}), Priority::High, false);

        let got_a = rx_a.recv().await.expect("agent_a should receive the broadcast");
        let got_b = rx_b.recv().await.expect("agent_b should receive the broadcast");
        assert_eq!(got_a.message_type, "pr_discovery");
        assert_eq!(got_b.message_type, "pr_discovery");
        hub.stop();
    }

    #[tokio::test]
    async fn targeted_message_skips_unrelated_subscribers() {
        let hub = CommunicationHub::new("phase_1", "run_abc");
        hub.start();

        let mut rx_target = hub.subscribe("agent_target", &["environment_data_request"]);
        let mut rx_other = hub.subscribe("agent_other", &["environment_data_request"]);

        hub.publish(
            "agent_a",
            Target::Agent("agent_target".into()),
            "environment_data_request",
            json!({}),
            Priority::Normal,
            true,
        );

        let got = rx_target.recv().await.expect("targeted agent should receive the message");
        assert_eq!(got.target, Target::Agent("agent_target".into()));

        // The other subscriber never gets it; confirm the channel stays empty.
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn message_history_filters_by_agent_and_type() {
        let hub = CommunicationHub::new("phase_1", "run_abc");
        hub.start();

        hub.publish("agent_a", Target::Broadcast, "jira_intelligence", json!({}), Priority::Normal, false);
        hub.publish("agent_b", Target::Broadcast, "pr_discovery", json!({}), Priority::Normal, false);

        // Give the background task a moment to drain the queue; history is
        // written synchronously at publish time so no wait is actually
        // required, but this keeps the test honest about hub shutdown order.
        hub.stop();

        let all = hub.get_message_history(None, None);
        assert_eq!(all.len(), 2);

        let only_a = hub.get_message_history(Some("agent_a"), None);
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].sender, "agent_a");

        let only_pr = hub.get_message_history(None, Some("pr_discovery"));
        assert_eq!(only_pr.len(), 1);
    }

    #[test]
    fn register_and_update_agent_status() {
        let hub = CommunicationHub::new("phase_1", "run_abc");
        hub.register_agent("agent_a", json!({"agent_type": "framework_agent"}));
        hub.update_agent_status("agent_a", "active");

        let status = hub.get_hub_status();
        assert_eq!(status.active_agents.get("agent_a").map(String::as_str), Some("active"));
    }

    #[test]
    fn hub_id_is_namespaced_by_phase_and_run() {
        let hub = CommunicationHub::new("phase_2", "run_xyz");
        assert!(hub.hub_id().starts_with("phase_2_run_xyz_"));
    }
}
