// Browser-extension channel.
//
// The embedding application owns the actual bridge to the extension: it drains
// the receiver returned by `MessageBus::new` and feeds whatever the extension
// sends back into `deliver` / `deliver_json`. Inbound messages are routed by
// their `id` to the one session waiting on that task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use transgate_core::schema::ProofResult;

use super::{ChannelOutcome, LaunchContext};
use crate::session::CancelFlag;

pub const LAUNCH_MESSAGE_TYPE: &str = "AUTH_ZKPASS";

// Keys owned by the launch envelope; schema documents cannot override them.
const RESERVED_KEYS: [&str; 10] = [
    "type",
    "id",
    "mint_account",
    "task",
    "allocator_address",
    "validator_address",
    "validator_host",
    "validator_pubkey",
    "allocator_signature",
    "app_id",
];

// ── Outbound ────────────────────────────────────────────────────────────────

/// The `AUTH_ZKPASS` message handed to the extension.
#[derive(Clone, Debug, PartialEq)]
pub struct LaunchMessage {
    id: String,
    payload: Value,
}

impl LaunchMessage {
    pub fn new(launch: &LaunchContext<'_>) -> Self {
        let task = launch.task;
        let mut payload = Map::new();
        payload.insert("type".into(), LAUNCH_MESSAGE_TYPE.into());
        payload.insert("id".into(), task.task_id.clone().into());
        if let Some(account) = launch.recipient {
            payload.insert("mint_account".into(), account.into());
        }
        payload.insert("task".into(), task.task_id.clone().into());
        if let Value::Object(schema) = launch.schema {
            for (key, value) in schema {
                if !RESERVED_KEYS.contains(&key.as_str()) {
                    payload.insert(key.clone(), value.clone());
                }
            }
        }
        payload.insert("allocator_address".into(), task.allocator_address.clone().into());
        payload.insert("validator_address".into(), task.validator_address.clone().into());
        payload.insert("validator_host".into(), task.validator_host.clone().into());
        payload.insert("validator_pubkey".into(), task.validator_pubkey.clone().into());
        payload.insert("allocator_signature".into(), task.allocator_signature.clone().into());
        payload.insert("app_id".into(), launch.app_id.into());
        Self {
            id: task.task_id.clone(),
            payload: Value::Object(payload),
        }
    }

    /// Correlation id; replies carry the same value.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }
}

// ── Inbound ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    GenerateZkpSuccess,
    NotMatchRequirements,
    IllegalWindowClosing,
    UnexpectedVerifyError,
    InvalidSchema,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ExtensionMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Proof payload, kept raw so a routed success with a bad body still ends the session.
    #[serde(default)]
    pub result: Option<Value>,
}

impl ExtensionMessage {
    pub fn proof(&self) -> Result<ProofResult, String> {
        match &self.result {
            None | Some(Value::Null) => Err("extension reported success without a result".to_string()),
            Some(raw) => ProofResult::deserialize(raw).map_err(|e| format!("malformed extension result: {}", e)),
        }
    }
}

#[derive(Debug)]
pub enum BusError {
    BridgeClosed,
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusError::BridgeClosed => write!(f, "extension bridge is closed"),
        }
    }
}

impl std::error::Error for BusError {}

// ── Bus ─────────────────────────────────────────────────────────────────────

type Listener = (u64, mpsc::UnboundedSender<ExtensionMessage>);

pub struct MessageBus {
    outbound: mpsc::UnboundedSender<LaunchMessage>,
    listeners: Mutex<HashMap<String, Listener>>,
    next_ticket: AtomicU64,
}

impl MessageBus {
    /// Returns the bus and the bridge end that receives outbound launch messages.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<LaunchMessage>) {
        let (outbound, bridge) = mpsc::unbounded_channel();
        let bus = Arc::new(Self {
            outbound,
            listeners: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(1),
        });
        (bus, bridge)
    }

    pub fn post(&self, message: LaunchMessage) -> Result<(), BusError> {
        self.outbound.send(message).map_err(|_| BusError::BridgeClosed)
    }

    /// Routes `message` to its subscriber. Returns false when nobody is waiting on its id.
    pub fn deliver(&self, message: ExtensionMessage) -> bool {
        let listeners = self.listeners();
        match listeners.get(&message.id) {
            Some((_, tx)) => tx.send(message).is_ok(),
            None => {
                tracing::debug!(id = %message.id, "dropping unrouted extension message");
                false
            }
        }
    }

    /// Like [`deliver`](Self::deliver) for raw bridge payloads. Malformed input is dropped.
    pub fn deliver_json(&self, raw: Value) -> bool {
        match serde_json::from_value::<ExtensionMessage>(raw) {
            Ok(message) => self.deliver(message),
            Err(e) => {
                tracing::debug!("dropping malformed extension message: {}", e);
                false
            }
        }
    }

    /// Registers the single listener for `key`, replacing any earlier one.
    pub fn subscribe(self: &Arc<Self>, key: impl Into<String>) -> Subscription {
        let key = key.into();
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        if self.listeners().insert(key.clone(), (ticket, tx)).is_some() {
            tracing::debug!(key = %key, "replacing extension listener");
        }
        Subscription {
            bus: Arc::clone(self),
            key,
            ticket,
            rx,
            closed: false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    fn unsubscribe(&self, key: &str, ticket: u64) {
        let mut listeners = self.listeners();
        if listeners.get(key).is_some_and(|(current, _)| *current == ticket) {
            listeners.remove(key);
        }
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<String, Listener>> {
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Listener registration; removed from the bus on [`close`](Self::close) or drop.
pub struct Subscription {
    bus: Arc<MessageBus>,
    key: String,
    ticket: u64,
    rx: mpsc::UnboundedReceiver<ExtensionMessage>,
    closed: bool,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next routed message. `None` once this subscription was replaced or closed.
    pub async fn recv(&mut self) -> Option<ExtensionMessage> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.bus.unsubscribe(&self.key, self.ticket);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Channel ─────────────────────────────────────────────────────────────────

/// Posts `launch` to the extension and waits for the matching reply or cancellation.
///
/// The listener is registered before posting so a fast reply cannot be missed,
/// and it is released on every exit path.
pub async fn await_extension(bus: &Arc<MessageBus>, launch: LaunchMessage, cancel: &CancelFlag) -> ChannelOutcome {
    if cancel.is_cancelled() {
        return ChannelOutcome::Cancelled;
    }
    let mut subscription = bus.subscribe(launch.id());
    if let Err(e) = bus.post(launch) {
        return ChannelOutcome::Failed(e.to_string());
    }

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            message = subscription.recv() => Some(message),
        };
        let message = match next {
            None => return ChannelOutcome::Cancelled,
            Some(None) => return ChannelOutcome::Failed("extension listener was replaced".to_string()),
            Some(Some(message)) => message,
        };
        tracing::debug!(id = %message.id, kind = ?message.kind, "extension message");
        match message.kind {
            MessageKind::GenerateZkpSuccess => {
                return match message.proof() {
                    Ok(result) => ChannelOutcome::Completed(result),
                    Err(cause) => {
                        tracing::warn!(id = %message.id, "{}", cause);
                        ChannelOutcome::Failed(cause)
                    }
                }
            }
            MessageKind::NotMatchRequirements => return ChannelOutcome::NotMatchRequirements,
            MessageKind::IllegalWindowClosing => return ChannelOutcome::Cancelled,
            MessageKind::UnexpectedVerifyError => {
                return ChannelOutcome::UnexpectedVerifyError(message.message.unwrap_or_default())
            }
            MessageKind::InvalidSchema => return ChannelOutcome::InvalidSchema,
            MessageKind::Unknown => continue,
        }
    }
}
