// Helpers for integration tests: a scripted gateway, a recording presenter,
// and signed task/result fixtures for every chain family.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use transgate_connect::channel::{Channel, LaunchMessage, MessageBus};
use transgate_connect::codec::{AllocationFields, ChainType, ResultFields};
use transgate_connect::commitment::commit;
use transgate_connect::config::ConnectorConfig;
use transgate_connect::gateway::{Gateway, GatewayError, SchemaEntry, SdkConfig, TaskRequest};
use transgate_connect::presenter::Presenter;
use transgate_connect::schema::{ProofResult, ProofStatus, PublicField, Task};
use transgate_connect::session::CancelFlag;
use transgate_connect::verify::AllocatorSet;
use transgate_core::testing::{self, ChainSigner};

pub const APP_ID: &str = "3f1b8c2e-app";
pub const SCHEMA_ID: &str = "c7eab8b7d7e44b05b41b613fe548edf5";
pub const TASK_ID: &str = "0f3c9a7d2b1e4c5a8d6f7e9b0a1c2d3e";
pub const NULLIFIER: &str = "0x9b1f5e3c2a7d4b6e8f0a1c3e5b7d9f2a4c6e8b0d1f3a5c7e9b2d4f6a8c0e1b3d";
pub const DEEP_LINK_BASE: &str = "https://link.transgate.test/verify";

// ── Fixtures ───────────────────────────────────────────────────────────────────

/// A task allocated and signed by a test allocator, plus the validator that will answer it.
pub struct Fixture {
    pub chain: ChainType,
    pub allocator: ChainSigner,
    pub validator: ChainSigner,
    pub task: Task,
}

impl Fixture {
    pub fn new(chain: ChainType) -> Self {
        Self::with_task(chain, TASK_ID)
    }

    pub fn with_task(chain: ChainType, task_id: &str) -> Self {
        let allocator = ChainSigner::new(chain, 7);
        let validator = ChainSigner::new(chain, 9);
        let validator_address = testing::validator_address(chain, &validator);
        let validator_pubkey = match chain {
            ChainType::Ton => validator.identity(),
            ChainType::Evm | ChainType::Solana => String::new(),
        };
        let allocator_signature = allocator.sign_allocation(&AllocationFields {
            task_id,
            schema_id: SCHEMA_ID,
            validator_address: &validator_address,
            validator_pubkey: &validator_pubkey,
        });
        let task = Task {
            task_id: task_id.to_string(),
            validator_address,
            validator_host: "validator-1.transgate.test".to_string(),
            validator_pubkey,
            allocator_address: allocator.identity(),
            allocator_signature,
        };
        Self {
            chain,
            allocator,
            validator,
            task,
        }
    }

    /// Same task, but the assignment is signed by a key the connector does not trust.
    pub fn forged(chain: ChainType) -> Self {
        let mut fixture = Self::new(chain);
        let impostor = ChainSigner::new(chain, 13);
        fixture.task.allocator_signature = impostor.sign_allocation(&fixture.task.allocation_fields(SCHEMA_ID));
        fixture
    }

    /// Same signed assignment, but the task now names a different validator key and
    /// the proof is signed with it. Only meaningful on TON, where results are checked
    /// against the key rather than a recovered address.
    pub fn with_substituted_validator_key(chain: ChainType) -> Self {
        let mut fixture = Self::new(chain);
        let rogue = ChainSigner::new(chain, 66);
        fixture.task.validator_pubkey = rogue.identity();
        fixture.validator = rogue;
        fixture
    }

    pub fn allocators(&self) -> AllocatorSet {
        AllocatorSet::default().with(self.chain, self.allocator.identity())
    }

    pub fn config(&self) -> ConnectorConfig {
        ConnectorConfig {
            server_url: "https://api.transgate.test".to_string(),
            schema_base_url: "https://api.transgate.test/schema".to_string(),
            deep_link_url: DEEP_LINK_BASE.to_string(),
            allocators: self.allocators(),
            ..ConnectorConfig::default()
        }
    }

    /// A proof over `fields` signed by the validator for `signed_task_id`.
    pub fn proof_signed_for(
        &self,
        signed_task_id: &str,
        fields: Vec<PublicField>,
        recipient: Option<&str>,
    ) -> ProofResult {
        let commitment = commit(&fields);
        let validator_signature = self.validator.sign_result(&ResultFields {
            task_id: signed_task_id,
            schema_id: SCHEMA_ID,
            nullifier_hash: NULLIFIER,
            commitment: &commitment,
            recipient,
        });
        ProofResult {
            task_id: self.task.task_id.clone(),
            nullifier_hash: NULLIFIER.to_string(),
            public_fields: fields,
            validator_signature,
            status: ProofStatus::Success,
        }
    }

    pub fn proof(&self, recipient: Option<&str>) -> ProofResult {
        self.proof_signed_for(&self.task.task_id, balance_fields(), recipient)
    }

    pub fn gateway(&self) -> MockGateway {
        MockGateway::new(sdk_config(), Ok(schema_document()), Ok(self.task.clone()))
    }

    pub fn success_reply(&self, proof: &ProofResult) -> Value {
        json!({
            "type": "GENERATE_ZKP_SUCCESS",
            "id": self.task.task_id,
            "result": proof,
        })
    }

    pub fn reply(&self, kind: &str) -> Value {
        json!({"type": kind, "id": self.task.task_id})
    }
}

/// One disclosed field whose only leaf is `42`.
pub fn balance_fields() -> Vec<PublicField> {
    vec![PublicField::new("Balance is 42").with("value", "42")]
}

pub fn sdk_config() -> SdkConfig {
    SdkConfig {
        schemas: vec![
            SchemaEntry {
                schema_id: SCHEMA_ID.to_string(),
                schema_url: None,
            },
            SchemaEntry {
                schema_id: "other-schema".to_string(),
                schema_url: Some("https://cdn.transgate.test/other.json".to_string()),
            },
        ],
        task_rpc: "rpc.transgate.test/task".to_string(),
        token: "app-token".to_string(),
        callback_url: Some("https://dapp.test/callback".to_string()),
    }
}

pub fn schema_document() -> Value {
    json!({
        "issuer": "Example Bank",
        "title": "Balance over threshold",
        "requests": [{"url": "https://bank.test/api/balance"}]
    })
}

// ── Mock gateway ──────────────────────────────────────────────────────────────

/// Scripted [`Gateway`]. Polls pop from a queue; an empty queue means "not ready".
pub struct MockGateway {
    pub extension: bool,
    config: Result<SdkConfig, u16>,
    schema: Result<Value, u16>,
    task: Result<Task, u16>,
    results: Mutex<VecDeque<Option<ProofResult>>>,
    scans: Mutex<VecDeque<bool>>,
    calls: Mutex<Vec<String>>,
    requests: Mutex<Vec<TaskRequest>>,
}

impl MockGateway {
    pub fn new(config: SdkConfig, schema: Result<Value, u16>, task: Result<Task, u16>) -> Self {
        Self {
            extension: false,
            config: Ok(config),
            schema,
            task,
            results: Mutex::new(VecDeque::new()),
            scans: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_extension(mut self) -> Self {
        self.extension = true;
        self
    }

    pub fn with_config_status(mut self, status: u16) -> Self {
        self.config = Err(status);
        self
    }

    pub fn with_schema_status(mut self, status: u16) -> Self {
        self.schema = Err(status);
        self
    }

    pub fn with_task_status(mut self, status: u16) -> Self {
        self.task = Err(status);
        self
    }

    pub fn with_results(self, results: Vec<Option<ProofResult>>) -> Self {
        self.results.lock().expect("lock").extend(results);
        self
    }

    pub fn with_scans(self, scans: Vec<bool>) -> Self {
        self.scans.lock().expect("lock").extend(scans);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().expect("lock").iter().filter(|c| *c == name).count()
    }

    pub fn task_requests(&self) -> Vec<TaskRequest> {
        self.requests.lock().expect("lock").clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().expect("lock").push(name.to_string());
    }
}

fn status<T>(scripted: &Result<T, u16>) -> Result<T, GatewayError>
where
    T: Clone,
{
    scripted
        .clone()
        .map_err(|code| GatewayError::HttpStatus(code, "scripted failure".to_string()))
}

#[async_trait]
impl Gateway for MockGateway {
    async fn probe_extension(&self) -> bool {
        self.record("probe");
        self.extension
    }

    async fn fetch_config(&self, _app_id: &str) -> Result<SdkConfig, GatewayError> {
        self.record("config");
        status(&self.config)
    }

    async fn fetch_schema(&self, url: &str) -> Result<Value, GatewayError> {
        self.record("schema");
        assert!(url.ends_with(".json"), "unexpected schema url {}", url);
        status(&self.schema)
    }

    async fn allocate_task(&self, _task_rpc: &str, request: &TaskRequest) -> Result<Task, GatewayError> {
        self.record("allocate");
        self.requests.lock().expect("lock").push(request.clone());
        status(&self.task)
    }

    async fn poll_result(&self, _task_id: &str) -> Result<Option<ProofResult>, GatewayError> {
        self.record("poll");
        Ok(self.results.lock().expect("lock").pop_front().flatten())
    }

    async fn scan_status(&self, _task_id: &str) -> Result<bool, GatewayError> {
        self.record("scan");
        Ok(self.scans.lock().expect("lock").pop_front().unwrap_or(false))
    }

    fn gateway_name(&self) -> &str {
        "mock"
    }
}

// ── Presenter ─────────────────────────────────────────────────────────────────

/// Records every presentation signal. With `close_modal` set, it cancels the
/// session as soon as a QR code or deep link is shown, like a user closing the modal.
#[derive(Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<String>>,
    close_modal: AtomicBool,
}

impl RecordingPresenter {
    pub fn closing_modal() -> Self {
        let presenter = Self::default();
        presenter.close_modal.store(true, Ordering::SeqCst);
        presenter
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("lock").clone()
    }

    pub fn shown_url(&self) -> Option<String> {
        self.events().into_iter().find_map(|e| {
            e.strip_prefix("qr:")
                .or_else(|| e.strip_prefix("deep_link:"))
                .map(str::to_string)
        })
    }

    fn push(&self, event: String) {
        self.events.lock().expect("lock").push(event);
    }

    fn maybe_close(&self, cancel: &CancelFlag) {
        if self.close_modal.load(Ordering::SeqCst) {
            cancel.cancel();
        }
    }
}

impl Presenter for RecordingPresenter {
    fn show_pending(&self, channel: Channel) {
        self.push(format!("pending:{}", channel.name()));
    }

    fn hide_pending(&self) {
        self.push("hide".to_string());
    }

    fn show_qr(&self, url: &str, cancel: CancelFlag) {
        self.push(format!("qr:{}", url));
        self.maybe_close(&cancel);
    }

    fn open_deep_link(&self, url: &str, cancel: CancelFlag) {
        self.push(format!("deep_link:{}", url));
        self.maybe_close(&cancel);
    }

    fn mark_consumed(&self) {
        self.push("consumed".to_string());
    }
}

// ── Extension bridge ──────────────────────────────────────────────────────────

/// Plays the browser extension: for each of `launches` launch messages, answers
/// with the scripted replies whose `id` matches. Returns the payloads it received.
pub fn spawn_extension(
    bus: Arc<MessageBus>,
    mut bridge: UnboundedReceiver<LaunchMessage>,
    replies: Vec<Value>,
    launches: usize,
) -> JoinHandle<Vec<Value>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        for _ in 0..launches {
            let Some(launch) = bridge.recv().await else {
                break;
            };
            for reply in replies.iter().filter(|r| r["id"] == launch.id()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
                bus.deliver_json(reply.clone());
            }
            seen.push(launch.into_payload());
        }
        seen
    })
}
