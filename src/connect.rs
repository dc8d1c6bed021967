// Session controller: the only place a launch can fail.
//
// Each launch walks the same steps in order:
//   probe → config → schema lookup → schema fetch → allocation → allocation check
//   → channel → commitment → result check
// Allocation is verified before any validator channel is opened; the result is
// verified only after the channel completes.

use std::sync::Arc;

use tracing::Instrument;
use transgate_core::codec::ChainType;
use transgate_core::commitment::commit;
use transgate_core::schema::{ProofResult, Task, VerifiedResult};
use transgate_core::verify::{verify_allocation, verify_result};

use crate::channel::{ChannelOutcome, LaunchContext, MessageBus, Orchestrator, Platform, PollSettings};
use crate::config::ConnectorConfig;
use crate::error::{ErrorKind, TransgateError};
use crate::gateway::{Gateway, TaskRequest};
use crate::presenter::Presenter;
use crate::session::{CancelFlag, Session};

pub struct TransgateConnect {
    app_id: String,
    config: ConnectorConfig,
    gateway: Arc<dyn Gateway>,
    bus: Arc<MessageBus>,
    presenter: Arc<dyn Presenter>,
    platform: Platform,
}

impl TransgateConnect {
    pub fn new(
        app_id: impl Into<String>,
        config: ConnectorConfig,
        gateway: Arc<dyn Gateway>,
        bus: Arc<MessageBus>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            config,
            gateway,
            bus,
            presenter,
            platform: Platform::Desktop,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Whether the browser extension is reachable.
    pub async fn is_transgate_available(&self) -> bool {
        self.gateway.probe_extension().await
    }

    /// Runs a session on the default chain (EVM).
    pub async fn launch(&self, schema_id: &str, address: Option<&str>) -> Result<VerifiedResult, TransgateError> {
        self.launch_with_cancel(schema_id, address, ChainType::Evm, CancelFlag::new())
            .await
    }

    pub async fn launch_with_alt_chain(
        &self,
        schema_id: &str,
        address: Option<&str>,
        chain_type: ChainType,
    ) -> Result<VerifiedResult, TransgateError> {
        self.launch_with_cancel(schema_id, address, chain_type, CancelFlag::new())
            .await
    }

    /// Like [`launch_with_alt_chain`](Self::launch_with_alt_chain) with a caller-held
    /// cancel flag. Setting it resolves the session with `VerificationCanceled`.
    pub async fn launch_with_cancel(
        &self,
        schema_id: &str,
        address: Option<&str>,
        chain_type: ChainType,
        cancel: CancelFlag,
    ) -> Result<VerifiedResult, TransgateError> {
        let mut session = Session::new(self.app_id.as_str(), chain_type, cancel);
        let span = tracing::info_span!(
            "launch",
            session_id = %session.id(),
            app_id = %self.app_id,
            schema_id,
            chain = chain_type.name(),
        );
        let result = self
            .run(&mut session, schema_id, address)
            .instrument(span.clone())
            .await;
        span.in_scope(|| match &result {
            Ok(verified) => tracing::info!(task_id = %verified.task_id, "session verified"),
            Err(e) => tracing::warn!(kind = ?e.kind, "session failed: {}", e),
        });
        result
    }

    async fn run(
        &self,
        session: &mut Session,
        schema_id: &str,
        address: Option<&str>,
    ) -> Result<VerifiedResult, TransgateError> {
        let chain_type = session.chain_type();

        // 1. Probe; only used to pick a channel.
        let extension_installed = self.gateway.probe_extension().await;
        tracing::debug!(extension_installed, gateway = self.gateway.gateway_name(), "probed extension");

        // 2. App config.
        let sdk_config = self
            .gateway
            .fetch_config(&self.app_id)
            .await
            .map_err(|e| TransgateError::caused_by(ErrorKind::IllegalAppId, e))?;

        // 3. Schema must be registered for the app.
        let entry = sdk_config
            .schema(schema_id)
            .ok_or_else(|| TransgateError::from(ErrorKind::IllegalSchemaId))?;

        // 4. Schema document, then a task.
        let schema_url = entry
            .schema_url
            .clone()
            .unwrap_or_else(|| self.config.default_schema_url(schema_id));
        let schema = self
            .gateway
            .fetch_schema(&schema_url)
            .await
            .map_err(|e| TransgateError::caused_by(ErrorKind::IllegalSchemaId, e))?;

        let request = TaskRequest {
            token: sdk_config.token.clone(),
            schema_id: schema_id.to_string(),
            app_id: self.app_id.clone(),
            chain_type,
        };
        let task = self
            .gateway
            .allocate_task(&sdk_config.task_rpc, &request)
            .await
            .map_err(|e| TransgateError::caused_by(ErrorKind::TaskRpcError, e))?;
        tracing::info!(task_id = %task.task_id, validator = %task.validator_address, "task allocated");

        // 5. Nothing reaches a validator unless the allocator signed this assignment,
        // including the key the result will be checked against.
        if !verify_allocation(
            &self.config.allocators,
            chain_type,
            &task.allocation_fields(schema_id),
            &task.allocator_signature,
        ) {
            tracing::warn!(task_id = %task.task_id, allocator = %task.allocator_address, "allocator signature rejected");
            return Err(ErrorKind::IllegalTaskInfo.into());
        }

        // 6. Channel.
        let launch = LaunchContext {
            app_id: &self.app_id,
            schema_id,
            chain_type,
            task: &task,
            schema: &schema,
            recipient: address,
            callback_url: sdk_config.callback_url.as_deref(),
            extension_installed,
        };
        let orchestrator = Orchestrator {
            gateway: self.gateway.as_ref(),
            bus: &self.bus,
            presenter: self.presenter.as_ref(),
            platform: self.platform,
            poll: PollSettings {
                interval: self.config.poll_interval,
                max_attempts: self.config.max_poll_attempts,
            },
            deep_link_base: &self.config.deep_link_url,
        };
        let proof = match orchestrator.run(session, &launch).await {
            ChannelOutcome::Completed(proof) => proof,
            other => return Err(outcome_error(other)),
        };

        // 7. Result.
        let verified = assemble(&task, proof, address);
        if !verify_result(chain_type, schema_id, &verified, task.result_signer(chain_type)) {
            tracing::warn!(task_id = %task.task_id, validator = %task.validator_address, "validator signature rejected");
            return Err(ErrorKind::IllegalNode.into());
        }
        Ok(verified)
    }
}

/// Binds a channel result to the task it was allocated for. Identity fields come
/// from the allocation, never from the channel.
fn assemble(task: &Task, proof: ProofResult, recipient: Option<&str>) -> VerifiedResult {
    if proof.task_id != task.task_id {
        tracing::debug!(expected = %task.task_id, got = %proof.task_id, "channel reported a different task id");
    }
    VerifiedResult {
        task_id: task.task_id.clone(),
        allocator_address: task.allocator_address.clone(),
        allocator_signature: task.allocator_signature.clone(),
        public_fields_commitment: commit(&proof.public_fields),
        public_fields: proof.public_fields,
        nullifier_hash: proof.nullifier_hash,
        validator_address: task.validator_address.clone(),
        validator_pubkey: Some(task.validator_pubkey.clone()).filter(|k| !k.is_empty()),
        validator_signature: proof.validator_signature,
        recipient: recipient.map(str::to_string),
    }
}

fn outcome_error(outcome: ChannelOutcome) -> TransgateError {
    match outcome {
        ChannelOutcome::Cancelled => ErrorKind::VerificationCanceled.into(),
        ChannelOutcome::TimedOut => ErrorKind::RequestTimeout.into(),
        ChannelOutcome::NotMatchRequirements => ErrorKind::NotMatchRequirements.into(),
        ChannelOutcome::InvalidSchema => ErrorKind::IllegalSchema.into(),
        ChannelOutcome::UnexpectedVerifyError(message) if message.is_empty() => {
            ErrorKind::UnexpectedVerifyError.into()
        }
        ChannelOutcome::UnexpectedVerifyError(message) => {
            TransgateError::caused_by(ErrorKind::UnexpectedVerifyError, message)
        }
        ChannelOutcome::Failed(cause) => TransgateError::caused_by(ErrorKind::UnexpectedError, cause),
        ChannelOutcome::Completed(_) => {
            TransgateError::caused_by(ErrorKind::UnexpectedError, "completed outcome treated as failure")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transgate_core::schema::{ProofStatus, PublicField};

    fn task() -> Task {
        Task {
            task_id: "task-a".to_string(),
            validator_address: "0xvalidator".to_string(),
            validator_host: "node".to_string(),
            validator_pubkey: String::new(),
            allocator_address: "0xallocator".to_string(),
            allocator_signature: "0xsig".to_string(),
        }
    }

    #[test]
    fn assemble_takes_identity_from_the_task() {
        let proof = ProofResult {
            task_id: "task-b".to_string(),
            nullifier_hash: "0x01".to_string(),
            public_fields: vec![PublicField::new("v").with("value", "42")],
            validator_signature: "0x02".to_string(),
            status: ProofStatus::Success,
        };
        let verified = assemble(&task(), proof, Some("0xme"));
        assert_eq!(verified.task_id, "task-a");
        assert_eq!(verified.validator_address, "0xvalidator");
        assert_eq!(verified.allocator_signature, "0xsig");
        assert_eq!(verified.recipient.as_deref(), Some("0xme"));
        assert_eq!(
            verified.public_fields_commitment,
            transgate_core::hash::keccak256_hex(b"42")
        );
    }

    #[test]
    fn outcomes_map_to_error_kinds() {
        assert_eq!(outcome_error(ChannelOutcome::Cancelled).kind, ErrorKind::VerificationCanceled);
        assert_eq!(outcome_error(ChannelOutcome::TimedOut).kind, ErrorKind::RequestTimeout);
        assert_eq!(outcome_error(ChannelOutcome::InvalidSchema).kind, ErrorKind::IllegalSchema);
        assert_eq!(
            outcome_error(ChannelOutcome::NotMatchRequirements).kind,
            ErrorKind::NotMatchRequirements
        );
        let err = outcome_error(ChannelOutcome::UnexpectedVerifyError("zk circuit".to_string()));
        assert_eq!(err.kind, ErrorKind::UnexpectedVerifyError);
        assert!(err.message.contains("zk circuit"));
        let err = outcome_error(ChannelOutcome::Failed("bridge gone".to_string()));
        assert_eq!(err.kind, ErrorKind::UnexpectedError);
        assert_eq!(err.code, 100015);
    }
}
