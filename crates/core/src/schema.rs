// Data model shared by the verifiers and the session runtime.
//
// Everything here is plain serde data. Wire names are snake_case; the task id
// travels as `task` on the allocation response. Hex-carrying fields keep the
// exact string the remote side sent so that signatures are checked against
// what was actually signed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::{AllocationFields, ChainType};

/// A validator assignment issued by the allocation service for one session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Allocation-service task identifier.
    #[serde(rename = "task")]
    pub task_id: String,
    /// Identity the validator signs results with (EVM address or Solana key hash).
    pub validator_address: String,
    pub validator_host: String,
    /// Validator public key, hex. This is the result signer identity on TON,
    /// where the allocator signs it along with the address.
    #[serde(default)]
    pub validator_pubkey: String,
    pub allocator_address: String,
    /// Allocator signature over `(task, schema, validator[, validator key])`, hex.
    pub allocator_signature: String,
}

impl Task {
    /// Identity the validator's result signature must resolve to on `chain`.
    pub fn result_signer(&self, chain: ChainType) -> &str {
        match chain {
            ChainType::Evm | ChainType::Solana => &self.validator_address,
            ChainType::Ton => &self.validator_pubkey,
        }
    }

    /// The assignment the allocator signed for this task under `schema_id`.
    pub fn allocation_fields<'a>(&'a self, schema_id: &'a str) -> AllocationFields<'a> {
        AllocationFields {
            task_id: &self.task_id,
            schema_id,
            validator_address: &self.validator_address,
            validator_pubkey: &self.validator_pubkey,
        }
    }
}

/// A schema id together with the opaque schema document fetched for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaReference {
    pub schema_id: String,
    pub schema_payload: Value,
}

/// One disclosed attribute.
///
/// `str` is the human-readable rendering and never contributes to the
/// commitment. The remaining keys keep the order they were disclosed in.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str: Option<String>,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl PublicField {
    pub fn new(display: impl Into<String>) -> Self {
        Self {
            str: Some(display.into()),
            values: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

/// Outcome reported alongside a proof result by the polling endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatus {
    #[default]
    Success,
    NotMatchRequirements,
    Failed,
}

/// Raw result as delivered by a channel, before any verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofResult {
    pub task_id: String,
    pub nullifier_hash: String,
    #[serde(default)]
    pub public_fields: Vec<PublicField>,
    pub validator_signature: String,
    #[serde(default)]
    pub status: ProofStatus,
}

/// The externally trusted artifact. Only built after both signatures check out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifiedResult {
    pub task_id: String,
    pub allocator_address: String,
    pub allocator_signature: String,
    pub public_fields: Vec<PublicField>,
    pub public_fields_commitment: String,
    pub nullifier_hash: String,
    pub validator_address: String,
    /// Validator result key from the allocation. Carried when the task had one (TON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_pubkey: Option<String>,
    pub validator_signature: String,
    /// Present exactly when the caller supplied a recipient; it is part of the signed payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

impl VerifiedResult {
    /// The assignment the allocator signed, rebuilt from the artifact.
    pub fn allocation_fields<'a>(&'a self, schema_id: &'a str) -> AllocationFields<'a> {
        AllocationFields {
            task_id: &self.task_id,
            schema_id,
            validator_address: &self.validator_address,
            validator_pubkey: self.validator_pubkey.as_deref().unwrap_or_default(),
        }
    }

    /// Identity the validator signature must resolve to. `None` on TON without a key.
    pub fn result_signer(&self, chain: ChainType) -> Option<&str> {
        match chain {
            ChainType::Evm | ChainType::Solana => Some(&self.validator_address),
            ChainType::Ton => self.validator_pubkey.as_deref().filter(|k| !k.is_empty()),
        }
    }
}
