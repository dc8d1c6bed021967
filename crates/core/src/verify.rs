// Allocation and result signature checks.
//
// A result is only trusted when:
//   1. the task assignment was signed by the configured allocator for the chain, and
//   2. the proof was signed by the validator that assignment named.
// On TON the assignment also names the validator's key, so the result signer is
// covered by the allocator signature on every chain.
// Both checks are plain predicates; callers map `false` to their own errors.

use crate::codec::{AllocationFields, ChainType, ResultFields};
use crate::schema::VerifiedResult;

/// Production allocator on EVM chains.
pub const EVM_ALLOCATOR: &str = "0x19a567b3b212a5b35bA0E3B600FbEd5c2eE9083d";

/// Trusted allocator identity per chain family. `None` means nothing is trusted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatorSet {
    pub evm: Option<String>,
    pub solana: Option<String>,
    pub ton: Option<String>,
}

impl Default for AllocatorSet {
    fn default() -> Self {
        Self {
            evm: Some(EVM_ALLOCATOR.to_string()),
            solana: None,
            ton: None,
        }
    }
}

impl AllocatorSet {
    pub fn for_chain(&self, chain: ChainType) -> Option<&str> {
        match chain {
            ChainType::Evm => self.evm.as_deref(),
            ChainType::Solana => self.solana.as_deref(),
            ChainType::Ton => self.ton.as_deref(),
        }
    }

    pub fn with(mut self, chain: ChainType, identity: impl Into<String>) -> Self {
        let slot = match chain {
            ChainType::Evm => &mut self.evm,
            ChainType::Solana => &mut self.solana,
            ChainType::Ton => &mut self.ton,
        };
        *slot = Some(identity.into());
        self
    }
}

/// True when `allocator_signature` over `fields` belongs to the trusted allocator for `chain`.
pub fn verify_allocation(
    allocators: &AllocatorSet,
    chain: ChainType,
    fields: &AllocationFields<'_>,
    allocator_signature: &str,
) -> bool {
    let Some(trusted) = allocators.for_chain(chain) else {
        return false;
    };
    let codec = chain.codec();
    match codec.encode_allocation(fields) {
        Ok(message) => codec.verify(&message, allocator_signature, trusted),
        Err(_) => false,
    }
}

/// True when `result.validator_signature` over
/// `(task_id, schema_id, nullifier_hash, commitment[, recipient])` belongs to `signer`.
///
/// `signer` is the assigned validator's identity for the chain (see
/// [`Task::result_signer`](crate::schema::Task::result_signer)); the caller
/// guarantees it came from an allocation that passed [`verify_allocation`].
pub fn verify_result(
    chain: ChainType,
    schema_id: &str,
    result: &VerifiedResult,
    signer: &str,
) -> bool {
    let codec = chain.codec();
    let fields = ResultFields {
        task_id: &result.task_id,
        schema_id,
        nullifier_hash: &result.nullifier_hash,
        commitment: &result.public_fields_commitment,
        recipient: result.recipient.as_deref(),
    };
    match codec.encode_result(&fields) {
        Ok(message) => codec.verify(&message, &result.validator_signature, signer),
        Err(_) => false,
    }
}
