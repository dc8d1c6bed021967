//! Pure verification logic for TransGate attestations.
//!
//! - [`commitment`]: canonical hash over disclosed public fields.
//! - [`codec`]: per-chain payload encoding and signature checks (EVM, Solana, TON).
//! - [`verify`]: allocator and validator signature predicates.
//! - [`schema`]: the data model shared with the session runtime.
//!
//! Nothing here performs I/O; the async runtime lives in `transgate-connect`.

pub mod codec;
pub mod commitment;
pub mod hash;
pub mod schema;
pub mod verify;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use codec::{ChainType, Codec, CodecError};
pub use commitment::commit;
pub use schema::{ProofResult, ProofStatus, PublicField, SchemaReference, Task, VerifiedResult};
pub use verify::{verify_allocation, verify_result, AllocatorSet};
