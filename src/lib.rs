//! Async session runtime for TransGate attestations.
//!
//! [`TransgateConnect`] fetches an app's configuration, obtains a validator
//! assignment, checks the allocator's signature, hands the task to a delivery
//! channel and only returns a [`VerifiedResult`] once the validator's signature
//! over the disclosed fields checks out. The pure verification logic lives in
//! `transgate-core` and is re-exported here.

pub mod channel;
pub mod config;
pub mod connect;
pub mod error;
pub mod gateway;
pub mod presenter;
pub mod session;

pub use transgate_core::{codec, commitment, hash, schema, verify};

pub use channel::{Channel, ChannelOutcome, ChannelState, MessageBus, Platform};
pub use config::ConnectorConfig;
pub use connect::TransgateConnect;
pub use error::{ErrorKind, TransgateError};
pub use gateway::{Gateway, GatewayError, HttpGateway};
pub use presenter::{LogPresenter, Presenter};
pub use session::{CancelFlag, Session};
pub use transgate_core::{ChainType, ProofResult, PublicField, Task, VerifiedResult};
