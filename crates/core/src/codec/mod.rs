// Per-chain encoding of the signed payloads and signature checks.
//
// Each chain family lays out the same logical tuples differently:
//   allocation = (task, schema, validator)        TON also signs the validator key
//   result     = (task, schema, nullifier, commitment[, recipient])
// `encode_*` returns the exact bytes the signer committed to; `verify` never
// fails loudly, any malformed input simply yields `false`.

pub mod cell;
mod evm;
mod solana;
mod ton;

pub use evm::EvmCodec;
pub use solana::SolanaCodec;
pub use ton::{TonAddress, TonCodec};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    #[default]
    Evm,
    #[serde(alias = "sol")]
    Solana,
    Ton,
}

impl ChainType {
    pub fn name(&self) -> &'static str {
        match self {
            ChainType::Evm => "evm",
            ChainType::Solana => "solana",
            ChainType::Ton => "ton",
        }
    }

    /// The codec for this chain family. Sessions resolve this once up front.
    pub fn codec(&self) -> &'static dyn Codec {
        match self {
            ChainType::Evm => &EvmCodec,
            ChainType::Solana => &SolanaCodec,
            ChainType::Ton => &TonCodec,
        }
    }
}

impl std::fmt::Display for ChainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChainType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evm" => Ok(ChainType::Evm),
            "solana" | "sol" => Ok(ChainType::Solana),
            "ton" => Ok(ChainType::Ton),
            other => Err(CodecError::UnknownChain(other.to_string())),
        }
    }
}

/// Fields the allocator signs when assigning a validator.
#[derive(Clone, Copy, Debug)]
pub struct AllocationFields<'a> {
    pub task_id: &'a str,
    pub schema_id: &'a str,
    pub validator_address: &'a str,
    /// Key the validator signs results with, hex. Only chains without signer
    /// recovery (TON) carry it in the signed payload; the others ignore it.
    pub validator_pubkey: &'a str,
}

/// Fields the validator signs over a finished proof.
#[derive(Clone, Copy, Debug)]
pub struct ResultFields<'a> {
    pub task_id: &'a str,
    pub schema_id: &'a str,
    pub nullifier_hash: &'a str,
    pub commitment: &'a str,
    pub recipient: Option<&'a str>,
}

pub trait Codec: Send + Sync {
    fn chain(&self) -> ChainType;

    fn encode_allocation(&self, fields: &AllocationFields<'_>) -> Result<Vec<u8>, CodecError>;

    fn encode_result(&self, fields: &ResultFields<'_>) -> Result<Vec<u8>, CodecError>;

    /// Identity (hex) of whoever produced `signature` over `message`.
    fn recover_signer(&self, message: &[u8], signature: &str) -> Result<String, CodecError>;

    /// Whether `signature` over `message` belongs to `expected`. Identities compare as hex,
    /// ignoring case and a `0x` prefix.
    fn verify(&self, message: &[u8], signature: &str, expected: &str) -> bool {
        match self.recover_signer(message, signature) {
            Ok(identity) => {
                let expected = crate::hash::normalize_hex(expected);
                !expected.is_empty() && crate::hash::normalize_hex(&identity) == expected
            }
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    InvalidHex(String),
    FieldTooLong { field: &'static str, len: usize },
    InvalidAddress(String),
    SignatureLength { expected: usize, got: usize },
    InvalidRecoveryId(u8),
    InvalidPublicKey,
    Recovery,
    RecoveryUnsupported(ChainType),
    CellOverflow,
    Serialize(String),
    UnknownChain(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::InvalidHex(field) => write!(f, "invalid hex in {}", field),
            CodecError::FieldTooLong { field, len } => {
                write!(f, "{} is {} bytes, does not fit a 32-byte word", field, len)
            }
            CodecError::InvalidAddress(a) => write!(f, "invalid address: {}", a),
            CodecError::SignatureLength { expected, got } => {
                write!(f, "signature must be {} bytes, got {}", expected, got)
            }
            CodecError::InvalidRecoveryId(v) => write!(f, "invalid recovery id: {}", v),
            CodecError::InvalidPublicKey => write!(f, "invalid public key"),
            CodecError::Recovery => write!(f, "signer recovery failed"),
            CodecError::RecoveryUnsupported(chain) => {
                write!(f, "{} signatures do not support signer recovery", chain)
            }
            CodecError::CellOverflow => write!(f, "cell capacity exceeded"),
            CodecError::Serialize(e) => write!(f, "serialize: {}", e),
            CodecError::UnknownChain(name) => write!(f, "unknown chain type: {}", name),
        }
    }
}

impl std::error::Error for CodecError {}

/// Splits a 65-byte `r || s || v` signature into the compact part and a 0/1 recovery id.
/// `v` may be 0, 1, 27 or 28.
pub(crate) fn split_recoverable(signature: &str) -> Result<([u8; 64], i32), CodecError> {
    let bytes = crate::hash::decode_hex(signature)
        .map_err(|_| CodecError::InvalidHex("signature".to_string()))?;
    if bytes.len() != 65 {
        return Err(CodecError::SignatureLength {
            expected: 65,
            got: bytes.len(),
        });
    }
    let v = bytes[64];
    let recovery_id = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(CodecError::InvalidRecoveryId(other)),
    };
    let mut compact = [0u8; 64];
    compact.copy_from_slice(&bytes[..64]);
    Ok((compact, i32::from(recovery_id)))
}

/// Recovers the uncompressed secp256k1 public key that signed `digest`.
pub(crate) fn recover_uncompressed(
    digest: [u8; 32],
    signature: &str,
) -> Result<[u8; 65], CodecError> {
    use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
    use secp256k1::{Message, Secp256k1};

    let (compact, v) = split_recoverable(signature)?;
    let recovery_id = RecoveryId::from_i32(v).map_err(|_| CodecError::InvalidRecoveryId(v as u8))?;
    let sig = RecoverableSignature::from_compact(&compact, recovery_id)
        .map_err(|_| CodecError::Recovery)?;
    let secp = Secp256k1::verification_only();
    let public_key = secp
        .recover_ecdsa(&Message::from_digest(digest), &sig)
        .map_err(|_| CodecError::Recovery)?;
    Ok(public_key.serialize_uncompressed())
}
