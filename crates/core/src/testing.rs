// Deterministic signers for fixtures. Compiled for tests and the `test-utils` feature only.

use ed25519_dalek::{Signer as _, SigningKey};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

use crate::codec::{AllocationFields, ChainType, EvmCodec, ResultFields, SolanaCodec};
use crate::hash::keccak256;

/// A 32-byte secret key whose last byte is `n` (n must be non-zero).
pub fn secret(n: u8) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[31] = n;
    key
}

fn sign_recoverable(secret_key: &SecretKey, digest: [u8; 32]) -> String {
    let secp = Secp256k1::signing_only();
    let sig = secp.sign_ecdsa_recoverable(&Message::from_digest(digest), secret_key);
    let (recovery_id, compact) = sig.serialize_compact();
    let mut out = compact.to_vec();
    out.push(27 + recovery_id.to_i32() as u8);
    format!("0x{}", hex::encode(out))
}

fn uncompressed(secret_key: &SecretKey) -> [u8; 65] {
    let secp = Secp256k1::signing_only();
    PublicKey::from_secret_key(&secp, secret_key).serialize_uncompressed()
}

pub struct EvmSigner {
    key: SecretKey,
}

impl EvmSigner {
    pub fn new(secret: [u8; 32]) -> Self {
        Self {
            key: SecretKey::from_slice(&secret).expect("valid secp256k1 secret"),
        }
    }

    pub fn address(&self) -> String {
        EvmCodec::address_of(&uncompressed(&self.key))
    }

    /// Signs EVM-encoded bytes the way a wallet signs a 32-byte personal message.
    pub fn sign(&self, encoded: &[u8]) -> String {
        sign_recoverable(&self.key, EvmCodec::signing_digest(encoded))
    }
}

pub struct SolanaSigner {
    key: SecretKey,
}

impl SolanaSigner {
    pub fn new(secret: [u8; 32]) -> Self {
        Self {
            key: SecretKey::from_slice(&secret).expect("valid secp256k1 secret"),
        }
    }

    pub fn identity(&self) -> String {
        SolanaCodec::identity_of(&uncompressed(&self.key))
    }

    pub fn sign(&self, encoded: &[u8]) -> String {
        sign_recoverable(&self.key, keccak256(encoded))
    }
}

pub struct TonSigner {
    key: SigningKey,
}

impl TonSigner {
    pub fn new(secret: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&secret),
        }
    }

    pub fn public_key(&self) -> String {
        hex::encode(self.key.verifying_key().as_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode(self.key.sign(message).to_bytes())
    }
}

/// One signer per chain family behind a common face, for chain-generic fixtures.
pub enum ChainSigner {
    Evm(EvmSigner),
    Solana(SolanaSigner),
    Ton(TonSigner),
}

impl ChainSigner {
    pub fn new(chain: ChainType, seed: u8) -> Self {
        match chain {
            ChainType::Evm => ChainSigner::Evm(EvmSigner::new(secret(seed))),
            ChainType::Solana => ChainSigner::Solana(SolanaSigner::new(secret(seed))),
            ChainType::Ton => ChainSigner::Ton(TonSigner::new([seed; 32])),
        }
    }

    pub fn chain(&self) -> ChainType {
        match self {
            ChainSigner::Evm(_) => ChainType::Evm,
            ChainSigner::Solana(_) => ChainType::Solana,
            ChainSigner::Ton(_) => ChainType::Ton,
        }
    }

    /// Identity a verifier compares against: address, key hash, or raw public key.
    pub fn identity(&self) -> String {
        match self {
            ChainSigner::Evm(s) => s.address(),
            ChainSigner::Solana(s) => s.identity(),
            ChainSigner::Ton(s) => s.public_key(),
        }
    }

    pub fn sign(&self, encoded: &[u8]) -> String {
        match self {
            ChainSigner::Evm(s) => s.sign(encoded),
            ChainSigner::Solana(s) => s.sign(encoded),
            ChainSigner::Ton(s) => s.sign(encoded),
        }
    }

    pub fn sign_allocation(&self, fields: &AllocationFields<'_>) -> String {
        let encoded = self
            .chain()
            .codec()
            .encode_allocation(fields)
            .expect("encodable allocation");
        self.sign(&encoded)
    }

    pub fn sign_result(&self, fields: &ResultFields<'_>) -> String {
        let encoded = self
            .chain()
            .codec()
            .encode_result(fields)
            .expect("encodable result");
        self.sign(&encoded)
    }
}

/// A validator address that the given chain's encoder accepts.
pub fn validator_address(chain: ChainType, signer: &ChainSigner) -> String {
    match chain {
        ChainType::Evm | ChainType::Solana => signer.identity(),
        ChainType::Ton => format!("0:{}", hex::encode(keccak256(signer.identity().as_bytes()))),
    }
}
