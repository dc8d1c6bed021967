// EVM family: static ABI tuple of 32-byte words, keccak256 digest, signed as
// an EIP-191 personal message, signer = last 20 bytes of keccak(pubkey).

use alloy_primitives::{eip191_hash_message, Address};
use std::str::FromStr;

use super::{AllocationFields, ChainType, Codec, CodecError, ResultFields};
use crate::hash::{decode_hex, keccak256};

const WORD: usize = 32;

pub struct EvmCodec;

impl EvmCodec {
    /// keccak256 of the ABI-encoded tuple (the "solidity sha3" of the parameters).
    pub fn params_hash(encoded: &[u8]) -> [u8; 32] {
        keccak256(encoded)
    }

    /// The digest a wallet actually signs for `params_hash`.
    pub fn signing_digest(encoded: &[u8]) -> [u8; 32] {
        eip191_hash_message(Self::params_hash(encoded)).0
    }

    /// `0x` + lowercase hex of the 20-byte address for an uncompressed public key.
    pub fn address_of(uncompressed: &[u8; 65]) -> String {
        let address = Address::from_raw_public_key(&uncompressed[1..]);
        format!("0x{}", hex::encode(address.as_slice()))
    }
}

impl Codec for EvmCodec {
    fn chain(&self) -> ChainType {
        ChainType::Evm
    }

    fn encode_allocation(&self, fields: &AllocationFields<'_>) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(3 * WORD);
        out.extend_from_slice(&string_word("task_id", fields.task_id)?);
        out.extend_from_slice(&string_word("schema_id", fields.schema_id)?);
        out.extend_from_slice(&address_word(fields.validator_address)?);
        Ok(out)
    }

    fn encode_result(&self, fields: &ResultFields<'_>) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(5 * WORD);
        out.extend_from_slice(&string_word("task_id", fields.task_id)?);
        out.extend_from_slice(&string_word("schema_id", fields.schema_id)?);
        out.extend_from_slice(&hex_word("nullifier_hash", fields.nullifier_hash)?);
        out.extend_from_slice(&hex_word("commitment", fields.commitment)?);
        if let Some(recipient) = fields.recipient {
            out.extend_from_slice(&address_word(recipient)?);
        }
        Ok(out)
    }

    fn recover_signer(&self, message: &[u8], signature: &str) -> Result<String, CodecError> {
        let public_key = super::recover_uncompressed(Self::signing_digest(message), signature)?;
        Ok(Self::address_of(&public_key))
    }
}

/// UTF-8 bytes right-padded to a word (`bytes32` of a short string).
fn string_word(field: &'static str, value: &str) -> Result<[u8; WORD], CodecError> {
    let bytes = value.as_bytes();
    if bytes.len() > WORD {
        return Err(CodecError::FieldTooLong {
            field,
            len: bytes.len(),
        });
    }
    let mut word = [0u8; WORD];
    word[..bytes.len()].copy_from_slice(bytes);
    Ok(word)
}

/// Hex value left-padded to a word.
fn hex_word(field: &'static str, value: &str) -> Result<[u8; WORD], CodecError> {
    let bytes = decode_hex(value).map_err(|_| CodecError::InvalidHex(field.to_string()))?;
    if bytes.len() > WORD {
        return Err(CodecError::FieldTooLong {
            field,
            len: bytes.len(),
        });
    }
    let mut word = [0u8; WORD];
    word[WORD - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

fn address_word(address: &str) -> Result<[u8; WORD], CodecError> {
    let parsed = Address::from_str(address.trim()).map_err(|_| CodecError::InvalidAddress(address.to_string()))?;
    Ok(parsed.into_word().0)
}
