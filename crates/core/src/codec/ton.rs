// TON family: payloads are cell trees, the signed message is the root cell
// hash, and signatures are plain Ed25519 over it. There is no signer
// recovery; the expected identity is the signer's raw public key.
//
// allocation root: [ref(task || schema), addr_std(validator), bits256(validator key)]
// result root:     [ref(task || schema), ref(nullifier || commitment), addr(recipient) | addr_none]

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use std::str::FromStr;

use super::cell::{Cell, CellBuilder};
use super::{AllocationFields, ChainType, Codec, CodecError, ResultFields};
use crate::hash::decode_hex;

/// Raw-form account address `<workchain>:<64 hex>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TonAddress {
    pub workchain: i8,
    pub account: [u8; 32],
}

impl FromStr for TonAddress {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::InvalidAddress(s.to_string());
        let (wc, account) = s.trim().split_once(':').ok_or_else(invalid)?;
        let workchain: i8 = wc.parse().map_err(|_| invalid())?;
        let account: [u8; 32] = hex::decode(account)
            .map_err(|_| invalid())?
            .try_into()
            .map_err(|_| invalid())?;
        Ok(TonAddress { workchain, account })
    }
}

impl std::fmt::Display for TonAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.account))
    }
}

pub struct TonCodec;

impl TonCodec {
    pub fn allocation_cell(fields: &AllocationFields<'_>) -> Result<Cell, CodecError> {
        let validator: TonAddress = fields.validator_address.parse()?;
        let validator_key = public_key_bytes(fields.validator_pubkey)?;
        let mut root = CellBuilder::new();
        root.store_ref(ids_cell(fields.task_id, fields.schema_id)?)?;
        store_address(&mut root, Some(&validator))?;
        root.store_bytes(&validator_key)?;
        Ok(root.build())
    }

    pub fn result_cell(fields: &ResultFields<'_>) -> Result<Cell, CodecError> {
        let recipient = fields
            .recipient
            .map(str::parse::<TonAddress>)
            .transpose()?;

        let nullifier = decode_hex(fields.nullifier_hash)
            .map_err(|_| CodecError::InvalidHex("nullifier_hash".to_string()))?;
        let commitment = decode_hex(fields.commitment)
            .map_err(|_| CodecError::InvalidHex("commitment".to_string()))?;
        let mut proof = CellBuilder::new();
        proof.store_bytes(&nullifier)?.store_bytes(&commitment)?;

        let mut root = CellBuilder::new();
        root.store_ref(ids_cell(fields.task_id, fields.schema_id)?)?
            .store_ref(proof.build())?;
        store_address(&mut root, recipient.as_ref())?;
        Ok(root.build())
    }
}

impl Codec for TonCodec {
    fn chain(&self) -> ChainType {
        ChainType::Ton
    }

    fn encode_allocation(&self, fields: &AllocationFields<'_>) -> Result<Vec<u8>, CodecError> {
        Ok(Self::allocation_cell(fields)?.hash().to_vec())
    }

    fn encode_result(&self, fields: &ResultFields<'_>) -> Result<Vec<u8>, CodecError> {
        Ok(Self::result_cell(fields)?.hash().to_vec())
    }

    fn recover_signer(&self, _message: &[u8], _signature: &str) -> Result<String, CodecError> {
        Err(CodecError::RecoveryUnsupported(ChainType::Ton))
    }

    fn verify(&self, message: &[u8], signature: &str, expected: &str) -> bool {
        verify_ed25519(message, signature, expected).unwrap_or(false)
    }
}

fn public_key_bytes(public_key: &str) -> Result<[u8; 32], CodecError> {
    decode_hex(public_key)
        .map_err(|_| CodecError::InvalidPublicKey)?
        .try_into()
        .map_err(|_| CodecError::InvalidPublicKey)
}

fn verify_ed25519(message: &[u8], signature: &str, public_key: &str) -> Result<bool, CodecError> {
    let key_bytes = public_key_bytes(public_key)?;
    let key = VerifyingKey::from_bytes(&key_bytes).map_err(|_| CodecError::InvalidPublicKey)?;

    let sig_bytes = decode_hex(signature).map_err(|_| CodecError::InvalidHex("signature".to_string()))?;
    let sig_bytes: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| CodecError::SignatureLength {
            expected: 64,
            got: sig_bytes.len(),
        })?;
    let sig = Signature::from_bytes(&sig_bytes);
    Ok(key.verify(message, &sig).is_ok())
}

fn ids_cell(task_id: &str, schema_id: &str) -> Result<Cell, CodecError> {
    let mut ids = CellBuilder::new();
    ids.store_bytes(task_id.as_bytes())?
        .store_bytes(schema_id.as_bytes())?;
    Ok(ids.build())
}

/// `addr_std$10 anycast:0 workchain:int8 address:bits256`, or `addr_none$00`.
fn store_address(builder: &mut CellBuilder, address: Option<&TonAddress>) -> Result<(), CodecError> {
    match address {
        None => {
            builder.store_uint(0b00, 2)?;
        }
        Some(addr) => {
            builder
                .store_uint(0b10, 2)?
                .store_bit(false)?
                .store_uint(u64::from(addr.workchain as u8), 8)?
                .store_bytes(&addr.account)?;
        }
    }
    Ok(())
}
