// Solana family: borsh-serialized structs, keccak256 digest, secp256k1
// recovery; the identity is keccak256 of the 64-byte public key (no 0x04).

use borsh::BorshSerialize;

use super::{AllocationFields, ChainType, Codec, CodecError, ResultFields};
use crate::hash::keccak256;

#[derive(BorshSerialize)]
struct TaskAllocation {
    task: String,
    schema: String,
    notary: String,
}

#[derive(BorshSerialize)]
struct Attestation {
    task: String,
    schema: String,
    nullifier: String,
    recipient: String,
    public_fields_hash: String,
}

pub struct SolanaCodec;

impl SolanaCodec {
    /// 32-byte identity for an uncompressed public key, as `0x` hex.
    pub fn identity_of(uncompressed: &[u8; 65]) -> String {
        format!("0x{}", hex::encode(keccak256(&uncompressed[1..])))
    }
}

impl Codec for SolanaCodec {
    fn chain(&self) -> ChainType {
        ChainType::Solana
    }

    fn encode_allocation(&self, fields: &AllocationFields<'_>) -> Result<Vec<u8>, CodecError> {
        let value = TaskAllocation {
            task: fields.task_id.to_string(),
            schema: fields.schema_id.to_string(),
            notary: fields.validator_address.to_string(),
        };
        borsh::to_vec(&value).map_err(|e| CodecError::Serialize(e.to_string()))
    }

    fn encode_result(&self, fields: &ResultFields<'_>) -> Result<Vec<u8>, CodecError> {
        let value = Attestation {
            task: fields.task_id.to_string(),
            schema: fields.schema_id.to_string(),
            nullifier: fields.nullifier_hash.to_string(),
            recipient: fields.recipient.unwrap_or_default().to_string(),
            public_fields_hash: fields.commitment.to_string(),
        };
        borsh::to_vec(&value).map_err(|e| CodecError::Serialize(e.to_string()))
    }

    fn recover_signer(&self, message: &[u8], signature: &str) -> Result<String, CodecError> {
        let public_key = super::recover_uncompressed(keccak256(message), signature)?;
        Ok(Self::identity_of(&public_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{secret, SolanaSigner};

    fn allocation(validator: &str) -> AllocationFields<'_> {
        AllocationFields {
            task_id: "task-1",
            schema_id: "schema-9",
            validator_address: validator,
            validator_pubkey: "",
        }
    }

    #[test]
    fn strings_are_length_prefixed_in_field_order() {
        let encoded = SolanaCodec.encode_allocation(&allocation("ab")).unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&6u32.to_le_bytes());
        expected.extend_from_slice(b"task-1");
        expected.extend_from_slice(&8u32.to_le_bytes());
        expected.extend_from_slice(b"schema-9");
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(b"ab");
        assert_eq!(encoded, expected);
    }

    #[test]
    fn missing_recipient_encodes_as_empty_string() {
        let fields = ResultFields {
            task_id: "t",
            schema_id: "s",
            nullifier_hash: "n",
            commitment: "c",
            recipient: None,
        };
        let encoded = SolanaCodec.encode_result(&fields).unwrap();
        // t, s, n, "", c each carry a 4-byte length prefix.
        assert_eq!(encoded.len(), 5 * 4 + 4);
        assert_eq!(&encoded[15..19], &0u32.to_le_bytes());
        let with = SolanaCodec
            .encode_result(&ResultFields {
                recipient: Some("r"),
                ..fields
            })
            .unwrap();
        assert_ne!(encoded, with);
    }

    #[test]
    fn signed_allocation_recovers_32_byte_identity() {
        let signer = SolanaSigner::new(secret(11));
        let identity = signer.identity();
        assert_eq!(identity.len(), 2 + 64);

        let encoded = SolanaCodec.encode_allocation(&allocation(&identity)).unwrap();
        let signature = signer.sign(&encoded);
        assert_eq!(SolanaCodec.recover_signer(&encoded, &signature).unwrap(), identity);
        assert!(SolanaCodec.verify(&encoded, &signature, &identity));
        assert!(SolanaCodec.verify(&encoded, &signature, identity.trim_start_matches("0x")));
    }

    #[test]
    fn other_key_does_not_verify() {
        let signer = SolanaSigner::new(secret(11));
        let other = SolanaSigner::new(secret(12));
        let encoded = SolanaCodec.encode_allocation(&allocation("v")).unwrap();
        let signature = signer.sign(&encoded);
        assert!(!SolanaCodec.verify(&encoded, &signature, &other.identity()));
    }

    #[test]
    fn evm_signature_scheme_does_not_cross_verify() {
        let signer = SolanaSigner::new(secret(4));
        let encoded = SolanaCodec.encode_allocation(&allocation("v")).unwrap();
        let signature = signer.sign(&encoded);
        // Same key, but the EVM codec hashes differently and derives a 20-byte address.
        assert!(!super::super::EvmCodec.verify(&encoded, &signature, &signer.identity()));
    }
}
