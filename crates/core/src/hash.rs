use sha2::Sha256;
use sha3::{Digest, Keccak256};

#[inline]
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    Keccak256::digest(input).into()
}

/// `0x`-prefixed lowercase hex of keccak256(input).
pub fn keccak256_hex(input: &[u8]) -> String {
    format!("0x{}", hex::encode(keccak256(input)))
}

#[inline]
pub fn sha256(input: &[u8]) -> [u8; 32] {
    Sha256::digest(input).into()
}

/// Decodes hex with or without a `0x` prefix.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits)
}

/// Lowercase hex without prefix, for identity comparisons.
pub fn normalize_hex(input: &str) -> String {
    let trimmed = input.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}
