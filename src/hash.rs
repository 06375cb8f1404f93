//! Hash computation for transfer messages
//!
//! Signature bundles are keyed by the keccak-256 hash of the canonical
//! encoded message, so every component that looks a bundle up goes through
//! [`message_hash`].

use alloy::primitives::B256;
use tiny_keccak::{Hasher, Keccak};

/// Compute keccak256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Hash of an encoded transfer message (the signature bundle key).
pub fn message_hash(message: &[u8]) -> B256 {
    B256::from(keccak256(message))
}

/// Convert bytes to hex string with 0x prefix
pub fn bytes32_to_hex(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}
