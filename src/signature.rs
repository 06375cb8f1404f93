//! Authority signatures over transfer messages
//!
//! Authorities sign the encoded message with the Ethereum personal-message
//! scheme (EIP-191 prefix + keccak-256), producing a 65-byte `r || s || v`
//! signature. The bridge never trusts the submitting account: the signer is
//! always recovered from the signature itself.

use alloy::primitives::{Address, PrimitiveSignature};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BridgeError, Result};

/// Length of a serialized `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Raw 65-byte authority signature, stored exactly as submitted.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthoritySignature([u8; SIGNATURE_LENGTH]);

impl AuthoritySignature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        AuthoritySignature(bytes)
    }

    /// Create from a slice, which must be exactly 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; SIGNATURE_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| BridgeError::InvalidSignature {
                    reason: format!("expected {} bytes, got {}", SIGNATURE_LENGTH, bytes.len()),
                })?;
        Ok(AuthoritySignature(raw))
    }

    /// Create from hex string (with or without 0x prefix)
    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex).map_err(|e| BridgeError::InvalidSignature {
            reason: e.to_string(),
        })?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    /// Convert to hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Recover the address that produced this signature over `message`.
    pub fn recover_signer(&self, message: &[u8]) -> Result<Address> {
        let signature = PrimitiveSignature::try_from(&self.0[..]).map_err(|e| {
            BridgeError::InvalidSignature {
                reason: e.to_string(),
            }
        })?;

        signature
            .recover_address_from_msg(message)
            .map_err(|e| BridgeError::InvalidSignature {
                reason: e.to_string(),
            })
    }
}

impl From<PrimitiveSignature> for AuthoritySignature {
    fn from(signature: PrimitiveSignature) -> Self {
        AuthoritySignature(signature.as_bytes())
    }
}

impl fmt::Debug for AuthoritySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthoritySignature({})", self.to_hex())
    }
}

impl fmt::Display for AuthoritySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for AuthoritySignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AuthoritySignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        AuthoritySignature::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}
