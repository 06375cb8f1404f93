//! Canonical transfer message codec
//!
//! A transfer instruction is encoded as a fixed-width concatenation, with no
//! length prefixes or delimiters:
//!
//! ```text
//! recipient (20) | value (32, big-endian) | transactionHash (32) | gasPrice (32, big-endian)
//! ```
//!
//! Authorities sign exactly these 116 bytes. Anything shorter is rejected
//! before a single field is read.

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::hash::message_hash;

/// Length of an encoded transfer message in bytes.
pub const MESSAGE_LENGTH: usize = 116;

const RECIPIENT_END: usize = 20;
const VALUE_END: usize = RECIPIENT_END + 32;
const HASH_END: usize = VALUE_END + 32;

/// One cross-ledger value movement.
///
/// `transaction_hash` is the hash of the origin-ledger transaction that
/// produced the transfer and anchors its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferInstruction {
    pub recipient: Address,
    pub value: U256,
    pub transaction_hash: B256,
    pub gas_price: U256,
}

impl TransferInstruction {
    pub fn new(recipient: Address, value: U256, transaction_hash: B256, gas_price: U256) -> Self {
        Self {
            recipient,
            value,
            transaction_hash,
            gas_price,
        }
    }

    /// Encode into the canonical message authorities sign.
    pub fn encode(&self) -> [u8; MESSAGE_LENGTH] {
        let mut data = [0u8; MESSAGE_LENGTH];
        data[..RECIPIENT_END].copy_from_slice(self.recipient.as_slice());
        data[RECIPIENT_END..VALUE_END].copy_from_slice(&self.value.to_be_bytes::<32>());
        data[VALUE_END..HASH_END].copy_from_slice(self.transaction_hash.as_slice());
        data[HASH_END..].copy_from_slice(&self.gas_price.to_be_bytes::<32>());
        data
    }

    /// Decode a canonical message.
    pub fn decode(message: &[u8]) -> Result<Self> {
        ensure_message_length(message)?;

        Ok(Self {
            recipient: Address::from_slice(&message[..RECIPIENT_END]),
            value: U256::from_be_slice(&message[RECIPIENT_END..VALUE_END]),
            transaction_hash: B256::from_slice(&message[VALUE_END..HASH_END]),
            gas_price: U256::from_be_slice(&message[HASH_END..MESSAGE_LENGTH]),
        })
    }

    /// Hash of the encoded message.
    pub fn message_hash(&self) -> B256 {
        message_hash(&self.encode())
    }
}

/// Reject any message that is not exactly [`MESSAGE_LENGTH`] bytes.
///
/// Trailing bytes are refused as well: they would let two different byte
/// strings (and so two signature bundles) decode to the same transfer.
pub fn ensure_message_length(message: &[u8]) -> Result<()> {
    if message.len() < MESSAGE_LENGTH {
        return Err(BridgeError::MessageTooShort {
            got: message.len(),
            expected: MESSAGE_LENGTH,
        });
    }
    if message.len() > MESSAGE_LENGTH {
        return Err(BridgeError::MessageTooLong {
            got: message.len(),
            expected: MESSAGE_LENGTH,
        });
    }
    Ok(())
}
