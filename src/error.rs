//! Error types for the federated bridge
//!
//! Every rejected call leaves all bridge state exactly as it was before the
//! call. The variants are grouped by [`ErrorKind`] so relayers can tell honest
//! retry noise (duplicates) from protocol violations and replays.

use alloy::primitives::{Address, B256, U256};
use std::fmt;
use thiserror::Error;

/// Errors raised by the value-transfer collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance for {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        account: Address,
        available: U256,
        requested: U256,
    },

    #[error("Insufficient bridge reserves: available {available}, requested {requested}")]
    InsufficientReserves { available: U256, requested: U256 },

    #[error("Balance overflow for {account}")]
    Overflow { account: Address },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================

    #[error("Invalid threshold: {required} required signatures for {authorities} authorities")]
    InvalidThreshold { required: usize, authorities: usize },

    #[error("Duplicate authority in authority set: {authority}")]
    DuplicateAuthority { authority: Address },

    // ========================================================================
    // Authorization Errors
    // ========================================================================

    #[error("Unauthorized: {sender} is not an authority")]
    NotAnAuthority { sender: Address },

    #[error("Recovered signer {signer} is not an authority")]
    SignerNotAuthority { signer: Address },

    #[error("Signature was produced by {recovered}, not by claimed authority {claimed}")]
    SignerMismatch { claimed: Address, recovered: Address },

    #[error("Invalid signature: {reason}")]
    InvalidSignature { reason: String },

    // ========================================================================
    // Duplication Errors
    // ========================================================================

    #[error("Authority {authority} already confirmed this deposit")]
    DuplicateConfirmation { authority: Address },

    #[error("Authority {signer} already signed this message")]
    DuplicateSignature { signer: Address },

    // ========================================================================
    // Integrity Errors
    // ========================================================================

    #[error("Message too short: expected {expected} bytes, got {got}")]
    MessageTooShort { got: usize, expected: usize },

    #[error("Message too long: expected {expected} bytes, got {got}")]
    MessageTooLong { got: usize, expected: usize },

    #[error("Stored message for {message_hash} differs from submitted message")]
    MessageMismatch { message_hash: B256 },

    // ========================================================================
    // Replay Errors
    // ========================================================================

    #[error("Deposit {transaction_hash} already released")]
    AlreadyReleased { transaction_hash: B256 },

    #[error("Withdrawal {transaction_hash} already executed")]
    AlreadyExecuted { transaction_hash: B256 },

    #[error("Signatures for {message_hash} already collected")]
    AlreadyCollected { message_hash: B256 },

    #[error("Transaction {transaction_hash} already requested a transfer")]
    DuplicateTransaction { transaction_hash: B256 },

    // ========================================================================
    // Insufficiency Errors
    // ========================================================================

    #[error("Insufficient signatures: got {got}, need {required}")]
    InsufficientSignatures { got: usize, required: usize },

    #[error("No signature at index {index} for {message_hash}")]
    SignatureNotFound { message_hash: B256, index: usize },

    // ========================================================================
    // Value Errors
    // ========================================================================

    #[error("Transfer value must be greater than zero")]
    ZeroValue,

    #[error("Value {value} does not cover relay fee {fee}")]
    InsufficientValueForRelayFee { value: U256, fee: U256 },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Error taxonomy used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Authorization,
    Duplication,
    Integrity,
    Replay,
    Insufficiency,
    Value,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Duplication => "duplication",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Replay => "replay",
            ErrorKind::Insufficiency => "insufficiency",
            ErrorKind::Value => "value",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::InvalidThreshold { .. } | BridgeError::DuplicateAuthority { .. } => {
                ErrorKind::Configuration
            }
            BridgeError::NotAnAuthority { .. }
            | BridgeError::SignerNotAuthority { .. }
            | BridgeError::SignerMismatch { .. }
            | BridgeError::InvalidSignature { .. } => ErrorKind::Authorization,
            BridgeError::DuplicateConfirmation { .. } | BridgeError::DuplicateSignature { .. } => {
                ErrorKind::Duplication
            }
            BridgeError::MessageTooShort { .. }
            | BridgeError::MessageTooLong { .. }
            | BridgeError::MessageMismatch { .. } => ErrorKind::Integrity,
            BridgeError::AlreadyReleased { .. }
            | BridgeError::AlreadyExecuted { .. }
            | BridgeError::AlreadyCollected { .. }
            | BridgeError::DuplicateTransaction { .. } => ErrorKind::Replay,
            BridgeError::InsufficientSignatures { .. } | BridgeError::SignatureNotFound { .. } => {
                ErrorKind::Insufficiency
            }
            BridgeError::ZeroValue
            | BridgeError::InsufficientValueForRelayFee { .. }
            | BridgeError::Ledger(_) => ErrorKind::Value,
        }
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
