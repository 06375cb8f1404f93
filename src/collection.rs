//! Foreign→home signature collection
//!
//! Authorities sign the encoded message of every withdrawal requested on the
//! foreign ledger and submit the signature to the foreign bridge. Signatures
//! are collected per message hash until `T` distinct authorities have signed;
//! the bundle is then `Collected` and can be relayed to the home ledger.
//!
//! ```text
//! Empty ──submit──▶ Collecting(k of T) ──k == T──▶ Collected
//! ```
//!
//! The first submission stores the message bytes for its hash; every later
//! submission must carry byte-identical bytes.

use alloy::primitives::{Address, Bytes, B256};
use serde::Serialize;
use std::collections::HashMap;

use crate::authority::{AuthorityRegistry, SignerSet};
use crate::error::{BridgeError, Result};
use crate::hash::message_hash;
use crate::message::{ensure_message_length, TransferInstruction};
use crate::signature::AuthoritySignature;

/// A completed signature bundle, ready to be relayed to the home ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayBundle {
    pub message_hash: B256,
    pub message: Bytes,
    /// Signers in submission order, parallel to `signatures`.
    pub signers: Vec<Address>,
    pub signatures: Vec<AuthoritySignature>,
    /// Account whose submission completed the bundle.
    pub relayer: Address,
}

#[derive(Debug, Clone)]
struct PendingBundle {
    message: Bytes,
    signers: SignerSet,
    signatures: Vec<AuthoritySignature>,
}

#[derive(Debug, Clone)]
enum BundleState {
    Collecting(PendingBundle),
    Collected(RelayBundle),
}

impl BundleState {
    fn message(&self) -> &Bytes {
        match self {
            BundleState::Collecting(pending) => &pending.message,
            BundleState::Collected(bundle) => &bundle.message,
        }
    }

    fn signatures(&self) -> &[AuthoritySignature] {
        match self {
            BundleState::Collecting(pending) => &pending.signatures,
            BundleState::Collected(bundle) => &bundle.signatures,
        }
    }

    fn has_signer(&self, index: usize, signer: &Address) -> bool {
        match self {
            BundleState::Collecting(pending) => pending.signers.contains(index),
            BundleState::Collected(bundle) => bundle.signers.contains(signer),
        }
    }
}

/// Result of an accepted signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Recorded; the message still needs more signatures.
    Pending {
        message_hash: B256,
        signatures: usize,
        required: usize,
    },
    /// This signature completed the bundle.
    Collected(RelayBundle),
}

#[derive(Debug, Default)]
pub struct SignatureCollector {
    bundles: HashMap<B256, BundleState>,
}

impl SignatureCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `signature` over `message` from `claimed_authority`.
    ///
    /// The signer is recovered from the signature; it must be a registered
    /// authority and equal `claimed_authority`. `relayer` is the account that
    /// delivered the submission and is recorded on the completed bundle.
    pub fn submit(
        &mut self,
        registry: &AuthorityRegistry,
        signature: AuthoritySignature,
        message: &[u8],
        claimed_authority: Address,
        relayer: Address,
    ) -> Result<SubmitOutcome> {
        TransferInstruction::decode(message)?;

        let signer = signature.recover_signer(message)?;
        let index = registry
            .position(&signer)
            .ok_or(BridgeError::SignerNotAuthority { signer })?;
        if signer != claimed_authority {
            return Err(BridgeError::SignerMismatch {
                claimed: claimed_authority,
                recovered: signer,
            });
        }

        let hash = message_hash(message);
        let mut pending = match self.bundles.get(&hash) {
            Some(state) if state.message().as_ref() != message => {
                return Err(BridgeError::MessageMismatch { message_hash: hash });
            }
            Some(state) if state.has_signer(index, &signer) => {
                return Err(BridgeError::DuplicateSignature { signer });
            }
            Some(BundleState::Collected(_)) => {
                return Err(BridgeError::AlreadyCollected { message_hash: hash });
            }
            Some(BundleState::Collecting(pending)) => pending.clone(),
            None => PendingBundle {
                message: Bytes::copy_from_slice(message),
                signers: registry.signer_set(),
                signatures: Vec::new(),
            },
        };
        pending.signers.insert(index);
        pending.signatures.push(signature);

        let required = registry.required_signatures();
        let signatures = pending.signatures.len();
        if signatures < required {
            self.bundles.insert(hash, BundleState::Collecting(pending));
            return Ok(SubmitOutcome::Pending {
                message_hash: hash,
                signatures,
                required,
            });
        }

        let bundle = RelayBundle {
            message_hash: hash,
            message: pending.message,
            signers: pending.signers.addresses(registry),
            signatures: pending.signatures,
            relayer,
        };
        self.bundles
            .insert(hash, BundleState::Collected(bundle.clone()));
        Ok(SubmitOutcome::Collected(bundle))
    }

    /// Whether `authority` has a signature recorded for `message`.
    ///
    /// Fails on a truncated message before any lookup is made.
    pub fn has_signed(
        &self,
        registry: &AuthorityRegistry,
        authority: &Address,
        message: &[u8],
    ) -> Result<bool> {
        ensure_message_length(message)?;

        let Some(index) = registry.position(authority) else {
            return Ok(false);
        };
        Ok(self
            .bundles
            .get(&message_hash(message))
            .is_some_and(|state| {
                state.message().as_ref() == message && state.has_signer(index, authority)
            }))
    }

    /// Signature at `index` (submission order) for `message_hash`.
    pub fn signature_at(&self, message_hash: &B256, index: usize) -> Result<AuthoritySignature> {
        self.bundles
            .get(message_hash)
            .and_then(|state| state.signatures().get(index).copied())
            .ok_or(BridgeError::SignatureNotFound {
                message_hash: *message_hash,
                index,
            })
    }

    /// Message stored for `message_hash`.
    pub fn message(&self, message_hash: &B256) -> Option<Bytes> {
        self.bundles
            .get(message_hash)
            .map(|state| state.message().clone())
    }

    /// Completed bundle for `message_hash`, if collection has finished.
    pub fn collected(&self, message_hash: &B256) -> Option<RelayBundle> {
        match self.bundles.get(message_hash) {
            Some(BundleState::Collected(bundle)) => Some(bundle.clone()),
            _ => None,
        }
    }

    /// Number of signatures recorded for `message_hash`.
    pub fn signature_count(&self, message_hash: &B256) -> usize {
        self.bundles
            .get(message_hash)
            .map(|state| state.signatures().len())
            .unwrap_or(0)
    }
}
