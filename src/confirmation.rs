//! Home→foreign deposit confirmations
//!
//! Authorities watch the home ledger for `DepositRequested` events and confirm
//! each deposit on the foreign side. Confirmations are tallied per
//! `(recipient, value, transaction_hash)` tuple, one vote per authority. The
//! call that brings a tuple to the threshold performs the release; the tuple
//! is then `Released` for good.
//!
//! ```text
//! Unconfirmed ──confirm──▶ Confirming(k of T) ──k == T──▶ Released
//! ```
//!
//! An authority that confirms a wrong value only creates a separate tuple, so
//! it cannot push the honest tuple over the threshold on its own. Release is
//! also guarded per transaction hash: once any tuple for a home transaction
//! has been released, no other tuple for that transaction can be.

use alloy::primitives::{Address, B256, U256};
use serde::Serialize;
use std::collections::HashMap;

use crate::authority::{AuthorityRegistry, SignerSet};
use crate::error::{BridgeError, Result};
use crate::ledger::ValueTransfer;
use crate::replay::{ReplayGuard, ReplayKey};

/// Confirmation record key: the full deposit tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DepositKey {
    pub recipient: Address,
    pub value: U256,
    pub transaction_hash: B256,
}

impl DepositKey {
    pub fn new(recipient: Address, value: U256, transaction_hash: B256) -> Self {
        Self {
            recipient,
            value,
            transaction_hash,
        }
    }
}

#[derive(Debug, Clone)]
enum ConfirmationState {
    Confirming(SignerSet),
    Released(SignerSet),
}

impl ConfirmationState {
    fn confirmers(&self) -> &SignerSet {
        match self {
            ConfirmationState::Confirming(confirmers) | ConfirmationState::Released(confirmers) => {
                confirmers
            }
        }
    }
}

/// Result of an accepted confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Recorded; the deposit still needs more confirmations.
    Pending { confirmations: usize, required: usize },
    /// This confirmation reached the threshold and the deposit was released.
    Released { confirmations: usize },
}

#[derive(Debug, Default)]
pub struct DepositConfirmations {
    records: HashMap<DepositKey, ConfirmationState>,
}

impl DepositConfirmations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `authority`'s confirmation of `key`.
    ///
    /// Nothing is recorded unless every check passes. On the threshold-crossing
    /// call the transfer identity is reserved in `replay` and the value is
    /// released to the recipient through `ledger`.
    pub fn confirm<L: ValueTransfer + ?Sized>(
        &mut self,
        registry: &AuthorityRegistry,
        replay: &ReplayGuard,
        ledger: &mut L,
        key: DepositKey,
        authority: Address,
    ) -> Result<ConfirmOutcome> {
        let index = registry
            .position(&authority)
            .ok_or(BridgeError::NotAnAuthority { sender: authority })?;

        let mut confirmers = match self.records.get(&key) {
            Some(state) if state.confirmers().contains(index) => {
                return Err(BridgeError::DuplicateConfirmation { authority });
            }
            Some(ConfirmationState::Released(_)) => {
                return Err(BridgeError::AlreadyReleased {
                    transaction_hash: key.transaction_hash,
                });
            }
            Some(ConfirmationState::Confirming(confirmers)) => confirmers.clone(),
            None => registry.signer_set(),
        };
        confirmers.insert(index);

        let required = registry.required_signatures();
        let confirmations = confirmers.len();
        if confirmations < required {
            self.records
                .insert(key, ConfirmationState::Confirming(confirmers));
            return Ok(ConfirmOutcome::Pending {
                confirmations,
                required,
            });
        }

        let replay_key = ReplayKey::home_deposit(key.transaction_hash);
        let payout = [(key.recipient, key.value)];
        if replay.is_spent(&replay_key) {
            return Err(BridgeError::AlreadyReleased {
                transaction_hash: key.transaction_hash,
            });
        }
        ledger.check_release(&payout)?;
        if !replay.try_reserve(replay_key) {
            return Err(BridgeError::AlreadyReleased {
                transaction_hash: key.transaction_hash,
            });
        }
        ledger.release(&payout)?;

        self.records
            .insert(key, ConfirmationState::Released(confirmers));
        Ok(ConfirmOutcome::Released { confirmations })
    }

    pub fn has_confirmed(
        &self,
        registry: &AuthorityRegistry,
        authority: &Address,
        key: &DepositKey,
    ) -> bool {
        match (registry.position(authority), self.records.get(key)) {
            (Some(index), Some(state)) => state.confirmers().contains(index),
            _ => false,
        }
    }

    /// Number of distinct authorities that confirmed `key`.
    pub fn confirmations(&self, key: &DepositKey) -> usize {
        self.records
            .get(key)
            .map(|state| state.confirmers().len())
            .unwrap_or(0)
    }

    pub fn is_released(&self, key: &DepositKey) -> bool {
        matches!(self.records.get(key), Some(ConfirmationState::Released(_)))
    }

    /// Authorities that confirmed `key`, in confirmation order.
    pub fn confirmers(&self, registry: &AuthorityRegistry, key: &DepositKey) -> Vec<Address> {
        self.records
            .get(key)
            .map(|state| state.confirmers().addresses(registry))
            .unwrap_or_default()
    }
}
