//! Replay guard
//!
//! Write-once record of every transfer identity that has been released.
//! Home-origin deposits and foreign-origin withdrawals live in separate
//! namespaces, so the same transaction hash on both ledgers never collides.
//! Entries are never removed.

use alloy::primitives::B256;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::hash::bytes32_to_hex;

/// Ledger on which a transfer originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Origin {
    Home,
    Foreign,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Home => "home",
            Origin::Foreign => "foreign",
        }
    }
}

/// Identity of one origin-ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReplayKey {
    pub origin: Origin,
    pub transaction_hash: B256,
}

impl ReplayKey {
    /// Deposit made on the home ledger, released on the foreign ledger.
    pub fn home_deposit(transaction_hash: B256) -> Self {
        Self {
            origin: Origin::Home,
            transaction_hash,
        }
    }

    /// Withdrawal requested on the foreign ledger, executed on the home ledger.
    pub fn foreign_withdraw(transaction_hash: B256) -> Self {
        Self {
            origin: Origin::Foreign,
            transaction_hash,
        }
    }
}

impl fmt::Display for ReplayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.origin.as_str(),
            bytes32_to_hex(&self.transaction_hash.0)
        )
    }
}

/// Shared idempotency store for both release paths.
#[derive(Debug, Default)]
pub struct ReplayGuard {
    spent: Mutex<HashSet<ReplayKey>>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check and mark `key` as spent.
    ///
    /// Returns `true` only for the first caller presenting `key`.
    pub fn try_reserve(&self, key: ReplayKey) -> bool {
        self.spent().insert(key)
    }

    pub fn is_spent(&self, key: &ReplayKey) -> bool {
        self.spent().contains(key)
    }

    pub fn len(&self) -> usize {
        self.spent().len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent().is_empty()
    }

    // The set is only ever extended by a single insert, so a poisoned lock
    // still holds a consistent value.
    fn spent(&self) -> MutexGuard<'_, HashSet<ReplayKey>> {
        self.spent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
