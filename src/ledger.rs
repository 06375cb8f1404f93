//! Value-transfer collaborator
//!
//! The bridge does not own an account model. Each side talks to its ledger
//! through [`ValueTransfer`]: user funds are locked into the bridge reserves
//! when a transfer leaves the ledger, and released from the reserves when an
//! authority-approved transfer arrives.
//!
//! Releases are two-phase. Callers run [`ValueTransfer::check_release`] before
//! they reserve the transfer identity, so a release that cannot be paid never
//! leaves a spent marker behind.

use alloy::primitives::{Address, U256};
use std::collections::HashMap;
use tracing::debug;

use crate::error::LedgerError;

pub trait ValueTransfer: Send {
    /// Balance held by `account`.
    fn balance_of(&self, account: &Address) -> U256;

    /// Value currently held by the bridge and available for release.
    fn reserves(&self) -> U256;

    /// Move `value` from `owner` into the bridge reserves.
    fn lock(&mut self, owner: &Address, value: U256) -> Result<(), LedgerError>;

    /// Check, without side effects, that the listed payouts can be released.
    fn check_release(&self, payouts: &[(Address, U256)]) -> Result<(), LedgerError>;

    /// Pay the listed payouts out of the bridge reserves.
    ///
    /// Must succeed whenever `check_release` succeeded for the same payouts
    /// and no other mutation happened in between.
    fn release(&mut self, payouts: &[(Address, U256)]) -> Result<(), LedgerError>;
}

/// In-memory ledger with a single bridge reserve.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: HashMap<Address, U256>,
    reserves: U256,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger whose bridge starts out holding `reserves`.
    pub fn with_reserves(reserves: U256) -> Self {
        Self {
            balances: HashMap::new(),
            reserves,
        }
    }

    /// Credit `account` directly, outside of the bridge.
    pub fn fund(&mut self, account: Address, value: U256) -> Result<(), LedgerError> {
        let balance = self.balances.entry(account).or_default();
        *balance = balance
            .checked_add(value)
            .ok_or(LedgerError::Overflow { account })?;
        Ok(())
    }

    fn total_payout(payouts: &[(Address, U256)]) -> Result<U256, LedgerError> {
        payouts.iter().try_fold(U256::ZERO, |total, (account, value)| {
            total
                .checked_add(*value)
                .ok_or(LedgerError::Overflow { account: *account })
        })
    }
}

impl ValueTransfer for InMemoryLedger {
    fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn reserves(&self) -> U256 {
        self.reserves
    }

    fn lock(&mut self, owner: &Address, value: U256) -> Result<(), LedgerError> {
        let available = self.balance_of(owner);
        if available < value {
            return Err(LedgerError::InsufficientBalance {
                account: *owner,
                available,
                requested: value,
            });
        }
        let reserves = self
            .reserves
            .checked_add(value)
            .ok_or(LedgerError::Overflow { account: *owner })?;

        self.balances.insert(*owner, available - value);
        self.reserves = reserves;
        debug!(account = %owner, value = %value, "Locked value into bridge reserves");
        Ok(())
    }

    fn check_release(&self, payouts: &[(Address, U256)]) -> Result<(), LedgerError> {
        let total = Self::total_payout(payouts)?;
        if total > self.reserves {
            return Err(LedgerError::InsufficientReserves {
                available: self.reserves,
                requested: total,
            });
        }
        // Payouts to the same account are credited together.
        let mut credits: HashMap<Address, U256> = HashMap::with_capacity(payouts.len());
        for (account, value) in payouts {
            let credit = credits.entry(*account).or_default();
            *credit = credit
                .checked_add(*value)
                .ok_or(LedgerError::Overflow { account: *account })?;
        }
        for (account, credit) in &credits {
            if self.balance_of(account).checked_add(*credit).is_none() {
                return Err(LedgerError::Overflow { account: *account });
            }
        }
        Ok(())
    }

    fn release(&mut self, payouts: &[(Address, U256)]) -> Result<(), LedgerError> {
        self.check_release(payouts)?;
        for (account, value) in payouts {
            self.reserves -= *value;
            let balance = self.balances.entry(*account).or_default();
            *balance += *value;
            debug!(account = %account, value = %value, "Released value from bridge reserves");
        }
        Ok(())
    }
}
