//! Home bridge
//!
//! Locks value for transfer to the foreign ledger and executes withdrawals
//! that carry at least `T` authority signatures.

use alloy::primitives::{Address, B256, U256};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::authority::AuthorityRegistry;
use crate::collection::RelayBundle;
use crate::error::{BridgeError, Result};
use crate::events::{BridgeEvent, EventSink};
use crate::ledger::ValueTransfer;
use crate::metrics;
use crate::relay::{verify_signatures, RelayGate, Withdrawal};
use crate::replay::{ReplayGuard, ReplayKey};
use crate::signature::AuthoritySignature;

pub struct HomeBridge<L, S> {
    registry: Arc<AuthorityRegistry>,
    replay: Arc<ReplayGuard>,
    gate: RelayGate,
    /// Home transactions that already locked value for the foreign ledger.
    requests: ReplayGuard,
    ledger: Mutex<L>,
    sink: S,
}

impl<L: ValueTransfer, S: EventSink> HomeBridge<L, S> {
    pub fn new(
        registry: Arc<AuthorityRegistry>,
        replay: Arc<ReplayGuard>,
        ledger: L,
        sink: S,
    ) -> Self {
        Self {
            registry,
            replay,
            gate: RelayGate::default(),
            requests: ReplayGuard::new(),
            ledger: Mutex::new(ledger),
            sink,
        }
    }

    /// Reimburse relayers `gas_price * estimated_gas_cost_of_withdraw` per withdrawal.
    pub fn with_estimated_gas_cost_of_withdraw(
        mut self,
        estimated_gas_cost_of_withdraw: u64,
    ) -> Self {
        self.gate = RelayGate::new(estimated_gas_cost_of_withdraw);
        self
    }

    pub fn registry(&self) -> &AuthorityRegistry {
        &self.registry
    }

    pub fn estimated_gas_cost_of_withdraw(&self) -> u64 {
        self.gate.estimated_gas_cost_of_withdraw()
    }

    /// Lock `value` from `depositor` for release on the foreign ledger.
    ///
    /// Each `transaction_hash` can lock value once; the foreign ledger releases
    /// at most one deposit per home transaction.
    pub fn deposit(&self, depositor: Address, value: U256, transaction_hash: B256) -> Result<()> {
        let result = self.try_deposit(depositor, value, transaction_hash);
        match &result {
            Ok(()) => {
                info!(
                    depositor = %depositor,
                    value = %value,
                    tx_hash = %transaction_hash,
                    "Deposit requested"
                );
                self.sink.publish(BridgeEvent::DepositRequested {
                    recipient: depositor,
                    value,
                    transaction_hash,
                });
            }
            Err(e) => {
                metrics::record_rejection("home_deposit", e);
                warn!(depositor = %depositor, error = %e, "Deposit rejected");
            }
        }
        result
    }

    fn try_deposit(&self, depositor: Address, value: U256, transaction_hash: B256) -> Result<()> {
        if value.is_zero() {
            return Err(BridgeError::ZeroValue);
        }

        let key = ReplayKey::home_deposit(transaction_hash);
        let mut ledger = self.ledger();
        if self.requests.is_spent(&key) {
            return Err(BridgeError::DuplicateTransaction { transaction_hash });
        }
        ledger.lock(&depositor, value)?;
        // serialized by the ledger guard, so the key is still free
        self.requests.try_reserve(key);
        Ok(())
    }

    /// Whether `transaction_hash` already locked value on this ledger.
    pub fn is_deposit_requested(&self, transaction_hash: B256) -> bool {
        self.requests
            .is_spent(&ReplayKey::home_deposit(transaction_hash))
    }

    /// Execute a withdrawal authorized by `signatures` over `message`.
    ///
    /// Signatures are verified before the ledger lock is taken.
    pub fn withdraw(
        &self,
        signatures: &[AuthoritySignature],
        message: &[u8],
        relayer: Address,
    ) -> Result<Withdrawal> {
        let result = verify_signatures(&self.registry, signatures, message).and_then(|verified| {
            debug!(
                message_hash = %verified.message_hash,
                signers = verified.signers.len(),
                "Withdraw signatures verified"
            );
            let mut ledger = self.ledger();
            self.gate
                .release(&self.replay, &mut *ledger, verified, relayer)
        });

        match &result {
            Ok(withdrawal) => {
                metrics::WITHDRAWALS.with_label_values(&["executed"]).inc();
                info!(
                    recipient = %withdrawal.instruction.recipient,
                    value = %withdrawal.recipient_value,
                    relay_fee = %withdrawal.relay_fee,
                    relayer = %relayer,
                    tx_hash = %withdrawal.instruction.transaction_hash,
                    "Withdraw executed"
                );
                self.sink.publish(BridgeEvent::Withdraw {
                    recipient: withdrawal.instruction.recipient,
                    value: withdrawal.recipient_value,
                    transaction_hash: withdrawal.instruction.transaction_hash,
                });
            }
            Err(e) => {
                metrics::WITHDRAWALS.with_label_values(&["rejected"]).inc();
                metrics::record_rejection("home_withdraw", e);
                warn!(relayer = %relayer, error = %e, "Withdraw rejected");
            }
        }
        result
    }

    /// Execute a bundle collected on the foreign ledger.
    pub fn relay(&self, bundle: &RelayBundle, relayer: Address) -> Result<Withdrawal> {
        self.withdraw(&bundle.signatures, &bundle.message, relayer)
    }

    /// Whether the foreign withdrawal `transaction_hash` was executed here.
    pub fn is_withdrawn(&self, transaction_hash: B256) -> bool {
        self.replay
            .is_spent(&ReplayKey::foreign_withdraw(transaction_hash))
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.ledger().balance_of(account)
    }

    pub fn reserves(&self) -> U256 {
        self.ledger().reserves()
    }

    /// Run `f` against the ledger while holding its lock.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut L) -> R) -> R {
        f(&mut *self.ledger())
    }

    fn ledger(&self) -> MutexGuard<'_, L> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
