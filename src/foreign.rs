//! Foreign bridge
//!
//! Releases home deposits once `T` authorities have confirmed them, and
//! collects authority signatures for withdrawals back to the home ledger.
//!
//! Lock order is always state machine, then ledger. Events are published
//! while the state-machine guard is held, so the event stream follows the
//! order in which transitions happened.

use alloy::primitives::{Address, Bytes, B256, U256};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::authority::AuthorityRegistry;
use crate::collection::{RelayBundle, SignatureCollector, SubmitOutcome};
use crate::confirmation::{ConfirmOutcome, DepositConfirmations, DepositKey};
use crate::error::{BridgeError, Result};
use crate::events::{BridgeEvent, EventSink};
use crate::ledger::ValueTransfer;
use crate::metrics;
use crate::replay::{ReplayGuard, ReplayKey};
use crate::signature::AuthoritySignature;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ForeignBridge<L, S> {
    registry: Arc<AuthorityRegistry>,
    replay: Arc<ReplayGuard>,
    confirmations: Mutex<DepositConfirmations>,
    collector: Mutex<SignatureCollector>,
    /// Foreign transactions that already locked value for the home ledger.
    requests: ReplayGuard,
    ledger: Mutex<L>,
    sink: S,
}

impl<L: ValueTransfer, S: EventSink> ForeignBridge<L, S> {
    pub fn new(
        registry: Arc<AuthorityRegistry>,
        replay: Arc<ReplayGuard>,
        ledger: L,
        sink: S,
    ) -> Self {
        Self {
            registry,
            replay,
            confirmations: Mutex::new(DepositConfirmations::new()),
            collector: Mutex::new(SignatureCollector::new()),
            requests: ReplayGuard::new(),
            ledger: Mutex::new(ledger),
            sink,
        }
    }

    pub fn registry(&self) -> &AuthorityRegistry {
        &self.registry
    }

    // ========================================================================
    // Home → foreign
    // ========================================================================

    /// Confirm, as `authority`, the home deposit `(recipient, value, transaction_hash)`.
    ///
    /// Emits `DepositConfirmation` while below the threshold and `Deposit` on
    /// the confirmation that releases the value.
    pub fn deposit(
        &self,
        authority: Address,
        recipient: Address,
        value: U256,
        transaction_hash: B256,
    ) -> Result<ConfirmOutcome> {
        let key = DepositKey::new(recipient, value, transaction_hash);
        let result = {
            let mut confirmations = lock(&self.confirmations);
            let result = {
                let mut ledger = lock(&self.ledger);
                confirmations.confirm(&self.registry, &self.replay, &mut *ledger, key, authority)
            };
            match &result {
                Ok(ConfirmOutcome::Pending { .. }) => {
                    self.sink.publish(BridgeEvent::DepositConfirmation {
                        recipient,
                        value,
                        transaction_hash,
                    })
                }
                Ok(ConfirmOutcome::Released { .. }) => self.sink.publish(BridgeEvent::Deposit {
                    recipient,
                    value,
                    transaction_hash,
                }),
                Err(_) => {}
            }
            result
        };

        match &result {
            Ok(ConfirmOutcome::Pending {
                confirmations,
                required,
            }) => {
                metrics::CONFIRMATIONS.with_label_values(&["pending"]).inc();
                debug!(
                    authority = %authority,
                    tx_hash = %transaction_hash,
                    confirmations,
                    required,
                    "Deposit confirmation recorded"
                );
            }
            Ok(ConfirmOutcome::Released { confirmations }) => {
                metrics::CONFIRMATIONS.with_label_values(&["released"]).inc();
                info!(
                    recipient = %recipient,
                    value = %value,
                    tx_hash = %transaction_hash,
                    confirmations,
                    "Deposit released"
                );
            }
            Err(e) => {
                metrics::record_rejection("foreign_deposit", e);
                warn!(
                    authority = %authority,
                    tx_hash = %transaction_hash,
                    error = %e,
                    "Deposit confirmation rejected"
                );
            }
        }
        result
    }

    pub fn has_authority_confirmed_deposit(
        &self,
        authority: &Address,
        recipient: Address,
        value: U256,
        transaction_hash: B256,
    ) -> bool {
        lock(&self.confirmations).has_confirmed(
            &self.registry,
            authority,
            &DepositKey::new(recipient, value, transaction_hash),
        )
    }

    /// Number of distinct authorities that confirmed the deposit tuple.
    pub fn deposit_confirmations(
        &self,
        recipient: Address,
        value: U256,
        transaction_hash: B256,
    ) -> usize {
        lock(&self.confirmations).confirmations(&DepositKey::new(recipient, value, transaction_hash))
    }

    /// Whether any deposit for the home transaction was released here.
    pub fn is_deposit_released(&self, transaction_hash: B256) -> bool {
        self.replay
            .is_spent(&ReplayKey::home_deposit(transaction_hash))
    }

    // ========================================================================
    // Foreign → home
    // ========================================================================

    /// Lock `value` from `sender` for withdrawal to `recipient` on the home ledger.
    ///
    /// Each `transaction_hash` can lock value once; the home ledger executes at
    /// most one withdrawal per foreign transaction.
    pub fn transfer_home_via_relay(
        &self,
        sender: Address,
        recipient: Address,
        value: U256,
        home_gas_price: U256,
        transaction_hash: B256,
    ) -> Result<()> {
        let result = self.lock_for_withdraw(sender, value, transaction_hash);

        match &result {
            Ok(()) => {
                info!(
                    sender = %sender,
                    recipient = %recipient,
                    value = %value,
                    tx_hash = %transaction_hash,
                    "Withdraw requested"
                );
                self.sink.publish(BridgeEvent::WithdrawRequested {
                    recipient,
                    value,
                    home_gas_price,
                    transaction_hash,
                });
            }
            Err(e) => {
                metrics::record_rejection("foreign_transfer_home", e);
                warn!(sender = %sender, error = %e, "Withdraw request rejected");
            }
        }
        result
    }

    fn lock_for_withdraw(&self, sender: Address, value: U256, transaction_hash: B256) -> Result<()> {
        if value.is_zero() {
            return Err(BridgeError::ZeroValue);
        }

        let key = ReplayKey::foreign_withdraw(transaction_hash);
        let mut ledger = lock(&self.ledger);
        if self.requests.is_spent(&key) {
            return Err(BridgeError::DuplicateTransaction { transaction_hash });
        }
        ledger.lock(&sender, value)?;
        // serialized by the ledger guard, so the key is still free
        self.requests.try_reserve(key);
        Ok(())
    }

    /// Whether `transaction_hash` already locked value on this ledger.
    pub fn is_withdraw_requested(&self, transaction_hash: B256) -> bool {
        self.requests
            .is_spent(&ReplayKey::foreign_withdraw(transaction_hash))
    }

    /// Submit `claimed_authority`'s signature over a withdrawal message.
    ///
    /// `relayer` is the account delivering the submission; it is reported as
    /// responsible for relaying the bundle when this signature completes it.
    pub fn submit_signature(
        &self,
        signature: AuthoritySignature,
        message: &[u8],
        claimed_authority: Address,
        relayer: Address,
    ) -> Result<SubmitOutcome> {
        let result = {
            let mut collector = lock(&self.collector);
            let result = collector.submit(
                &self.registry,
                signature,
                message,
                claimed_authority,
                relayer,
            );
            match &result {
                Ok(SubmitOutcome::Pending { message_hash, .. }) => {
                    self.sink.publish(BridgeEvent::WithdrawSignatureSubmitted {
                        message_hash: *message_hash,
                    })
                }
                Ok(SubmitOutcome::Collected(bundle)) => {
                    self.sink.publish(BridgeEvent::CollectedSignatures {
                        message_hash: bundle.message_hash,
                        authority_responsible_for_relay: relayer,
                    })
                }
                Err(_) => {}
            }
            result
        };

        match &result {
            Ok(SubmitOutcome::Pending {
                message_hash,
                signatures,
                required,
            }) => {
                metrics::SIGNATURES.with_label_values(&["pending"]).inc();
                debug!(
                    authority = %claimed_authority,
                    message_hash = %message_hash,
                    signatures,
                    required,
                    "Withdraw signature recorded"
                );
            }
            Ok(SubmitOutcome::Collected(bundle)) => {
                metrics::SIGNATURES.with_label_values(&["collected"]).inc();
                info!(
                    message_hash = %bundle.message_hash,
                    signatures = bundle.signatures.len(),
                    relayer = %relayer,
                    "Withdraw signatures collected"
                );
            }
            Err(e) => {
                metrics::record_rejection("foreign_submit_signature", e);
                warn!(
                    authority = %claimed_authority,
                    error = %e,
                    "Withdraw signature rejected"
                );
            }
        }
        result
    }

    /// Whether `authority` has signed `message`. Fails on a malformed message.
    pub fn has_authority_signed_withdraw(&self, authority: &Address, message: &[u8]) -> Result<bool> {
        lock(&self.collector).has_signed(&self.registry, authority, message)
    }

    /// Signature at `index`, in submission order, for `message_hash`.
    pub fn signature(&self, message_hash: &B256, index: usize) -> Result<AuthoritySignature> {
        lock(&self.collector).signature_at(message_hash, index)
    }

    pub fn message(&self, message_hash: &B256) -> Option<Bytes> {
        lock(&self.collector).message(message_hash)
    }

    pub fn collected_bundle(&self, message_hash: &B256) -> Option<RelayBundle> {
        lock(&self.collector).collected(message_hash)
    }

    pub fn signature_count(&self, message_hash: &B256) -> usize {
        lock(&self.collector).signature_count(message_hash)
    }

    // ========================================================================
    // Ledger
    // ========================================================================

    pub fn balance_of(&self, account: &Address) -> U256 {
        lock(&self.ledger).balance_of(account)
    }

    pub fn reserves(&self) -> U256 {
        lock(&self.ledger).reserves()
    }

    /// Run `f` against the ledger while holding its lock.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut L) -> R) -> R {
        f(&mut *lock(&self.ledger))
    }
}
