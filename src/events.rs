//! Outbound bridge events
//!
//! Every successful state-changing call publishes exactly one event. Sinks are
//! pluggable: [`EventLog`] keeps an in-memory history, and an unbounded tokio
//! channel can feed a relayer task directly.

use alloy::primitives::{Address, B256, U256};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum BridgeEvent {
    // ========================================================================
    // Home ledger
    // ========================================================================
    /// Value locked on the home ledger for release on the foreign ledger.
    DepositRequested {
        recipient: Address,
        value: U256,
        transaction_hash: B256,
    },

    /// Withdrawal executed on the home ledger.
    Withdraw {
        recipient: Address,
        value: U256,
        transaction_hash: B256,
    },

    // ========================================================================
    // Foreign ledger
    // ========================================================================
    /// An authority confirmed a deposit that has not reached the threshold yet.
    DepositConfirmation {
        recipient: Address,
        value: U256,
        transaction_hash: B256,
    },

    /// Deposit released to the recipient on the foreign ledger.
    Deposit {
        recipient: Address,
        value: U256,
        transaction_hash: B256,
    },

    /// Value locked on the foreign ledger for withdrawal on the home ledger.
    WithdrawRequested {
        recipient: Address,
        value: U256,
        home_gas_price: U256,
        transaction_hash: B256,
    },

    WithdrawSignatureSubmitted { message_hash: B256 },

    CollectedSignatures {
        message_hash: B256,
        authority_responsible_for_relay: Address,
    },
}

impl BridgeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::DepositRequested { .. } => "DepositRequested",
            BridgeEvent::Withdraw { .. } => "Withdraw",
            BridgeEvent::DepositConfirmation { .. } => "DepositConfirmation",
            BridgeEvent::Deposit { .. } => "Deposit",
            BridgeEvent::WithdrawRequested { .. } => "WithdrawRequested",
            BridgeEvent::WithdrawSignatureSubmitted { .. } => "WithdrawSignatureSubmitted",
            BridgeEvent::CollectedSignatures { .. } => "CollectedSignatures",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Destination for bridge events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: BridgeEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn publish(&self, event: BridgeEvent) {
        (**self).publish(event)
    }
}

impl EventSink for UnboundedSender<BridgeEvent> {
    fn publish(&self, event: BridgeEvent) {
        if let Err(e) = self.send(event) {
            warn!(event = e.0.name(), "Event receiver dropped, discarding event");
        }
    }
}

/// In-memory, append-only event history.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<BridgeEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event published so far, oldest first.
    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<BridgeEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl EventSink for EventLog {
    fn publish(&self, event: BridgeEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
