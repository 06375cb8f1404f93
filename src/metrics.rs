//! Prometheus metrics for the federated bridge
//!
//! Registered in the default registry; an embedding service exposes them with
//! `prometheus::TextEncoder`.

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

use crate::error::BridgeError;

lazy_static! {
    pub static ref CONFIRMATIONS: IntCounterVec = register_int_counter_vec!(
        "bridge_confirmations_total",
        "Deposit confirmations accepted, by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref SIGNATURES: IntCounterVec = register_int_counter_vec!(
        "bridge_signatures_total",
        "Withdrawal signatures accepted, by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref WITHDRAWALS: IntCounterVec = register_int_counter_vec!(
        "bridge_withdrawals_total",
        "Withdrawals executed through the relay gate",
        &["outcome"]
    ).unwrap();

    pub static ref REJECTIONS: IntCounterVec = register_int_counter_vec!(
        "bridge_rejections_total",
        "Rejected bridge calls, by error kind",
        &["operation", "kind"]
    ).unwrap();
}

/// Count a rejected call.
pub fn record_rejection(operation: &str, error: &BridgeError) {
    REJECTIONS
        .with_label_values(&[operation, error.kind().as_str()])
        .inc();
}
