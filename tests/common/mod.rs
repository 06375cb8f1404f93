//! Shared fixtures for the scenario tests

#![allow(dead_code)]

use std::sync::{Arc, Once};

use alloy::primitives::{Address, B256, U256};
use alloy::signers::{local::PrivateKeySigner, SignerSync};
use federated_bridge::{
    AuthorityRegistry, AuthoritySignature, EventLog, ForeignBridge, HomeBridge, InMemoryLedger,
    ReplayGuard, TransferInstruction,
};

/// Fixed test keys
pub const KEYS: [&str; 5] = [
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    "0x7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
    "0x47e179ec197488593b187f80a00eb0da91f1c9b0b0a8c8f4fb9a81e2ff5d7b7d",
];

pub const RESERVES: u64 = 1_000_000;

static INIT: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn signers(n: usize) -> Vec<PrivateKeySigner> {
    KEYS[..n]
        .iter()
        .map(|k| k.parse().expect("valid test key"))
        .collect()
}

pub fn registry(signers: &[PrivateKeySigner], required: usize) -> Arc<AuthorityRegistry> {
    Arc::new(
        AuthorityRegistry::new(signers.iter().map(|s| s.address()).collect(), required)
            .expect("valid registry"),
    )
}

pub fn sign(signer: &PrivateKeySigner, message: &[u8]) -> AuthoritySignature {
    signer
        .sign_message_sync(message)
        .expect("signing succeeds")
        .into()
}

pub fn recipient() -> Address {
    Address::repeat_byte(0xee)
}

pub fn relayer() -> Address {
    Address::repeat_byte(0x99)
}

pub fn tx_hash(n: u8) -> B256 {
    B256::repeat_byte(n)
}

pub fn withdraw_message(recipient: Address, value: u64, tx_hash: B256, gas_price: u64) -> Vec<u8> {
    TransferInstruction::new(recipient, U256::from(value), tx_hash, U256::from(gas_price))
        .encode()
        .to_vec()
}

pub type TestForeign = ForeignBridge<InMemoryLedger, Arc<EventLog>>;
pub type TestHome = HomeBridge<InMemoryLedger, Arc<EventLog>>;

pub fn foreign(registry: Arc<AuthorityRegistry>) -> (TestForeign, Arc<EventLog>) {
    init_tracing();
    let events = Arc::new(EventLog::new());
    let bridge = ForeignBridge::new(
        registry,
        Arc::new(ReplayGuard::new()),
        InMemoryLedger::with_reserves(U256::from(RESERVES)),
        events.clone(),
    );
    (bridge, events)
}

pub fn home(registry: Arc<AuthorityRegistry>, reserves: u64) -> (TestHome, Arc<EventLog>) {
    init_tracing();
    let events = Arc::new(EventLog::new());
    let bridge = HomeBridge::new(
        registry,
        Arc::new(ReplayGuard::new()),
        InMemoryLedger::with_reserves(U256::from(reserves)),
        events.clone(),
    );
    (bridge, events)
}

pub fn event_names(events: &EventLog) -> Vec<&'static str> {
    events.events().iter().map(|e| e.name()).collect()
}
