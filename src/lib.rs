//! Federated Bridge: authority-signed value transfers between two ledgers
//!
//! A fixed set of N authorities co-signs transfer instructions; any T of them
//! finalize a transfer. This crate holds the protocol core shared by both sides:
//!
//! - **Message** - Canonical 116-byte transfer instruction and its keccak hash
//! - **Authority Registry** - Ordered authority set and signature threshold
//! - **Replay Guard** - One-way spent markers per originating transaction
//! - **Confirmation** - Home→foreign deposit confirmation state machine
//! - **Collection** - Foreign→home withdrawal signature collection
//! - **Relay Gate** - Final admission check before value is released at home
//! - **Home / Foreign** - Ledger-side facades emitting bridge events
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! federated-bridge = { path = "../federated-bridge" }
//! ```
//!
//! ```ignore
//! let config = BridgeConfig::load()?;
//! let registry = Arc::new(config.registry()?);
//! let home = HomeBridge::new(registry.clone(), Arc::new(ReplayGuard::new()), ledger, EventLog::new())
//!     .with_estimated_gas_cost_of_withdraw(config.estimated_gas_cost_of_withdraw);
//! ```

// Protocol core
pub mod authority;
pub mod collection;
pub mod confirmation;
pub mod hash;
pub mod message;
pub mod relay;
pub mod replay;
pub mod signature;

// Ledger sides
pub mod foreign;
pub mod home;
pub mod ledger;

// Ambient
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;

// Re-export commonly used items at the crate root
pub use authority::{AuthorityRegistry, SignerSet};
pub use collection::{RelayBundle, SignatureCollector, SubmitOutcome};
pub use config::BridgeConfig;
pub use confirmation::{ConfirmOutcome, DepositConfirmations, DepositKey};
pub use error::{BridgeError, ErrorKind, LedgerError};
pub use events::{BridgeEvent, EventLog, EventSink};
pub use foreign::ForeignBridge;
pub use hash::{bytes32_to_hex, keccak256, message_hash};
pub use home::HomeBridge;
pub use ledger::{InMemoryLedger, ValueTransfer};
pub use message::{TransferInstruction, MESSAGE_LENGTH};
pub use relay::{verify_signatures, RelayGate, VerifiedMessage, Withdrawal};
pub use replay::{Origin, ReplayGuard, ReplayKey};
pub use signature::{AuthoritySignature, SIGNATURE_LENGTH};
