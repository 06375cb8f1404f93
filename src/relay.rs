//! Relay submission gate
//!
//! Final admission check on the home ledger when a relayer presents a
//! withdrawal message together with authority signatures. Checks run in a
//! fixed order and nothing is mutated until all of them pass:
//!
//! 1. the message decodes (exact canonical length)
//! 2. every signature recovers to a registered authority, no signer twice
//! 3. at least `T` distinct signers
//! 4. the withdrawal's transaction hash has not been executed before
//! 5. the ledger can pay the recipient (and the relayer's fee)
//!
//! Only then is the transaction hash reserved and the value released.

use alloy::primitives::{Address, B256, U256};
use serde::Serialize;

use crate::authority::AuthorityRegistry;
use crate::error::{BridgeError, Result};
use crate::hash::message_hash;
use crate::ledger::ValueTransfer;
use crate::message::TransferInstruction;
use crate::replay::{ReplayGuard, ReplayKey};
use crate::signature::AuthoritySignature;

/// A message whose signatures passed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedMessage {
    pub instruction: TransferInstruction,
    pub message_hash: B256,
    /// Recovered signers, in the order the signatures were supplied.
    pub signers: Vec<Address>,
}

/// An executed withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Withdrawal {
    pub instruction: TransferInstruction,
    pub message_hash: B256,
    pub signers: Vec<Address>,
    pub relayer: Address,
    /// Amount paid to the recipient.
    pub recipient_value: U256,
    /// Amount paid to the relayer.
    pub relay_fee: U256,
}

/// Verify `signatures` over `message` without touching any state.
pub fn verify_signatures(
    registry: &AuthorityRegistry,
    signatures: &[AuthoritySignature],
    message: &[u8],
) -> Result<VerifiedMessage> {
    let instruction = TransferInstruction::decode(message)?;

    let mut seen = registry.signer_set();
    let mut signers = Vec::with_capacity(signatures.len());
    for signature in signatures {
        let signer = signature.recover_signer(message)?;
        let index = registry
            .position(&signer)
            .ok_or(BridgeError::SignerNotAuthority { signer })?;
        if !seen.insert(index) {
            return Err(BridgeError::DuplicateSignature { signer });
        }
        signers.push(signer);
    }

    let required = registry.required_signatures();
    if signers.len() < required {
        return Err(BridgeError::InsufficientSignatures {
            got: signers.len(),
            required,
        });
    }

    Ok(VerifiedMessage {
        instruction,
        message_hash: message_hash(message),
        signers,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RelayGate {
    estimated_gas_cost_of_withdraw: u64,
}

impl RelayGate {
    /// Gate that reimburses the relayer `gas_price * estimated_gas_cost_of_withdraw`
    /// out of the withdrawn value. Zero disables reimbursement.
    pub fn new(estimated_gas_cost_of_withdraw: u64) -> Self {
        Self {
            estimated_gas_cost_of_withdraw,
        }
    }

    pub fn estimated_gas_cost_of_withdraw(&self) -> u64 {
        self.estimated_gas_cost_of_withdraw
    }

    /// Fee owed to the relayer for `instruction`.
    pub fn relay_fee(&self, instruction: &TransferInstruction) -> Result<U256> {
        let fee = instruction
            .gas_price
            .checked_mul(U256::from(self.estimated_gas_cost_of_withdraw))
            .unwrap_or(U256::MAX);
        if fee > instruction.value {
            return Err(BridgeError::InsufficientValueForRelayFee {
                value: instruction.value,
                fee,
            });
        }
        Ok(fee)
    }

    /// Verify and execute a withdrawal.
    ///
    /// The caller must serialize calls that share `ledger`.
    pub fn execute<L: ValueTransfer + ?Sized>(
        &self,
        registry: &AuthorityRegistry,
        replay: &ReplayGuard,
        ledger: &mut L,
        signatures: &[AuthoritySignature],
        message: &[u8],
        relayer: Address,
    ) -> Result<Withdrawal> {
        let verified = verify_signatures(registry, signatures, message)?;
        self.release(replay, ledger, verified, relayer)
    }

    /// Execute an already verified message.
    pub fn release<L: ValueTransfer + ?Sized>(
        &self,
        replay: &ReplayGuard,
        ledger: &mut L,
        verified: VerifiedMessage,
        relayer: Address,
    ) -> Result<Withdrawal> {
        let instruction = verified.instruction;
        let key = ReplayKey::foreign_withdraw(instruction.transaction_hash);
        if replay.is_spent(&key) {
            return Err(BridgeError::AlreadyExecuted {
                transaction_hash: instruction.transaction_hash,
            });
        }

        let relay_fee = self.relay_fee(&instruction)?;
        let recipient_value = instruction.value - relay_fee;
        let mut payouts = vec![(instruction.recipient, recipient_value)];
        if !relay_fee.is_zero() {
            payouts.push((relayer, relay_fee));
        }
        ledger.check_release(&payouts)?;

        if !replay.try_reserve(key) {
            return Err(BridgeError::AlreadyExecuted {
                transaction_hash: instruction.transaction_hash,
            });
        }
        ledger.release(&payouts)?;

        Ok(Withdrawal {
            instruction,
            message_hash: verified.message_hash,
            signers: verified.signers,
            relayer,
            recipient_value,
            relay_fee,
        })
    }
}
