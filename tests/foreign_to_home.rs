//! Foreign→home withdrawals: signature collection and relay execution

mod common;

use alloy::primitives::{keccak256, Address, U256};
use common::*;
use federated_bridge::{BridgeError, BridgeEvent, ErrorKind, SubmitOutcome, MESSAGE_LENGTH};

// ============================================================================
// Signature collection
// ============================================================================

#[test]
fn test_resubmitted_signature_rejected_regardless_of_relayer() {
    let signers = signers(2);
    let x = &signers[0];
    let (foreign, events) = foreign(registry(&signers, 2));
    let message = withdraw_message(recipient(), 100, tx_hash(1), 0);
    let signature = sign(x, &message);

    let outcome = foreign
        .submit_signature(signature, &message, x.address(), x.address())
        .unwrap();
    assert!(matches!(
        outcome,
        SubmitOutcome::Pending {
            signatures: 1,
            required: 2,
            ..
        }
    ));

    let err = foreign
        .submit_signature(signature, &message, x.address(), relayer())
        .unwrap_err();
    assert_eq!(err, BridgeError::DuplicateSignature { signer: x.address() });
    assert_eq!(foreign.signature_count(&keccak256(&message)), 1);
    assert_eq!(event_names(&events), vec!["WithdrawSignatureSubmitted"]);
}

#[test]
fn test_signature_by_non_authority_rejected() {
    let all = signers(3);
    let (foreign, events) = foreign(registry(&all[..2], 1));
    let message = withdraw_message(recipient(), 100, tx_hash(1), 0);
    let outsider = &all[2];

    let err = foreign
        .submit_signature(sign(outsider, &message), &message, outsider.address(), relayer())
        .unwrap_err();

    assert_eq!(
        err,
        BridgeError::SignerNotAuthority {
            signer: outsider.address()
        }
    );
    assert!(events.is_empty());
}

#[test]
fn test_signature_claimed_by_other_authority_rejected() {
    let signers = signers(2);
    let (x, y) = (&signers[0], &signers[1]);
    let (foreign, _events) = foreign(registry(&signers, 2));
    let message = withdraw_message(recipient(), 100, tx_hash(1), 0);

    let err = foreign
        .submit_signature(sign(x, &message), &message, y.address(), relayer())
        .unwrap_err();

    assert_eq!(
        err,
        BridgeError::SignerMismatch {
            claimed: y.address(),
            recovered: x.address(),
        }
    );
    assert!(!foreign
        .has_authority_signed_withdraw(&y.address(), &message)
        .unwrap());
}

#[test]
fn test_signature_over_other_message_rejected() {
    let signers = signers(2);
    let x = &signers[0];
    let (foreign, _events) = foreign(registry(&signers, 1));
    let message = withdraw_message(recipient(), 100, tx_hash(1), 0);
    let tampered = withdraw_message(recipient(), 100_000, tx_hash(1), 0);

    let err = foreign
        .submit_signature(sign(x, &message), &tampered, x.address(), relayer())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(foreign.message(&keccak256(&tampered)).is_none());
}

#[test]
fn test_two_of_two_collects_ordered_bundle() {
    let signers = signers(2);
    let (x, y) = (&signers[0], &signers[1]);
    let (foreign, events) = foreign(registry(&signers, 2));
    let message = withdraw_message(recipient(), 100, tx_hash(1), 0);
    let hash = keccak256(&message);
    let (sig_x, sig_y) = (sign(x, &message), sign(y, &message));

    foreign
        .submit_signature(sig_x, &message, x.address(), x.address())
        .unwrap();
    assert!(foreign.collected_bundle(&hash).is_none());

    let SubmitOutcome::Collected(bundle) = foreign
        .submit_signature(sig_y, &message, y.address(), relayer())
        .unwrap()
    else {
        panic!("expected collected bundle");
    };

    assert_eq!(bundle.message_hash, hash);
    assert_eq!(bundle.signatures, vec![sig_x, sig_y]);
    assert_eq!(bundle.signers, vec![x.address(), y.address()]);
    assert_eq!(bundle.relayer, relayer());
    assert_eq!(foreign.collected_bundle(&hash), Some(bundle));
    assert_eq!(foreign.signature(&hash, 0).unwrap(), sig_x);
    assert_eq!(foreign.signature(&hash, 1).unwrap(), sig_y);
    assert_eq!(
        foreign.signature(&hash, 2).unwrap_err(),
        BridgeError::SignatureNotFound {
            message_hash: hash,
            index: 2
        }
    );
    assert_eq!(foreign.message(&hash).unwrap().as_ref(), message.as_slice());
    assert_eq!(
        events.last(),
        Some(BridgeEvent::CollectedSignatures {
            message_hash: hash,
            authority_responsible_for_relay: relayer(),
        })
    );
}

#[test]
fn test_late_signature_after_collection_rejected() {
    let signers = signers(3);
    let (foreign, _events) = foreign(registry(&signers, 2));
    let message = withdraw_message(recipient(), 100, tx_hash(1), 0);
    for signer in &signers[..2] {
        foreign
            .submit_signature(sign(signer, &message), &message, signer.address(), relayer())
            .unwrap();
    }

    let late = &signers[2];
    let err = foreign
        .submit_signature(sign(late, &message), &message, late.address(), relayer())
        .unwrap_err();

    assert_eq!(
        err,
        BridgeError::AlreadyCollected {
            message_hash: keccak256(&message)
        }
    );
    assert_eq!(foreign.signature_count(&keccak256(&message)), 2);
}

#[test]
fn test_bundles_for_different_messages_progress_independently() {
    let signers = signers(3);
    let (foreign, _events) = foreign(registry(&signers, 2));
    let first = withdraw_message(recipient(), 100, tx_hash(1), 0);
    let second = withdraw_message(recipient(), 200, tx_hash(2), 0);

    foreign
        .submit_signature(sign(&signers[0], &first), &first, signers[0].address(), relayer())
        .unwrap();
    foreign
        .submit_signature(sign(&signers[1], &second), &second, signers[1].address(), relayer())
        .unwrap();
    foreign
        .submit_signature(sign(&signers[2], &second), &second, signers[2].address(), relayer())
        .unwrap();

    assert!(foreign.collected_bundle(&keccak256(&first)).is_none());
    assert!(foreign.collected_bundle(&keccak256(&second)).is_some());
    assert!(foreign
        .has_authority_signed_withdraw(&signers[0].address(), &first)
        .unwrap());
    assert!(!foreign
        .has_authority_signed_withdraw(&signers[0].address(), &second)
        .unwrap());
}

#[test]
fn test_truncated_message_fails_signed_query() {
    let signers = signers(2);
    let (foreign, _events) = foreign(registry(&signers, 1));
    let message = withdraw_message(recipient(), 100, tx_hash(1), 0);

    let err = foreign
        .has_authority_signed_withdraw(&signers[0].address(), &message[..83])
        .unwrap_err();

    assert_eq!(
        err,
        BridgeError::MessageTooShort {
            got: 83,
            expected: MESSAGE_LENGTH
        }
    );
}

#[test]
fn test_overlong_message_rejected() {
    let signers = signers(2);
    let x = &signers[0];
    let (foreign, _events) = foreign(registry(&signers, 1));
    let mut message = withdraw_message(recipient(), 100, tx_hash(1), 0);
    message.push(0);

    let err = foreign
        .submit_signature(sign(x, &message), &message, x.address(), relayer())
        .unwrap_err();

    assert_eq!(
        err,
        BridgeError::MessageTooLong {
            got: MESSAGE_LENGTH + 1,
            expected: MESSAGE_LENGTH
        }
    );
}

#[test]
fn test_collection_completes_exactly_at_threshold() {
    for n in 1..=5usize {
        for t in 1..=n {
            let signers = signers(n);
            let (foreign, events) = foreign(registry(&signers, t));
            let message = withdraw_message(recipient(), 10, tx_hash(1), 0);
            let hash = keccak256(&message);

            for (i, signer) in signers.iter().enumerate() {
                let result = foreign.submit_signature(
                    sign(signer, &message),
                    &message,
                    signer.address(),
                    relayer(),
                );
                let k = i + 1;
                match k.cmp(&t) {
                    std::cmp::Ordering::Less => {
                        assert_eq!(
                            result.unwrap(),
                            SubmitOutcome::Pending {
                                message_hash: hash,
                                signatures: k,
                                required: t
                            },
                            "n={n} t={t} k={k}"
                        );
                        assert!(foreign.collected_bundle(&hash).is_none(), "n={n} t={t} k={k}");
                    }
                    std::cmp::Ordering::Equal => {
                        let SubmitOutcome::Collected(bundle) = result.unwrap() else {
                            panic!("expected collected bundle at n={n} t={t}");
                        };
                        assert_eq!(bundle.signatures.len(), t, "n={n} t={t}");
                    }
                    std::cmp::Ordering::Greater => {
                        assert_eq!(
                            result.unwrap_err(),
                            BridgeError::AlreadyCollected { message_hash: hash },
                            "n={n} t={t} k={k}"
                        );
                    }
                }
            }

            assert_eq!(foreign.signature_count(&hash), t, "n={n} t={t}");
            let collected = event_names(&events)
                .into_iter()
                .filter(|name| *name == "CollectedSignatures")
                .count();
            assert_eq!(collected, 1, "n={n} t={t}");
        }
    }
}

// ============================================================================
// Origin-side withdraw requests
// ============================================================================

#[test]
fn test_transfer_home_rejects_reused_transaction_hash() {
    let signers = signers(2);
    let (foreign, events) = foreign(registry(&signers, 1));
    let sender = Address::repeat_byte(0xaa);
    foreign.with_ledger(|ledger| ledger.fund(sender, U256::from(200u64)).unwrap());

    foreign
        .transfer_home_via_relay(sender, recipient(), U256::from(100u64), U256::ZERO, tx_hash(1))
        .unwrap();
    let err = foreign
        .transfer_home_via_relay(sender, recipient(), U256::from(100u64), U256::ZERO, tx_hash(1))
        .unwrap_err();

    assert_eq!(
        err,
        BridgeError::DuplicateTransaction {
            transaction_hash: tx_hash(1)
        }
    );
    assert_eq!(foreign.balance_of(&sender), U256::from(100u64));
    assert_eq!(foreign.reserves(), U256::from(RESERVES + 100));
    assert_eq!(event_names(&events), vec!["WithdrawRequested"]);
    assert!(foreign.is_withdraw_requested(tx_hash(1)));
}

#[test]
fn test_failed_transfer_home_leaves_transaction_hash_unused() {
    let signers = signers(2);
    let (foreign, _events) = foreign(registry(&signers, 1));
    let sender = Address::repeat_byte(0xaa);

    let err = foreign
        .transfer_home_via_relay(sender, recipient(), U256::from(100u64), U256::ZERO, tx_hash(1))
        .unwrap_err();
    assert!(matches!(err, BridgeError::Ledger(_)));
    assert!(!foreign.is_withdraw_requested(tx_hash(1)));

    foreign.with_ledger(|ledger| ledger.fund(sender, U256::from(100u64)).unwrap());
    foreign
        .transfer_home_via_relay(sender, recipient(), U256::from(100u64), U256::ZERO, tx_hash(1))
        .unwrap();
}

// ============================================================================
// Relay execution on the home ledger
// ============================================================================

#[test]
fn test_end_to_end_withdrawal_executes_once() {
    let signers = signers(2);
    let registry = registry(&signers, 2);
    let (foreign, foreign_events) = foreign(registry.clone());
    let (home, home_events) = home(registry, RESERVES);
    let sender = Address::repeat_byte(0xaa);
    foreign.with_ledger(|ledger| ledger.fund(sender, U256::from(500u64)).unwrap());

    foreign
        .transfer_home_via_relay(sender, recipient(), U256::from(500u64), U256::ZERO, tx_hash(1))
        .unwrap();
    let Some(BridgeEvent::WithdrawRequested {
        recipient: to,
        value,
        home_gas_price,
        transaction_hash,
    }) = foreign_events.last()
    else {
        panic!("expected WithdrawRequested");
    };

    let message = federated_bridge::TransferInstruction::new(to, value, transaction_hash, home_gas_price)
        .encode();
    let mut outcome = None;
    for signer in &signers {
        outcome = Some(
            foreign
                .submit_signature(sign(signer, &message), &message, signer.address(), relayer())
                .unwrap(),
        );
    }
    let Some(SubmitOutcome::Collected(bundle)) = outcome else {
        panic!("expected collected bundle");
    };

    let withdrawal = home.relay(&bundle, relayer()).unwrap();
    assert_eq!(withdrawal.recipient_value, U256::from(500u64));
    assert_eq!(home.balance_of(&recipient()), U256::from(500u64));
    assert!(home.is_withdrawn(tx_hash(1)));
    assert_eq!(
        home_events.events(),
        vec![BridgeEvent::Withdraw {
            recipient: recipient(),
            value: U256::from(500u64),
            transaction_hash: tx_hash(1),
        }]
    );

    let err = home.relay(&bundle, relayer()).unwrap_err();
    assert_eq!(
        err,
        BridgeError::AlreadyExecuted {
            transaction_hash: tx_hash(1)
        }
    );
    assert_eq!(home.balance_of(&recipient()), U256::from(500u64));
    assert_eq!(home_events.len(), 1);
}

#[test]
fn test_withdraw_below_threshold_rejected() {
    let signers = signers(3);
    let (home, events) = home(registry(&signers, 2), RESERVES);
    let message = withdraw_message(recipient(), 100, tx_hash(1), 0);

    let err = home
        .withdraw(&[sign(&signers[0], &message)], &message, relayer())
        .unwrap_err();

    assert_eq!(
        err,
        BridgeError::InsufficientSignatures {
            got: 1,
            required: 2
        }
    );
    assert!(!home.is_withdrawn(tx_hash(1)));
    assert!(events.is_empty());
}

#[test]
fn test_withdraw_with_repeated_signature_rejected() {
    let signers = signers(2);
    let (home, _events) = home(registry(&signers, 2), RESERVES);
    let message = withdraw_message(recipient(), 100, tx_hash(1), 0);
    let signature = sign(&signers[0], &message);

    let err = home
        .withdraw(&[signature, signature], &message, relayer())
        .unwrap_err();

    assert_eq!(
        err,
        BridgeError::DuplicateSignature {
            signer: signers[0].address()
        }
    );
    assert_eq!(home.balance_of(&recipient()), U256::ZERO);
}

#[test]
fn test_same_transaction_with_different_payload_rejected() {
    let signers = signers(2);
    let (home, _events) = home(registry(&signers, 1), RESERVES);
    let other = Address::repeat_byte(0xdd);
    let first = withdraw_message(recipient(), 100, tx_hash(1), 0);
    let second = withdraw_message(other, 900, tx_hash(1), 0);

    home.withdraw(&[sign(&signers[0], &first)], &first, relayer())
        .unwrap();
    let err = home
        .withdraw(&[sign(&signers[0], &second)], &second, relayer())
        .unwrap_err();

    assert_eq!(
        err,
        BridgeError::AlreadyExecuted {
            transaction_hash: tx_hash(1)
        }
    );
    assert_eq!(home.balance_of(&other), U256::ZERO);

    let third = withdraw_message(other, 900, tx_hash(2), 0);
    home.withdraw(&[sign(&signers[0], &third)], &third, relayer())
        .unwrap();
    assert_eq!(home.balance_of(&other), U256::from(900u64));
}

#[test]
fn test_withdraw_without_reserves_fails_atomically() {
    let signers = signers(2);
    let (home, events) = home(registry(&signers, 1), 0);
    let message = withdraw_message(recipient(), 100, tx_hash(1), 0);
    let signatures = [sign(&signers[0], &message)];

    let err = home.withdraw(&signatures, &message, relayer()).unwrap_err();
    assert!(matches!(err, BridgeError::Ledger(_)));
    assert!(!home.is_withdrawn(tx_hash(1)));
    assert!(events.is_empty());

    let depositor = Address::repeat_byte(0xaa);
    home.with_ledger(|ledger| ledger.fund(depositor, U256::from(100u64)).unwrap());
    home.deposit(depositor, U256::from(100u64), tx_hash(9))
        .unwrap();

    home.withdraw(&signatures, &message, relayer()).unwrap();
    assert_eq!(home.balance_of(&recipient()), U256::from(100u64));
    assert!(home.is_withdrawn(tx_hash(1)));
}

#[test]
fn test_relayer_reimbursed_from_value() {
    let signers = signers(2);
    let (home, events) = home(registry(&signers, 1), RESERVES);
    let home = home.with_estimated_gas_cost_of_withdraw(21_000);
    let message = withdraw_message(recipient(), 1_000_000, tx_hash(1), 10);

    let withdrawal = home
        .withdraw(&[sign(&signers[0], &message)], &message, relayer())
        .unwrap();

    assert_eq!(withdrawal.relay_fee, U256::from(210_000u64));
    assert_eq!(home.balance_of(&relayer()), U256::from(210_000u64));
    assert_eq!(home.balance_of(&recipient()), U256::from(790_000u64));
    assert_eq!(
        events.last(),
        Some(BridgeEvent::Withdraw {
            recipient: recipient(),
            value: U256::from(790_000u64),
            transaction_hash: tx_hash(1),
        })
    );
}

#[test]
fn test_value_below_relay_fee_rejected() {
    let signers = signers(2);
    let (home, _events) = home(registry(&signers, 1), RESERVES);
    let home = home.with_estimated_gas_cost_of_withdraw(21_000);
    let message = withdraw_message(recipient(), 1_000, tx_hash(1), 1);

    let err = home
        .withdraw(&[sign(&signers[0], &message)], &message, relayer())
        .unwrap_err();

    assert_eq!(
        err,
        BridgeError::InsufficientValueForRelayFee {
            value: U256::from(1_000u64),
            fee: U256::from(21_000u64),
        }
    );
    assert!(!home.is_withdrawn(tx_hash(1)));
}

#[test]
fn test_withdraw_threshold_soundness() {
    for n in 1..=5usize {
        for t in 1..=n {
            let signers = signers(n);
            let (home, _events) = home(registry(&signers, t), RESERVES);
            let message = withdraw_message(recipient(), 10, tx_hash(1), 0);
            let signatures: Vec<_> = signers.iter().map(|s| sign(s, &message)).collect();

            for k in 0..t {
                let err = home
                    .withdraw(&signatures[..k], &message, relayer())
                    .unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Insufficiency, "n={n} t={t} k={k}");
            }
            home.withdraw(&signatures[..t], &message, relayer())
                .unwrap();
            assert_eq!(home.balance_of(&recipient()), U256::from(10u64), "n={n} t={t}");
        }
    }
}
