//! Block validation and multi-signature quorum over a nullable ledger.

use std::sync::Arc;

use conclave_consensus::ConsensusValidator;
use conclave_ledger::ValidationState;
use conclave_nullables::NullLedger;
use conclave_types::{AccountId, Block, Instruction, NodeId, Signature, Timestamp, WeightTotal};

fn block_signed_by(validators: &[&str]) -> Block {
    let mut block = Block::new(
        AccountId::new("client"),
        AccountId::new("delegator"),
        Instruction::new("transfer", b"5".to_vec()),
        Timestamp::new(1_000),
        1,
        None,
    );
    for v in validators {
        block
            .validator_signatures
            .insert(NodeId::new(*v), Signature([1u8; 64]));
    }
    block
}

fn peers(ids: &[&str]) -> Vec<NodeId> {
    ids.iter().map(|id| NodeId::new(*id)).collect()
}

fn weighted_ledger() -> Arc<NullLedger> {
    let ledger = Arc::new(NullLedger::new());
    ledger.set_weight("A", 40);
    ledger.set_weight("B", 30);
    ledger.set_weight("C", 30);
    ledger
}

fn validator(ledger: &Arc<NullLedger>) -> ConsensusValidator {
    ConsensusValidator::new(ledger.clone(), ledger.clone())
}

#[tokio::test]
async fn seventy_percent_signers_reach_quorum() {
    let ledger = weighted_ledger();
    let v = validator(&ledger);
    let block = block_signed_by(&["A", "B"]);
    assert!(v.multi_signature_quorum_reached(&block, &peers(&["A", "B", "C"])).await);
}

#[tokio::test]
async fn thirty_percent_signers_fall_short() {
    let ledger = weighted_ledger();
    let v = validator(&ledger);
    let block = block_signed_by(&["C"]);
    let outcome = v.evaluate_block_quorum(&block, &peers(&["A", "B", "C"])).await;
    assert!(!outcome.reached);
    assert_eq!(outcome.online, WeightTotal::from(100u128));
    assert_eq!(outcome.voted, WeightTotal::from(30u128));
}

#[tokio::test]
async fn unknown_peers_weigh_nothing() {
    let ledger = weighted_ledger();
    let v = validator(&ledger);
    let block = block_signed_by(&["A"]);
    let outcome = v
        .evaluate_block_quorum(&block, &peers(&["A", "ghost-1", "ghost-2"]))
        .await;
    assert_eq!(outcome.online, WeightTotal::from(40u128));
    assert!(outcome.reached);
}

#[tokio::test]
async fn no_connected_peers_reaches_quorum() {
    let ledger = weighted_ledger();
    let v = validator(&ledger);
    assert!(v.multi_signature_quorum_reached(&block_signed_by(&[]), &[]).await);
}

#[tokio::test]
async fn ledger_errors_count_as_zero_weight() {
    let ledger = weighted_ledger();
    ledger.fail_reads(true);
    let v = validator(&ledger);
    let outcome = v
        .evaluate_block_quorum(&block_signed_by(&["A"]), &peers(&["A", "B"]))
        .await;
    assert!(outcome.online.is_zero());
    assert!(outcome.voted.is_zero());
}

#[tokio::test]
async fn block_verdicts_come_from_block_manager() {
    let ledger = weighted_ledger();
    let v = validator(&ledger);
    let block = block_signed_by(&[]);
    assert!(v.valid_block(&block).await);
    assert!(v.valid_block_finalization(&block).await);

    ledger.set_block_verdict(ValidationState::Invalid("bad nonce".into()));
    assert!(!v.valid_block(&block).await);
    assert!(v.valid_block_finalization(&block).await);

    ledger.set_finalization_verdict(ValidationState::Invalid("missing signatures".into()));
    assert!(!v.valid_block_finalization(&block).await);
}

#[tokio::test]
async fn block_manager_errors_mean_invalid() {
    let ledger = weighted_ledger();
    ledger.fail_reads(true);
    let v = validator(&ledger);
    assert!(!v.valid_block(&block_signed_by(&[])).await);
}
