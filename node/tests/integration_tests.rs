//! End-to-end tests for `ConsensusNode` wired over nullable collaborators:
//! configuration → proposal signing → vote dispatch → container sync.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use conclave_crypto::{Blake2bHasher, Ed25519Signer, Signer};
use conclave_network::{SyncRequest, SyncResponse, SyncServer};
use conclave_node::{ConsensusNode, NodeConfig, NodeError, NodeServices, SyncStatus};
use conclave_nullables::{NullClock, NullElectionManager, NullLedger, NullNetwork, NullTicker};
use conclave_types::{
    AccountId, Block, Container, ElectionId, Instruction, NetworkId, NodeId, Signature, Timestamp,
    Vote,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SIGNER_SEED: [u8; 32] = [7u8; 32];

fn block(nonce: u64) -> Block {
    Block::new(
        AccountId::new("alice"),
        AccountId::new("delegator"),
        Instruction::new("transfer", nonce.to_le_bytes().to_vec()),
        Timestamp::new(1_000),
        nonce,
        None,
    )
}

fn chain(len: usize) -> Vec<Container> {
    let mut out: Vec<Container> = Vec::with_capacity(len);
    for i in 0..len {
        let previous = out.last().map(|c| c.hash);
        let blocks = if i == 0 { Vec::new() } else { vec![block(i as u64)] };
        out.push(Container::new(
            previous,
            Timestamp::new(2_000 + i as u64),
            NodeId::new("creator"),
            blocks,
        ));
    }
    out
}

fn config_for(genesis: &Container) -> NodeConfig {
    NodeConfig {
        network_id: genesis.hash.to_hex(),
        node_id: "node-a".into(),
        enable_metrics: true,
        ..NodeConfig::default()
    }
}

struct Harness {
    node: ConsensusNode,
    ledger: Arc<NullLedger>,
    network: Arc<NullNetwork>,
    elections: Arc<NullElectionManager>,
    clock: Arc<NullClock>,
}

fn harness(config: NodeConfig, ledger: Arc<NullLedger>, network: Arc<NullNetwork>) -> Harness {
    let elections = Arc::new(NullElectionManager::new());
    let clock = Arc::new(NullClock::new(10_000));
    let services = NodeServices {
        ledger: ledger.clone(),
        block_manager: ledger.clone(),
        processor: ledger.clone(),
        transport: network.clone(),
        elections: elections.clone(),
        signer: Arc::new(Ed25519Signer::from_seed(&SIGNER_SEED)),
        hasher: Arc::new(Blake2bHasher),
        clock: clock.clone(),
    };
    let node = ConsensusNode::new(config, services).expect("node builds");
    Harness {
        node,
        ledger,
        network,
        elections,
        clock,
    }
}

fn vote(election: &str, voter: &str) -> Vote {
    Vote {
        election: ElectionId::new(election),
        voter: NodeId::new(voter),
        candidate: NodeId::new("candidate"),
        signature: Signature([0u8; 64]),
    }
}

// ---------------------------------------------------------------------------
// Construction & configuration
// ---------------------------------------------------------------------------

#[test]
fn node_builds_from_toml_file() {
    let genesis = &chain(1)[0];
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"
network_id = "{}"
node_id = "node-a"

[proposal_queue]
max_queue_size = 2
"#,
        genesis.hash.to_hex()
    )
    .expect("write config");

    let config = NodeConfig::from_toml_file(file.path()).expect("config parses");
    assert_eq!(config.proposal_queue.max_queue_size, 2);

    let h = harness(config, Arc::new(NullLedger::new()), Arc::new(NullNetwork::new()));
    assert_eq!(h.node.network_id(), NetworkId::new(genesis.hash));
    assert_eq!(h.node.node_id(), &NodeId::new("node-a"));
    assert!(h.node.metrics().is_none());
    assert_eq!(h.node.sync_status(), SyncStatus::Syncing);
}

#[test]
fn invalid_config_is_refused() {
    let config = NodeConfig {
        network_id: "zz".into(),
        ..NodeConfig::default()
    };
    let elections = Arc::new(NullElectionManager::new());
    let ledger = Arc::new(NullLedger::new());
    let services = NodeServices {
        ledger: ledger.clone(),
        block_manager: ledger.clone(),
        processor: ledger,
        transport: Arc::new(NullNetwork::new()),
        elections,
        signer: Arc::new(Ed25519Signer::from_seed(&SIGNER_SEED)),
        hasher: Arc::new(Blake2bHasher),
        clock: Arc::new(NullClock::new(0)),
    };
    assert!(matches!(
        ConsensusNode::new(config, services),
        Err(NodeError::Config(_))
    ));
}

// ---------------------------------------------------------------------------
// Proposals
// ---------------------------------------------------------------------------

#[tokio::test]
async fn propose_signs_and_queues() {
    let genesis = &chain(1)[0];
    let h = harness(
        config_for(genesis),
        Arc::new(NullLedger::new()),
        Arc::new(NullNetwork::new()),
    );

    assert!(h.node.propose(block(1), 5).await.unwrap());
    let proposed = h.node.next_proposal().await.expect("queued proposal");
    assert_eq!(proposed.hash, block(1).hash);

    let signer = Ed25519Signer::from_seed(&SIGNER_SEED);
    let signature = proposed
        .validator_signatures
        .get(&NodeId::new("node-a"))
        .expect("local signature");
    assert!(signer.verify(proposed.hash.as_bytes(), signature, &signer.public_key()));

    let keys = HashMap::from([(NodeId::new("node-a"), signer.public_key())]);
    assert!(h.node.verify_validator_signatures(&proposed, &keys));
    assert!(!h.node.verify_validator_signatures(&proposed, &HashMap::new()));
}

#[tokio::test]
async fn tampered_signature_fails_batch_verification() {
    let genesis = &chain(1)[0];
    let h = harness(
        config_for(genesis),
        Arc::new(NullLedger::new()),
        Arc::new(NullNetwork::new()),
    );
    h.node.propose(block(1), 1).await.unwrap();
    let mut proposed = h.node.next_proposal().await.unwrap();

    let other = Ed25519Signer::from_seed(&[9u8; 32]);
    proposed
        .validator_signatures
        .insert(NodeId::new("node-b"), Signature([3u8; 64]));
    let keys = HashMap::from([
        (NodeId::new("node-a"), Ed25519Signer::from_seed(&SIGNER_SEED).public_key()),
        (NodeId::new("node-b"), other.public_key()),
    ]);
    assert!(!h.node.verify_validator_signatures(&proposed, &keys));
}

#[tokio::test]
async fn confirmed_block_is_not_proposed() {
    let source = chain(2);
    let h = harness(
        config_for(&source[0]),
        Arc::new(NullLedger::with_chain(source.iter().cloned())),
        Arc::new(NullNetwork::new()),
    );
    assert!(!h.node.propose(block(1), 1).await.unwrap());
    assert_eq!(h.node.proposal_count().await, 0);
}

#[tokio::test]
async fn full_proposal_queue_refuses_and_counts() {
    let genesis = &chain(1)[0];
    let mut config = config_for(genesis);
    config.proposal_queue.max_queue_size = 2;
    let h = harness(config, Arc::new(NullLedger::new()), Arc::new(NullNetwork::new()));

    assert!(h.node.propose(block(1), 1).await.unwrap());
    assert!(h.node.propose(block(2), 1).await.unwrap());
    assert!(!h.node.propose(block(3), 1).await.unwrap());

    let metrics = h.node.metrics().expect("metrics enabled");
    assert_eq!(metrics.proposals_queued.get(), 2);
    assert_eq!(metrics.proposals_rejected.get(), 1);
}

#[tokio::test]
async fn stale_proposals_expire() {
    let genesis = &chain(1)[0];
    let h = harness(
        config_for(genesis),
        Arc::new(NullLedger::new()),
        Arc::new(NullNetwork::new()),
    );
    h.node.propose(block(1), 1).await.unwrap();
    h.clock.advance(60_000);
    assert!(h.node.next_proposal().await.is_none());
    assert_eq!(h.node.metrics().unwrap().proposals_expired.get(), 1);
}

// ---------------------------------------------------------------------------
// Quorum
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quorum_uses_connected_peers() {
    let genesis = &chain(1)[0];
    let ledger = Arc::new(NullLedger::new());
    ledger.set_weight("A", 40);
    ledger.set_weight("B", 30);
    ledger.set_weight("C", 30);
    let network = Arc::new(NullNetwork::new());
    for peer in ["A", "B", "C"] {
        network.connect(peer);
    }
    let h = harness(config_for(genesis), ledger, network);

    let mut signed = block(1);
    for v in ["A", "B"] {
        signed
            .validator_signatures
            .insert(NodeId::new(v), Signature([1u8; 64]));
    }
    assert!(h.node.multi_signature_quorum_reached(&signed).await);

    // With C gone, A+B is the whole online weight.
    h.network.disconnect_all();
    h.network.connect("A");
    h.network.connect("B");
    let outcome = h.node.evaluate_block_quorum(&signed).await;
    assert_eq!(outcome.online.to_u128(), Some(70));
    assert!(outcome.reached);

    let mut weak = block(2);
    weak.validator_signatures
        .insert(NodeId::new("C"), Signature([1u8; 64]));
    h.network.connect("C");
    assert!(!h.node.multi_signature_quorum_reached(&weak).await);
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn vote_loop_dispatches_queued_votes() {
    let genesis = &chain(1)[0];
    let ledger = Arc::new(NullLedger::new());
    ledger.set_weight("v1", 10);
    ledger.set_weight("v2", 20);
    let h = harness(config_for(genesis), ledger, Arc::new(NullNetwork::new()));
    h.elections.reject_voter("v3");

    h.node.add_vote(vote("e1", "v1"), NodeId::new("peer")).await;
    h.node.add_vote(vote("e1", "v2"), NodeId::new("peer")).await;
    h.node.add_vote(vote("e2", "v3"), NodeId::new("peer")).await;

    h.node
        .run_with(NullTicker::finite(1), NullTicker::finite(0))
        .await;

    let accepted: Vec<_> = h
        .elections
        .accepted()
        .into_iter()
        .map(|v| (v.voter.to_string(), v.weight))
        .collect();
    assert_eq!(accepted.len(), 2);
    assert!(accepted.contains(&("v1".into(), "10".into())));
    assert!(accepted.contains(&("v2".into(), "20".into())));
    assert_eq!(h.elections.rejected().len(), 1);

    let metrics = h.node.metrics().unwrap();
    assert_eq!(metrics.votes_queued.get(), 3);
    assert_eq!(metrics.votes_dispatched.get(), 2);
    assert_eq!(metrics.votes_rejected.get(), 1);
    assert_eq!(metrics.vote_backlog.get(), 0);
}

#[tokio::test]
async fn stuck_election_does_not_stall_other_elections() {
    let genesis = &chain(1)[0];
    let h = harness(
        config_for(genesis),
        Arc::new(NullLedger::new()),
        Arc::new(NullNetwork::new()),
    );
    h.elections.hold_election("slow");
    h.node.add_vote(vote("slow", "s1"), NodeId::new("peer")).await;

    let (vote_ticker, vote_handle) = NullTicker::new();
    tokio::join!(h.node.run_with(vote_ticker, NullTicker::finite(0)), async {
        vote_handle.tick();
        h.elections.wait_until_parked("slow").await;

        h.node.add_vote(vote("fast", "f1"), NodeId::new("peer")).await;
        for _ in 0..3 {
            vote_handle.tick();
        }
        while h.elections.accepted().is_empty() {
            tokio::task::yield_now().await;
        }
        h.node.shutdown();
    });

    let accepted: Vec<_> = h
        .elections
        .accepted()
        .into_iter()
        .map(|v| v.election.to_string())
        .collect();
    assert_eq!(accepted, vec!["fast".to_string()]);
    assert_eq!(h.node.vote_queue().metrics().await.dispatched_total, 1);
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sync_loop_replicates_peer_chain() {
    let source = chain(4);
    let network_id = NetworkId::new(source[0].hash);
    let source_ledger = Arc::new(NullLedger::with_chain(source.iter().cloned()));
    let network = Arc::new(NullNetwork::serving(Arc::new(SyncServer::new(
        network_id,
        source_ledger,
    ))));
    network.connect("p1");
    network.connect("p2");

    let h = harness(config_for(&source[0]), Arc::new(NullLedger::new()), network);
    h.node
        .run_with(NullTicker::finite(0), NullTicker::finite(20))
        .await;

    assert_eq!(h.node.wait_for_sync().await, Some(source[0].clone()));
    assert_eq!(h.node.sync_status(), SyncStatus::Complete(Some(source[0].clone())));
    let expected: Vec<_> = source.iter().map(|c| c.hash).collect();
    assert_eq!(h.ledger.chain_hashes(), expected);

    let history = h.node.account_history(&AccountId::new("alice")).await.unwrap();
    assert_eq!(history.len(), 3);

    let metrics = h.node.metrics().unwrap();
    assert_eq!(metrics.containers_applied.get(), 3);
    assert_eq!(metrics.unprocessed_containers.get(), 0);
    assert!(metrics.sync_passes.get() >= 3);
    assert_eq!(metrics.sync_failures.get(), 0);
}

#[tokio::test]
async fn exhausted_sync_completes_without_genesis() {
    let genesis = &chain(1)[0];
    let network = Arc::new(NullNetwork::new());
    network.connect("p1");
    for _ in 0..3 {
        network.enqueue_response(SyncResponse::Error("unavailable".into()));
    }
    let h = harness(config_for(genesis), Arc::new(NullLedger::new()), network);

    h.node
        .run_with(NullTicker::finite(0), NullTicker::finite(10))
        .await;

    assert_eq!(h.node.sync_status(), SyncStatus::Complete(None));
    assert_eq!(h.node.wait_for_sync().await, None);
    assert_eq!(h.node.metrics().unwrap().sync_failures.get(), 3);
}

#[tokio::test]
async fn shutdown_stops_idle_loops() {
    let genesis = &chain(1)[0];
    let h = harness(
        config_for(genesis),
        Arc::new(NullLedger::new()),
        Arc::new(NullNetwork::new()),
    );
    let (vote_ticker, _vote_handle) = NullTicker::new();
    let (sync_ticker, _sync_handle) = NullTicker::new();

    tokio::join!(h.node.run_with(vote_ticker, sync_ticker), async {
        tokio::task::yield_now().await;
        h.node.shutdown();
    });

    assert_eq!(h.node.sync_status(), SyncStatus::Stopped);
    assert_eq!(h.node.wait_for_sync().await, None);
    assert!(h.node.syncer().is_stopped());
}

#[tokio::test]
async fn serves_sync_requests_from_local_ledger() {
    let source = chain(3);
    let h = harness(
        config_for(&source[0]),
        Arc::new(NullLedger::with_chain(source.iter().cloned())),
        Arc::new(NullNetwork::new()),
    );

    assert_eq!(
        h.node.handle_sync_request(SyncRequest::GetGenesis).await,
        SyncResponse::Genesis(Some(source[0].clone()))
    );
    let response = h
        .node
        .handle_sync_request(SyncRequest::GetContainersWithBlocks {
            hashes: vec![source[2].hash],
        })
        .await;
    assert_eq!(response, SyncResponse::ContainersWithBlocks(vec![source[2].clone()]));
}

#[tokio::test]
async fn metrics_encode_after_refresh() {
    let genesis = &chain(1)[0];
    let h = harness(
        config_for(genesis),
        Arc::new(NullLedger::new()),
        Arc::new(NullNetwork::new()),
    );
    h.node.propose(block(1), 1).await.unwrap();
    h.node.refresh_metrics().await;
    let text = h.node.metrics().unwrap().encode().unwrap();
    assert!(text.contains("conclave_proposal_queue_size 1"));
}
