//! Sync server answers from a nullable ledger.

use std::sync::Arc;

use conclave_network::{SyncRequest, SyncResponse, SyncServer};
use conclave_nullables::NullLedger;
use conclave_types::{AccountId, Block, Container, Hash256, Instruction, NetworkId, NodeId, Timestamp};

fn chain(len: usize) -> Vec<Container> {
    let mut out: Vec<Container> = Vec::with_capacity(len);
    for i in 0..len {
        let previous = out.last().map(|c| c.hash);
        let block = Block::new(
            AccountId::new("client"),
            AccountId::new("delegator"),
            Instruction::new("noop", Vec::new()),
            Timestamp::new(10),
            i as u64,
            None,
        );
        out.push(Container::new(
            previous,
            Timestamp::new(100 + i as u64),
            NodeId::new("creator"),
            vec![block],
        ));
    }
    out
}

fn server(containers: &[Container]) -> SyncServer {
    let ledger = Arc::new(NullLedger::with_chain(containers.iter().cloned()));
    SyncServer::new(NetworkId::new(containers[0].hash), ledger)
}

#[tokio::test]
async fn serves_genesis() {
    let c = chain(2);
    let response = server(&c).handle(SyncRequest::GetGenesis).await;
    assert_eq!(response, SyncResponse::Genesis(Some(c[0].clone())));
}

#[tokio::test]
async fn missing_genesis_is_none() {
    let c = chain(1);
    let ledger = Arc::new(NullLedger::new());
    let response = SyncServer::new(NetworkId::new(c[0].hash), ledger)
        .handle(SyncRequest::GetGenesis)
        .await;
    assert_eq!(response, SyncResponse::Genesis(None));
}

#[tokio::test]
async fn chain_is_headers_after_start() {
    let c = chain(4);
    let response = server(&c)
        .handle(SyncRequest::GetContainerChain {
            start: c[1].hash,
            limit: 1,
        })
        .await;
    let headers = match response {
        SyncResponse::ContainerChain(headers) => headers,
        other => panic!("expected chain, got {other:?}"),
    };
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].hash, c[2].hash);
    assert!(headers[0].blocks.is_empty());
}

#[tokio::test]
async fn unknown_start_is_an_error_response() {
    let c = chain(2);
    let response = server(&c)
        .handle(SyncRequest::GetContainerChain {
            start: Hash256::new([9u8; 32]),
            limit: 10,
        })
        .await;
    assert!(matches!(response, SyncResponse::Error(_)));
}

#[tokio::test]
async fn full_containers_skip_unknown_hashes() {
    let c = chain(3);
    let response = server(&c)
        .handle(SyncRequest::GetContainersWithBlocks {
            hashes: vec![c[2].hash, Hash256::new([1u8; 32]), c[1].hash],
        })
        .await;
    assert_eq!(
        response,
        SyncResponse::ContainersWithBlocks(vec![c[2].clone(), c[1].clone()])
    );
}
