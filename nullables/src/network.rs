//! Nullable network — scripted peer responses instead of real I/O.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use conclave_network::{NetworkError, PeerTransport, SyncRequest, SyncResponse, SyncServer};
use conclave_types::NodeId;

#[derive(Default)]
struct NetworkState {
    peers: Vec<NodeId>,
    unreachable: HashSet<NodeId>,
    scripted: VecDeque<Result<SyncResponse, NetworkError>>,
    /// Every request "sent", with its target peer (`None` for random).
    sent: Vec<(Option<NodeId>, SyncRequest)>,
}

/// A test transport that records requests instead of sending them.
///
/// Answers come from, in order: the scripted queue, then the attached
/// [`SyncServer`] if any. Without either, requests time out.
pub struct NullNetwork {
    state: Mutex<NetworkState>,
    server: Option<Arc<SyncServer>>,
}

impl NullNetwork {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NetworkState::default()),
            server: None,
        }
    }

    /// A network whose peers all answer from `server`.
    pub fn serving(server: Arc<SyncServer>) -> Self {
        Self {
            state: Mutex::new(NetworkState::default()),
            server: Some(server),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connect(&self, peer: impl Into<NodeId>) {
        self.lock().peers.push(peer.into());
    }

    pub fn disconnect_all(&self) {
        self.lock().peers.clear();
    }

    /// Requests addressed to `peer` fail with a connection error.
    pub fn make_unreachable(&self, peer: impl Into<NodeId>) {
        self.lock().unreachable.insert(peer.into());
    }

    /// Queue the answer for the next request.
    pub fn enqueue_response(&self, response: SyncResponse) {
        self.lock().scripted.push_back(Ok(response));
    }

    /// Queue a transport failure for the next request.
    pub fn enqueue_failure(&self, error: NetworkError) {
        self.lock().scripted.push_back(Err(error));
    }

    /// Get all sent requests (for assertions).
    pub fn sent(&self) -> Vec<(Option<NodeId>, SyncRequest)> {
        self.lock().sent.clone()
    }

    /// Clear recorded requests and scripted answers.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.sent.clear();
        state.scripted.clear();
    }

    async fn answer(
        &self,
        target: Option<&NodeId>,
        request: SyncRequest,
    ) -> Result<SyncResponse, NetworkError> {
        let scripted = {
            let mut state = self.lock();
            state.sent.push((target.cloned(), request.clone()));
            if state.peers.is_empty() {
                return Err(NetworkError::NoPeers);
            }
            if let Some(peer) = target {
                if !state.peers.contains(peer) {
                    return Err(NetworkError::PeerNotFound(peer.to_string()));
                }
                if state.unreachable.contains(peer) {
                    return Err(NetworkError::ConnectionFailed(peer.to_string()));
                }
            }
            state.scripted.pop_front()
        };
        if let Some(result) = scripted {
            return result;
        }
        match &self.server {
            Some(server) => Ok(server.handle(request).await),
            None => Err(NetworkError::Timeout(request.kind().to_string())),
        }
    }
}

impl Default for NullNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeerTransport for NullNetwork {
    async fn send_to_random_peer(
        &self,
        request: SyncRequest,
    ) -> Result<SyncResponse, NetworkError> {
        self.answer(None, request).await
    }

    async fn send_to_peer(
        &self,
        peer: &NodeId,
        request: SyncRequest,
    ) -> Result<SyncResponse, NetworkError> {
        self.answer(Some(peer), request).await
    }

    async fn connected_node_ids(&self) -> Vec<NodeId> {
        self.lock().peers.clone()
    }
}
