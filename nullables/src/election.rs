//! Nullable election manager — records votes instead of tallying them.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use conclave_consensus::{ConsensusError, ElectionManager};
use conclave_types::{ElectionId, NodeId, Signature};

/// One `process_vote` call as the election manager saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedVote {
    pub election: ElectionId,
    pub voter: NodeId,
    pub candidate: NodeId,
    pub weight: String,
}

#[derive(Default)]
struct ElectionState {
    accepted: Vec<RecordedVote>,
    rejected: Vec<RecordedVote>,
    reject_voters: HashSet<NodeId>,
    /// Gates for held elections; `true` once released.
    gates: HashMap<ElectionId, watch::Sender<bool>>,
    /// Calls currently parked at a gate, per election.
    parked: HashMap<ElectionId, usize>,
}

/// An election manager that accepts every vote unless told otherwise.
pub struct NullElectionManager {
    state: Mutex<ElectionState>,
}

impl NullElectionManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ElectionState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ElectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject every vote cast by `voter`.
    pub fn reject_voter(&self, voter: impl Into<NodeId>) {
        self.lock().reject_voters.insert(voter.into());
    }

    /// Park every `process_vote` call for `election` until
    /// [`release_election`](Self::release_election).
    pub fn hold_election(&self, election: impl Into<ElectionId>) {
        let (tx, _) = watch::channel(false);
        self.lock().gates.insert(election.into(), tx);
    }

    /// Let parked and future calls for `election` through.
    pub fn release_election(&self, election: impl Into<ElectionId>) {
        if let Some(gate) = self.lock().gates.get(&election.into()) {
            gate.send_replace(true);
        }
    }

    /// Number of calls for `election` waiting at its gate.
    pub fn parked(&self, election: impl Into<ElectionId>) -> usize {
        self.lock().parked.get(&election.into()).copied().unwrap_or(0)
    }

    /// Yield until at least one call for `election` is parked.
    pub async fn wait_until_parked(&self, election: impl Into<ElectionId>) {
        let election = election.into();
        while self.parked(election.clone()) == 0 {
            tokio::task::yield_now().await;
        }
    }

    /// Accepted votes, in arrival order.
    pub fn accepted(&self) -> Vec<RecordedVote> {
        self.lock().accepted.clone()
    }

    pub fn rejected(&self) -> Vec<RecordedVote> {
        self.lock().rejected.clone()
    }
}

impl Default for NullElectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ElectionManager for NullElectionManager {
    async fn process_vote(
        &self,
        election: &ElectionId,
        voter: &NodeId,
        candidate: &NodeId,
        _signature: &Signature,
        weight: &str,
    ) -> Result<(), ConsensusError> {
        if weight.parse::<u128>().is_err() {
            return Err(ConsensusError::InvalidWeight(weight.to_string()));
        }
        let gate = self.lock().gates.get(election).map(watch::Sender::subscribe);
        if let Some(mut gate) = gate {
            *self.lock().parked.entry(election.clone()).or_default() += 1;
            let _ = gate.wait_for(|released| *released).await;
            if let Some(count) = self.lock().parked.get_mut(election) {
                *count -= 1;
            }
        }
        let record = RecordedVote {
            election: election.clone(),
            voter: voter.clone(),
            candidate: candidate.clone(),
            weight: weight.to_string(),
        };
        let mut state = self.lock();
        if state.reject_voters.contains(voter) {
            state.rejected.push(record);
            return Err(ConsensusError::VoteRejected {
                election: election.to_string(),
                voter: voter.to_string(),
                reason: "voter rejected by null election manager".to_string(),
            });
        }
        state.accepted.push(record);
        Ok(())
    }
}
