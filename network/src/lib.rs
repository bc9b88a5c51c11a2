//! Container synchronization.
//!
//! A node that joins (or falls behind) pulls the confirmed chain from its
//! peers:
//! - [`sync`] — typed request/response messages and the [`PeerTransport`] seam
//! - [`sync_manager`] — out-of-order reassembly into strict chain order
//! - [`syncer`] — the genesis → chain → batches → complete state machine
//! - [`server`] — answers the same requests from the local ledger

pub mod error;
pub mod server;
pub mod sync;
pub mod sync_manager;
pub mod syncer;

pub use error::{NetworkError, SyncError};
pub use server::SyncServer;
pub use sync::{PeerTransport, SyncRequest, SyncResponse};
pub use sync_manager::{ContainerSyncManager, SyncManagerConfig};
pub use syncer::{ContainerSyncer, PassOutcome, StepOutcome, SyncConfig, SyncPhase};
