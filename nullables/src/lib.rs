//! Nullable infrastructure for deterministic testing.
//!
//! Inspired by the "A-frame architecture" pattern from RsNano.
//! Every collaborator of the consensus core (clock, tick source, ledger,
//! peer transport, election manager) is abstracted behind a trait. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Record what was asked of them
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod election;
pub mod ledger;
pub mod network;
pub mod ticker;

pub use clock::NullClock;
pub use election::{NullElectionManager, RecordedVote};
pub use ledger::NullLedger;
pub use network::NullNetwork;
pub use ticker::{NullTicker, TickHandle};
