//! Conclave node: hosts the consensus core and container sync.
//!
//! [`ConsensusNode`] owns the vote queue, proposal queue, consensus
//! validator, container syncer and sync server, and drives the periodic
//! work from injected tick sources. Configuration, structured logging,
//! Prometheus metrics and graceful shutdown live alongside it.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_from_config, init_logging, LogFormat};
pub use metrics::ConsensusMetrics;
pub use node::{ConsensusNode, NodeServices, SyncStatus};
pub use shutdown::ShutdownController;
