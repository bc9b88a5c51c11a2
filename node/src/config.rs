//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use conclave_consensus::{ProposalQueueConfig, VoteQueueConfig};
use conclave_network::SyncConfig;
use conclave_types::{NetworkId, NodeId};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a Conclave node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Hex hash of the genesis container.
    #[serde(default = "default_network_id")]
    pub network_id: String,

    /// Identity this node signs proposals under.
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default)]
    pub vote_queue: VoteQueueSection,

    #[serde(default)]
    pub proposal_queue: ProposalQueueSection,

    #[serde(default)]
    pub sync: SyncSection,
}

/// `[vote_queue]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoteQueueSection {
    #[serde(default = "default_vote_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_vote_interval_ms")]
    pub interval_ms: u64,
}

/// `[proposal_queue]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalQueueSection {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
}

/// `[sync]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_sync_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_chain_limit")]
    pub chain_limit: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network_id() -> String {
    "0".repeat(64)
}

fn default_node_id() -> String {
    "local".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_vote_batch_size() -> usize {
    VoteQueueConfig::default().batch_size
}

fn default_vote_interval_ms() -> u64 {
    VoteQueueConfig::default().interval_ms
}

fn default_max_queue_size() -> usize {
    ProposalQueueConfig::default().max_queue_size
}

fn default_max_age_ms() -> u64 {
    ProposalQueueConfig::default().max_age_ms
}

fn default_sync_batch_size() -> usize {
    SyncConfig::default().batch_size
}

fn default_max_retries() -> u32 {
    SyncConfig::default().max_retries
}

fn default_retry_delay_ms() -> u64 {
    SyncConfig::default().retry_delay_ms
}

fn default_max_attempts() -> u32 {
    SyncConfig::default().max_attempts
}

fn default_chain_limit() -> usize {
    SyncConfig::default().chain_limit
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn network_id(&self) -> Result<NetworkId, NodeError> {
        NetworkId::from_hex(&self.network_id)
            .map_err(|e| NodeError::Config(format!("network_id: {e}")))
    }

    pub fn node_id(&self) -> Result<NodeId, NodeError> {
        NodeId::parse(&self.node_id).map_err(|e| NodeError::Config(format!("node_id: {e}")))
    }

    /// Unknown formats fall back to human-readable output.
    pub fn log_format(&self) -> LogFormat {
        match self.log_format.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Human,
        }
    }

    /// Reject values the components cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.network_id()?;
        self.node_id()?;
        if self.vote_queue.batch_size == 0 {
            return Err(NodeError::Config("vote_queue.batch_size must be > 0".into()));
        }
        if self.proposal_queue.max_queue_size == 0 {
            return Err(NodeError::Config("proposal_queue.max_queue_size must be > 0".into()));
        }
        if self.sync.batch_size == 0 {
            return Err(NodeError::Config("sync.batch_size must be > 0".into()));
        }
        Ok(())
    }

    pub fn vote_queue_config(&self) -> VoteQueueConfig {
        VoteQueueConfig {
            batch_size: self.vote_queue.batch_size,
            interval_ms: self.vote_queue.interval_ms,
        }
    }

    pub fn proposal_queue_config(&self) -> ProposalQueueConfig {
        ProposalQueueConfig {
            max_queue_size: self.proposal_queue.max_queue_size,
            max_age_ms: self.proposal_queue.max_age_ms,
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            batch_size: self.sync.batch_size,
            max_retries: self.sync.max_retries,
            retry_delay_ms: self.sync.retry_delay_ms,
            max_attempts: self.sync.max_attempts,
            chain_limit: self.sync.chain_limit,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network_id: default_network_id(),
            node_id: default_node_id(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            vote_queue: VoteQueueSection::default(),
            proposal_queue: ProposalQueueSection::default(),
            sync: SyncSection::default(),
        }
    }
}

impl Default for VoteQueueSection {
    fn default() -> Self {
        Self {
            batch_size: default_vote_batch_size(),
            interval_ms: default_vote_interval_ms(),
        }
    }
}

impl Default for ProposalQueueSection {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            max_age_ms: default_max_age_ms(),
        }
    }
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            batch_size: default_sync_batch_size(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_attempts: default_max_attempts(),
            chain_limit: default_chain_limit(),
        }
    }
}
