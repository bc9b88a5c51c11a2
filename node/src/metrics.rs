//! Prometheus metrics for the Conclave node.
//!
//! [`ConsensusMetrics`] owns a dedicated [`Registry`]. Counters mirror the
//! lifetime totals kept by the vote queue and the sync manager; gauges are
//! resampled by `ConsensusNode::refresh_metrics`.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

pub struct ConsensusMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub votes_queued: IntCounter,
    pub votes_dispatched: IntCounter,
    /// Votes the election manager refused.
    pub votes_rejected: IntCounter,
    pub proposals_queued: IntCounter,
    /// Proposals refused at capacity.
    pub proposals_rejected: IntCounter,
    /// Proposals evicted past their max age.
    pub proposals_expired: IntCounter,
    /// Containers the processor reported as added during sync.
    pub containers_applied: IntCounter,
    pub sync_passes: IntCounter,
    /// Sync passes that consumed a retry.
    pub sync_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Votes waiting across all elections.
    pub vote_backlog: IntGauge,
    pub proposal_queue_size: IntGauge,
    /// Containers fetched or listed but not yet applied.
    pub unprocessed_containers: IntGauge,
    pub sync_retries: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    pub sync_pass_duration_ms: Histogram,
}

impl ConsensusMetrics {
    /// Create a fresh set of metrics registered under a new [`Registry`].
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let votes_queued = register_int_counter_with_registry!(
            Opts::new("conclave_votes_queued_total", "Votes accepted into the vote queue"),
            registry
        )?;
        let votes_dispatched = register_int_counter_with_registry!(
            Opts::new(
                "conclave_votes_dispatched_total",
                "Votes handed to the election manager and accepted"
            ),
            registry
        )?;
        let votes_rejected = register_int_counter_with_registry!(
            Opts::new(
                "conclave_votes_rejected_total",
                "Votes the election manager rejected"
            ),
            registry
        )?;
        let proposals_queued = register_int_counter_with_registry!(
            Opts::new("conclave_proposals_queued_total", "Proposals queued"),
            registry
        )?;
        let proposals_rejected = register_int_counter_with_registry!(
            Opts::new(
                "conclave_proposals_rejected_total",
                "Proposals rejected because the queue was full"
            ),
            registry
        )?;
        let proposals_expired = register_int_counter_with_registry!(
            Opts::new(
                "conclave_proposals_expired_total",
                "Proposals evicted after exceeding their max age"
            ),
            registry
        )?;
        let containers_applied = register_int_counter_with_registry!(
            Opts::new(
                "conclave_containers_applied_total",
                "Synced containers added to the ledger"
            ),
            registry
        )?;
        let sync_passes = register_int_counter_with_registry!(
            Opts::new("conclave_sync_passes_total", "Container sync passes run"),
            registry
        )?;
        let sync_failures = register_int_counter_with_registry!(
            Opts::new(
                "conclave_sync_failures_total",
                "Container sync passes that consumed a retry"
            ),
            registry
        )?;

        let vote_backlog = register_int_gauge_with_registry!(
            Opts::new("conclave_vote_backlog", "Votes waiting to be dispatched"),
            registry
        )?;
        let proposal_queue_size = register_int_gauge_with_registry!(
            Opts::new("conclave_proposal_queue_size", "Proposals currently queued"),
            registry
        )?;
        let unprocessed_containers = register_int_gauge_with_registry!(
            Opts::new(
                "conclave_unprocessed_containers",
                "Containers queued or received but not yet applied"
            ),
            registry
        )?;
        let sync_retries = register_int_gauge_with_registry!(
            Opts::new(
                "conclave_sync_retries",
                "Consecutive failed sync steps since the last progress"
            ),
            registry
        )?;

        // 1 ms to ~16 s.
        let sync_pass_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "conclave_sync_pass_duration_ms",
                "Wall time of one sync pass in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            votes_queued,
            votes_dispatched,
            votes_rejected,
            proposals_queued,
            proposals_rejected,
            proposals_expired,
            containers_applied,
            sync_passes,
            sync_failures,
            vote_backlog,
            proposal_queue_size,
            unprocessed_containers,
            sync_retries,
            sync_pass_duration_ms,
        })
    }

    /// Advance `counter` to a lifetime `total` kept elsewhere.
    pub fn sync_counter(counter: &IntCounter, total: u64) {
        let current = counter.get();
        if total > current {
            counter.inc_by(total - current);
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let mut buf = Vec::new();
        prometheus::TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_metric() {
        let metrics = ConsensusMetrics::new().unwrap();
        metrics.votes_queued.inc();
        metrics.sync_pass_duration_ms.observe(3.0);
        assert_eq!(metrics.registry.gather().len(), 14);
    }

    #[test]
    fn sync_counter_only_moves_forward() {
        let metrics = ConsensusMetrics::new().unwrap();
        ConsensusMetrics::sync_counter(&metrics.votes_dispatched, 5);
        assert_eq!(metrics.votes_dispatched.get(), 5);
        ConsensusMetrics::sync_counter(&metrics.votes_dispatched, 3);
        assert_eq!(metrics.votes_dispatched.get(), 5);
        ConsensusMetrics::sync_counter(&metrics.votes_dispatched, 9);
        assert_eq!(metrics.votes_dispatched.get(), 9);
    }

    #[test]
    fn encodes_text_format() {
        let metrics = ConsensusMetrics::new().unwrap();
        metrics.proposal_queue_size.set(4);
        let text = metrics.encode().unwrap();
        assert!(text.contains("conclave_proposal_queue_size 4"));
    }
}
