//! Weighted-majority quorum over validator signatures.
//!
//! A block reaches quorum when the weight of the validators that signed it is
//! at least 67% of the weight of every connected peer. The check is done in
//! exact unbounded integer arithmetic: `voted * 100 >= online * 67`.

use conclave_types::{Weight, WeightTotal};

/// Quorum threshold as a percentage of online weight.
pub const QUORUM_PERCENT: u32 = 67;
const PERCENT_DENOMINATOR: u32 = 100;

/// Diagnostics of one quorum evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct QuorumOutcome {
    pub reached: bool,
    /// Summed weight of the connected peers.
    pub online: WeightTotal,
    /// Summed weight of the signing validators.
    pub voted: WeightTotal,
    /// `ceil(online * 0.67)`: the smallest voted weight that reaches quorum.
    pub threshold: WeightTotal,
    /// `voted / threshold * 100`, for logging only. `None` when the threshold
    /// is zero.
    pub percentage: Option<f64>,
}

/// Evaluate quorum for the given online and voted weights.
///
/// Pure: the same inputs always give the same outcome. With no online weight
/// the threshold is zero and quorum is trivially reached.
pub fn evaluate_quorum(online_weights: &[Weight], voted_weights: &[Weight]) -> QuorumOutcome {
    let online: WeightTotal = online_weights.iter().sum();
    let voted: WeightTotal = voted_weights.iter().sum();

    let scaled_threshold = &online * QUORUM_PERCENT;
    let reached = &voted * PERCENT_DENOMINATOR >= scaled_threshold;

    let threshold = scaled_threshold.div_ceil(PERCENT_DENOMINATOR);
    let percentage = if threshold.is_zero() {
        None
    } else {
        Some(voted.to_f64() / threshold.to_f64() * 100.0)
    };

    QuorumOutcome {
        reached,
        online,
        voted,
        threshold,
        percentage,
    }
}
