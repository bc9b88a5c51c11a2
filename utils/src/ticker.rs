//! Tick sources for periodic work.
//!
//! Periodic components (vote batching, sync retries) never own a timer. A
//! driver loop awaits a [`Ticker`] and then calls the component's one-shot
//! step, so tests can substitute a manual tick source and advance virtual
//! time deterministically.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval, Interval, MissedTickBehavior};

#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick. Returns `false` once the source is exhausted.
    async fn tick(&mut self) -> bool;
}

/// Real-time ticker backed by a tokio interval.
///
/// The first tick fires one `period` after construction, not immediately.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Ticker whose first tick fires immediately.
    pub fn immediate(period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}
