//! Shared utilities for the Conclave node.

pub mod logging;
pub mod ticker;
pub mod time;

pub use logging::init_tracing;
pub use ticker::{IntervalTicker, Ticker};
pub use time::{format_duration_ms, Clock, SystemClock};
