//! Streaming metrics over the ping sample stream.
//!
//! The [`Engine`] is the single mutable aggregator: the distributor feeds
//! it samples while the render and export loops read [`Stats`] snapshots
//! concurrently.

mod engine;
mod percentile;

pub use engine::{Engine, Stats, BROWNOUT_THRESHOLD_MS};
pub use percentile::{PercentileCalculator, Percentiles};
