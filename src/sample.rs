//! The sample type produced by the ping output parsers.
//!
//! A [`Sample`] is created exactly once from one line of ping output and
//! flows by value through the pipeline; it is never mutated afterwards.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Sequence value for timeout lines that carry no usable sequence number.
pub const SEQUENCE_UNKNOWN: i64 = -1;

/// A single ping measurement outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Wall-clock instant the sample was observed.
    pub timestamp: DateTime<Utc>,
    /// Sequence identifier: the real ICMP sequence on Linux/macOS replies,
    /// a synthetic per-parser counter on Windows, [`SEQUENCE_UNKNOWN`] on
    /// Unix timeout lines. Diagnostic only — platforms disagree on its
    /// meaning, so arrival order is the sole ordering authority.
    pub sequence: i64,
    /// Round-trip time. Meaningful only when `timeout` is false.
    pub rtt: Duration,
    /// True when no reply was received for this probe.
    pub timeout: bool,
}

impl Sample {
    /// Create a successful reply sample, stamped with the current time.
    pub fn reply(sequence: i64, rtt: Duration) -> Self {
        Self { timestamp: Utc::now(), sequence, rtt, timeout: false }
    }

    /// Create a timeout sample, stamped with the current time.
    pub fn timed_out(sequence: i64) -> Self {
        Self { timestamp: Utc::now(), sequence, rtt: Duration::ZERO, timeout: true }
    }

    /// RTT in fractional milliseconds, or -1.0 for a timeout.
    pub fn rtt_ms(&self) -> f64 {
        if self.timeout {
            return -1.0;
        }
        duration_ms(self.rtt)
    }
}

/// Convert a duration to fractional milliseconds.
pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
