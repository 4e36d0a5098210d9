//! Empirical percentiles over RTT observations.
//!
//! Insertion is O(1); the observation list is sorted lazily before the
//! first query after a batch of inserts. Queries happen at display/export
//! rate while inserts happen once per probe, so sort-on-query wins.
//!
//! The list is append-only and never evicted — long sessions grow it
//! without bound. The engine only talks to this type through its public
//! surface, so a bounded structure could be swapped in later.

use std::time::Duration;

use serde::Serialize;

use crate::sample::duration_ms;

/// Common percentiles as a value struct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Computes percentiles from RTT observations with lazy sorting.
#[derive(Debug)]
pub struct PercentileCalculator {
    values: Vec<f64>,
    sorted: bool,
}

impl PercentileCalculator {
    pub fn new() -> Self {
        Self { values: Vec::with_capacity(1024), sorted: true }
    }

    /// Record an RTT observation.
    pub fn add(&mut self, rtt: Duration) {
        self.add_ms(duration_ms(rtt));
    }

    /// Record an observation already expressed in milliseconds.
    pub fn add_ms(&mut self, ms: f64) {
        self.values.push(ms);
        self.sorted = false;
    }

    /// Clear all observations.
    pub fn reset(&mut self) {
        self.values.clear();
        self.sorted = true;
    }

    /// Number of observations recorded.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when observations were added since the last sort.
    pub fn needs_sort(&self) -> bool {
        !self.sorted
    }

    /// Sort the observations if any were added since the last sort.
    pub fn ensure_sorted(&mut self) {
        if !self.sorted {
            self.values.sort_unstable_by(|a, b| a.total_cmp(b));
            self.sorted = true;
        }
    }

    /// The value at the given percentile (0–100), interpolating linearly
    /// between order statistics. Returns 0.0 when no observations exist.
    ///
    /// Requires [`ensure_sorted`](Self::ensure_sorted) to have run since the
    /// last insert; the owning engine guarantees this under its lock.
    pub fn percentile(&self, pct: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        debug_assert!(self.sorted, "percentile queried with unsorted observations");

        let last = self.values.len() - 1;
        if pct <= 0.0 {
            return self.values[0];
        }
        if pct >= 100.0 {
            return self.values[last];
        }

        let rank = (pct / 100.0) * last as f64;
        let lower = rank as usize;
        let upper = lower + 1;
        if upper > last {
            return self.values[last];
        }

        let frac = rank - lower as f64;
        self.values[lower] + frac * (self.values[upper] - self.values[lower])
    }

    /// The 50th percentile (median).
    pub fn p50(&self) -> f64 {
        self.percentile(50.0)
    }

    /// The 90th percentile.
    pub fn p90(&self) -> f64 {
        self.percentile(90.0)
    }

    /// The 95th percentile.
    pub fn p95(&self) -> f64 {
        self.percentile(95.0)
    }

    /// The 99th percentile.
    pub fn p99(&self) -> f64 {
        self.percentile(99.0)
    }

    /// All common percentiles at once.
    pub fn percentiles(&self) -> Percentiles {
        Percentiles { p50: self.p50(), p90: self.p90(), p95: self.p95(), p99: self.p99() }
    }
}

impl Default for PercentileCalculator {
    fn default() -> Self {
        Self::new()
    }
}
