//! The metrics engine: running aggregates over every sample seen.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::percentile::{PercentileCalculator, Percentiles};
use crate::sample::{duration_ms, Sample};

/// RTT above this threshold counts as a brownout sample.
pub const BROWNOUT_THRESHOLD_MS: f64 = 200.0;

/// A point-in-time snapshot of all computed metrics.
///
/// RTT-derived fields are populated only once at least one successful
/// sample exists; until then they hold zero defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    // Sample counts
    pub total_samples: u64,
    pub total_timeouts: u64,
    pub total_success: u64,

    // Loss and availability
    pub loss_percent: f64,
    pub availability_percent: f64,

    // RTT statistics
    pub min_rtt: Duration,
    pub max_rtt: Duration,
    pub avg_rtt: Duration,
    /// Standard deviation of successful RTTs.
    pub std_dev: Duration,
    /// Mean absolute difference between consecutive successful RTTs.
    pub jitter: Duration,
    /// Most recent successful RTT.
    pub last_rtt: Duration,

    // RTT statistics in milliseconds (for display/export)
    pub min_rtt_ms: f64,
    pub max_rtt_ms: f64,
    pub avg_rtt_ms: f64,
    pub std_dev_ms: f64,
    /// Variance in ms².
    pub variance_ms2: f64,
    pub jitter_ms: f64,
    pub last_rtt_ms: f64,

    // Streaks
    /// Positive = consecutive successes, negative = consecutive timeouts.
    pub current_streak: i64,
    pub longest_success: u64,
    pub longest_timeout: u64,

    // Percentiles over successful RTTs (milliseconds)
    pub percentiles: Percentiles,

    // Outage and instability patterns
    /// Number of separate timeout burst events.
    pub loss_bursts: u64,
    /// Number of high-latency samples (above the brownout threshold).
    pub brownout_samples: u64,
    /// Number of transitions into the brownout state.
    pub brownout_bursts: u64,
    pub in_brownout: bool,

    // Timing
    pub start_time: DateTime<Utc>,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_timeout_time: Option<DateTime<Utc>>,
    /// Elapsed time since the last timeout, if one ever happened.
    pub time_since_timeout: Option<Duration>,
    /// Seconds since monitoring started.
    pub uptime_seconds: f64,
}

impl Stats {
    /// A snapshot with zero defaults for everything but the start time.
    fn empty(start_time: DateTime<Utc>) -> Self {
        Self {
            total_samples: 0,
            total_timeouts: 0,
            total_success: 0,
            loss_percent: 0.0,
            availability_percent: 0.0,
            min_rtt: Duration::ZERO,
            max_rtt: Duration::ZERO,
            avg_rtt: Duration::ZERO,
            std_dev: Duration::ZERO,
            jitter: Duration::ZERO,
            last_rtt: Duration::ZERO,
            min_rtt_ms: 0.0,
            max_rtt_ms: 0.0,
            avg_rtt_ms: 0.0,
            std_dev_ms: 0.0,
            variance_ms2: 0.0,
            jitter_ms: 0.0,
            last_rtt_ms: 0.0,
            current_streak: 0,
            longest_success: 0,
            longest_timeout: 0,
            percentiles: Percentiles::default(),
            loss_bursts: 0,
            brownout_samples: 0,
            brownout_bursts: 0,
            in_brownout: false,
            start_time,
            last_success_time: None,
            last_timeout_time: None,
            time_since_timeout: None,
            uptime_seconds: 0.0,
        }
    }
}

/// Running aggregate state, guarded by the engine's lock.
#[derive(Debug)]
struct EngineState {
    total_samples: u64,
    total_timeouts: u64,
    min_rtt: Option<Duration>,
    max_rtt: Duration,
    sum_rtt: Duration,
    /// Sum of RTT² in microseconds², for variance via E[X²] − (E[X])².
    sum_rtt_squares_us: f64,
    last_rtt: Option<Duration>,
    sum_jitter: Duration,
    jitter_count: u64,
    current_streak: i64,
    longest_success: u64,
    longest_timeout: u64,
    percentiles: PercentileCalculator,

    // Outage tracking
    loss_bursts: u64,
    in_timeout_burst: bool,
    brownout_samples: u64,
    brownout_bursts: u64,
    in_brownout: bool,

    // Timing
    start_time: DateTime<Utc>,
    last_success_time: Option<DateTime<Utc>>,
    last_timeout_time: Option<DateTime<Utc>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            total_samples: 0,
            total_timeouts: 0,
            min_rtt: None,
            max_rtt: Duration::ZERO,
            sum_rtt: Duration::ZERO,
            sum_rtt_squares_us: 0.0,
            last_rtt: None,
            sum_jitter: Duration::ZERO,
            jitter_count: 0,
            current_streak: 0,
            longest_success: 0,
            longest_timeout: 0,
            percentiles: PercentileCalculator::new(),
            loss_bursts: 0,
            in_timeout_burst: false,
            brownout_samples: 0,
            brownout_bursts: 0,
            in_brownout: false,
            start_time: Utc::now(),
            last_success_time: None,
            last_timeout_time: None,
        }
    }

    /// Build a snapshot. The percentile store must already be sorted.
    fn snapshot(&self) -> Stats {
        let total_success = self.total_samples - self.total_timeouts;

        let mut stats = Stats::empty(self.start_time);
        stats.total_samples = self.total_samples;
        stats.total_timeouts = self.total_timeouts;
        stats.total_success = total_success;
        stats.current_streak = self.current_streak;
        stats.longest_success = self.longest_success;
        stats.longest_timeout = self.longest_timeout;
        stats.loss_bursts = self.loss_bursts;
        stats.brownout_samples = self.brownout_samples;
        stats.brownout_bursts = self.brownout_bursts;
        stats.in_brownout = self.in_brownout;
        stats.uptime_seconds =
            (Utc::now() - self.start_time).num_milliseconds().max(0) as f64 / 1000.0;

        if self.total_samples > 0 {
            stats.loss_percent =
                self.total_timeouts as f64 / self.total_samples as f64 * 100.0;
            stats.availability_percent = 100.0 - stats.loss_percent;
        }

        if total_success > 0 {
            let min_rtt = self.min_rtt.unwrap_or_default();
            let last_rtt = self.last_rtt.unwrap_or_default();
            stats.min_rtt = min_rtt;
            stats.max_rtt = self.max_rtt;
            stats.avg_rtt = self.sum_rtt.div_f64(total_success as f64);
            stats.last_rtt = last_rtt;
            stats.percentiles = self.percentiles.percentiles();

            // Variance = E[X²] − (E[X])², clamped against floating-point
            // error going negative.
            let n = total_success as f64;
            let mean_us = self.sum_rtt.as_micros() as f64 / n;
            let variance_us = ((self.sum_rtt_squares_us / n) - mean_us * mean_us).max(0.0);
            let std_dev_us = variance_us.sqrt();
            stats.std_dev = Duration::from_micros(std_dev_us as u64);

            stats.min_rtt_ms = duration_ms(min_rtt);
            stats.max_rtt_ms = duration_ms(self.max_rtt);
            stats.avg_rtt_ms = duration_ms(stats.avg_rtt);
            stats.std_dev_ms = std_dev_us / 1000.0;
            stats.variance_ms2 = variance_us / 1_000_000.0;
            stats.last_rtt_ms = duration_ms(last_rtt);

            stats.last_success_time = self.last_success_time;
        }

        if self.jitter_count > 0 {
            stats.jitter = self.sum_jitter.div_f64(self.jitter_count as f64);
            stats.jitter_ms = duration_ms(stats.jitter);
        }

        if let Some(last_timeout) = self.last_timeout_time {
            stats.last_timeout_time = Some(last_timeout);
            stats.time_since_timeout =
                (Utc::now() - last_timeout).to_std().ok();
        }

        stats
    }
}

/// Computes metrics from ping samples.
///
/// The writer (`add`) takes exclusive access; readers (`stats`) share,
/// except when a percentile resort is pending, in which case the snapshot
/// is built under one exclusive acquisition so no caller ever observes a
/// partially-updated view.
#[derive(Debug)]
pub struct Engine {
    inner: RwLock<EngineState>,
}

impl Engine {
    pub fn new() -> Self {
        Self { inner: RwLock::new(EngineState::new()) }
    }

    /// Process a new ping sample.
    pub fn add(&self, sample: Sample) {
        let mut s = self.write();

        s.total_samples += 1;

        if sample.timeout {
            s.total_timeouts += 1;
            s.last_timeout_time = Some(sample.timestamp);

            // New burst only when transitioning from success to timeout.
            if !s.in_timeout_burst {
                s.loss_bursts += 1;
                s.in_timeout_burst = true;
            }

            // A timeout is never simultaneously a brownout.
            s.in_brownout = false;

            s.current_streak =
                if s.current_streak > 0 { -1 } else { s.current_streak - 1 };
            let run = s.current_streak.unsigned_abs();
            if run > s.longest_timeout {
                s.longest_timeout = run;
            }
            return;
        }

        // Successful ping
        s.last_success_time = Some(sample.timestamp);
        s.in_timeout_burst = false;

        let rtt = sample.rtt;
        if duration_ms(rtt) > BROWNOUT_THRESHOLD_MS {
            s.brownout_samples += 1;
            if !s.in_brownout {
                s.brownout_bursts += 1;
                s.in_brownout = true;
            }
        } else {
            s.in_brownout = false;
        }

        s.min_rtt = Some(s.min_rtt.map_or(rtt, |m| m.min(rtt)));
        s.max_rtt = s.max_rtt.max(rtt);
        s.sum_rtt += rtt;

        let rtt_us = rtt.as_micros() as f64;
        s.sum_rtt_squares_us += rtt_us * rtt_us;

        // Jitter counts deltas between consecutive successes; timeouts
        // neither contribute a delta nor break the chain.
        if let Some(prev) = s.last_rtt {
            let diff = if rtt > prev { rtt - prev } else { prev - rtt };
            s.sum_jitter += diff;
            s.jitter_count += 1;
        }
        s.last_rtt = Some(rtt);

        s.current_streak =
            if s.current_streak < 0 { 1 } else { s.current_streak + 1 };
        if s.current_streak as u64 > s.longest_success {
            s.longest_success = s.current_streak as u64;
        }

        s.percentiles.add(rtt);
    }

    /// The current computed metrics.
    pub fn stats(&self) -> Stats {
        {
            let s = self.read();
            if !s.percentiles.needs_sort() {
                return s.snapshot();
            }
        }

        // Samples arrived since the last query; the lazy sort needs the
        // write lock, and snapshotting under it keeps the view atomic.
        let mut s = self.write();
        s.percentiles.ensure_sorted();
        s.snapshot()
    }

    /// Return the engine to its initial state, restarting the uptime clock.
    pub fn reset(&self) {
        *self.write() = EngineState::new();
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn success(ms: u64) -> Sample {
        Sample::reply(0, Duration::from_millis(ms))
    }

    fn timeout() -> Sample {
        Sample::timed_out(-1)
    }

    fn engine_with(samples: &[Sample]) -> Engine {
        let engine = Engine::new();
        for &sample in samples {
            engine.add(sample);
        }
        engine
    }

    #[test]
    fn empty_engine_has_zero_stats() {
        let stats = Engine::new().stats();
        assert_eq!(stats.total_samples, 0);
        assert_eq!(stats.loss_percent, 0.0);
        assert_eq!(stats.availability_percent, 0.0);
        assert_eq!(stats.min_rtt, Duration::ZERO);
        assert_eq!(stats.percentiles.p99, 0.0);
        assert!(stats.last_success_time.is_none());
        assert!(stats.last_timeout_time.is_none());
    }

    #[test]
    fn counts_split_by_outcome() {
        let stats =
            engine_with(&[success(10), timeout(), success(12), success(9)]).stats();
        assert_eq!(stats.total_samples, 4);
        assert_eq!(stats.total_timeouts, 1);
        assert_eq!(stats.total_success, 3);
    }

    #[test]
    fn availability_scenario() {
        let stats =
            engine_with(&[success(10), success(10), success(10), timeout()]).stats();
        assert_eq!(stats.total_success, 3);
        assert!((stats.loss_percent - 25.0).abs() < 1e-9);
        assert!((stats.availability_percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn streak_scenario() {
        let stats = engine_with(&[
            success(10),
            success(10),
            success(10),
            timeout(),
            timeout(),
        ])
        .stats();
        assert_eq!(stats.current_streak, -2);
        assert_eq!(stats.longest_success, 3);
        assert_eq!(stats.longest_timeout, 2);
    }

    #[test]
    fn streak_recovers_after_timeouts() {
        let stats = engine_with(&[timeout(), timeout(), success(10)]).stats();
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_timeout, 2);
        assert_eq!(stats.longest_success, 1);
    }

    #[test]
    fn jitter_is_mean_absolute_consecutive_difference() {
        let stats = engine_with(&[success(10), success(20), success(15)]).stats();
        // (|20-10| + |15-20|) / 2 = 7.5ms
        assert!((stats.jitter_ms - 7.5).abs() < 0.001, "jitter {}", stats.jitter_ms);
    }

    #[test]
    fn jitter_chain_survives_timeouts() {
        let stats = engine_with(&[success(10), timeout(), success(20)]).stats();
        // The timeout contributes no delta; |20-10| / 1 = 10ms.
        assert!((stats.jitter_ms - 10.0).abs() < 0.001);
    }

    #[test]
    fn stddev_scenario() {
        let stats = engine_with(&[success(10), success(20), success(30)]).stats();
        assert!((stats.variance_ms2 - 66.67).abs() < 0.1, "var {}", stats.variance_ms2);
        assert!((stats.std_dev_ms - 8.165).abs() < 0.1, "σ {}", stats.std_dev_ms);
        assert!((stats.avg_rtt_ms - 20.0).abs() < 0.001);
    }

    #[test]
    fn min_max_last_track_successes_only() {
        let stats =
            engine_with(&[success(30), timeout(), success(10), success(20)]).stats();
        assert_eq!(stats.min_rtt, Duration::from_millis(10));
        assert_eq!(stats.max_rtt, Duration::from_millis(30));
        assert_eq!(stats.last_rtt, Duration::from_millis(20));
    }

    #[test]
    fn loss_bursts_count_runs_not_samples() {
        let stats = engine_with(&[
            success(10),
            timeout(),
            timeout(),
            timeout(),
            success(10),
            timeout(),
            success(10),
        ])
        .stats();
        assert_eq!(stats.loss_bursts, 2);
        assert_eq!(stats.total_timeouts, 4);
    }

    #[test]
    fn leading_timeouts_open_a_burst() {
        let stats = engine_with(&[timeout(), timeout()]).stats();
        assert_eq!(stats.loss_bursts, 1);
    }

    #[test]
    fn brownout_transition_table() {
        let engine = Engine::new();

        engine.add(success(250));
        let stats = engine.stats();
        assert!(stats.in_brownout);
        assert_eq!(stats.brownout_samples, 1);
        assert_eq!(stats.brownout_bursts, 1);

        // Staying high extends the burst without opening a new one.
        engine.add(success(300));
        let stats = engine.stats();
        assert!(stats.in_brownout);
        assert_eq!(stats.brownout_samples, 2);
        assert_eq!(stats.brownout_bursts, 1);

        // A fast reply exits brownout.
        engine.add(success(20));
        let stats = engine.stats();
        assert!(!stats.in_brownout);
        assert_eq!(stats.brownout_bursts, 1);

        // Re-entry opens a second burst.
        engine.add(success(400));
        let stats = engine.stats();
        assert!(stats.in_brownout);
        assert_eq!(stats.brownout_bursts, 2);

        // A timeout exits brownout unconditionally and never counts a
        // brownout burst of its own.
        engine.add(timeout());
        let stats = engine.stats();
        assert!(!stats.in_brownout);
        assert_eq!(stats.brownout_bursts, 2);
        assert_eq!(stats.brownout_samples, 3);
    }

    #[test]
    fn threshold_is_exclusive() {
        let stats = engine_with(&[success(200)]).stats();
        assert!(!stats.in_brownout);
        assert_eq!(stats.brownout_samples, 0);
    }

    #[test]
    fn percentiles_are_monotonic() {
        let stats = engine_with(&[
            success(5),
            success(80),
            success(12),
            success(33),
            success(7),
            success(150),
        ])
        .stats();
        let p = stats.percentiles;
        assert!(p.p50 <= p.p90);
        assert!(p.p90 <= p.p95);
        assert!(p.p95 <= p.p99);
    }

    #[test]
    fn stats_is_idempotent_between_adds() {
        let engine = engine_with(&[success(10), timeout(), success(20)]);
        let first = engine.stats();
        let second = engine.stats();

        // The clock-derived fields move with the wall clock; everything
        // else must be byte-identical.
        assert_eq!(first.total_samples, second.total_samples);
        assert_eq!(first.total_timeouts, second.total_timeouts);
        assert_eq!(first.loss_percent, second.loss_percent);
        assert_eq!(first.min_rtt, second.min_rtt);
        assert_eq!(first.max_rtt, second.max_rtt);
        assert_eq!(first.avg_rtt, second.avg_rtt);
        assert_eq!(first.std_dev, second.std_dev);
        assert_eq!(first.jitter, second.jitter);
        assert_eq!(first.percentiles, second.percentiles);
        assert_eq!(first.current_streak, second.current_streak);
        assert_eq!(first.loss_bursts, second.loss_bursts);
        assert_eq!(first.last_success_time, second.last_success_time);
        assert_eq!(first.last_timeout_time, second.last_timeout_time);
        assert_eq!(first.start_time, second.start_time);
    }

    #[test]
    fn all_timeout_stream_leaves_latency_at_defaults() {
        let stats = engine_with(&[timeout(), timeout(), timeout()]).stats();
        assert_eq!(stats.total_success, 0);
        assert_eq!(stats.loss_percent, 100.0);
        assert_eq!(stats.availability_percent, 0.0);
        assert_eq!(stats.min_rtt, Duration::ZERO);
        assert_eq!(stats.avg_rtt_ms, 0.0);
        assert_eq!(stats.percentiles.p50, 0.0);
        assert_eq!(stats.current_streak, -3);
    }

    #[test]
    fn reset_restores_initial_state() {
        let engine = engine_with(&[success(250), timeout(), success(10)]);
        engine.reset();
        let stats = engine.stats();

        assert_eq!(stats.total_samples, 0);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.loss_bursts, 0);
        assert_eq!(stats.brownout_bursts, 0);
        assert!(!stats.in_brownout);
        assert_eq!(stats.percentiles, Percentiles::default());
        assert!(stats.last_success_time.is_none());
        assert!(stats.last_timeout_time.is_none());

        // The engine keeps working after a reset.
        engine.add(success(5));
        assert_eq!(engine.stats().total_samples, 1);
    }

    #[test]
    fn ui_clear_does_not_touch_cumulative_stats() {
        // The display buffer and the engine reset independently: clearing
        // the scroll-back must leave every cumulative metric intact.
        use crate::buffer::RingBuffer;

        let engine = Engine::new();
        let history: RingBuffer<Sample> = RingBuffer::new(16);
        for sample in [success(10), timeout(), success(20)] {
            history.push(sample);
            engine.add(sample);
        }

        history.clear();

        let stats = engine.stats();
        assert_eq!(history.len(), 0);
        assert_eq!(stats.total_samples, 3);
        assert_eq!(stats.total_timeouts, 1);
        assert_eq!(stats.loss_bursts, 1);
    }

    proptest! {
        /// total = timeouts + successes after every add, and the derived
        /// availability always complements loss.
        #[test]
        fn count_invariants(outcomes in prop::collection::vec(any::<bool>(), 1..128)) {
            let engine = Engine::new();
            for (i, &is_timeout) in outcomes.iter().enumerate() {
                if is_timeout {
                    engine.add(timeout());
                } else {
                    engine.add(success((i % 50) as u64 + 1));
                }

                let stats = engine.stats();
                prop_assert_eq!(
                    stats.total_samples,
                    stats.total_timeouts + stats.total_success
                );
                prop_assert!(
                    (stats.loss_percent + stats.availability_percent - 100.0).abs()
                        < 1e-9
                );
            }
        }

        /// Percentiles stay ordered for any mix of successful RTTs.
        #[test]
        fn percentile_ordering(rtts in prop::collection::vec(1u64..2000, 1..64)) {
            let engine = Engine::new();
            for ms in rtts {
                engine.add(success(ms));
            }
            let p = engine.stats().percentiles;
            prop_assert!(p.p50 <= p.p90 && p.p90 <= p.p95 && p.p95 <= p.p99);
        }
    }
}
