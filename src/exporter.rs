//! Prometheus metrics export.
//!
//! Translates each [`Stats`] snapshot into the `metrics` facade; the
//! Prometheus exporter backend owns the HTTP listener and the exposition
//! wire format. The engine's totals are cumulative, so counters advance by
//! the delta against the previously exported snapshot.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use log::info;
// Leading `::` disambiguates the metrics facade crate from this crate's
// own metrics module.
use ::metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::errors::MonitorError;
use crate::metrics::Stats;

/// Totals from the last exported snapshot, for counter deltas.
#[derive(Debug, Clone, Copy, Default)]
struct ExportedTotals {
    sent: u64,
    success: u64,
    timeouts: u64,
}

/// Pushes ping statistics to a Prometheus scrape endpoint.
pub struct PingExporter {
    target: String,
    prev: Mutex<ExportedTotals>,
}

impl PingExporter {
    /// Install the Prometheus recorder and HTTP listener on `addr`.
    ///
    /// Must be called from within the tokio runtime; the listener serves
    /// `/metrics` until the process exits.
    pub fn install(addr: SocketAddr, target: &str) -> Result<Arc<Self>, MonitorError> {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| {
                MonitorError::exporter(format!(
                    "failed to start metrics endpoint on {addr}"
                ))
                .with_source(e)
            })?;

        describe_metrics();
        info!("prometheus exporter listening on {addr}");

        Ok(Arc::new(Self {
            target: target.to_string(),
            prev: Mutex::new(ExportedTotals::default()),
        }))
    }

    /// Export one statistics snapshot.
    ///
    /// Called synchronously once per processed sample; only in-memory state
    /// is touched here, the HTTP side serves whatever was recorded last.
    pub fn update(&self, stats: &Stats) {
        let deltas = {
            let mut prev =
                self.prev.lock().unwrap_or_else(PoisonError::into_inner);
            let deltas = ExportedTotals {
                // saturating: after an engine reset the totals shrink and
                // the counters simply hold still.
                sent: stats.total_samples.saturating_sub(prev.sent),
                success: stats.total_success.saturating_sub(prev.success),
                timeouts: stats.total_timeouts.saturating_sub(prev.timeouts),
            };
            *prev = ExportedTotals {
                sent: stats.total_samples,
                success: stats.total_success,
                timeouts: stats.total_timeouts,
            };
            deltas
        };

        let target = self.target.clone();

        counter!("pingmon_ping_sent_total", "target" => target.clone())
            .increment(deltas.sent);
        counter!("pingmon_ping_success_total", "target" => target.clone())
            .increment(deltas.success);
        counter!("pingmon_ping_timeout_total", "target" => target.clone())
            .increment(deltas.timeouts);

        gauge!("pingmon_ping_loss_percent", "target" => target.clone())
            .set(stats.loss_percent);
        gauge!("pingmon_ping_availability_percent", "target" => target.clone())
            .set(stats.availability_percent);

        gauge!("pingmon_ping_current_streak", "target" => target.clone())
            .set(stats.current_streak as f64);
        gauge!("pingmon_ping_longest_success_streak", "target" => target.clone())
            .set(stats.longest_success as f64);
        gauge!("pingmon_ping_longest_timeout_streak", "target" => target.clone())
            .set(stats.longest_timeout as f64);

        gauge!("pingmon_ping_loss_bursts", "target" => target.clone())
            .set(stats.loss_bursts as f64);
        gauge!("pingmon_ping_brownout_samples", "target" => target.clone())
            .set(stats.brownout_samples as f64);
        gauge!("pingmon_ping_brownout_bursts", "target" => target.clone())
            .set(stats.brownout_bursts as f64);
        gauge!("pingmon_ping_in_brownout", "target" => target.clone())
            .set(if stats.in_brownout { 1.0 } else { 0.0 });

        gauge!("pingmon_uptime_seconds", "target" => target.clone())
            .set(stats.uptime_seconds);

        // Up means the last probe was answered.
        gauge!("pingmon_ping_up", "target" => target.clone())
            .set(if stats.current_streak > 0 { 1.0 } else { 0.0 });

        if stats.total_success > 0 {
            for (stat, value) in [
                ("min", stats.min_rtt_ms),
                ("avg", stats.avg_rtt_ms),
                ("max", stats.max_rtt_ms),
            ] {
                gauge!(
                    "pingmon_ping_latency_ms",
                    "target" => target.clone(),
                    "stat" => stat
                )
                .set(value);
            }

            gauge!("pingmon_ping_stddev_ms", "target" => target.clone())
                .set(stats.std_dev_ms);
            gauge!("pingmon_ping_variance_ms2", "target" => target.clone())
                .set(stats.variance_ms2);
            gauge!("pingmon_ping_jitter_ms", "target" => target.clone())
                .set(stats.jitter_ms);

            // -1 while a timeout streak is in progress.
            let last_rtt =
                if stats.current_streak > 0 { stats.last_rtt_ms } else { -1.0 };
            gauge!("pingmon_ping_last_rtt_ms", "target" => target.clone())
                .set(last_rtt);

            gauge!("pingmon_ping_latency_p50_ms", "target" => target.clone())
                .set(stats.percentiles.p50);
            gauge!("pingmon_ping_latency_p90_ms", "target" => target.clone())
                .set(stats.percentiles.p90);
            gauge!("pingmon_ping_latency_p95_ms", "target" => target.clone())
                .set(stats.percentiles.p95);
            gauge!("pingmon_ping_latency_p99_ms", "target" => target.clone())
                .set(stats.percentiles.p99);
        }
    }
}

/// Register help text for everything this exporter records.
fn describe_metrics() {
    describe_counter!("pingmon_ping_sent_total", "Total number of ping probes sent");
    describe_counter!(
        "pingmon_ping_success_total",
        "Total number of successful ping responses"
    );
    describe_counter!("pingmon_ping_timeout_total", "Total number of ping timeouts");
    describe_gauge!("pingmon_ping_loss_percent", "Packet loss percentage (0-100)");
    describe_gauge!(
        "pingmon_ping_availability_percent",
        "Availability percentage (0-100)"
    );
    describe_gauge!(
        "pingmon_ping_current_streak",
        "Current streak (positive=success, negative=timeout)"
    );
    describe_gauge!(
        "pingmon_ping_longest_success_streak",
        "Longest run of consecutive successful pings"
    );
    describe_gauge!(
        "pingmon_ping_longest_timeout_streak",
        "Longest run of consecutive timeouts"
    );
    describe_gauge!(
        "pingmon_ping_loss_bursts",
        "Number of separate packet loss burst events"
    );
    describe_gauge!(
        "pingmon_ping_brownout_samples",
        "Total number of high-latency samples"
    );
    describe_gauge!(
        "pingmon_ping_brownout_bursts",
        "Number of transitions into high latency"
    );
    describe_gauge!(
        "pingmon_ping_in_brownout",
        "Currently in brownout state (1=yes, 0=no)"
    );
    describe_gauge!("pingmon_uptime_seconds", "Seconds since monitoring started");
    describe_gauge!(
        "pingmon_ping_up",
        "Target is reachable based on the last ping (1=up, 0=down)"
    );
    describe_gauge!(
        "pingmon_ping_latency_ms",
        "Ping latency in milliseconds (min, avg, max)"
    );
    describe_gauge!(
        "pingmon_ping_stddev_ms",
        "Standard deviation of ping latency in milliseconds"
    );
    describe_gauge!(
        "pingmon_ping_variance_ms2",
        "Variance of ping latency in milliseconds squared"
    );
    describe_gauge!(
        "pingmon_ping_jitter_ms",
        "Mean absolute difference between consecutive RTTs in milliseconds"
    );
    describe_gauge!(
        "pingmon_ping_last_rtt_ms",
        "Most recent RTT in milliseconds (-1 while timing out)"
    );
    describe_gauge!("pingmon_ping_latency_p50_ms", "Median latency in milliseconds");
    describe_gauge!(
        "pingmon_ping_latency_p90_ms",
        "90th percentile latency in milliseconds"
    );
    describe_gauge!(
        "pingmon_ping_latency_p95_ms",
        "95th percentile latency in milliseconds"
    );
    describe_gauge!(
        "pingmon_ping_latency_p99_ms",
        "99th percentile latency in milliseconds"
    );
}
