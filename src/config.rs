//! Runtime configuration and validation.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::errors::MonitorError;

/// Shortest allowed probe interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);
/// Longest allowed probe interval.
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);
/// Default probe interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
/// Default scroll-back capacity in samples.
pub const DEFAULT_HISTORY_SIZE: usize = 30_000;

/// All configuration options for a monitoring run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Target host to ping.
    pub target: String,
    /// Ping interval.
    pub interval: Duration,
    /// Scroll-back history length in samples.
    pub history_size: usize,
    /// Capacity of the parser → distributor channel.
    pub sample_buffer: usize,
    /// Capacity of the distributor → UI sample channel.
    pub ui_buffer: usize,
    /// Capacity of the distributor → UI stats channel.
    pub stats_buffer: usize,
    /// Prometheus exporter listen address, when enabled.
    pub exporter_addr: Option<SocketAddr>,
    /// Print the final statistics as JSON on exit.
    pub json_report: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: String::new(),
            interval: DEFAULT_INTERVAL,
            history_size: DEFAULT_HISTORY_SIZE,
            sample_buffer: 100,
            ui_buffer: 100,
            stats_buffer: 10,
            exporter_addr: None,
            json_report: false,
        }
    }
}

impl Config {
    /// Check the configuration for problems a run would hit immediately.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.target.is_empty() {
            return Err(MonitorError::config("target host required"));
        }
        if !is_valid_target(&self.target) {
            return Err(MonitorError::config(format!(
                "invalid target: {}",
                self.target
            ))
            .with_suggestion("Use an IP address or an RFC 1123 hostname."));
        }
        if self.interval < MIN_INTERVAL {
            return Err(MonitorError::config("interval must be at least 100ms"));
        }
        if self.interval > MAX_INTERVAL {
            return Err(MonitorError::config("interval must be at most 1 hour"));
        }
        if self.history_size == 0 {
            return Err(MonitorError::config("history size must be positive"));
        }
        Ok(())
    }
}

/// True for IP literals (bracketed and zoned forms included) and RFC 1123
/// hostnames.
fn is_valid_target(target: &str) -> bool {
    let host = target
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(target);
    let bare = host.split('%').next().unwrap_or(host);
    if bare.parse::<IpAddr>().is_ok() {
        return true;
    }
    is_valid_hostname(target)
}

fn is_valid_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Parse a `--exporter` address; a bare `:9090` binds all interfaces.
pub fn parse_exporter_addr(addr: &str) -> Result<SocketAddr, MonitorError> {
    let normalized = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    };
    normalized.parse().map_err(|_| {
        MonitorError::config(format!("invalid exporter address: {addr}"))
            .with_suggestion("Use host:port, e.g. 127.0.0.1:9090 or :9090.")
    })
}

/// Parse a duration argument such as `500ms`, `2s`, `1.5s`, `1m`, or `1h`.
pub fn parse_duration_arg(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let unit_start = value
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| format!("missing unit in duration '{value}' (try 500ms or 1s)"))?;
    let (number, unit) = value.split_at(unit_start);
    let number: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{value}'"))?;

    let seconds = match unit {
        "ms" => number / 1000.0,
        "s" => number,
        "m" => number * 60.0,
        "h" => number * 3600.0,
        _ => return Err(format!("unknown duration unit '{unit}' (use ms, s, m, or h)")),
    };
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("invalid duration '{value}'"));
    }
    Ok(Duration::from_secs_f64(seconds))
}
