mod app;
mod buffer;
mod config;
mod distributor;
mod errors;
mod exporter;
mod metrics;
mod parser;
mod runner;
mod sample;
mod tui;

use std::time::Duration;

use clap::Parser;
use clap_verbosity_flag::Verbosity;
use colored::Colorize;

use crate::app::App;
use crate::config::{parse_duration_arg, parse_exporter_addr, Config};
use crate::errors::MonitorError;
use crate::metrics::Stats;

/// Build-time git revision, when available.
const GIT_HASH: Option<&str> = option_env!("PINGMON_BUILD_GIT_HASH");

fn long_version() -> &'static str {
    match GIT_HASH {
        Some(hash) => {
            Box::leak(format!("{} (rev {hash})", env!("CARGO_PKG_VERSION")).into_boxed_str())
        }
        None => env!("CARGO_PKG_VERSION"),
    }
}

#[derive(Parser)]
#[command(
    name = "pingmon",
    version,
    long_version = long_version(),
    about = "Terminal ping monitor with a latency heatmap and Prometheus export"
)]
struct Cli {
    /// Target host to ping (IP address or hostname)
    target: String,

    /// Ping interval (e.g. 500ms, 1s)
    #[arg(short, long, default_value = "1s", value_parser = parse_duration_arg)]
    interval: Duration,

    /// History buffer size in samples
    #[arg(long, default_value_t = config::DEFAULT_HISTORY_SIZE, value_name = "SAMPLES")]
    history: usize,

    /// Enable the Prometheus exporter on this address (e.g. :9090)
    #[arg(long, value_name = "ADDR")]
    exporter: Option<String>,

    /// Print final statistics as JSON on exit
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    verbosity: Verbosity,
}

impl Cli {
    fn into_config(self) -> Result<Config, MonitorError> {
        let exporter_addr =
            self.exporter.as_deref().map(parse_exporter_addr).transpose()?;
        let config = Config {
            target: self.target,
            interval: self.interval,
            history_size: self.history,
            exporter_addr,
            json_report: self.json,
            ..Config::default()
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(error) => exit_with(error),
    };
    let json_report = config.json_report;

    match App::new(config).run().await {
        Ok(stats) => print_report(&stats, json_report),
        Err(error) => exit_with(error),
    }
}

fn exit_with(error: MonitorError) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), error.message);
    if let Some(suggestion) = &error.suggestion {
        eprintln!("  {}", suggestion.yellow());
    }
    std::process::exit(error.exit_code());
}

/// Print the final statistics once the terminal is back to normal.
fn print_report(stats: &Stats, json: bool) {
    if json {
        match serde_json::to_string_pretty(stats) {
            Ok(out) => println!("{out}"),
            Err(e) => eprintln!("failed to serialize statistics: {e}"),
        }
        return;
    }

    if stats.total_samples == 0 {
        println!("{}", "No samples collected.".dimmed());
        return;
    }

    println!(
        "{} {}   {} {}   {} {:.1}%",
        "Sent:".bold().white(),
        stats.total_samples,
        "Lost:".bold().white(),
        stats.total_timeouts,
        "Availability:".bold().white(),
        stats.availability_percent
    );

    if stats.total_success > 0 {
        println!(
            "{} {:.1}/{:.1}/{:.1} ms   {} {:.1} ms   {} {:.1} ms",
            "Min/Avg/Max:".bold().white(),
            stats.min_rtt_ms,
            stats.avg_rtt_ms,
            stats.max_rtt_ms,
            "σ:".bold().white(),
            stats.std_dev_ms,
            "Jitter:".bold().white(),
            stats.jitter_ms
        );
        println!(
            "{} {:.1}/{:.1}/{:.1}/{:.1} ms",
            "p50/p90/p95/p99:".bold().white(),
            stats.percentiles.p50,
            stats.percentiles.p90,
            stats.percentiles.p95,
            stats.percentiles.p99
        );
    }

    if stats.loss_bursts > 0 {
        println!(
            "{} {}   {} {} samples",
            "Outages:".bold().white(),
            stats.loss_bursts,
            "Longest drop:".bold().white(),
            stats.longest_timeout
        );
    }
}
