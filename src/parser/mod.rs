//! Parsers for native ping output.
//!
//! Each platform ships a materially different ping text format, timeout
//! vocabulary, and sequence-numbering behavior, so there is one parser
//! variant per platform behind a shared trait. A line either yields a
//! sample or it doesn't — headers, summaries, and malformed numeric fields
//! are all "no sample", never an error.

mod darwin;
mod linux;
mod windows;

pub use darwin::DarwinParser;
pub use linux::LinuxParser;
pub use windows::WindowsParser;

use std::time::Duration;

use crate::sample::Sample;

/// Parses single lines of ping output into samples.
pub trait LineParser: Send {
    /// Parse one line of ping output.
    ///
    /// Returns `Some(sample)` when the line carried timing or timeout
    /// information, `None` for every other line.
    fn parse_line(&mut self, line: &str) -> Option<Sample>;
}

/// The ping output dialect to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
}

impl Platform {
    /// The dialect of the running operating system.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Darwin
        } else {
            Platform::Linux
        }
    }
}

/// Build the parser for the given platform dialect.
pub fn parser_for(platform: Platform) -> Box<dyn LineParser> {
    match platform {
        Platform::Linux => Box::new(LinuxParser::new()),
        Platform::Darwin => Box::new(DarwinParser::new()),
        Platform::Windows => Box::new(WindowsParser::new()),
    }
}

/// Convert fractional milliseconds to a duration without losing the
/// sub-millisecond part.
pub(crate) fn ms_duration(ms: f64) -> Duration {
    Duration::from_secs_f64(ms / 1000.0)
}

/// Split a leading run of ASCII digits off `s` as an integer.
pub(crate) fn take_int(s: &str) -> Option<(i64, &str)> {
    let end = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if end == 0 {
        return None;
    }
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

/// Split a leading run of digits and dots off `s` as a float.
///
/// Returns `None` when the run parses to nothing sensible (for example
/// `"..."`), which callers treat as an unmatched line.
pub(crate) fn take_float(s: &str) -> Option<(f64, &str)> {
    let end = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.').len();
    if end == 0 {
        return None;
    }
    let value: f64 = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

/// Parse a Linux/macOS reply line of the shape
/// `64 bytes from 8.8.8.8: icmp_seq=1 ttl=118 time=14.3 ms`.
pub(crate) fn parse_unix_reply(line: &str) -> Option<Sample> {
    let rest = &line[line.find("icmp_seq=")? + "icmp_seq=".len()..];
    let (sequence, rest) = take_int(rest)?;
    let rest = &rest[rest.find("time=")? + "time=".len()..];
    let (ms, rest) = take_float(rest)?;
    if !rest.trim_start().starts_with("ms") {
        return None;
    }
    Some(Sample::reply(sequence, ms_duration(ms)))
}

/// True for Linux/macOS lines that report a lost probe.
pub(crate) fn is_unix_timeout(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    if lower.contains("request timeout")
        || lower.contains("no answer")
        || lower.contains("unreachable")
    {
        return true;
    }
    // "time" followed later by "exceeded", e.g. "Time to live exceeded".
    matches!(
        (lower.find("time"), lower.find("exceeded")),
        (Some(t), Some(e)) if t < e
    )
}
