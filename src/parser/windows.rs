//! Parser for Windows ping output.

use std::time::Duration;

use super::{take_int, LineParser};
use crate::sample::Sample;

/// Parses ping output from Windows systems.
///
/// Reply lines look like `Reply from 8.8.8.8: bytes=32 time=14ms TTL=118`,
/// with `time<1ms` for sub-millisecond responses. Windows carries no usable
/// sequence field, so this parser numbers matched lines itself — replies
/// and timeouts both advance the counter.
#[derive(Debug, Default)]
pub struct WindowsParser {
    seq_counter: i64,
}

impl WindowsParser {
    pub fn new() -> Self {
        Self { seq_counter: 0 }
    }
}

impl LineParser for WindowsParser {
    fn parse_line(&mut self, line: &str) -> Option<Sample> {
        if let Some(rtt) = reply_rtt(line) {
            self.seq_counter += 1;
            return Some(Sample::reply(self.seq_counter, rtt));
        }
        if is_timeout(line) {
            self.seq_counter += 1;
            return Some(Sample::timed_out(self.seq_counter));
        }
        None
    }
}

/// Extract the RTT from a reply line, handling both `time=14ms` and the
/// sub-millisecond `time<1ms` form (which reads as 1ms).
fn reply_rtt(line: &str) -> Option<Duration> {
    let rest = &line[line.find("Reply from")?..];
    let mut rest = &rest[rest.find("time")? + "time".len()..];
    if let Some(stripped) = rest.strip_prefix(['<', '=']) {
        rest = stripped;
    }
    let (ms, rest) = take_int(rest)?;
    if !rest.trim_start().starts_with("ms") {
        return None;
    }
    Some(Duration::from_millis(ms as u64))
}

/// True for Windows lines that report a failed probe.
fn is_timeout(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    if lower.contains("request timed out")
        || lower.contains("transmit failed")
        || lower.contains("general failure")
    {
        return true;
    }
    matches!(
        (lower.find("destination"), lower.find("unreachable")),
        (Some(d), Some(u)) if d < u
    )
}
