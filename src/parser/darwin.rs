//! Parser for macOS ping output.

use super::{is_unix_timeout, parse_unix_reply, LineParser};
use crate::sample::{Sample, SEQUENCE_UNKNOWN};

/// Parses ping output from macOS systems.
///
/// Same reply shape as Linux, but `icmp_seq` starts at 0 and timeouts are
/// reported as `Request timeout for icmp_seq 0`.
#[derive(Debug, Default)]
pub struct DarwinParser;

impl DarwinParser {
    pub fn new() -> Self {
        Self
    }
}

impl LineParser for DarwinParser {
    fn parse_line(&mut self, line: &str) -> Option<Sample> {
        if let Some(sample) = parse_unix_reply(line) {
            return Some(sample);
        }
        if is_unix_timeout(line) {
            return Some(Sample::timed_out(SEQUENCE_UNKNOWN));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(line: &str) -> Option<Sample> {
        DarwinParser::new().parse_line(line)
    }

    #[test]
    fn parses_reply_with_zero_based_sequence() {
        let sample = parse("64 bytes from 8.8.8.8: icmp_seq=0 ttl=118 time=14.236 ms")
            .expect("reply line should match");
        assert_eq!(sample.sequence, 0);
        assert!(!sample.timeout);
        assert!((sample.rtt_ms() - 14.236).abs() < 1e-6);
    }

    #[test]
    fn request_timeout_line_matches() {
        let sample = parse("Request timeout for icmp_seq 7").expect("timeout should match");
        assert!(sample.timeout);
        assert_eq!(sample.sequence, SEQUENCE_UNKNOWN);
        assert_eq!(sample.rtt, Duration::ZERO);
    }

    #[test]
    fn ignores_banner() {
        assert!(parse("PING 8.8.8.8 (8.8.8.8): 56 data bytes").is_none());
        assert!(parse("round-trip min/avg/max/stddev = 13.9/14.4/15.1/0.4 ms").is_none());
    }
}
