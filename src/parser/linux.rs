//! Parser for Linux (iputils) ping output.

use super::{is_unix_timeout, parse_unix_reply, LineParser};
use crate::sample::{Sample, SEQUENCE_UNKNOWN};

/// Parses ping output from Linux systems.
///
/// Reply lines look like `64 bytes from 8.8.8.8: icmp_seq=1 ttl=118
/// time=14.3 ms`; sequence numbers start at 1.
#[derive(Debug, Default)]
pub struct LinuxParser;

impl LinuxParser {
    pub fn new() -> Self {
        Self
    }
}

impl LineParser for LinuxParser {
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
        LinuxParser::new().parse_line(line)
    }

    #[test]
    fn parses_reply_line() {
        let sample = parse("64 bytes from 8.8.8.8: icmp_seq=1 ttl=118 time=14.3 ms")
            .expect("reply line should match");
        assert_eq!(sample.sequence, 1);
        assert!(!sample.timeout);
        assert!((sample.rtt_ms() - 14.3).abs() < 1e-9);
    }

    #[test]
    fn fractional_rtt_round_trips_within_a_microsecond() {
        let sample = parse("64 bytes from 1.1.1.1: icmp_seq=5 ttl=118 time=14.236 ms")
            .expect("reply line should match");
        assert_eq!(sample.sequence, 5);
        let diff = if sample.rtt > Duration::from_micros(14_236) {
            sample.rtt - Duration::from_micros(14_236)
        } else {
            Duration::from_micros(14_236) - sample.rtt
        };
        assert!(diff <= Duration::from_micros(1), "off by {diff:?}");
    }

    #[test]
    fn timeout_lines_produce_timeout_samples() {
        for line in [
            "no answer yet for icmp_seq=3",
            "From 10.0.0.1 icmp_seq=4 Destination Host Unreachable",
            "From 10.0.0.1 icmp_seq=2 Time to live exceeded",
        ] {
            let sample = parse(line).unwrap_or_else(|| panic!("no match: {line}"));
            assert!(sample.timeout, "expected timeout for: {line}");
            assert_eq!(sample.rtt, Duration::ZERO);
            assert_eq!(sample.sequence, SEQUENCE_UNKNOWN);
        }
    }

    #[test]
    fn ignores_headers_and_summaries() {
        for line in [
            "PING google.com (142.250.80.46) 56(84) bytes of data.",
            "--- google.com ping statistics ---",
            "5 packets transmitted, 5 received, 0% packet loss, time 4005ms",
            "rtt min/avg/max/mdev = 13.9/14.4/15.1/0.4 ms",
            "",
        ] {
            assert!(parse(line).is_none(), "unexpected match: {line}");
        }
    }

    #[test]
    fn malformed_rtt_is_unmatched_not_an_error() {
        assert!(parse("64 bytes from 8.8.8.8: icmp_seq=1 ttl=118 time=... ms").is_none());
    }
}
