//! Ping subprocess execution.
//!
//! Builds the platform-specific ping invocation, spawns it, and feeds
//! every stdout and stderr line through the platform parser, emitting
//! matched samples on a bounded channel until the process ends or
//! shutdown is requested.

use std::net::Ipv6Addr;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};

use crate::errors::MonitorError;
use crate::parser::{parser_for, LineParser, Platform};
use crate::sample::Sample;

/// How many stderr lines to keep for error reporting.
const STDERR_TAIL_LINES: usize = 16;

/// A fully-resolved ping invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingCommand {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

/// Build the ping command line for a platform.
///
/// Unix platforms pin the locale to C so the output stays in English
/// regardless of system settings; Windows routes through `cmd.exe` to set
/// code page 437 for the same reason.
pub fn build_command(
    platform: Platform,
    target: &str,
    interval: Duration,
) -> Result<PingCommand, MonitorError> {
    let target = normalize_target(target);
    let interval_arg = format_interval(interval);
    let c_locale = vec![
        ("LC_ALL".to_string(), "C".to_string()),
        ("LANG".to_string(), "C".to_string()),
    ];

    match platform {
        Platform::Linux => {
            let mut args = Vec::new();
            if is_ipv6_literal(target) {
                args.push("-6".to_string());
            }
            args.extend(["-i".to_string(), interval_arg, target.to_string()]);
            Ok(PingCommand { program: "ping".to_string(), args, envs: c_locale })
        }
        Platform::Darwin => {
            // macOS ships a separate ping6 for IPv6 literals.
            let program = if is_ipv6_literal(target) { "ping6" } else { "ping" };
            Ok(PingCommand {
                program: program.to_string(),
                args: vec!["-i".to_string(), interval_arg, target.to_string()],
                envs: c_locale,
            })
        }
        Platform::Windows => {
            validate_windows_target(target)?;
            // Windows ping has no sub-second interval; -t pings continuously.
            let command_line =
                format!("chcp 437 >nul & ping -t {}", quote_cmd_arg(target));
            Ok(PingCommand {
                program: "cmd.exe".to_string(),
                args: vec!["/C".to_string(), command_line],
                envs: Vec::new(),
            })
        }
    }
}

/// Executes ping and emits parsed samples.
pub struct Runner {
    target: String,
    interval: Duration,
    platform: Platform,
}

impl Runner {
    pub fn new(target: impl Into<String>, interval: Duration, platform: Platform) -> Self {
        Self { target: target.into(), interval, platform }
    }

    /// Run the ping process and send samples to the channel.
    ///
    /// Returns when the process exits, the sample receiver is dropped, or
    /// the shutdown signal fires; the child is killed on the latter two.
    pub async fn run(
        self,
        samples: mpsc::Sender<Sample>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), MonitorError> {
        let command = build_command(self.platform, &self.target, self.interval)?;
        let mut parser = parser_for(self.platform);

        debug!("starting `{} {}`", command.program, command.args.join(" "));

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MonitorError::ping(format!(
                    "failed to start `{} {}`",
                    command.program,
                    command.args.join(" ")
                ))
                .with_source(e)
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MonitorError::ping("ping stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MonitorError::ping("ping stderr was not captured"))?;

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut stderr_tail: Vec<String> = Vec::new();

        while stdout_open || stderr_open {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("shutdown requested, stopping ping process");
                    let _ = child.kill().await;
                    return Ok(());
                }
                line = stdout_lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => {
                        if !emit(parser.as_mut(), &line, &samples).await {
                            let _ = child.kill().await;
                            return Ok(());
                        }
                    }
                    Ok(None) => stdout_open = false,
                    Err(e) => {
                        warn!("error reading ping stdout: {e}");
                        stdout_open = false;
                    }
                },
                line = stderr_lines.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => {
                        // Some systems report timeouts on stderr, so it goes
                        // through the parser too; keep a tail for errors.
                        if stderr_tail.len() < STDERR_TAIL_LINES {
                            stderr_tail.push(line.clone());
                        }
                        if !emit(parser.as_mut(), &line, &samples).await {
                            let _ = child.kill().await;
                            return Ok(());
                        }
                    }
                    Ok(None) => stderr_open = false,
                    Err(e) => {
                        warn!("error reading ping stderr: {e}");
                        stderr_open = false;
                    }
                },
            }
        }

        let status = child.wait().await.map_err(|e| {
            MonitorError::ping("failed waiting for ping to exit").with_source(e)
        })?;

        if *shutdown.borrow() {
            return Ok(());
        }
        if !status.success() {
            let mut error =
                MonitorError::ping(format!("ping exited unexpectedly ({status})"));
            if !stderr_tail.is_empty() {
                error = error
                    .with_suggestion(format!("ping reported: {}", stderr_tail.join(" / ")));
            }
            return Err(error);
        }
        Ok(())
    }
}

/// Parse one line and forward any sample; false when the receiver is gone.
async fn emit(
    parser: &mut dyn LineParser,
    line: &str,
    samples: &mpsc::Sender<Sample>,
) -> bool {
    match parser.parse_line(line) {
        Some(sample) => samples.send(sample).await.is_ok(),
        None => true,
    }
}

/// Strip the brackets off a `[::1]`-style IPv6 literal.
fn normalize_target(target: &str) -> &str {
    target
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(target)
}

/// True for bare IPv6 literals, with or without a `%zone` suffix.
fn is_ipv6_literal(target: &str) -> bool {
    let host = target.split('%').next().unwrap_or(target);
    host.parse::<Ipv6Addr>().is_ok()
}

/// Format an interval in seconds with minimal decimals.
fn format_interval(interval: Duration) -> String {
    format!("{}", interval.as_secs_f64())
}

/// Windows targets are interpolated into a cmd.exe line, so the accepted
/// character set is restricted.
fn validate_windows_target(target: &str) -> Result<(), MonitorError> {
    if target.is_empty() {
        return Err(MonitorError::config("target host required"));
    }
    let ok = target.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | ':' | '%')
    });
    if !ok {
        return Err(MonitorError::config(
            "target contains unsupported characters for Windows ping",
        ));
    }
    Ok(())
}

/// Quote a cmd.exe argument, escaping `%` to stop variable expansion.
fn quote_cmd_arg(arg: &str) -> String {
    format!("\"{}\"", arg.replace('%', "^%"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_command_uses_interval_flag() {
        let command =
            build_command(Platform::Linux, "example.com", Duration::from_secs(1)).unwrap();
        assert_eq!(command.program, "ping");
        assert_eq!(command.args, vec!["-i", "1", "example.com"]);
        assert!(command.envs.contains(&("LC_ALL".to_string(), "C".to_string())));
    }

    #[test]
    fn linux_ipv6_literal_gets_dash_six() {
        let command =
            build_command(Platform::Linux, "2001:db8::1", Duration::from_secs(1)).unwrap();
        assert_eq!(command.args, vec!["-6", "-i", "1", "2001:db8::1"]);
    }

    #[test]
    fn darwin_uses_ping6_for_ipv6() {
        let v4 = build_command(Platform::Darwin, "8.8.8.8", Duration::from_secs(2)).unwrap();
        assert_eq!(v4.program, "ping");
        assert_eq!(v4.args, vec!["-i", "2", "8.8.8.8"]);

        let v6 = build_command(Platform::Darwin, "::1", Duration::from_secs(2)).unwrap();
        assert_eq!(v6.program, "ping6");
    }

    #[test]
    fn sub_second_interval_keeps_decimals() {
        let command =
            build_command(Platform::Linux, "example.com", Duration::from_millis(500))
                .unwrap();
        assert_eq!(command.args[1], "0.5");
    }

    #[test]
    fn brackets_are_stripped_from_ipv6_targets() {
        let command =
            build_command(Platform::Linux, "[2001:db8::1]", Duration::from_secs(1)).unwrap();
        assert_eq!(command.args, vec!["-6", "-i", "1", "2001:db8::1"]);
    }

    #[test]
    fn windows_wraps_ping_in_cmd() {
        let command =
            build_command(Platform::Windows, "example.com", Duration::from_secs(1)).unwrap();
        assert_eq!(command.program, "cmd.exe");
        assert_eq!(command.args[0], "/C");
        assert!(command.args[1].contains("chcp 437"));
        assert!(command.args[1].contains("ping -t \"example.com\""));
        assert!(command.envs.is_empty());
    }

    #[test]
    fn windows_rejects_shell_metacharacters() {
        let result =
            build_command(Platform::Windows, "evil.com & del *", Duration::from_secs(1));
        assert!(result.is_err());

        let result = build_command(Platform::Windows, "", Duration::from_secs(1));
        assert!(result.is_err());
    }

    #[test]
    fn windows_escapes_percent_in_zone_ids() {
        let command =
            build_command(Platform::Windows, "fe80::1%eth0", Duration::from_secs(1)).unwrap();
        assert!(command.args[1].contains("fe80::1^%eth0"));
    }
}
