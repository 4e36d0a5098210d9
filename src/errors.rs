//! Custom error types for the ping monitor.
//!
//! This module provides user-friendly error types that wrap underlying
//! errors with clear, actionable messages. The sample pipeline itself has
//! no fatal error paths; everything here originates in the collaborators
//! around it (subprocess, exporter, terminal, configuration).

use std::error::Error;
use std::fmt;

/// Exit codes for the application.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// The ping subprocess could not be started or exited abnormally.
    pub const PING_ERROR: i32 = 1;
    /// The metrics exporter failed to start or serve.
    pub const EXPORTER_ERROR: i32 = 2;
    /// Configuration error (invalid arguments).
    pub const CONFIG_ERROR: i32 = 3;
    /// The terminal could not be initialized or restored.
    pub const TERMINAL_ERROR: i32 = 4;
    /// Unknown/unexpected error.
    pub const UNKNOWN_ERROR: i32 = 99;
}

/// Categories of errors that can occur while monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The ping subprocess failed (missing binary, abnormal exit).
    Ping,
    /// The Prometheus exporter failed.
    Exporter,
    /// Invalid configuration or arguments.
    Config,
    /// Terminal setup/teardown failures.
    Terminal,
    /// Unknown or unexpected errors.
    Unknown,
}

impl ErrorKind {
    /// Get the exit code for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Ping => exit_codes::PING_ERROR,
            ErrorKind::Exporter => exit_codes::EXPORTER_ERROR,
            ErrorKind::Config => exit_codes::CONFIG_ERROR,
            ErrorKind::Terminal => exit_codes::TERMINAL_ERROR,
            ErrorKind::Unknown => exit_codes::UNKNOWN_ERROR,
        }
    }

    /// Get a user-friendly description of this error kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::Ping => "Ping error",
            ErrorKind::Exporter => "Exporter error",
            ErrorKind::Config => "Configuration error",
            ErrorKind::Terminal => "Terminal error",
            ErrorKind::Unknown => "Unknown error",
        }
    }
}

/// A user-friendly error type for monitor operations.
#[derive(Debug)]
pub struct MonitorError {
    /// The kind of error.
    pub kind: ErrorKind,
    /// User-friendly error message.
    pub message: String,
    /// Optional suggestion for how to resolve the error.
    pub suggestion: Option<String>,
    /// The underlying error, if any.
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl MonitorError {
    /// Create a new MonitorError.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), suggestion: None, source: None }
    }

    /// Add a suggestion for how to resolve the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add the underlying error source.
    pub fn with_source(
        mut self,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// Create a ping subprocess error.
    pub fn ping(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Ping, message).with_suggestion(
            "Check that the system ping utility is installed and the target is reachable.",
        )
    }

    /// Create an exporter error.
    pub fn exporter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Exporter, message).with_suggestion(
            "Check that the exporter address is valid and the port is not already in use.",
        )
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Create a terminal error.
    pub fn terminal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Terminal, message).with_suggestion(
            "Run pingmon from an interactive terminal.",
        )
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.description(), self.message)?;

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }

        Ok(())
    }
}

impl Error for MonitorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_exit_codes() {
        assert_eq!(ErrorKind::Ping.exit_code(), exit_codes::PING_ERROR);
        assert_eq!(ErrorKind::Exporter.exit_code(), exit_codes::EXPORTER_ERROR);
        assert_eq!(ErrorKind::Config.exit_code(), exit_codes::CONFIG_ERROR);
        assert_eq!(ErrorKind::Terminal.exit_code(), exit_codes::TERMINAL_ERROR);
        assert_eq!(ErrorKind::Unknown.exit_code(), exit_codes::UNKNOWN_ERROR);
    }

    #[test]
    fn test_monitor_error_display() {
        let error = MonitorError::ping("failed to start `ping -i 1 example.com`");

        let display = format!("{}", error);
        assert!(display.contains("Ping error"));
        assert!(display.contains("failed to start"));
        assert!(display.contains("Suggestion"));
    }

    #[test]
    fn test_source_is_preserved() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let error = MonitorError::ping("spawn failed").with_source(io_err);
        assert!(error.source().is_some());
    }
}
