//! Result of one command invocation

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of running a single command
///
/// Built once when the command exits and never modified afterwards.
/// `ended_at` is always `started_at + duration`, so `ended_at >= started_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    command: String,
    success: bool,
    output: String,
    error: String,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    duration: Duration,
}

impl ExecutionResult {
    /// A command that exited with status zero
    pub fn succeeded(
        command: impl Into<String>,
        output: impl Into<String>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self::build(command.into(), true, output.into(), String::new(), started_at, duration)
    }

    /// A command that exited non-zero or never launched
    ///
    /// When nothing was captured the error text doubles as the output so
    /// there is always something to show.
    pub fn failed(
        command: impl Into<String>,
        output: impl Into<String>,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let error = error.into();
        let mut output = output.into();
        if output.is_empty() {
            output = error.clone();
        }
        Self::build(command.into(), false, output, error, started_at, duration)
    }

    fn build(
        command: String,
        success: bool,
        output: String,
        error: String,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let ended_at = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|elapsed| started_at.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            command,
            success,
            output,
            error,
            started_at,
            ended_at,
            duration,
        }
    }

    /// The command text, which doubles as the result's name
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Combined stdout and stderr
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Failure text, empty on success
    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Status string used by the execution store
    pub fn status_label(&self) -> &'static str {
        if self.success {
            "success"
        } else {
            "failed"
        }
    }
}
