//! Pipeline run lifecycle

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a single pipeline run
///
/// ```text
/// Accepted -> StartedNotified -> Dispatched -> Executing
///     -> Succeeded | SequentialFailed | AsyncFailed -> Recorded -> Notified -> Done
/// Dispatched -> Notified                      (no project configured)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    /// Trigger passed the gate
    Accepted,
    /// "Started" notification attempted
    StartedNotified,
    /// Trigger record created, background task handed off
    Dispatched,
    /// Commands are running
    Executing,
    /// Every sequential command passed
    Succeeded,
    /// A sequential command failed and stopped the run
    SequentialFailed,
    /// An async command failed under the escalate policy
    AsyncFailed,
    /// Execution results persisted
    Recorded,
    /// Terminal notification attempted
    Notified,
    /// Nothing left to do
    Done,
}

impl RunPhase {
    /// Whether `next` is a legal successor of this phase
    pub fn can_advance_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Accepted, StartedNotified)
                | (StartedNotified, Dispatched)
                | (Dispatched, Executing)
                | (Dispatched, Notified)
                | (Executing, Succeeded)
                | (Executing, SequentialFailed)
                | (Executing, AsyncFailed)
                | (Succeeded, Recorded)
                | (SequentialFailed, Recorded)
                | (AsyncFailed, Recorded)
                | (Recorded, Notified)
                | (Notified, Done)
        )
    }

    /// Phases reached only through a failed run
    pub fn is_failure(self) -> bool {
        matches!(self, RunPhase::SequentialFailed | RunPhase::AsyncFailed)
    }

    pub fn is_terminal(self) -> bool {
        self == RunPhase::Done
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Accepted => "accepted",
            RunPhase::StartedNotified => "started-notified",
            RunPhase::Dispatched => "dispatched",
            RunPhase::Executing => "executing",
            RunPhase::Succeeded => "succeeded",
            RunPhase::SequentialFailed => "sequential-failed",
            RunPhase::AsyncFailed => "async-failed",
            RunPhase::Recorded => "recorded",
            RunPhase::Notified => "notified",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}
