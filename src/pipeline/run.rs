//! Per-trigger run state

use crate::core::{RunPhase, TriggerIdentity};
use crate::execution::ExecutionResult;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal phase transition {from} -> {to}")]
pub struct PhaseError {
    pub from: RunPhase,
    pub to: RunPhase,
}

/// One accepted trigger on its way to a terminal notification
///
/// Owned by the background task and dropped once the run is done.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub trigger_id: i64,
    pub trigger: TriggerIdentity,
    pub results: Vec<ExecutionResult>,
    pub started_at: DateTime<Utc>,
    phase: RunPhase,
}

impl PipelineRun {
    pub fn new(run_id: Uuid, trigger_id: i64, trigger: TriggerIdentity) -> Self {
        Self {
            run_id,
            trigger_id,
            trigger,
            results: Vec::new(),
            started_at: Utc::now(),
            phase: RunPhase::Dispatched,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn advance(&mut self, next: RunPhase) -> Result<(), PhaseError> {
        if !self.phase.can_advance_to(next) {
            return Err(PhaseError {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Latest end time across the results, or now when nothing ran
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.results
            .iter()
            .map(|r| r.ended_at())
            .max()
            .unwrap_or_else(Utc::now)
    }

    /// Commands whose end time was never set
    pub fn missing_end_times(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.ended_at().timestamp_millis() == 0)
            .map(|r| r.command())
            .collect()
    }
}
