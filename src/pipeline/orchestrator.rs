//! Relay orchestrator - owns the lifecycle of every accepted trigger

use crate::{
    core::{config::AsyncFailurePolicy, ProjectRegistry, RunPhase, TriggerIdentity},
    execution::{CommandEngine, CommandExecutor, EngineOutcome, ExecutionContext},
    notify::{Notification, NotificationStatus, Notifier},
    persistence::ExecutionStore,
    pipeline::{failure_message, skipped_message, PipelineRun},
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Phase change of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEvent {
    pub run_id: Uuid,
    pub commit_id: String,
    pub phase: RunPhase,
}

/// Event handler callback type
pub type EventHandler = Arc<dyn Fn(RunEvent) + Send + Sync>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The trigger could not be persisted, so nothing was dispatched
    #[error("failed to record trigger: {0:#}")]
    TriggerRecord(anyhow::Error),
}

/// A dispatched run
///
/// The webhook drops this; tests await `task` to observe the finished run.
#[derive(Debug)]
pub struct TriggerHandle {
    pub run_id: Uuid,
    pub trigger_id: i64,
    pub task: JoinHandle<()>,
}

/// Accepts triggers and drives each one through execution,
/// persistence and notification on its own task
pub struct Relay<E> {
    engine: CommandEngine<E>,
    projects: ProjectRegistry,
    store: Arc<dyn ExecutionStore>,
    notifier: Arc<dyn Notifier>,
    async_failure_policy: AsyncFailurePolicy,
    run_permits: Option<Arc<Semaphore>>,
    event_handlers: Vec<EventHandler>,
    runs: TaskTracker,
}

impl<E: CommandExecutor + 'static> Relay<E> {
    pub fn new(
        engine: CommandEngine<E>,
        projects: ProjectRegistry,
        store: Arc<dyn ExecutionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            engine,
            projects,
            store,
            notifier,
            async_failure_policy: AsyncFailurePolicy::default(),
            run_permits: None,
            event_handlers: Vec::new(),
            runs: TaskTracker::new(),
        }
    }

    pub fn with_async_failure_policy(mut self, policy: AsyncFailurePolicy) -> Self {
        self.async_failure_policy = policy;
        self
    }

    /// Cap how many runs execute at once; `None` leaves runs unbounded
    pub fn with_max_concurrent_runs(mut self, limit: Option<usize>) -> Self {
        self.run_permits = limit.map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    /// Add an event handler
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(RunEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
        self
    }

    pub fn engine(&self) -> &CommandEngine<E> {
        &self.engine
    }

    pub fn projects(&self) -> &ProjectRegistry {
        &self.projects
    }

    /// Announce the trigger, record it and hand the run to a background task
    ///
    /// Returns once the run is dispatched. Only a failure to record the
    /// trigger is reported; every later failure ends up in the logs and
    /// the terminal notification.
    pub async fn accept(self: &Arc<Self>, trigger: TriggerIdentity) -> Result<TriggerHandle, RelayError> {
        let run_id = Uuid::new_v4();
        info!(
            branch = %trigger.branch,
            commit_id = %trigger.commit_id,
            message = %trigger.message,
            "Trigger accepted"
        );
        self.emit(run_id, &trigger.commit_id, RunPhase::Accepted);

        self.notify(NotificationStatus::Started, &trigger, trigger.message.clone())
            .await;
        self.emit(run_id, &trigger.commit_id, RunPhase::StartedNotified);

        let trigger_id = self
            .store
            .create_trigger(
                trigger.commit_time,
                &trigger.commit_id,
                &trigger.message,
                &trigger.branch,
            )
            .await
            .map_err(|e| {
                error!(commit_id = %trigger.commit_id, "Failed to record trigger: {:#}", e);
                RelayError::TriggerRecord(e)
            })?;

        let run = PipelineRun::new(run_id, trigger_id, trigger);
        self.emit(run_id, &run.trigger.commit_id, RunPhase::Dispatched);

        let relay = Arc::clone(self);
        let task = self.runs.spawn(async move { relay.run(run).await });

        Ok(TriggerHandle {
            run_id,
            trigger_id,
            task,
        })
    }

    /// Wait for every dispatched run to send its terminal notification
    ///
    /// Runs accepted while draining are waited for as well.
    pub async fn drain(&self) {
        let in_flight = self.runs.len();
        if in_flight > 0 {
            info!(in_flight, "Waiting for dispatched runs to finish");
        }
        self.runs.close();
        self.runs.wait().await;
        self.runs.reopen();
    }

    async fn run(&self, mut run: PipelineRun) {
        let _permit = match &self.run_permits {
            Some(permits) => match Arc::clone(permits).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    error!("Run limiter unavailable, running unthrottled: {}", e);
                    None
                }
            },
            None => None,
        };

        let project = self
            .projects
            .lookup(&run.trigger.organization, &run.trigger.repo)
            .filter(|project| !project.commands.is_empty());
        let Some(project) = project else {
            info!(
                "No commands configured for {}, skipping",
                run.trigger.full_repo_name()
            );
            let message = skipped_message(&run.trigger.message);
            self.notify(NotificationStatus::Success, &run.trigger, message).await;
            self.transition(&mut run, RunPhase::Notified);
            self.transition(&mut run, RunPhase::Done);
            return;
        };

        self.transition(&mut run, RunPhase::Executing);
        info!(project = %project.name, trigger_id = run.trigger_id, "Executing commands");

        let context = ExecutionContext::new(&run.trigger.branch, run.trigger.full_repo_name());
        let report = self.engine.execute(&project.commands, &context).await;
        run.results = report.results;

        for command in run.missing_end_times() {
            warn!(command, "Execution result has no end time");
        }
        let completed_at = run.completed_at();
        info!(
            completed_at = %completed_at,
            duration_ms = (completed_at - run.started_at).num_milliseconds(),
            "Execution finished"
        );

        let verdict = self.verdict(&report.outcome, &run);
        self.transition(&mut run, verdict);

        self.record(&run).await;
        self.transition(&mut run, RunPhase::Recorded);

        let failed = if verdict.is_failure() {
            run.results.iter().find(|r| !r.success())
        } else {
            None
        };
        let (status, message) = match failed {
            Some(result) => (
                NotificationStatus::Failure,
                failure_message(&run.trigger.message, result),
            ),
            None => (NotificationStatus::Success, run.trigger.message.clone()),
        };
        self.notify(status, &run.trigger, message).await;
        self.transition(&mut run, RunPhase::Notified);
        self.transition(&mut run, RunPhase::Done);
    }

    fn verdict(&self, outcome: &EngineOutcome, run: &PipelineRun) -> RunPhase {
        if let EngineOutcome::SequentialFailed { command, error } = outcome {
            warn!(command = %command, error = %error, "Sequential phase failed");
            return RunPhase::SequentialFailed;
        }

        let async_failures = run.results.iter().filter(|r| !r.success()).count();
        if async_failures == 0 {
            return RunPhase::Succeeded;
        }

        match self.async_failure_policy {
            AsyncFailurePolicy::Escalate => RunPhase::AsyncFailed,
            AsyncFailurePolicy::Report => {
                warn!(
                    failed = async_failures,
                    "Async commands failed; reporting the run as successful"
                );
                RunPhase::Succeeded
            }
        }
    }

    /// Persist every result; a failed write does not stop the others
    async fn record(&self, run: &PipelineRun) {
        for result in &run.results {
            debug!(command = result.command(), output = result.output(), error = result.error());
            if let Err(e) = self
                .store
                .record_execution(
                    run.trigger_id,
                    result.command(),
                    result.status_label(),
                    result.output(),
                    result.error(),
                )
                .await
            {
                error!(
                    trigger_id = run.trigger_id,
                    command = result.command(),
                    "Failed to record execution: {:#}",
                    e
                );
            }
        }
    }

    async fn notify(&self, status: NotificationStatus, trigger: &TriggerIdentity, message: String) {
        let notification = Notification::for_trigger(status, trigger, message);
        if let Err(e) = self.notifier.send(&notification).await {
            error!(
                status = %status,
                commit_id = %trigger.commit_id,
                "Failed to send notification: {}",
                e
            );
        }
    }

    fn transition(&self, run: &mut PipelineRun, next: RunPhase) {
        match run.advance(next) {
            Ok(()) => self.emit(run.run_id, &run.trigger.commit_id, next),
            Err(e) => error!(run_id = %run.run_id, "{}", e),
        }
    }

    /// Emit an event to all handlers
    fn emit(&self, run_id: Uuid, commit_id: &str, phase: RunPhase) {
        debug!(run_id = %run_id, phase = %phase, "Run phase changed");
        for handler in &self.event_handlers {
            handler(RunEvent {
                run_id,
                commit_id: commit_id.to_string(),
                phase,
            });
        }
    }
}
