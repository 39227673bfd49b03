//! Command engine - runs the sequential phase, then the async phase

use crate::{
    core::CommandSpec,
    execution::{CommandEnv, CommandExecutor, ExecutionResult},
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Branch and repository a run executes against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub branch: String,
    /// Full `organization/repo` name
    pub repository: String,
}

impl ExecutionContext {
    pub fn new(branch: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            repository: repository.into(),
        }
    }
}

/// How the engine finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// Every sequential command passed and every async command ran.
    /// Async failures are only visible in the individual results.
    Completed,
    /// A sequential command failed; nothing after it ran
    SequentialFailed { command: String, error: String },
}

/// Results and outcome of one engine run
#[derive(Debug, Clone)]
pub struct EngineReport {
    /// Sequential results in invocation order, then async results in
    /// completion order. Async order is not the configured order.
    pub results: Vec<ExecutionResult>,
    pub outcome: EngineOutcome,
}

impl EngineReport {
    pub fn is_sequential_failure(&self) -> bool {
        matches!(self.outcome, EngineOutcome::SequentialFailed { .. })
    }

    /// First result that did not succeed
    pub fn first_failure(&self) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| !r.success())
    }
}

/// Runs a project's commands
pub struct CommandEngine<E> {
    executor: Arc<E>,
}

impl<E> Clone for CommandEngine<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<E: CommandExecutor + 'static> CommandEngine<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run the sequential phase, then (if it passed) the async phase
    pub async fn execute(&self, spec: &CommandSpec, context: &ExecutionContext) -> EngineReport {
        let env = Arc::new(CommandEnv::for_trigger(&context.branch, &context.repository));
        let mut results = Vec::new();

        for command in spec.sequential_commands() {
            let result = self.executor.run(command, &env).await;
            info!(
                command = result.command(),
                status = result.status_label(),
                duration_ms = result.duration().as_millis() as u64,
                "Sequential command finished"
            );

            if !result.success() {
                let outcome = EngineOutcome::SequentialFailed {
                    command: result.command().to_string(),
                    error: result.error().to_string(),
                };
                warn!("Stopping after failed command: {}", result.command());
                results.push(result);
                return EngineReport { results, outcome };
            }

            results.push(result);
        }

        results.extend(self.run_parallel(spec, env).await);

        EngineReport {
            results,
            outcome: EngineOutcome::Completed,
        }
    }

    /// Launch every async command at once and wait for the slowest
    ///
    /// A task that panics still yields a failed result for its command.
    async fn run_parallel(&self, spec: &CommandSpec, env: Arc<CommandEnv>) -> Vec<ExecutionResult> {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();
        let mut launched = HashMap::new();

        for command in spec.parallel_commands() {
            let executor = Arc::clone(&self.executor);
            let env = Arc::clone(&env);
            let collected = Arc::clone(&collected);
            let owned = command.to_string();

            let handle = tasks.spawn(async move {
                let result = executor.run(&owned, &env).await;
                info!(
                    command = result.command(),
                    status = result.status_label(),
                    duration_ms = result.duration().as_millis() as u64,
                    "Async command finished"
                );
                collected.lock().await.push(result);
            });
            launched.insert(handle.id(), (command.to_string(), Utc::now(), Instant::now()));
        }

        while let Some(joined) = tasks.join_next().await {
            let Err(e) = joined else { continue };
            error!("Async command task did not complete: {}", e);

            if let Some((command, started_at, clock)) = launched.remove(&e.id()) {
                let result =
                    ExecutionResult::failed(command, "", e.to_string(), started_at, clock.elapsed());
                collected.lock().await.push(result);
            }
        }

        let mut collected = collected.lock().await;
        std::mem::take(&mut *collected)
    }
}
