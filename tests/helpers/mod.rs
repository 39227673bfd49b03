//! Test utilities for github-sentry

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use github_sentry::core::{CommandSpec, Project, ProjectRegistry, RunPhase, TriggerIdentity};
use github_sentry::execution::{CommandEngine, CommandEnv, CommandExecutor, ExecutionResult};
use github_sentry::notify::{Notification, Notifier, NotifyError};
use github_sentry::persistence::{ExecutionRecord, ExecutionStore, InMemoryStore, TriggerRecord};
use github_sentry::pipeline::{Relay, RunEvent};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared, ordered log of side effects across collaborators
#[derive(Clone, Default)]
pub struct Timeline(Arc<Mutex<Vec<String>>>);

impl Timeline {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Position of the first entry starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.starts_with(prefix))
    }
}

/// Executor that fails or delays selected commands and records every call
#[derive(Default)]
pub struct ScriptedExecutor {
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    invoked: Mutex<Vec<String>>,
    running: AtomicUsize,
    peak: AtomicUsize,
    timeline: Option<Timeline>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, commands: &[&str]) -> Self {
        self.failing.extend(commands.iter().map(|c| c.to_string()));
        self
    }

    pub fn delay(mut self, command: &str, delay: Duration) -> Self {
        self.delays.insert(command.to_string(), delay);
        self
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    pub fn invoked(&self) -> Vec<String> {
        self.invoked.lock().unwrap().clone()
    }

    /// Highest number of commands seen running at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn run(&self, command: &str, _env: &CommandEnv) -> ExecutionResult {
        self.invoked.lock().unwrap().push(command.to_string());
        if let Some(timeline) = &self.timeline {
            timeline.push(format!("execute:{}", command));
        }

        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        let started_at = Utc::now();
        let delay = self.delays.get(command).copied().unwrap_or_default();
        tokio::time::sleep(delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(command) {
            ExecutionResult::failed(command, "", "exit status 1", started_at, delay)
        } else {
            ExecutionResult::succeeded(command, format!("ran {}", command), started_at, delay)
        }
    }
}

/// Notifier that keeps every notification it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
    timeline: Option<Timeline>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records notifications but reports every delivery as failed
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        if let Some(timeline) = &self.timeline {
            timeline.push(format!("notify:{}", notification.status));
        }

        if self.fail {
            return Err(NotifyError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Store that can refuse triggers or individual executions
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    reject_triggers: bool,
    reject_commands: HashSet<String>,
    timeline: Option<Timeline>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_triggers() -> Self {
        Self {
            reject_triggers: true,
            ..Default::default()
        }
    }

    pub fn rejecting_commands(mut self, commands: &[&str]) -> Self {
        self.reject_commands
            .extend(commands.iter().map(|c| c.to_string()));
        self
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    fn note(&self, entry: String) {
        if let Some(timeline) = &self.timeline {
            timeline.push(entry);
        }
    }
}

#[async_trait]
impl ExecutionStore for FlakyStore {
    async fn create_trigger(
        &self,
        time: DateTime<Utc>,
        commit_id: &str,
        commit_message: &str,
        branch: &str,
    ) -> anyhow::Result<i64> {
        self.note(format!("create_trigger:{}", commit_id));
        if self.reject_triggers {
            anyhow::bail!("database is unavailable");
        }
        self.inner
            .create_trigger(time, commit_id, commit_message, branch)
            .await
    }

    async fn record_execution(
        &self,
        trigger_id: i64,
        script_name: &str,
        status: &str,
        output: &str,
        error: &str,
    ) -> anyhow::Result<()> {
        self.note(format!("record:{}", script_name));
        if self.reject_commands.contains(script_name) {
            anyhow::bail!("write failed for {}", script_name);
        }
        self.inner
            .record_execution(trigger_id, script_name, status, output, error)
            .await
    }

    async fn recent_triggers(&self, limit: usize) -> anyhow::Result<Vec<TriggerRecord>> {
        self.inner.recent_triggers(limit).await
    }

    async fn executions_for(&self, trigger_id: i64) -> anyhow::Result<Vec<ExecutionRecord>> {
        self.inner.executions_for(trigger_id).await
    }
}

/// A push to `staging` on `organization/repo`
pub fn trigger(organization: &str, repo: &str, message: &str) -> TriggerIdentity {
    TriggerIdentity {
        commit_id: "a1b2c3d".to_string(),
        message: message.to_string(),
        branch: "staging".to_string(),
        organization: organization.to_string(),
        repo: repo.to_string(),
        author: "Dana".to_string(),
        commit_time: Utc::now(),
    }
}

/// Registry with a single `acme/api` project
pub fn registry(sequential: &[&str], parallel: &[&str]) -> ProjectRegistry {
    std::iter::once(Project {
        name: "api".to_string(),
        organization: "acme".to_string(),
        repo: "api".to_string(),
        commands: CommandSpec::new(sequential.iter().copied(), parallel.iter().copied()),
    })
    .collect()
}

/// Everything a relay test needs to inspect afterwards
pub struct Harness {
    pub relay: Arc<Relay<ScriptedExecutor>>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<FlakyStore>,
    pub events: Arc<Mutex<Vec<RunEvent>>>,
}

impl Harness {
    pub fn build(
        executor: ScriptedExecutor,
        projects: ProjectRegistry,
        store: FlakyStore,
        notifier: RecordingNotifier,
        configure: impl FnOnce(Relay<ScriptedExecutor>) -> Relay<ScriptedExecutor>,
    ) -> Self {
        let notifier = Arc::new(notifier);
        let store = Arc::new(store);
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&events);

        let relay = Relay::new(
            CommandEngine::new(executor),
            projects,
            Arc::clone(&store) as Arc<dyn ExecutionStore>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        )
        .with_event_handler(move |event| recorded.lock().unwrap().push(event));

        Self {
            relay: Arc::new(configure(relay)),
            notifier,
            store,
            events,
        }
    }

    pub fn new(executor: ScriptedExecutor, projects: ProjectRegistry) -> Self {
        Self::build(
            executor,
            projects,
            FlakyStore::new(),
            RecordingNotifier::new(),
            |relay| relay,
        )
    }

    /// Accept `trigger` and wait for its background run to finish
    pub async fn run_to_completion(&self, trigger: TriggerIdentity) -> i64 {
        let handle = self.relay.accept(trigger).await.unwrap();
        handle.task.await.unwrap();
        handle.trigger_id
    }

    pub fn phases(&self) -> Vec<RunPhase> {
        self.events.lock().unwrap().iter().map(|e| e.phase).collect()
    }

    pub fn executor(&self) -> &ScriptedExecutor {
        self.relay.engine().executor()
    }
}
