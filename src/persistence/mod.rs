//! Persistence layer for triggers and execution records

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteStore;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// A recorded push that started a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub id: i64,
    /// Commit time of the head commit
    pub time: DateTime<Utc>,
    pub commit_id: String,
    pub commit_message: String,
    pub branch: String,
    pub created_at: DateTime<Utc>,
}

/// A recorded command invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: i64,
    pub trigger_id: i64,
    /// The command text
    pub script_name: String,
    /// `success` or `failed`
    pub status: String,
    pub output: String,
    pub error: String,
    pub executed_at: DateTime<Utc>,
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Record a trigger and return its id
    async fn create_trigger(
        &self,
        time: DateTime<Utc>,
        commit_id: &str,
        commit_message: &str,
        branch: &str,
    ) -> Result<i64>;

    /// Record one command invocation for a trigger
    async fn record_execution(
        &self,
        trigger_id: i64,
        script_name: &str,
        status: &str,
        output: &str,
        error: &str,
    ) -> Result<()>;

    /// Most recent triggers, newest first
    async fn recent_triggers(&self, limit: usize) -> Result<Vec<TriggerRecord>>;

    /// Executions recorded for a trigger, in insertion order
    async fn executions_for(&self, trigger_id: i64) -> Result<Vec<ExecutionRecord>>;

    /// Release backend resources at shutdown
    async fn close(&self) {}
}

/// In-memory persistence (for testing or ephemeral use)
pub struct InMemoryStore {
    triggers: tokio::sync::RwLock<Vec<TriggerRecord>>,
    executions: tokio::sync::RwLock<Vec<ExecutionRecord>>,
    next_trigger_id: AtomicI64,
    next_execution_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            triggers: tokio::sync::RwLock::new(Vec::new()),
            executions: tokio::sync::RwLock::new(Vec::new()),
            next_trigger_id: AtomicI64::new(1),
            next_execution_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ExecutionStore for InMemoryStore {
    async fn create_trigger(
        &self,
        time: DateTime<Utc>,
        commit_id: &str,
        commit_message: &str,
        branch: &str,
    ) -> Result<i64> {
        let id = self.next_trigger_id.fetch_add(1, Ordering::SeqCst);
        self.triggers.write().await.push(TriggerRecord {
            id,
            time,
            commit_id: commit_id.to_string(),
            commit_message: commit_message.to_string(),
            branch: branch.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn record_execution(
        &self,
        trigger_id: i64,
        script_name: &str,
        status: &str,
        output: &str,
        error: &str,
    ) -> Result<()> {
        if !self.triggers.read().await.iter().any(|t| t.id == trigger_id) {
            anyhow::bail!("Unknown trigger id {}", trigger_id);
        }

        let id = self.next_execution_id.fetch_add(1, Ordering::SeqCst);
        self.executions.write().await.push(ExecutionRecord {
            id,
            trigger_id,
            script_name: script_name.to_string(),
            status: status.to_string(),
            output: output.to_string(),
            error: error.to_string(),
            executed_at: Utc::now(),
        });
        Ok(())
    }

    async fn recent_triggers(&self, limit: usize) -> Result<Vec<TriggerRecord>> {
        let triggers = self.triggers.read().await;
        Ok(triggers.iter().rev().take(limit).cloned().collect())
    }

    async fn executions_for(&self, trigger_id: i64) -> Result<Vec<ExecutionRecord>> {
        let executions = self.executions.read().await;
        Ok(executions
            .iter()
            .filter(|e| e.trigger_id == trigger_id)
            .cloned()
            .collect())
    }
}
