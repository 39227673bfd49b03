//! SQLite-based persistence store

use crate::persistence::{ExecutionRecord, ExecutionStore, TriggerRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

/// SQLite trigger and execution store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path`
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .context("Invalid database path")?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS triggers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                time TEXT NOT NULL,
                commit_id TEXT NOT NULL,
                commit_message TEXT NOT NULL,
                branch TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create triggers table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS executions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trigger_id INTEGER NOT NULL REFERENCES triggers(id) ON DELETE CASCADE,
                script_name TEXT NOT NULL,
                status TEXT NOT NULL,
                output TEXT,
                error TEXT,
                executed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create executions table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_executions_trigger ON executions(trigger_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Convert DateTime<Utc> to NaiveDateTime for SQLite
    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    /// Convert NaiveDateTime to DateTime<Utc>
    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }
}

#[async_trait::async_trait]
impl ExecutionStore for SqliteStore {
    async fn create_trigger(
        &self,
        time: DateTime<Utc>,
        commit_id: &str,
        commit_message: &str,
        branch: &str,
    ) -> Result<i64> {
        let done = sqlx::query(
            r#"
            INSERT INTO triggers (time, commit_id, commit_message, branch, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(Self::to_naive(time))
        .bind(commit_id)
        .bind(commit_message)
        .bind(branch)
        .bind(Self::to_naive(Utc::now()))
        .execute(&self.pool)
        .await
        .context("Failed to record trigger")?;

        Ok(done.last_insert_rowid())
    }

    async fn record_execution(
        &self,
        trigger_id: i64,
        script_name: &str,
        status: &str,
        output: &str,
        error: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO executions (trigger_id, script_name, status, output, error, executed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(trigger_id)
        .bind(script_name)
        .bind(status)
        .bind(output)
        .bind(error)
        .bind(Self::to_naive(Utc::now()))
        .execute(&self.pool)
        .await
        .context("Failed to record execution")?;

        Ok(())
    }

    async fn recent_triggers(&self, limit: usize) -> Result<Vec<TriggerRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, time, commit_id, commit_message, branch, created_at
            FROM triggers
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list triggers")?;

        Ok(rows
            .iter()
            .map(|row| TriggerRecord {
                id: row.get("id"),
                time: Self::from_naive(row.get("time")),
                commit_id: row.get("commit_id"),
                commit_message: row.get("commit_message"),
                branch: row.get("branch"),
                created_at: Self::from_naive(row.get("created_at")),
            })
            .collect())
    }

    async fn executions_for(&self, trigger_id: i64) -> Result<Vec<ExecutionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, trigger_id, script_name, status, output, error, executed_at
            FROM executions
            WHERE trigger_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(trigger_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list executions")?;

        Ok(rows
            .iter()
            .map(|row| ExecutionRecord {
                id: row.get("id"),
                trigger_id: row.get("trigger_id"),
                script_name: row.get("script_name"),
                status: row.get("status"),
                output: row.get::<Option<String>, _>("output").unwrap_or_default(),
                error: row.get::<Option<String>, _>("error").unwrap_or_default(),
                executed_at: Self::from_naive(row.get("executed_at")),
            })
            .collect())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
