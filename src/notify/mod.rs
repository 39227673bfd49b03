//! Chat notifications for pipeline runs

pub mod card;
pub mod feishu;

pub use card::build_card;
pub use feishu::FeishuNotifier;

use crate::core::TriggerIdentity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which card template a notification uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Started,
    Success,
    Failure,
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationStatus::Started => "started",
            NotificationStatus::Success => "success",
            NotificationStatus::Failure => "failure",
        })
    }
}

/// Everything a status card shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub status: NotificationStatus,
    /// Full `organization/repo` name
    pub repo: String,
    pub author: String,
    pub commit_id: String,
    pub message: String,
    pub branch: String,
    pub commit_time: DateTime<Utc>,
}

impl Notification {
    /// Notification about `trigger` carrying `message` as its body
    pub fn for_trigger(
        status: NotificationStatus,
        trigger: &TriggerIdentity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            repo: trigger.full_repo_name(),
            author: trigger.author.clone(),
            commit_id: trigger.commit_id.clone(),
            message: message.into(),
            branch: trigger.branch.clone(),
            commit_time: trigger.commit_time,
        }
    }
}

/// Error types for notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to send request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("webhook returned error code {code}: {msg}\nResponse body: {body}")]
    Rejected { code: i64, msg: String, body: String },

    #[error("webhook returned unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("failed to sign request: {0}")]
    Sign(String),
}

/// Delivers notifications to a chat channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}
