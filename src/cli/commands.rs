//! CLI command definitions

use crate::notify::NotificationStatus;
use clap::Args;

/// Start the webhook server
#[derive(Debug, Args, Clone, Default)]
pub struct ServeCommand {
    /// Listen address, overriding `addr` from the configuration
    #[arg(long)]
    pub addr: Option<String>,

    /// Keep triggers and executions in memory instead of the database
    #[arg(long)]
    pub no_history: bool,
}

/// Validate the configuration file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Send a single notification card
#[derive(Debug, Args, Clone)]
pub struct TestNotifyCommand {
    /// Commit id shown on the card
    #[arg(short = 'c', long, default_value = "0000000")]
    pub commit_id: String,

    /// Commit message shown on the card
    #[arg(short, long, default_value = "Test notification from github-sentry")]
    pub message: String,

    /// Branch shown on the card (defaults to the staging branch)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Repository shown on the card, as organization/repo
    #[arg(short, long, default_value = "unknown/repo")]
    pub repo: String,

    /// Card template to use
    #[arg(long, value_enum, default_value_t = StatusArg::Started)]
    pub status: StatusArg,
}

/// Show recorded triggers and executions
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Number of recent triggers to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show the executions of one trigger
    #[arg(short, long)]
    pub trigger: Option<i64>,

    /// Show command output
    #[arg(long)]
    pub output: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Notification status argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusArg {
    Started,
    Success,
    Failure,
}

impl From<StatusArg> for NotificationStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Started => NotificationStatus::Started,
            StatusArg::Success => NotificationStatus::Success,
            StatusArg::Failure => NotificationStatus::Failure,
        }
    }
}
