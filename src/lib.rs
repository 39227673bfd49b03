//! github-sentry - runs configured commands when a watched branch is pushed
//! and reports the outcome to a Feishu chat

pub mod cli;
pub mod core;
pub mod execution;
pub mod logging;
pub mod notify;
pub mod persistence;
pub mod pipeline;
pub mod server;

// Re-export commonly used types
pub use core::config::{AsyncFailurePolicy, RelayConfig};
pub use core::{CommandSpec, ProjectRegistry, RunPhase, TriggerIdentity};
pub use execution::{CommandEngine, CommandExecutor, ExecutionResult, ShellExecutor};
pub use notify::{FeishuNotifier, Notification, NotificationStatus, Notifier};
pub use persistence::{ExecutionStore, InMemoryStore};
pub use pipeline::{Relay, RelayError, RunEvent, TriggerHandle};
