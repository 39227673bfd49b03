//! Tracing subscriber setup

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Rotated daily as `webhook.log.YYYY-MM-DD`
pub const LOG_FILE_PREFIX: &str = "webhook.log";

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "github_sentry=debug,tower_http=debug"
    } else {
        "github_sentry=info,tower_http=info"
    }
}

/// Install the global subscriber: stdout, plus a daily file under
/// `log_folder` when one is given
///
/// The returned guard flushes the file writer when dropped, so keep it
/// alive for the life of the process.
pub fn init(verbose: bool, log_folder: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose).into());

    let (file_layer, guard) = match log_folder {
        Some(folder) => {
            std::fs::create_dir_all(folder)
                .with_context(|| format!("Failed to create log folder {}", folder.display()))?;
            let appender = tracing_appender::rolling::daily(folder, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("Failed to set logging subscriber")?;

    Ok(guard)
}
