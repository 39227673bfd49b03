use anyhow::{Context, Result};
use github_sentry::cli::commands::{HistoryCommand, ServeCommand, TestNotifyCommand, ValidateCommand};
use github_sentry::cli::output::*;
use github_sentry::cli::{Cli, Command};
use github_sentry::core::config::RelayConfig;
use github_sentry::execution::{CommandEngine, ShellExecutor};
use github_sentry::notify::{FeishuNotifier, Notification, NotificationStatus, Notifier};
use github_sentry::persistence::{ExecutionStore, InMemoryStore};
use github_sentry::pipeline::Relay;
use github_sentry::server::{create_router, AppState};
use github_sentry::{logging, ProjectRegistry};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Execute command
    match cli.command() {
        Command::Serve(cmd) => serve(&cli, &cmd).await?,
        Command::Validate(cmd) => validate_config(&cli.config, &cmd)?,
        Command::TestNotify(cmd) => test_notify(&cli, &cmd).await?,
        Command::History(cmd) => show_history(&cli.config, &cmd).await?,
    }

    Ok(())
}

async fn serve(cli: &Cli, cmd: &ServeCommand) -> Result<()> {
    let config = RelayConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    let _log_guard = logging::init(cli.verbose, config.log_folder.as_deref())?;

    let store = open_store(&config, cmd.no_history).await?;
    let notifier = FeishuNotifier::from_config(&config.feishu)
        .context("Failed to create Feishu client")?;
    let registry = config.registry();
    log_projects(&registry);

    let relay = Relay::new(
        CommandEngine::new(ShellExecutor::new()),
        registry,
        Arc::clone(&store),
        Arc::new(notifier),
    )
    .with_async_failure_policy(config.pipeline.async_failure_policy)
    .with_max_concurrent_runs(config.pipeline.max_concurrent_runs);

    let relay = Arc::new(relay);
    let state = AppState::new(
        Arc::clone(&relay),
        &config.github_webhook_secret,
        &config.staging_branch,
    );
    let app = create_router(state);

    let addr = cmd.addr.as_deref().unwrap_or(&config.addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(
        "Listening on {} (staging branch: {})",
        addr, config.staging_branch
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down");
    relay.drain().await;
    store.close().await;
    Ok(())
}

async fn open_store(config: &RelayConfig, no_history: bool) -> Result<Arc<dyn ExecutionStore>> {
    if no_history {
        warn!("History disabled, triggers are kept in memory only");
        return Ok(Arc::new(InMemoryStore::new()));
    }
    open_database(config).await
}

#[cfg(feature = "sqlite")]
async fn open_database(config: &RelayConfig) -> Result<Arc<dyn ExecutionStore>> {
    let path = config.database_path()?;
    info!("Opening database {}", path.display());
    let store = github_sentry::persistence::SqliteStore::open(&path).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_database(_config: &RelayConfig) -> Result<Arc<dyn ExecutionStore>> {
    warn!("Built without sqlite support, triggers are kept in memory only");
    Ok(Arc::new(InMemoryStore::new()))
}

fn log_projects(registry: &ProjectRegistry) {
    if registry.is_empty() {
        warn!("No projects configured, every push will be skipped");
    }
    for project in registry.iter() {
        info!(
            "Project {}: {}/{} ({} sequential, {} async)",
            project.name,
            project.organization,
            project.repo,
            project.commands.sequential_commands().count(),
            project.commands.parallel_commands().count()
        );
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn validate_config(path: &Path, cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating {}...", INFO, path.display());

    match RelayConfig::from_file(path) {
        Ok(config) => {
            println!("{} Configuration is valid!", CHECK);
            for line in format_config_summary(&config) {
                println!("{}", line);
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

async fn test_notify(cli: &Cli, cmd: &TestNotifyCommand) -> Result<()> {
    let config = RelayConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    let _log_guard = logging::init(cli.verbose, None)?;

    let notifier = FeishuNotifier::from_config(&config.feishu)
        .context("Failed to create Feishu client")?;
    let status = NotificationStatus::from(cmd.status);
    let notification = Notification {
        status,
        repo: cmd.repo.clone(),
        author: "github-sentry".to_string(),
        commit_id: cmd.commit_id.clone(),
        message: cmd.message.clone(),
        branch: cmd.branch.clone().unwrap_or_else(|| config.staging_branch.clone()),
        commit_time: chrono::Utc::now(),
    };

    println!(
        "{} Sending {} card (signed: {})",
        ROCKET,
        style(status).bold(),
        notifier.is_signed()
    );

    match notifier.send(&notification).await {
        Ok(()) => {
            println!("{} Notification delivered", CHECK);
            Ok(())
        }
        Err(e) => {
            println!("{} {}", CROSS, style(&e).red());
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "sqlite")]
async fn show_history(config_path: &Path, cmd: &HistoryCommand) -> Result<()> {
    let config = RelayConfig::from_file(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    let store = github_sentry::persistence::SqliteStore::open(config.database_path()?).await?;

    // Executions of one trigger
    if let Some(trigger_id) = cmd.trigger {
        let executions = store.executions_for(trigger_id).await?;
        if cmd.json {
            let data = serde_json::json!({ "trigger_id": trigger_id, "executions": executions });
            println!("{}", serde_json::to_string_pretty(&data)?);
        } else if executions.is_empty() {
            println!("{} No executions recorded for trigger #{}", WARN, trigger_id);
        } else {
            println!("{} Executions for trigger #{}:", INFO, trigger_id);
            for record in &executions {
                println!("  {}", format_execution_record(record, cmd.output));
            }
        }
        store.close().await;
        return Ok(());
    }

    let triggers = store.recent_triggers(cmd.limit).await?;
    if cmd.json {
        let data = serde_json::json!({ "triggers": triggers });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else if triggers.is_empty() {
        println!("{} No triggers recorded", INFO);
    } else {
        println!("{} Trigger history (showing latest {}):", INFO, cmd.limit);
        for record in &triggers {
            println!("  {}", format_trigger_record(record));
        }
    }

    store.close().await;
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn show_history(_config_path: &Path, _cmd: &HistoryCommand) -> Result<()> {
    anyhow::bail!("history requires the sqlite feature")
}
