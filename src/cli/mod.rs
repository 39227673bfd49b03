//! Command-line interface

pub mod commands;
pub mod output;

use crate::core::config::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};
use commands::{HistoryCommand, ServeCommand, TestNotifyCommand, ValidateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Relay GitHub pushes to build commands and Feishu notifications
#[derive(Debug, Parser, Clone)]
#[command(name = "github-sentry")]
#[command(version)]
#[command(about = "Run configured commands on staging pushes and report to Feishu", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the relay configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Start the webhook server (default)
    Serve(ServeCommand),

    /// Validate the configuration file
    Validate(ValidateCommand),

    /// Send a single notification card
    TestNotify(TestNotifyCommand),

    /// Show recorded triggers and executions
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// The requested command, `serve` when none was given
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Serve(ServeCommand::default()))
    }
}
