//! Relay configuration from YAML

use crate::core::{CommandSpec, Project, ProjectRegistry};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// The only configuration schema version this build understands
pub const CONFIG_VERSION: u32 = 1;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Top-level relay configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Schema version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Address the webhook server binds to
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Secret shared with GitHub for payload signatures
    #[serde(default, skip_serializing)]
    pub github_webhook_secret: String,

    /// Only pushes to this branch start a pipeline run
    #[serde(default)]
    pub staging_branch: String,

    /// Directory for the daily log file (stdout only when unset)
    #[serde(default)]
    pub log_folder: Option<PathBuf>,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub feishu: FeishuConfig,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Projects by entry name
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,
}

/// SQLite database location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the database file (platform data dir when unset)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Feishu custom bot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeishuConfig {
    #[serde(default)]
    pub webhook_url: String,

    /// Signing secret, only needed for bots with signature verification on
    #[serde(default, skip_serializing)]
    pub webhook_secret: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            webhook_secret: None,
            timeout_secs: default_notify_timeout(),
        }
    }
}

/// Knobs for pipeline runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// What a failed async command does to the run's terminal status
    #[serde(default)]
    pub async_failure_policy: AsyncFailurePolicy,

    /// Ceiling on concurrently executing runs (unbounded when unset)
    #[serde(default)]
    pub max_concurrent_runs: Option<usize>,
}

/// How failed commands in the async phase affect the terminal notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsyncFailurePolicy {
    /// Record the failure; the run still finishes with a success notification
    #[default]
    Report,
    /// Any failed async command turns the run into a failure
    Escalate,
}

/// One project entry as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub organization: String,

    #[serde(default)]
    pub repo: String,

    #[serde(flatten)]
    pub commands: CommandSpec,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_notify_timeout() -> u64 {
    10
}

impl RelayConfig {
    /// Load relay configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse relay configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RelayConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the relay configuration
    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            anyhow::bail!(
                "Unsupported config version {} (expected {})",
                self.version,
                CONFIG_VERSION
            );
        }

        if self.github_webhook_secret.is_empty() {
            anyhow::bail!("github_webhook_secret must be set");
        }

        if self.staging_branch.is_empty() {
            anyhow::bail!("staging_branch must be set");
        }

        if self.feishu.webhook_url.is_empty() {
            anyhow::bail!("feishu.webhook_url must be set");
        }

        if self.pipeline.max_concurrent_runs == Some(0) {
            anyhow::bail!("pipeline.max_concurrent_runs must be at least 1 when set");
        }

        let mut seen = HashSet::new();
        for (name, project) in &self.projects {
            if project.organization.is_empty() {
                anyhow::bail!("projects.{}.organization must be set", name);
            }
            if project.repo.is_empty() {
                anyhow::bail!("projects.{}.repo must be set", name);
            }
            if !seen.insert((&project.organization, &project.repo)) {
                anyhow::bail!(
                    "projects.{} duplicates repository {}/{}",
                    name,
                    project.organization,
                    project.repo
                );
            }
        }

        Ok(())
    }

    /// Resolve project entries into a lookup table
    pub fn registry(&self) -> ProjectRegistry {
        self.projects
            .iter()
            .map(|(name, project)| Project {
                name: name.clone(),
                organization: project.organization.clone(),
                repo: project.repo.clone(),
                commands: project.commands.clone(),
            })
            .collect()
    }

    /// Database path, falling back to the platform data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        let db_dir = data_dir.join("github-sentry");
        std::fs::create_dir_all(&db_dir)
            .with_context(|| format!("Failed to create {}", db_dir.display()))?;

        Ok(db_dir.join("sentry.db"))
    }
}
