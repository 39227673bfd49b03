//! Command executor - runs a single command under a subshell

use crate::execution::ExecutionResult;
use chrono::Utc;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Shell used for both script files and command lines
pub const DEFAULT_SHELL: &str = "bash";

/// Variables added on top of the process environment for every command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandEnv {
    vars: Vec<(String, String)>,
}

impl CommandEnv {
    /// Environment exposing the branch and repository to invoked commands
    pub fn for_trigger(branch: &str, repository: &str) -> Self {
        Self {
            vars: vec![
                ("GITHUB_BRANCH".to_string(), branch.to_string()),
                ("GITHUB_REPO".to_string(), repository.to_string()),
                ("GITHUB_REPOSITORY".to_string(), repository.to_string()),
            ],
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// How a command string is handed to the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// `bash <path>`
    Script,
    /// `bash -c <line>`
    CommandLine,
}

impl Invocation {
    /// Script files end in `.sh` or start with a path (`./` or `/`)
    pub fn classify(command: &str) -> Self {
        if command.ends_with(".sh") || command.starts_with("./") || command.starts_with('/') {
            Invocation::Script
        } else {
            Invocation::CommandLine
        }
    }
}

/// Trait for running one command - allows for different implementations
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion and describe what happened
    ///
    /// Never fails: launch errors and non-zero exits are encoded in the
    /// returned result.
    async fn run(&self, command: &str, env: &CommandEnv) -> ExecutionResult;
}

/// Executes commands as shell subprocesses
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
        }
    }

    /// Use a different shell binary
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    fn build(&self, command: &str, env: &CommandEnv) -> Command {
        let mut cmd = Command::new(&self.shell);
        match Invocation::classify(command) {
            Invocation::Script => cmd.arg(command),
            Invocation::CommandLine => cmd.arg("-c").arg(command),
        };
        cmd.envs(env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    async fn spawn_and_wait(
        &self,
        command: &str,
        env: &CommandEnv,
    ) -> std::io::Result<(ExitStatus, String)> {
        let mut child = self.build(command, env).spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("stderr was not captured"))?;

        let combined = read_combined(stdout, stderr).await?;
        let status = child.wait().await?;

        Ok((status, String::from_utf8_lossy(&combined).into_owned()))
    }
}

#[async_trait::async_trait]
impl CommandExecutor for ShellExecutor {
    async fn run(&self, command: &str, env: &CommandEnv) -> ExecutionResult {
        debug!("Running command: {}", command);

        let started_at = Utc::now();
        let clock = Instant::now();
        let outcome = self.spawn_and_wait(command, env).await;
        let duration = clock.elapsed();

        match outcome {
            Ok((status, output)) if status.success() => {
                ExecutionResult::succeeded(command, output, started_at, duration)
            }
            Ok((status, output)) => {
                let error = describe_exit(status);
                debug!("Command {} failed: {}", command, error);
                ExecutionResult::failed(command, output, error, started_at, duration)
            }
            Err(e) => {
                warn!("Failed to launch command {}: {}", command, e);
                ExecutionResult::failed(command, "", e.to_string(), started_at, duration)
            }
        }
    }
}

/// Drain stdout and stderr into one buffer in arrival order
async fn read_combined<O, E>(mut stdout: O, mut stderr: E) -> std::io::Result<Vec<u8>>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut combined = Vec::new();
    let mut out_buf = [0u8; 4096];
    let mut err_buf = [0u8; 4096];
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            read = stdout.read(&mut out_buf), if out_open => match read? {
                0 => out_open = false,
                n => combined.extend_from_slice(&out_buf[..n]),
            },
            read = stderr.read(&mut err_buf), if err_open => match read? {
                0 => err_open = false,
                n => combined.extend_from_slice(&err_buf[..n]),
            },
        }
    }

    Ok(combined)
}

/// Failure text for a non-zero exit
fn describe_exit(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit status {}", code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal: {}", signal);
        }
    }

    status.to_string()
}
