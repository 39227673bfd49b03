//! Command configuration for a single project

use serde::{Deserialize, Serialize};

/// The commands a project runs when it is triggered
///
/// `sequential` runs first, in order, and stops at the first failure.
/// `parallel` (the `async` key in YAML) only runs once every sequential
/// command has succeeded; its commands run concurrently with no ordering
/// between them. Empty strings in either list are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Ordered commands, stop on first failure
    #[serde(default)]
    pub sequential: Vec<String>,

    /// Unordered commands, all run to completion
    #[serde(default, rename = "async")]
    pub parallel: Vec<String>,
}

impl CommandSpec {
    pub fn new<S, P>(sequential: S, parallel: P) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            sequential: sequential.into_iter().map(Into::into).collect(),
            parallel: parallel.into_iter().map(Into::into).collect(),
        }
    }

    /// Sequential commands with empty entries removed
    pub fn sequential_commands(&self) -> impl Iterator<Item = &str> {
        self.sequential.iter().map(String::as_str).filter(|c| !c.is_empty())
    }

    /// Parallel commands with empty entries removed
    pub fn parallel_commands(&self) -> impl Iterator<Item = &str> {
        self.parallel.iter().map(String::as_str).filter(|c| !c.is_empty())
    }

    /// True when there is nothing to run in either phase
    pub fn is_empty(&self) -> bool {
        self.sequential_commands().next().is_none() && self.parallel_commands().next().is_none()
    }
}
