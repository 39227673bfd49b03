//! Project lookup by repository identity

use crate::core::CommandSpec;
use std::collections::HashMap;

/// A configured project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Name of the project entry in the configuration
    pub name: String,
    pub organization: String,
    pub repo: String,
    pub commands: CommandSpec,
}

/// Projects keyed by `(organization, repo)`
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: HashMap<(String, String), Project>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project, replacing any entry for the same repository
    pub fn insert(&mut self, project: Project) -> Option<Project> {
        let key = (project.organization.clone(), project.repo.clone());
        self.projects.insert(key, project)
    }

    /// Find the project configured for a repository
    pub fn lookup(&self, organization: &str, repo: &str) -> Option<&Project> {
        self.projects
            .get(&(organization.to_string(), repo.to_string()))
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }
}

impl FromIterator<Project> for ProjectRegistry {
    fn from_iter<I: IntoIterator<Item = Project>>(iter: I) -> Self {
        let mut registry = Self::new();
        for project in iter {
            registry.insert(project);
        }
        registry
    }
}
