//! Trigger identity and the push-event gate
//!
//! A GitHub push payload is decoded into [`PushEvent`], filtered by branch and
//! reduced to a [`TriggerIdentity`] that the relay works with from then on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Fallback organization when the payload carries no repository owner
pub const UNKNOWN_ORGANIZATION: &str = "unknown";

/// Fallback repository name when the payload carries no repository
pub const UNKNOWN_REPO: &str = "repo";

/// Fallback author when no name or login can be found
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Who pushed what, where and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerIdentity {
    pub commit_id: String,
    pub message: String,
    pub branch: String,
    pub organization: String,
    pub repo: String,
    pub author: String,
    pub commit_time: DateTime<Utc>,
}

impl TriggerIdentity {
    /// `organization/repo`, as shown in notifications and exported to commands
    pub fn full_repo_name(&self) -> String {
        format!("{}/{}", self.organization, self.repo)
    }
}

/// Outcome of running a push event through the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The push targets the watched branch and has a head commit
    Accept(TriggerIdentity),
    /// The push targets some other branch
    BranchIgnored { branch: String },
    /// The push has no head commit (e.g. a branch deletion)
    NoHeadCommit,
}

/// The subset of a GitHub push payload the relay reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref", default)]
    pub git_ref: String,

    #[serde(default)]
    pub head_commit: Option<HeadCommit>,

    #[serde(default)]
    pub repository: Option<Repository>,

    #[serde(default)]
    pub pusher: Option<GitUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadCommit {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub author: Option<GitUser>,
}

/// Commit author or pusher
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitUser {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub owner: Option<RepositoryOwner>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryOwner {
    #[serde(default)]
    pub login: String,

    #[serde(default)]
    pub name: Option<String>,
}

impl PushEvent {
    /// Parse a push payload from its JSON body
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    /// Branch name with the `refs/heads/` prefix removed
    pub fn branch(&self) -> &str {
        self.git_ref
            .strip_prefix(BRANCH_REF_PREFIX)
            .unwrap_or(&self.git_ref)
    }

    /// Decide whether this push starts a pipeline run on `watched_branch`
    pub fn gate(&self, watched_branch: &str) -> GateDecision {
        let branch = self.branch();
        if branch != watched_branch {
            return GateDecision::BranchIgnored {
                branch: branch.to_string(),
            };
        }

        let Some(head) = &self.head_commit else {
            return GateDecision::NoHeadCommit;
        };

        let (organization, repo) = self.repository_identity();

        GateDecision::Accept(TriggerIdentity {
            commit_id: head.id.clone(),
            message: head.message.clone(),
            branch: branch.to_string(),
            organization,
            repo,
            author: self.author(),
            commit_time: head.timestamp.unwrap_or_else(Utc::now),
        })
    }

    fn repository_identity(&self) -> (String, String) {
        let (organization, repo) = match &self.repository {
            Some(repository) => {
                let owner = repository
                    .owner
                    .as_ref()
                    .map(|owner| {
                        if owner.login.is_empty() {
                            owner.name.clone().unwrap_or_default()
                        } else {
                            owner.login.clone()
                        }
                    })
                    .unwrap_or_default();
                (owner, repository.name.clone())
            }
            None => (String::new(), String::new()),
        };

        if organization.is_empty() && repo.is_empty() {
            (UNKNOWN_ORGANIZATION.to_string(), UNKNOWN_REPO.to_string())
        } else {
            (organization, repo)
        }
    }

    /// Commit author name, then author login, then pusher name, then pusher login
    fn author(&self) -> String {
        let commit_author = self.head_commit.as_ref().and_then(|c| c.author.as_ref());
        let candidates = [
            commit_author.map(|a| a.name.as_str()),
            commit_author.map(|a| a.username.as_str()),
            self.pusher.as_ref().map(|p| p.name.as_str()),
            self.pusher.as_ref().map(|p| p.username.as_str()),
        ];

        candidates
            .into_iter()
            .flatten()
            .find(|candidate| !candidate.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string()
    }
}
