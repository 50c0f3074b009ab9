use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `owner/name` pair identifying a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parses `owner/name`.
    pub fn parse(slug: &str) -> Option<Self> {
        let (owner, name) = slug.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One page of a listing plus the token for the page after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub commit_sha: String,
}

/// A tag whose name is `<prefix><unix timestamp>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTag {
    pub name: String,
    pub timestamp: u64,
    pub commit_sha: String,
}

/// Whether the CommitGuard gate applies to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    /// No marker tag exists.
    Inactive,
    Active { required_sha: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    pub author_email: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    pub id: u64,
    pub pull_requests: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Closed,
    All,
}

impl PullRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

/// Outcome of triggering re-runs; failed IDs keep their error text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RerunReport {
    pub triggered: Vec<u64>,
    pub failed: Vec<(u64, String)>,
}

impl RerunReport {
    pub fn is_partial_failure(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySettings {
    pub allow_rebase_merge: bool,
    pub allow_squash_merge: bool,
    pub allow_merge_commit: bool,
    pub allow_auto_merge: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchProtection {
    pub require_code_owner_reviews: bool,
    pub required_approving_review_count: u32,
    pub required_conversation_resolution: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatChannel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaturityLevel {
    pub index: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    pub index: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamContact {
    pub kind: String,
    pub address: String,
}

/// A service as listed by the service catalog, with everything the
/// maturity check reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogService {
    pub name: String,
    pub html_url: String,
    pub lifecycle: Option<Lifecycle>,
    pub level: Option<MaturityLevel>,
    pub team_contacts: Vec<TeamContact>,
    pub repository_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// A file to commit: path inside the target repository and its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}
