//! Webhook payloads the actions are triggered with.
//!
//! GitHub hands the action the event name (`GITHUB_EVENT_NAME`) and the raw
//! JSON payload (`GITHUB_EVENT_PATH`). Each supported event has its own strict
//! schema; only the fields the actions read are modelled.

use crate::domain::model::RepoId;
use crate::utils::error::{ActionError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Owner,
}

impl Repository {
    pub fn id(&self) -> RepoId {
        RepoId::new(&self.owner.login, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestHead {
    /// Head branch name.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Last commit on the head branch.
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestBase {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repo: Repository,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub title: String,
    pub number: u64,
    pub commits: u64,
    pub head: PullRequestHead,
    pub base: PullRequestBase,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestEvent {
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Branch,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub ref_type: RefType,
    pub repository: Repository,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusAuthor {
    pub login: String,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusCommit {
    pub sha: String,
    pub html_url: String,
    pub author: Option<StatusAuthor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusBranch {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusRepository {
    pub full_name: String,
    pub html_url: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusEvent {
    pub state: String,
    pub context: String,
    pub target_url: Option<String>,
    pub commit: StatusCommit,
    #[serde(default)]
    pub branches: Vec<StatusBranch>,
    pub repository: StatusRepository,
}

/// A decoded event, keyed by event name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubEvent {
    PullRequest(PullRequestEvent),
    Create(CreateEvent),
    Status(StatusEvent),
}

impl GitHubEvent {
    pub fn decode(event_name: &str, payload: &[u8]) -> Result<Self> {
        match event_name {
            "pull_request" => decode_as(event_name, payload).map(Self::PullRequest),
            "create" => decode_as(event_name, payload).map(Self::Create),
            "status" => decode_as(event_name, payload).map(Self::Status),
            other => Err(ActionError::UnsupportedEvent {
                event: other.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PullRequest(_) => "pull_request",
            Self::Create(_) => "create",
            Self::Status(_) => "status",
        }
    }
}

fn decode_as<T: DeserializeOwned>(event_name: &str, payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload).map_err(|source| ActionError::EventDecode {
        event: event_name.to_string(),
        source,
    })
}
