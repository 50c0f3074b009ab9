//! Commits freshly generated stubs into a downstream repository when the
//! schema registry changed within the last hour.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};

use crate::core::pagination::Paginator;
use crate::domain::model::{CommitAuthor, GeneratedFile, NewPullRequest, RepoId};
use crate::domain::ports::{GitWriter, SchemaStore};
use crate::utils::error::{ActionError, Result};

pub const DEFAULT_AUTHOR_NAME: &str = "Outreach CI";
pub const DEFAULT_AUTHOR_EMAIL: &str = "outreach-ci@users.noreply.github.com";
pub const DEFAULT_COMMIT_BRANCH: &str = "feature";
pub const DEFAULT_BASE_BRANCH: &str = "main";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Generate new clerk stubs";
pub const DEFAULT_PR_TITLE: &str = "feat: generate new clerk stubs";
pub const DEFAULT_PR_BODY: &str = "Automatically generate new clerk stubs per hour";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubSyncConfig {
    pub target: RepoId,
    /// Branch the stubs are committed to; created from `base_branch` when missing.
    pub commit_branch: String,
    pub base_branch: String,
    pub author: CommitAuthor,
    pub commit_message: String,
    pub pr_title: String,
    pub pr_body: String,
}

impl StubSyncConfig {
    pub fn new(target: RepoId) -> Self {
        Self {
            target,
            commit_branch: DEFAULT_COMMIT_BRANCH.to_string(),
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            author: CommitAuthor {
                name: DEFAULT_AUTHOR_NAME.to_string(),
                email: DEFAULT_AUTHOR_EMAIL.to_string(),
            },
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            pr_title: DEFAULT_PR_TITLE.to_string(),
            pr_body: DEFAULT_PR_BODY.to_string(),
        }
    }
}

/// Newest modification time under `prefix`.
pub async fn latest_schema_timestamp<S>(store: &S, prefix: &str) -> Result<DateTime<Utc>>
where
    S: SchemaStore + ?Sized,
{
    let mut pages = Paginator::new(move |cursor: Option<String>| store.list_objects(prefix, cursor));
    let mut latest: Option<DateTime<Utc>> = None;

    while let Some(objects) = pages.next_page().await? {
        for object in objects {
            if latest.map_or(true, |max| object.last_modified > max) {
                latest = Some(object.last_modified);
            }
        }
    }

    latest.ok_or_else(|| ActionError::NoSchemaObjects {
        bucket: store.bucket().to_string(),
        prefix: prefix.to_string(),
    })
}

/// True when `latest` lies strictly inside the hour before `now`.
pub fn is_fresh(latest: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > latest && now - Duration::hours(1) < latest
}

/// Every regular file under `dir`, with paths relative to it, sorted.
pub fn collect_generated_files(dir: &Path) -> Result<Vec<GeneratedFile>> {
    let mut files = Vec::new();
    walk(dir, dir, &mut files)?;
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<GeneratedFile>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(root, &path, files)?;
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(&path);
        let path_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        tracing::debug!("collected generated file {}", path_str);
        files.push(GeneratedFile {
            path: path_str,
            content: std::fs::read_to_string(&path)?,
        });
    }
    Ok(())
}

/// Tip of the commit branch, creating the branch from the base branch first
/// when it does not exist yet.
pub async fn ensure_commit_branch<G>(git: &G, config: &StubSyncConfig) -> Result<String>
where
    G: GitWriter + ?Sized,
{
    let repo = &config.target;
    if let Some(sha) = git.get_branch_sha(repo, &config.commit_branch).await? {
        return Ok(sha);
    }

    if config.commit_branch == config.base_branch {
        return Err(ActionError::InvalidConfigValue {
            field: "base_branch".to_string(),
            value: config.base_branch.clone(),
            reason: "the commit branch does not exist but the base branch is the same as the commit branch".to_string(),
        });
    }
    if config.base_branch.is_empty() {
        return Err(ActionError::InvalidConfigValue {
            field: "base_branch".to_string(),
            value: String::new(),
            reason: "must be set when the commit branch does not exist".to_string(),
        });
    }

    let base_sha = git
        .get_branch_sha(repo, &config.base_branch)
        .await?
        .ok_or_else(|| ActionError::upstream("get base branch", format!("branch {} not found", config.base_branch)))?;

    tracing::info!("creating branch {} from {} at {}", config.commit_branch, config.base_branch, base_sha);
    git.create_branch(repo, &config.commit_branch, &base_sha).await?;
    Ok(base_sha)
}

/// Commits `files` on top of the commit branch and opens a pull request.
/// Returns the pull request URL.
pub async fn publish_stubs<G>(git: &G, config: &StubSyncConfig, files: &[GeneratedFile]) -> Result<String>
where
    G: GitWriter + ?Sized,
{
    let repo = &config.target;
    let parent = ensure_commit_branch(git, config).await?;

    let tree = git
        .create_tree(repo, &parent, files)
        .await
        .map_err(|e| ActionError::upstream("create the tree based on the provided files", e))?;
    let commit = git
        .create_commit(repo, &config.commit_message, &tree, &parent, &config.author)
        .await
        .map_err(|e| ActionError::upstream("create the commit", e))?;
    git.update_branch(repo, &config.commit_branch, &commit)
        .await
        .map_err(|e| ActionError::upstream("update the commit branch", e))?;

    let pull = NewPullRequest {
        title: config.pr_title.clone(),
        head: config.commit_branch.clone(),
        base: config.base_branch.clone(),
        body: config.pr_body.clone(),
    };
    let url = git
        .create_pull_request(repo, &pull)
        .await
        .map_err(|e| ActionError::upstream("create the pull request", e))?;

    tracing::info!("PR created: {}", url);
    Ok(url)
}

/// Returns the pull request URL, or `None` when the schemas are not fresh.
pub async fn run_stub_sync<S, G>(
    store: &S,
    git: &G,
    config: &StubSyncConfig,
    prefix: &str,
    generated_dir: &Path,
    now: DateTime<Utc>,
) -> Result<Option<String>>
where
    S: SchemaStore + ?Sized,
    G: GitWriter + ?Sized,
{
    let latest = latest_schema_timestamp(store, prefix).await?;
    if !is_fresh(latest, now) {
        tracing::info!("schemas last changed at {}, nothing to sync", latest);
        return Ok(None);
    }

    let files = collect_generated_files(generated_dir)?;
    if files.is_empty() {
        tracing::warn!("no generated files under {}", generated_dir.display());
        return Ok(None);
    }

    tracing::info!("syncing {} generated files into {}", files.len(), config.target);
    publish_stubs(git, config, &files).await.map(Some)
}
