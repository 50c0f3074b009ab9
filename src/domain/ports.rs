use crate::domain::model::{
    BranchProtection, CatalogService, ChatChannel, CommitAuthor, CommitRecord, GeneratedFile,
    MaturityLevel, NewPullRequest, Page, PullRequestState, RepoId, RepositorySettings,
    SchemaObject, Tag, WorkflowRun,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Read side of the source-control API plus workflow re-runs.
#[async_trait]
pub trait SourceControl: Send + Sync {
    async fn list_tags(&self, repo: &RepoId, per_page: u32, cursor: Option<String>) -> Result<Page<Tag>>;

    /// Literal comparison status of `head` relative to `base`.
    async fn compare(&self, repo: &RepoId, base: &str, head: &str) -> Result<String>;

    /// Pull request numbers in the given state.
    async fn list_pull_requests(
        &self,
        repo: &RepoId,
        state: PullRequestState,
        cursor: Option<String>,
    ) -> Result<Page<u64>>;

    async fn list_workflow_runs(
        &self,
        repo: &RepoId,
        workflow_file: &str,
        event: &str,
        cursor: Option<String>,
    ) -> Result<Page<WorkflowRun>>;

    async fn rerun_workflow(&self, repo: &RepoId, run_id: u64) -> Result<()>;

    async fn get_commit(&self, repo: &RepoId, sha: &str) -> Result<CommitRecord>;
}

/// Repository and branch-protection settings.
#[async_trait]
pub trait RepositoryAdmin: Send + Sync {
    async fn update_repository_settings(&self, repo: &RepoId, settings: &RepositorySettings) -> Result<()>;

    async fn update_branch_protection(
        &self,
        repo: &RepoId,
        branch: &str,
        protection: &BranchProtection,
    ) -> Result<()>;

    async fn update_required_status_checks(&self, repo: &RepoId, branch: &str, contexts: &[String]) -> Result<()>;
}

/// Low-level git data writes used to commit files without a checkout.
#[async_trait]
pub trait GitWriter: Send + Sync {
    /// Tip of `branch`, or `None` when the branch does not exist.
    async fn get_branch_sha(&self, repo: &RepoId, branch: &str) -> Result<Option<String>>;

    async fn create_branch(&self, repo: &RepoId, branch: &str, sha: &str) -> Result<()>;

    /// Returns the new tree's SHA.
    async fn create_tree(&self, repo: &RepoId, base_sha: &str, files: &[GeneratedFile]) -> Result<String>;

    /// Returns the new commit's SHA.
    async fn create_commit(
        &self,
        repo: &RepoId,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
        author: &CommitAuthor,
    ) -> Result<String>;

    async fn update_branch(&self, repo: &RepoId, branch: &str, sha: &str) -> Result<()>;

    /// Returns the pull request's html URL.
    async fn create_pull_request(&self, repo: &RepoId, pull: &NewPullRequest) -> Result<String>;
}

#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()>;

    async fn list_channels(&self, cursor: Option<String>) -> Result<Page<ChatChannel>>;

    async fn join_channel(&self, channel_id: &str) -> Result<()>;

    /// Messages the workspace member registered under `email` directly.
    async fn direct_message(&self, email: &str, text: &str) -> Result<()>;
}

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn list_services(&self, cursor: Option<String>) -> Result<Page<CatalogService>>;

    /// Every maturity level of the rubric.
    async fn list_levels(&self) -> Result<Vec<MaturityLevel>>;
}

#[async_trait]
pub trait SchemaStore: Send + Sync {
    fn bucket(&self) -> &str;

    async fn list_objects(&self, prefix: &str, cursor: Option<String>) -> Result<Page<SchemaObject>>;
}
