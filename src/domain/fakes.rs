//! In-memory fakes for the ports (testing only).
//!
//! Listings are served in fixed-size pages whose continuation token is the
//! index of the next page, so the pagination path is exercised too.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::model::*;
use crate::domain::ports::*;
use crate::utils::error::{ActionError, Result};

fn page_of<T: Clone>(items: &[T], page_size: usize, cursor: Option<String>) -> Page<T> {
    let index: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
    let start = (index * page_size).min(items.len());
    let end = (start + page_size).min(items.len());
    let next = (end < items.len()).then(|| (index + 1).to_string());
    Page {
        items: items[start..end].to_vec(),
        next,
    }
}

// ---------------------------------------------------------------------------
// MemorySourceControl
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemorySourceControl {
    pub tags: Vec<Tag>,
    pub tag_page_size: usize,
    pub compare_status: String,
    pub open_pull_requests: Vec<u64>,
    pub workflow_runs: Vec<WorkflowRun>,
    pub failing_reruns: HashSet<u64>,
    pub commits: HashMap<String, CommitRecord>,
    pub compare_calls: Mutex<Vec<(String, String)>>,
    pub tag_pages_served: Mutex<usize>,
    pub reruns: Mutex<Vec<u64>>,
    pub workflow_queries: Mutex<Vec<(String, String)>>,
}

impl MemorySourceControl {
    pub fn new() -> Self {
        Self {
            tag_page_size: 2,
            compare_status: "identical".to_string(),
            ..Self::default()
        }
    }

    pub fn with_tags(mut self, tags: &[(&str, &str)]) -> Self {
        self.tags = tags
            .iter()
            .map(|(name, sha)| Tag {
                name: name.to_string(),
                commit_sha: sha.to_string(),
            })
            .collect();
        self
    }

    pub fn with_compare_status(mut self, status: &str) -> Self {
        self.compare_status = status.to_string();
        self
    }

    pub fn with_commit(mut self, commit: CommitRecord) -> Self {
        self.commits.insert(commit.sha.clone(), commit);
        self
    }

    pub fn reruns(&self) -> Vec<u64> {
        self.reruns.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceControl for MemorySourceControl {
    async fn list_tags(&self, _repo: &RepoId, _per_page: u32, cursor: Option<String>) -> Result<Page<Tag>> {
        *self.tag_pages_served.lock().unwrap() += 1;
        Ok(page_of(&self.tags, self.tag_page_size.max(1), cursor))
    }

    async fn compare(&self, _repo: &RepoId, base: &str, head: &str) -> Result<String> {
        self.compare_calls
            .lock()
            .unwrap()
            .push((base.to_string(), head.to_string()));
        Ok(self.compare_status.clone())
    }

    async fn list_pull_requests(
        &self,
        _repo: &RepoId,
        _state: PullRequestState,
        cursor: Option<String>,
    ) -> Result<Page<u64>> {
        Ok(page_of(&self.open_pull_requests, 2, cursor))
    }

    async fn list_workflow_runs(
        &self,
        _repo: &RepoId,
        workflow_file: &str,
        event: &str,
        cursor: Option<String>,
    ) -> Result<Page<WorkflowRun>> {
        self.workflow_queries
            .lock()
            .unwrap()
            .push((workflow_file.to_string(), event.to_string()));
        Ok(page_of(&self.workflow_runs, 2, cursor))
    }

    async fn rerun_workflow(&self, _repo: &RepoId, run_id: u64) -> Result<()> {
        if self.failing_reruns.contains(&run_id) {
            return Err(ActionError::UpstreamStatus {
                operation: format!("rerun workflow {run_id}"),
                status: 403,
                body: "forbidden".to_string(),
            });
        }
        self.reruns.lock().unwrap().push(run_id);
        Ok(())
    }

    async fn get_commit(&self, _repo: &RepoId, sha: &str) -> Result<CommitRecord> {
        self.commits.get(sha).cloned().ok_or_else(|| ActionError::UpstreamStatus {
            operation: format!("get commit {sha}"),
            status: 404,
            body: "Not Found".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryRepositoryAdmin
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryRepositoryAdmin {
    pub fail_protection: bool,
    pub settings: Mutex<Vec<RepositorySettings>>,
    pub protections: Mutex<Vec<(String, BranchProtection)>>,
    pub status_checks: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl RepositoryAdmin for MemoryRepositoryAdmin {
    async fn update_repository_settings(&self, _repo: &RepoId, settings: &RepositorySettings) -> Result<()> {
        self.settings.lock().unwrap().push(settings.clone());
        Ok(())
    }

    async fn update_branch_protection(
        &self,
        _repo: &RepoId,
        branch: &str,
        protection: &BranchProtection,
    ) -> Result<()> {
        if self.fail_protection {
            return Err(ActionError::UpstreamStatus {
                operation: "update branch protection rules".to_string(),
                status: 404,
                body: "Branch not found".to_string(),
            });
        }
        self.protections
            .lock()
            .unwrap()
            .push((branch.to_string(), protection.clone()));
        Ok(())
    }

    async fn update_required_status_checks(&self, _repo: &RepoId, branch: &str, contexts: &[String]) -> Result<()> {
        self.status_checks
            .lock()
            .unwrap()
            .push((branch.to_string(), contexts.to_vec()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryGitWriter
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryGitWriter {
    pub branches: Mutex<HashMap<String, String>>,
    pub trees: Mutex<Vec<(String, Vec<GeneratedFile>)>>,
    pub commits: Mutex<Vec<(String, String, String, CommitAuthor)>>,
    pub pull_requests: Mutex<Vec<NewPullRequest>>,
}

impl MemoryGitWriter {
    pub fn with_branch(self, branch: &str, sha: &str) -> Self {
        self.branches
            .lock()
            .unwrap()
            .insert(branch.to_string(), sha.to_string());
        self
    }

    pub fn branch_sha(&self, branch: &str) -> Option<String> {
        self.branches.lock().unwrap().get(branch).cloned()
    }
}

#[async_trait]
impl GitWriter for MemoryGitWriter {
    async fn get_branch_sha(&self, _repo: &RepoId, branch: &str) -> Result<Option<String>> {
        Ok(self.branch_sha(branch))
    }

    async fn create_branch(&self, _repo: &RepoId, branch: &str, sha: &str) -> Result<()> {
        self.branches
            .lock()
            .unwrap()
            .insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn create_tree(&self, _repo: &RepoId, base_sha: &str, files: &[GeneratedFile]) -> Result<String> {
        let mut trees = self.trees.lock().unwrap();
        trees.push((base_sha.to_string(), files.to_vec()));
        Ok(format!("tree-{}", trees.len()))
    }

    async fn create_commit(
        &self,
        _repo: &RepoId,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
        author: &CommitAuthor,
    ) -> Result<String> {
        let mut commits = self.commits.lock().unwrap();
        commits.push((
            message.to_string(),
            tree_sha.to_string(),
            parent_sha.to_string(),
            author.clone(),
        ));
        Ok(format!("commit-{}", commits.len()))
    }

    async fn update_branch(&self, _repo: &RepoId, branch: &str, sha: &str) -> Result<()> {
        self.branches
            .lock()
            .unwrap()
            .insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn create_pull_request(&self, repo: &RepoId, pull: &NewPullRequest) -> Result<String> {
        let mut pulls = self.pull_requests.lock().unwrap();
        pulls.push(pull.clone());
        Ok(format!("https://github.com/{}/pull/{}", repo, pulls.len()))
    }
}

// ---------------------------------------------------------------------------
// MemoryChat
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryChat {
    pub channels: Vec<ChatChannel>,
    pub failing_channels: HashSet<String>,
    pub posted: Mutex<Vec<(String, String)>>,
    pub joined: Mutex<Vec<String>>,
    /// Member ids keyed by email.
    pub members: HashMap<String, String>,
    pub direct: Mutex<Vec<(String, String)>>,
}

impl MemoryChat {
    pub fn with_channels(mut self, channels: &[(&str, &str)]) -> Self {
        self.channels = channels
            .iter()
            .map(|(id, name)| ChatChannel {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();
        self
    }

    pub fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().unwrap().clone()
    }

    pub fn with_member(mut self, email: &str, id: &str) -> Self {
        self.members.insert(email.to_string(), id.to_string());
        self
    }

    /// Direct messages as `(member id, text)`.
    pub fn direct(&self) -> Vec<(String, String)> {
        self.direct.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatNotifier for MemoryChat {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        if self.failing_channels.contains(channel) {
            return Err(ActionError::upstream("post message to channel", "channel_not_found"));
        }
        self.posted
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }

    async fn list_channels(&self, cursor: Option<String>) -> Result<Page<ChatChannel>> {
        Ok(page_of(&self.channels, 2, cursor))
    }

    async fn join_channel(&self, channel_id: &str) -> Result<()> {
        self.joined.lock().unwrap().push(channel_id.to_string());
        Ok(())
    }

    async fn direct_message(&self, email: &str, text: &str) -> Result<()> {
        let id = self
            .members
            .get(email)
            .ok_or_else(|| ActionError::upstream("retrieve slack identity of committer", "users_not_found"))?;
        self.direct.lock().unwrap().push((id.clone(), text.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    pub services: Vec<CatalogService>,
    pub levels: Vec<MaturityLevel>,
}

#[async_trait]
impl ServiceCatalog for MemoryCatalog {
    async fn list_services(&self, cursor: Option<String>) -> Result<Page<CatalogService>> {
        Ok(page_of(&self.services, 2, cursor))
    }

    async fn list_levels(&self) -> Result<Vec<MaturityLevel>> {
        Ok(self.levels.clone())
    }
}

// ---------------------------------------------------------------------------
// MemorySchemaStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemorySchemaStore {
    pub bucket: String,
    pub objects: Vec<SchemaObject>,
}

#[async_trait]
impl SchemaStore for MemorySchemaStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects(&self, prefix: &str, cursor: Option<String>) -> Result<Page<SchemaObject>> {
        let matching: Vec<SchemaObject> = self
            .objects
            .iter()
            .filter(|object| object.key.starts_with(prefix))
            .cloned()
            .collect();
        Ok(page_of(&matching, 2, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_of_splits_and_links() {
        let items = [1, 2, 3, 4, 5];
        let first = page_of(&items, 2, None);
        assert_eq!(first.items, vec![1, 2]);
        assert_eq!(first.next.as_deref(), Some("1"));

        let last = page_of(&items, 2, Some("2".to_string()));
        assert_eq!(last.items, vec![5]);
        assert_eq!(last.next, None);

        assert_eq!(page_of::<u8>(&[], 2, None), Page::last(vec![]));
    }
}
