//! GitHub REST client backing the source-control ports.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::domain::model::{
    BranchProtection, CommitAuthor, CommitRecord, GeneratedFile, NewPullRequest, Page, PullRequestState, RepoId,
    RepositorySettings, Tag, WorkflowRun,
};
use crate::domain::ports::{GitWriter, RepositoryAdmin, SourceControl};
use crate::utils::error::Result;
use crate::utils::http::{ensure_success, read_json, send_with_rate_limit_retry};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const PER_PAGE: u32 = 100;
const GITHUB_JSON: &str = "application/vnd.github+json";
const CLIENT_USER_AGENT: &str = concat!("ci-actions/", env!("CARGO_PKG_VERSION"));

/// The `page` query parameter of the `rel="next"` entry of a `Link` header.
pub fn next_page_from_link(link: &str) -> Option<String> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';').map(str::trim);
        let target = parts.next()?.strip_prefix('<')?.strip_suffix('>')?;
        if !parts.any(|param| param == "rel=\"next\"") {
            return None;
        }
        Url::parse(target)
            .ok()?
            .query_pairs()
            .find(|(key, _)| key == "page")
            .map(|(_, value)| value.into_owned())
    })
}

fn next_page(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LINK)
        .and_then(|value| value.to_str().ok())
        .and_then(next_page_from_link)
}

#[derive(Debug, Deserialize)]
struct TagResponse {
    name: String,
    commit: ShaResponse,
}

#[derive(Debug, Deserialize)]
struct ShaResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CompareResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct NumberResponse {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunsResponse {
    workflow_runs: Vec<WorkflowRunResponse>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunResponse {
    id: u64,
    #[serde(default)]
    pull_requests: Vec<NumberResponse>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
    author: Option<CommitDetailAuthor>,
    verification: Option<Verification>,
}

#[derive(Debug, Deserialize)]
struct CommitDetailAuthor {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Verification {
    verified: bool,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: ShaResponse,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    html_url: String,
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn repo_url(&self, repo: &RepoId, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.base_url, repo.owner, repo.name, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, GITHUB_JSON)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        let response = send_with_rate_limit_retry(operation, request).await?;
        ensure_success(operation, response).await
    }

    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, String)],
        cursor: Option<String>,
    ) -> Result<(T, Option<String>)> {
        let mut request = self
            .request(Method::GET, url)
            .query(query)
            .query(&[("per_page", PER_PAGE)]);
        if let Some(page) = cursor {
            request = request.query(&[("page", page)]);
        }

        let response = self.send(operation, request).await?;
        let next = next_page(&response);
        let body = read_json(operation, response).await?;
        Ok((body, next))
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn list_tags(&self, repo: &RepoId, per_page: u32, cursor: Option<String>) -> Result<Page<Tag>> {
        let operation = "list tags";
        let mut request = self
            .request(Method::GET, &self.repo_url(repo, "/tags"))
            .query(&[("per_page", per_page)]);
        if let Some(page) = cursor {
            request = request.query(&[("page", page)]);
        }

        let response = self.send(operation, request).await?;
        let next = next_page(&response);
        let tags: Vec<TagResponse> = read_json(operation, response).await?;
        tracing::debug!("fetched {} tags of {}", tags.len(), repo);

        Ok(Page {
            items: tags
                .into_iter()
                .map(|tag| Tag {
                    name: tag.name,
                    commit_sha: tag.commit.sha,
                })
                .collect(),
            next,
        })
    }

    async fn compare(&self, repo: &RepoId, base: &str, head: &str) -> Result<String> {
        let operation = "compare commits";
        let url = self.repo_url(repo, &format!("/compare/{base}...{head}"));
        let response = self.send(operation, self.request(Method::GET, &url)).await?;
        let comparison: CompareResponse = read_json(operation, response).await?;
        Ok(comparison.status)
    }

    async fn list_pull_requests(
        &self,
        repo: &RepoId,
        state: PullRequestState,
        cursor: Option<String>,
    ) -> Result<Page<u64>> {
        let (pulls, next): (Vec<NumberResponse>, _) = self
            .get_page(
                "list pull requests",
                &self.repo_url(repo, "/pulls"),
                &[("state", state.as_str().to_string())],
                cursor,
            )
            .await?;

        Ok(Page {
            items: pulls.into_iter().map(|pr| pr.number).collect(),
            next,
        })
    }

    async fn list_workflow_runs(
        &self,
        repo: &RepoId,
        workflow_file: &str,
        event: &str,
        cursor: Option<String>,
    ) -> Result<Page<WorkflowRun>> {
        let url = self.repo_url(repo, &format!("/actions/workflows/{workflow_file}/runs"));
        let (runs, next): (WorkflowRunsResponse, _) = self
            .get_page("list workflow runs", &url, &[("event", event.to_string())], cursor)
            .await?;

        Ok(Page {
            items: runs
                .workflow_runs
                .into_iter()
                .map(|run| WorkflowRun {
                    id: run.id,
                    pull_requests: run.pull_requests.into_iter().map(|pr| pr.number).collect(),
                })
                .collect(),
            next,
        })
    }

    async fn rerun_workflow(&self, repo: &RepoId, run_id: u64) -> Result<()> {
        let url = self.repo_url(repo, &format!("/actions/runs/{run_id}/rerun"));
        self.send(&format!("rerun workflow {run_id}"), self.request(Method::POST, &url))
            .await?;
        Ok(())
    }

    async fn get_commit(&self, repo: &RepoId, sha: &str) -> Result<CommitRecord> {
        let operation = "get first commit details from github api";
        let url = self.repo_url(repo, &format!("/commits/{sha}"));
        let response = self.send(operation, self.request(Method::GET, &url)).await?;
        let commit: CommitResponse = read_json(operation, response).await?;

        Ok(CommitRecord {
            sha: commit.sha,
            message: commit.commit.message,
            author_email: commit.commit.author.and_then(|author| author.email),
            verified: commit.commit.verification.is_some_and(|v| v.verified),
        })
    }
}

#[async_trait]
impl RepositoryAdmin for GitHubClient {
    async fn update_repository_settings(&self, repo: &RepoId, settings: &RepositorySettings) -> Result<()> {
        let request = self
            .request(Method::PATCH, &self.repo_url(repo, ""))
            .json(settings);
        self.send("update repository settings", request).await?;
        Ok(())
    }

    async fn update_branch_protection(
        &self,
        repo: &RepoId,
        branch: &str,
        protection: &BranchProtection,
    ) -> Result<()> {
        let body = json!({
            "required_status_checks": null,
            "enforce_admins": null,
            "required_pull_request_reviews": {
                "require_code_owner_reviews": protection.require_code_owner_reviews,
                "required_approving_review_count": protection.required_approving_review_count,
            },
            "restrictions": null,
            "required_conversation_resolution": protection.required_conversation_resolution,
        });
        let url = self.repo_url(repo, &format!("/branches/{branch}/protection"));
        self.send("update branch protection rules", self.request(Method::PUT, &url).json(&body))
            .await?;
        Ok(())
    }

    async fn update_required_status_checks(&self, repo: &RepoId, branch: &str, contexts: &[String]) -> Result<()> {
        let checks: Vec<_> = contexts.iter().map(|context| json!({ "context": context })).collect();
        let url = self.repo_url(repo, &format!("/branches/{branch}/protection/required_status_checks"));
        let request = self.request(Method::PATCH, &url).json(&json!({ "checks": checks }));
        self.send("update required status checks", request).await?;
        Ok(())
    }
}

#[async_trait]
impl GitWriter for GitHubClient {
    async fn get_branch_sha(&self, repo: &RepoId, branch: &str) -> Result<Option<String>> {
        let operation = "get branch ref";
        let url = self.repo_url(repo, &format!("/git/ref/heads/{branch}"));
        let response = send_with_rate_limit_retry(operation, self.request(Method::GET, &url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = ensure_success(operation, response).await?;
        let reference: RefResponse = read_json(operation, response).await?;
        Ok(Some(reference.object.sha))
    }

    async fn create_branch(&self, repo: &RepoId, branch: &str, sha: &str) -> Result<()> {
        let body = json!({ "ref": format!("refs/heads/{branch}"), "sha": sha });
        let request = self
            .request(Method::POST, &self.repo_url(repo, "/git/refs"))
            .json(&body);
        self.send("create branch ref", request).await?;
        Ok(())
    }

    async fn create_tree(&self, repo: &RepoId, base_sha: &str, files: &[GeneratedFile]) -> Result<String> {
        let operation = "create tree";
        let entries: Vec<_> = files
            .iter()
            .map(|file| {
                json!({
                    "path": file.path,
                    "mode": "100644",
                    "type": "blob",
                    "content": file.content,
                })
            })
            .collect();
        let body = json!({ "base_tree": base_sha, "tree": entries });

        let request = self
            .request(Method::POST, &self.repo_url(repo, "/git/trees"))
            .json(&body);
        let response = self.send(operation, request).await?;
        let tree: ShaResponse = read_json(operation, response).await?;
        Ok(tree.sha)
    }

    async fn create_commit(
        &self,
        repo: &RepoId,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
        author: &CommitAuthor,
    ) -> Result<String> {
        let operation = "create commit";
        let body = json!({
            "message": message,
            "tree": tree_sha,
            "parents": [parent_sha],
            "author": { "name": author.name, "email": author.email },
        });

        let request = self
            .request(Method::POST, &self.repo_url(repo, "/git/commits"))
            .json(&body);
        let response = self.send(operation, request).await?;
        let commit: ShaResponse = read_json(operation, response).await?;
        Ok(commit.sha)
    }

    async fn update_branch(&self, repo: &RepoId, branch: &str, sha: &str) -> Result<()> {
        let url = self.repo_url(repo, &format!("/git/refs/heads/{branch}"));
        let request = self
            .request(Method::PATCH, &url)
            .json(&json!({ "sha": sha, "force": false }));
        self.send("update branch ref", request).await?;
        Ok(())
    }

    async fn create_pull_request(&self, repo: &RepoId, pull: &NewPullRequest) -> Result<String> {
        let operation = "create pull request";
        let body = json!({
            "title": pull.title,
            "head": pull.head,
            "base": pull.base,
            "body": pull.body,
            "maintainer_can_modify": true,
        });

        let request = self
            .request(Method::POST, &self.repo_url(repo, "/pulls"))
            .json(&body);
        let response = self.send(operation, request).await?;
        let created: PullRequestResponse = read_json(operation, response).await?;
        Ok(created.html_url)
    }
}
