//! CommitGuard: blocks pull requests whose branch is missing the commit the
//! newest marker tag points at, and re-runs that check on open pull requests
//! when a new marker tag is pushed.

use crate::core::ancestry::check_contains;
use crate::core::rerun::{open_pull_requests, rerun_all, runs_to_rerun};
use crate::core::tag_resolver::{has_marker_prefix, resolve_required_commit, COMMITGUARD_TAG_PREFIX};
use crate::domain::event::{CreateEvent, GitHubEvent, PullRequestEvent, RefType};
use crate::domain::model::{GateStatus, RerunReport};
use crate::domain::ports::SourceControl;
use crate::utils::error::{ActionError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitGuardOutcome {
    /// The pull request was checked against the gate.
    Checked(GateStatus),
    /// A new marker tag triggered re-runs.
    Rerun(RerunReport),
    /// The create event was not a marker tag, or there was nothing to re-run.
    Skipped,
}

pub async fn run_commitguard<S>(scm: &S, event: &GitHubEvent) -> Result<CommitGuardOutcome>
where
    S: SourceControl + ?Sized,
{
    match event {
        GitHubEvent::PullRequest(pr) => run_on_pull_request(scm, pr).await.map(CommitGuardOutcome::Checked),
        GitHubEvent::Create(create) => run_on_create(scm, create).await,
        other => Err(ActionError::UnsupportedEvent {
            event: other.name().to_string(),
        }),
    }
}

pub async fn run_on_pull_request<S>(scm: &S, event: &PullRequestEvent) -> Result<GateStatus>
where
    S: SourceControl + ?Sized,
{
    let pr = &event.pull_request;
    let repo = pr.base.repo.id();

    let Some(required_sha) = resolve_required_commit(scm, &repo, COMMITGUARD_TAG_PREFIX).await? else {
        tracing::info!("no CommitGuard tags found, skipping check");
        return Ok(GateStatus::Inactive);
    };

    tracing::info!(
        "checking that branch {} of {} contains commit {}",
        pr.head.git_ref,
        repo,
        required_sha
    );
    check_contains(scm, &repo, &pr.head.git_ref, &required_sha).await?;

    Ok(GateStatus::Active { required_sha })
}

pub async fn run_on_create<S>(scm: &S, event: &CreateEvent) -> Result<CommitGuardOutcome>
where
    S: SourceControl + ?Sized,
{
    if event.ref_type != RefType::Tag || !has_marker_prefix(&event.git_ref, COMMITGUARD_TAG_PREFIX) {
        tracing::info!("ref {} is not a CommitGuard tag, nothing to do", event.git_ref);
        return Ok(CommitGuardOutcome::Skipped);
    }

    let repo = event.repository.id();
    let open = open_pull_requests(scm, &repo).await?;
    if open.is_empty() {
        tracing::info!("no open pull requests in {}", repo);
        return Ok(CommitGuardOutcome::Skipped);
    }

    let run_ids = runs_to_rerun(scm, &repo, &open).await?;
    tracing::info!("rerunning {} workflow runs for {} open pull requests", run_ids.len(), open.len());

    let report = rerun_all(scm, &repo, &run_ids).await;
    if report.is_partial_failure() {
        tracing::warn!("{} of {} reruns failed", report.failed.len(), run_ids.len());
    }
    Ok(CommitGuardOutcome::Rerun(report))
}
