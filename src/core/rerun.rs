use crate::core::pagination::Paginator;
use crate::domain::model::{PullRequestState, RepoId, RerunReport, WorkflowRun};
use crate::domain::ports::SourceControl;
use crate::utils::error::Result;
use std::collections::HashSet;

/// Shared workflow file that carries the CommitGuard job for pull requests.
/// The runs API is keyed by workflow file, so this name is fixed.
pub const PULL_REQUEST_WORKFLOW_FILE: &str = "pull_request-shared-actions.yaml";

pub const PULL_REQUEST_TRIGGER_EVENT: &str = "pull_request";

/// Run IDs associated with at least one open pull request, first-seen order,
/// each ID at most once.
pub fn select_runs<'a>(open_prs: &HashSet<u64>, runs: impl IntoIterator<Item = &'a WorkflowRun>) -> Vec<u64> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for run in runs {
        let still_open = run.pull_requests.iter().any(|number| open_prs.contains(number));
        if still_open && seen.insert(run.id) {
            selected.push(run.id);
        }
    }

    selected
}

pub async fn open_pull_requests<S>(scm: &S, repo: &RepoId) -> Result<HashSet<u64>>
where
    S: SourceControl + ?Sized,
{
    let pages = Paginator::new(move |cursor: Option<String>| {
        scm.list_pull_requests(repo, PullRequestState::Open, cursor)
    });
    Ok(pages.collect_all().await?.into_iter().collect())
}

/// Pages through the shared workflow's `pull_request` runs and picks the ones
/// to re-run.
pub async fn runs_to_rerun<S>(scm: &S, repo: &RepoId, open_prs: &HashSet<u64>) -> Result<Vec<u64>>
where
    S: SourceControl + ?Sized,
{
    let mut pages = Paginator::new(move |cursor: Option<String>| {
        scm.list_workflow_runs(repo, PULL_REQUEST_WORKFLOW_FILE, PULL_REQUEST_TRIGGER_EVENT, cursor)
    });

    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    while let Some(runs) = pages.next_page().await? {
        for id in select_runs(open_prs, &runs) {
            if seen.insert(id) {
                selected.push(id);
            }
        }
    }

    Ok(selected)
}

/// Triggers each run; a failed trigger is logged and does not stop the rest.
pub async fn rerun_all<S>(scm: &S, repo: &RepoId, run_ids: &[u64]) -> RerunReport
where
    S: SourceControl + ?Sized,
{
    let mut report = RerunReport::default();

    for &run_id in run_ids {
        tracing::info!("rerunning workflow id {}", run_id);
        match scm.rerun_workflow(repo, run_id).await {
            Ok(()) => report.triggered.push(run_id),
            Err(e) => {
                tracing::warn!("error rerunning workflow with id {}: {}", run_id, e);
                report.failed.push((run_id, e.to_string()));
            }
        }
    }

    report
}
