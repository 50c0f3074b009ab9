use crate::core::bypass::{BypassDecision, BypassPolicy};
use crate::core::conventional::{check_single_commit_title, first_line, parse_title, CommitTitle};
use crate::domain::event::GitHubEvent;
use crate::domain::ports::SourceControl;
use crate::utils::error::{ActionError, Result};

/// Validates the pull request title and, for single-commit pull requests,
/// that the commit title matches it unless the author may bypass that check.
pub async fn run_conventional_commit<S>(scm: &S, event: &GitHubEvent, bypass: &BypassPolicy) -> Result<CommitTitle>
where
    S: SourceControl + ?Sized,
{
    let GitHubEvent::PullRequest(event) = event else {
        return Err(ActionError::UnsupportedEvent {
            event: event.name().to_string(),
        });
    };
    let pr = &event.pull_request;

    tracing::info!("PR title (sans quotes): {:?}", pr.title);
    tracing::info!("number of commits: {}", pr.commits);

    if pr.commits == 1 {
        let repo = pr.base.repo.id();
        let commit = scm.get_commit(&repo, &pr.head.sha).await?;

        match bypass.evaluate(&commit) {
            BypassDecision::Granted => {
                tracing::info!(
                    "commit author {:?} may bypass the commit title check",
                    commit.author_email.as_deref().unwrap_or_default()
                );
            }
            BypassDecision::Denied(_) => {
                let commit_title = first_line(&commit.message);
                tracing::info!("parsed title of first commit (sans quotes): {:?}", commit_title);
                check_single_commit_title(&pr.title, commit_title)?;
            }
        }
    }

    let title = parse_title(&pr.title)?;
    tracing::info!(
        "successfully parsed conventional commit: type: [{}] scope: [{}] breaking: [{}] message: [{}]",
        title.commit_type,
        title.scope.as_deref().unwrap_or_default(),
        title.breaking,
        title.message
    );

    Ok(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{
        CreateEvent, Owner, PullRequest, PullRequestBase, PullRequestEvent, PullRequestHead, RefType, Repository,
    };
    use crate::domain::fakes::MemorySourceControl;
    use crate::domain::model::CommitRecord;

    const DEPENDABOT: &str = "49699333+dependabot[bot]@users.noreply.github.com";

    fn repository() -> Repository {
        Repository {
            name: "actions".to_string(),
            owner: Owner {
                login: "getoutreach".to_string(),
            },
        }
    }

    fn pr_event(title: &str, commits: u64) -> GitHubEvent {
        GitHubEvent::PullRequest(PullRequestEvent {
            pull_request: PullRequest {
                title: title.to_string(),
                number: 3,
                commits,
                head: PullRequestHead {
                    git_ref: "feature".to_string(),
                    sha: "HEAD".to_string(),
                },
                base: PullRequestBase {
                    git_ref: "main".to_string(),
                    repo: repository(),
                },
            },
        })
    }

    fn head_commit(message: &str, email: &str, verified: bool) -> CommitRecord {
        CommitRecord {
            sha: "HEAD".to_string(),
            message: message.to_string(),
            author_email: Some(email.to_string()),
            verified,
        }
    }

    #[tokio::test]
    async fn test_multi_commit_pr_only_checks_title() {
        let scm = MemorySourceControl::new();
        let title = run_conventional_commit(&scm, &pr_event("feat(api)!: drop v1", 3), &BypassPolicy::default())
            .await
            .unwrap();

        assert_eq!(title.commit_type, "feat");
        assert_eq!(title.scope.as_deref(), Some("api"));
        assert!(title.breaking);
    }

    #[tokio::test]
    async fn test_single_commit_title_must_match() {
        let scm = MemorySourceControl::new().with_commit(head_commit(
            "fix: something else\r\n\r\nbody",
            "dev@example.com",
            true,
        ));

        let err = run_conventional_commit(&scm, &pr_event("fix: the bug", 1), &BypassPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::TitleMismatch { .. }));
    }

    #[tokio::test]
    async fn test_single_commit_matching_first_line_passes() {
        let scm = MemorySourceControl::new().with_commit(head_commit(
            "fix: the bug  \r\n\r\nlonger explanation",
            "dev@example.com",
            false,
        ));

        assert!(run_conventional_commit(&scm, &pr_event("fix: the bug", 1), &BypassPolicy::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_verified_bypass_author_skips_title_match() {
        let scm = MemorySourceControl::new().with_commit(head_commit("Bump serde from 1.0 to 1.1", DEPENDABOT, true));

        let title = run_conventional_commit(
            &scm,
            &pr_event("chore(deps): bump serde from 1.0 to 1.1", 1),
            &BypassPolicy::default(),
        )
        .await
        .unwrap();
        assert_eq!(title.commit_type, "chore");
    }

    #[tokio::test]
    async fn test_unverified_bypass_author_is_checked() {
        let scm = MemorySourceControl::new().with_commit(head_commit("Bump serde", DEPENDABOT, false));

        let err = run_conventional_commit(&scm, &pr_event("chore(deps): bump serde", 1), &BypassPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::TitleMismatch { .. }));
    }

    #[tokio::test]
    async fn test_bypass_still_validates_pr_title() {
        let scm = MemorySourceControl::new().with_commit(head_commit("whatever", DEPENDABOT, true));

        let err = run_conventional_commit(&scm, &pr_event("bump serde", 1), &BypassPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidFormat { .. }));
    }

    #[tokio::test]
    async fn test_non_pull_request_event_is_rejected() {
        let scm = MemorySourceControl::new();
        let event = GitHubEvent::Create(CreateEvent {
            git_ref: "v1".to_string(),
            ref_type: RefType::Tag,
            repository: repository(),
        });

        let err = run_conventional_commit(&scm, &event, &BypassPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::UnsupportedEvent { ref event } if event == "create"));
    }

    #[tokio::test]
    async fn test_missing_commit_surfaces_upstream_error() {
        let scm = MemorySourceControl::new();
        let err = run_conventional_commit(&scm, &pr_event("feat: x", 1), &BypassPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::UpstreamStatus { status: 404, .. }));
    }
}
