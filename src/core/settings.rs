use crate::domain::model::{BranchProtection, RepoId, RepositorySettings};
use crate::domain::ports::RepositoryAdmin;
use crate::utils::error::{ActionError, Result};

/// Everything the settings action writes to one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsPlan {
    pub repository: RepositorySettings,
    /// Branch the protection rules and status checks apply to.
    pub branch: String,
    pub protection: BranchProtection,
    pub required_status_checks: Vec<String>,
}

/// Applies the plan in order: merge settings, branch protection, required
/// status checks. The first failure stops the run.
pub async fn apply_settings<A>(admin: &A, repo: &RepoId, plan: &SettingsPlan) -> Result<()>
where
    A: RepositoryAdmin + ?Sized,
{
    let settings = &plan.repository;
    tracing::info!(
        "updating repository ({}) settings: AllowRebaseMerge: {} AllowSquashMerge: {} AllowMergeCommit: {} AllowAutoMerge: {}",
        repo,
        settings.allow_rebase_merge,
        settings.allow_squash_merge,
        settings.allow_merge_commit,
        settings.allow_auto_merge
    );
    admin
        .update_repository_settings(repo, settings)
        .await
        .map_err(|e| ActionError::upstream("update repository settings", e))?;

    let protection = &plan.protection;
    tracing::info!(
        "updating repository ({}) branch ({}) protection rules: RequireCodeOwnerReviews: {} RequiredApprovingReviewCount: {} RequiredConversationResolution: {}",
        repo,
        plan.branch,
        protection.require_code_owner_reviews,
        protection.required_approving_review_count,
        protection.required_conversation_resolution
    );
    admin
        .update_branch_protection(repo, &plan.branch, protection)
        .await
        .map_err(|e| ActionError::upstream("update branch protection rules", e))?;

    tracing::info!(
        "updating repository ({}) branch ({}) required status checks: {:?}",
        repo,
        plan.branch,
        plan.required_status_checks
    );
    admin
        .update_required_status_checks(repo, &plan.branch, &plan.required_status_checks)
        .await
        .map_err(|e| ActionError::upstream("update required status checks", e))?;

    Ok(())
}
