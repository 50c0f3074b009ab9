pub mod cli;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::adapters::{github, opslevel, slack};
use crate::core::runner::{DEFAULT_TIMEOUT, MATURITY_TIMEOUT};
use crate::core::settings::SettingsPlan;
use crate::core::stub_sync::{self, StubSyncConfig};
use crate::domain::model::{BranchProtection, CommitAuthor, RepoId, RepositorySettings};
use crate::utils::error::{ActionError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{
    split_list, validate_non_empty_string, validate_range, validate_repository_slug, validate_url, Validate,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "ci-actions")]
#[command(about = "GitHub Actions for commit gating, PR title checks and repository hygiene")]
pub struct CliConfig {
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, default_value = "", global = true)]
    pub github_token: String,

    #[arg(long, env = "GITHUB_API_URL", default_value = github::DEFAULT_API_URL, global = true)]
    pub github_api_url: String,

    #[arg(long, env = "GITHUB_EVENT_NAME", default_value = "", global = true)]
    pub event_name: String,

    #[arg(long, env = "GITHUB_EVENT_PATH", global = true)]
    pub event_path: Option<PathBuf>,

    /// `owner/name` of the repository the workflow runs in.
    #[arg(long, env = "GITHUB_REPOSITORY", default_value = "", global = true)]
    pub repository: String,

    /// Overall deadline; defaults to 5 minutes (30 for `opslevel`).
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, env = "CI_ACTIONS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Markdown file the outcome is appended to.
    #[arg(long, env = "GITHUB_STEP_SUMMARY", global = true)]
    pub step_summary: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Require PR branches to contain the newest `commitguard-<ts>` tag.
    Commitguard,
    /// Enforce conventional-commit PR titles.
    ConventionalCommit(ConventionalCommitArgs),
    /// Alert a Slack channel when a watched branch fails a check.
    BrokenBranch(BrokenBranchArgs),
    /// Apply merge settings, branch protection and required status checks.
    Settings(SettingsArgs),
    /// Notify teams whose services are below their required maturity level.
    Opslevel(OpsLevelArgs),
    /// Commit freshly generated stubs into a downstream repository.
    StubSync(StubSyncArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Commitguard => "commitguard",
            Self::ConventionalCommit(_) => "conventional-commit",
            Self::BrokenBranch(_) => "broken-branch",
            Self::Settings(_) => "settings",
            Self::Opslevel(_) => "opslevel",
            Self::StubSync(_) => "stub-sync",
        }
    }

    fn needs_event(&self) -> bool {
        matches!(self, Self::Commitguard | Self::ConventionalCommit(_) | Self::BrokenBranch(_))
    }

    fn needs_github(&self) -> bool {
        !matches!(self, Self::BrokenBranch(_) | Self::Opslevel(_))
    }
}

#[derive(Debug, Clone, Args)]
pub struct ConventionalCommitArgs {
    /// Space-delimited author emails allowed to skip the commit title check.
    #[arg(long, env = "BYPASS_AUTHOR_EMAILS", default_value = "")]
    pub bypass_author_emails: String,
}

#[derive(Debug, Clone, Args)]
pub struct SlackArgs {
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true, default_value = "")]
    pub slack_token: String,

    #[arg(long, env = "SLACK_API_URL", default_value = slack::DEFAULT_API_URL)]
    pub slack_api_url: String,
}

impl Validate for SlackArgs {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("slack_token", &self.slack_token)?;
        validate_url("slack_api_url", &self.slack_api_url)
    }
}

#[derive(Debug, Clone, Args)]
pub struct BrokenBranchArgs {
    #[command(flatten)]
    pub slack: SlackArgs,

    #[arg(long, env = "GITHUB_BRANCH", default_value = "")]
    pub branch: String,

    #[arg(long, env = "SLACK_CHANNEL", default_value = "")]
    pub channel: String,

    /// Comma-delimited check names that never alert.
    #[arg(long, env = "IGNORED_CHECKS", default_value = "")]
    pub ignored_checks: String,

    /// Also DM the committer at this Slack email.
    #[arg(long, env = "COMMITTER_EMAIL")]
    pub committer_email: Option<String>,
}

impl Validate for BrokenBranchArgs {
    fn validate(&self) -> Result<()> {
        self.slack.validate()?;
        validate_non_empty_string("branch", &self.branch)?;
        validate_non_empty_string("channel", &self.channel)
    }
}

/// Every input is required: a missing one fails the run instead of writing a
/// default to the repository.
#[derive(Debug, Clone, Args)]
pub struct SettingsArgs {
    #[arg(long, env = "ALLOW_REBASE_MERGE", action = ArgAction::Set)]
    pub allow_rebase_merge: Option<bool>,

    #[arg(long, env = "ALLOW_SQUASH_MERGE", action = ArgAction::Set)]
    pub allow_squash_merge: Option<bool>,

    #[arg(long, env = "ALLOW_MERGE_COMMIT", action = ArgAction::Set)]
    pub allow_merge_commit: Option<bool>,

    #[arg(long, env = "ALLOW_AUTO_MERGE", action = ArgAction::Set)]
    pub allow_auto_merge: Option<bool>,

    #[arg(long, env = "REQUIRED_CONVERSATION_RESOLUTION", action = ArgAction::Set)]
    pub required_conversation_resolution: Option<bool>,

    #[arg(long, env = "REQUIRE_CODEOWNER_REVIEWERS", action = ArgAction::Set)]
    pub require_codeowner_reviewers: Option<bool>,

    #[arg(long, env = "REQUIRED_APPROVING_REVIEW_COUNT")]
    pub required_approving_review_count: Option<u32>,

    /// Comma-delimited status check contexts.
    #[arg(long, env = "REQUIRED_STATUS_CHECKS")]
    pub required_status_checks: Option<String>,

    #[arg(long, env = "DEFAULT_BRANCH", default_value = "main")]
    pub default_branch: String,
}

fn required<T: Copy>(field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| ActionError::MissingConfig {
        field: field.to_string(),
    })
}

impl SettingsArgs {
    fn status_checks(&self) -> Result<Vec<String>> {
        let raw = self
            .required_status_checks
            .as_deref()
            .ok_or_else(|| ActionError::MissingConfig {
                field: "required_status_checks".to_string(),
            })?;
        let checks = split_list(raw, ',');
        if checks.is_empty() {
            return Err(ActionError::InvalidConfigValue {
                field: "required_status_checks".to_string(),
                value: raw.to_string(),
                reason: "at least one status check context is required".to_string(),
            });
        }
        Ok(checks)
    }

    pub fn plan(&self) -> Result<SettingsPlan> {
        Ok(SettingsPlan {
            repository: RepositorySettings {
                allow_rebase_merge: required("allow_rebase_merge", self.allow_rebase_merge)?,
                allow_squash_merge: required("allow_squash_merge", self.allow_squash_merge)?,
                allow_merge_commit: required("allow_merge_commit", self.allow_merge_commit)?,
                allow_auto_merge: required("allow_auto_merge", self.allow_auto_merge)?,
            },
            branch: self.default_branch.clone(),
            protection: BranchProtection {
                require_code_owner_reviews: required("require_codeowner_reviewers", self.require_codeowner_reviewers)?,
                required_approving_review_count: required(
                    "required_approving_review_count",
                    self.required_approving_review_count,
                )?,
                required_conversation_resolution: required(
                    "required_conversation_resolution",
                    self.required_conversation_resolution,
                )?,
            },
            required_status_checks: self.status_checks()?,
        })
    }
}

impl Validate for SettingsArgs {
    fn validate(&self) -> Result<()> {
        let plan = self.plan()?;
        // GitHub accepts 0 to 6 required approvals.
        validate_range(
            "required_approving_review_count",
            plan.protection.required_approving_review_count,
            0,
            6,
        )?;
        validate_non_empty_string("default_branch", &self.default_branch)
    }
}

#[derive(Debug, Clone, Args)]
pub struct OpsLevelArgs {
    #[arg(long, env = "OPSLEVEL_TOKEN", hide_env_values = true, default_value = "")]
    pub opslevel_token: String,

    #[arg(long, env = "OPSLEVEL_API_URL", default_value = opslevel::DEFAULT_API_URL)]
    pub opslevel_api_url: String,

    #[command(flatten)]
    pub slack: SlackArgs,
}

impl Validate for OpsLevelArgs {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("opslevel_token", &self.opslevel_token)?;
        validate_url("opslevel_api_url", &self.opslevel_api_url)?;
        self.slack.validate()
    }
}

#[derive(Debug, Clone, Args)]
pub struct StubSyncArgs {
    #[arg(long, env = "AWS_REGION", default_value = "us-west-2")]
    pub aws_region: String,

    #[arg(long, env = "SCHEMA_BUCKET", default_value = "")]
    pub schema_bucket: String,

    #[arg(long, env = "SCHEMA_PREFIX", default_value = "")]
    pub schema_prefix: String,

    /// Directory holding the generator output.
    #[arg(long, env = "GENERATED_DIR", default_value = "out")]
    pub generated_dir: PathBuf,

    #[arg(long, env = "STUB_TARGET_REPOSITORY", default_value = "getoutreach/clerkcommons")]
    pub target_repository: String,

    #[arg(long, default_value = stub_sync::DEFAULT_COMMIT_BRANCH)]
    pub commit_branch: String,

    #[arg(long, default_value = stub_sync::DEFAULT_BASE_BRANCH)]
    pub base_branch: String,

    #[arg(long, default_value = stub_sync::DEFAULT_AUTHOR_NAME)]
    pub author_name: String,

    #[arg(long, default_value = stub_sync::DEFAULT_AUTHOR_EMAIL)]
    pub author_email: String,

    #[arg(long, default_value = stub_sync::DEFAULT_COMMIT_MESSAGE)]
    pub commit_message: String,

    #[arg(long, default_value = stub_sync::DEFAULT_PR_TITLE)]
    pub pr_title: String,

    #[arg(long, default_value = stub_sync::DEFAULT_PR_BODY)]
    pub pr_body: String,
}

impl StubSyncArgs {
    pub fn sync_config(&self) -> Result<StubSyncConfig> {
        let target = RepoId::parse(&self.target_repository).ok_or_else(|| ActionError::InvalidConfigValue {
            field: "target_repository".to_string(),
            value: self.target_repository.clone(),
            reason: "Expected <owner>/<name>".to_string(),
        })?;

        Ok(StubSyncConfig {
            target,
            commit_branch: self.commit_branch.clone(),
            base_branch: self.base_branch.clone(),
            author: CommitAuthor {
                name: self.author_name.clone(),
                email: self.author_email.clone(),
            },
            commit_message: self.commit_message.clone(),
            pr_title: self.pr_title.clone(),
            pr_body: self.pr_body.clone(),
        })
    }
}

impl Validate for StubSyncArgs {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("aws_region", &self.aws_region)?;
        validate_non_empty_string("schema_bucket", &self.schema_bucket)?;
        validate_repository_slug("target_repository", &self.target_repository)?;
        validate_non_empty_string("commit_branch", &self.commit_branch)?;
        validate_non_empty_string("pr_title", &self.pr_title)
    }
}

impl CliConfig {
    pub fn timeout(&self) -> Duration {
        match (self.timeout_secs, &self.command) {
            (Some(seconds), _) => Duration::from_secs(seconds),
            (None, Command::Opslevel(_)) => MATURITY_TIMEOUT,
            (None, _) => DEFAULT_TIMEOUT,
        }
    }

    pub fn repository_id(&self) -> Result<RepoId> {
        RepoId::parse(&self.repository).ok_or_else(|| ActionError::InvalidConfigValue {
            field: "repository".to_string(),
            value: self.repository.clone(),
            reason: "Expected <owner>/<name>".to_string(),
        })
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(seconds) = self.timeout_secs {
            validate_range("timeout_secs", seconds, 1, 6 * 60 * 60)?;
        }

        if self.command.needs_github() {
            validate_non_empty_string("github_token", &self.github_token)?;
            validate_url("github_api_url", &self.github_api_url)?;
        }

        if self.command.needs_event() {
            validate_non_empty_string("event_name", &self.event_name)?;
            if self.event_path.is_none() {
                return Err(ActionError::MissingConfig {
                    field: "event_path".to_string(),
                });
            }
        }

        match &self.command {
            Command::Commitguard | Command::ConventionalCommit(_) => Ok(()),
            Command::BrokenBranch(args) => args.validate(),
            Command::Settings(args) => {
                validate_repository_slug("repository", &self.repository)?;
                args.validate()
            }
            Command::Opslevel(args) => args.validate(),
            Command::StubSync(args) => args.validate(),
        }
    }
}
