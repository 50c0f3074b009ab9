//! Wires the configured adapters into each action and renders a one-line outcome.

use crate::adapters::{GitHubClient, OpsLevelClient, SlackClient};
use crate::config::cli::EventFile;
use crate::config::{CliConfig, Command, SlackArgs, StubSyncArgs};
use crate::core::broken_branch::{run_broken_branch, AlertConfig};
use crate::core::bypass::BypassPolicy;
use crate::core::commitguard::{run_commitguard, CommitGuardOutcome};
use crate::core::maturity::run_maturity_check;
use crate::core::settings::apply_settings;
use crate::core::title_check::run_conventional_commit;
use crate::domain::event::GitHubEvent;
use crate::domain::model::GateStatus;
use crate::utils::error::{ActionError, Result};

pub async fn run_action(config: &CliConfig) -> Result<String> {
    match &config.command {
        Command::Commitguard => {
            let event = load_event(config)?;
            let outcome = run_commitguard(&github(config), &event).await?;
            Ok(describe_commitguard(&outcome))
        }
        Command::ConventionalCommit(args) => {
            let event = load_event(config)?;
            let bypass = BypassPolicy::new(&args.bypass_author_emails);
            let title = run_conventional_commit(&github(config), &event, &bypass).await?;
            Ok(format!("title {:?} follows conventional commit syntax", title.to_string()))
        }
        Command::BrokenBranch(args) => {
            let event = load_event(config)?;
            let alert = AlertConfig::new(&args.branch, &args.channel, &args.ignored_checks)
                .with_committer_email(args.committer_email.as_deref());
            let posted = run_broken_branch(&slack(&args.slack), &event, &alert).await?;
            Ok(if posted {
                format!("alerted {} about {}", alert.channel, alert.branch)
            } else {
                "no alert needed".to_string()
            })
        }
        Command::Settings(args) => {
            let repo = config.repository_id()?;
            apply_settings(&github(config), &repo, &args.plan()?).await?;
            Ok(format!("applied settings to {}", repo))
        }
        Command::Opslevel(args) => {
            let catalog = OpsLevelClient::new(&args.opslevel_api_url, &args.opslevel_token);
            let summary = run_maturity_check(&catalog, &slack(&args.slack)).await?;
            for (service, reason) in &summary.failed {
                tracing::warn!("{}: {}", service, reason);
            }
            Ok(format!(
                "checked {} services, notified {}, {} failed",
                summary.checked,
                summary.notified.len(),
                summary.failed.len()
            ))
        }
        Command::StubSync(args) => stub_sync(config, args).await,
    }
}

fn github(config: &CliConfig) -> GitHubClient {
    GitHubClient::new(&config.github_api_url, &config.github_token)
}

fn slack(args: &SlackArgs) -> SlackClient {
    SlackClient::new(&args.slack_api_url, &args.slack_token)
}

fn load_event(config: &CliConfig) -> Result<GitHubEvent> {
    let path = config.event_path.as_deref().ok_or_else(|| ActionError::MissingConfig {
        field: "event_path".to_string(),
    })?;
    EventFile::new(&config.event_name, path).load()
}

pub fn describe_commitguard(outcome: &CommitGuardOutcome) -> String {
    match outcome {
        CommitGuardOutcome::Checked(GateStatus::Inactive) => "no CommitGuard tag, nothing to check".to_string(),
        CommitGuardOutcome::Checked(GateStatus::Active { required_sha }) => {
            format!("branch contains required commit {}", required_sha)
        }
        CommitGuardOutcome::Rerun(report) if report.is_partial_failure() => format!(
            "re-ran {} workflow runs, {} could not be re-run",
            report.triggered.len(),
            report.failed.len()
        ),
        CommitGuardOutcome::Rerun(report) => format!("re-ran {} workflow runs", report.triggered.len()),
        CommitGuardOutcome::Skipped => "nothing to re-run".to_string(),
    }
}

#[cfg(feature = "s3")]
async fn stub_sync(config: &CliConfig, args: &StubSyncArgs) -> Result<String> {
    use chrono::Utc;

    use crate::adapters::S3SchemaStore;
    use crate::core::stub_sync::run_stub_sync;

    let sync = args.sync_config()?;
    let store = S3SchemaStore::from_region(&args.aws_region, args.schema_bucket.clone()).await;
    let published = run_stub_sync(
        &store,
        &github(config),
        &sync,
        &args.schema_prefix,
        &args.generated_dir,
        Utc::now(),
    )
    .await?;

    match published {
        Some(url) => Ok(format!("opened {}", url)),
        None => Ok("schemas unchanged, no stubs published".to_string()),
    }
}

#[cfg(not(feature = "s3"))]
async fn stub_sync(_config: &CliConfig, args: &StubSyncArgs) -> Result<String> {
    Err(ActionError::InvalidConfigValue {
        field: "schema_bucket".to_string(),
        value: args.schema_bucket.clone(),
        reason: "built without the `s3` feature".to_string(),
    })
}
