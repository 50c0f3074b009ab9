//! Alerts a chat channel when a commit status on a watched branch fails.

use crate::domain::event::{GitHubEvent, StatusEvent};
use crate::domain::ports::ChatNotifier;
use crate::utils::error::{ActionError, Result};
use crate::utils::validation::split_list;

pub const FAILURE_STATE: &str = "failure";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertConfig {
    /// Branch the alert watches, e.g. `main`.
    pub branch: String,
    pub channel: String,
    pub ignored_checks: Vec<String>,
    /// Committer to message directly, already resolved to a chat email.
    pub committer_email: Option<String>,
}

impl AlertConfig {
    /// `ignored_checks` is the raw comma-delimited list.
    pub fn new(branch: &str, channel: &str, ignored_checks: &str) -> Self {
        Self {
            branch: branch.trim().to_string(),
            channel: channel.trim().to_string(),
            ignored_checks: split_list(ignored_checks, ','),
            committer_email: None,
        }
    }

    /// A blank email leaves direct messages off.
    pub fn with_committer_email(mut self, email: Option<&str>) -> Self {
        self.committer_email = email
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(str::to_string);
        self
    }

    pub fn is_ignored(&self, check: &str) -> bool {
        self.ignored_checks
            .iter()
            .any(|ignored| ignored.to_lowercase() == check.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    Alert,
    NotFailure,
    IgnoredCheck,
}

pub fn should_alert(config: &AlertConfig, status: &StatusEvent) -> AlertDecision {
    if status.state != FAILURE_STATE {
        return AlertDecision::NotFailure;
    }
    if config.is_ignored(&status.context) {
        return AlertDecision::IgnoredCheck;
    }
    AlertDecision::Alert
}

/// Slack link markup.
pub fn hyperlink(text: &str, link: &str) -> String {
    format!("<{link}|{text}>")
}

fn failed_check(status: &StatusEvent) -> String {
    match status.target_url.as_deref() {
        Some(url) => hyperlink(&status.context, url),
        None => status.context.clone(),
    }
}

pub fn channel_message(branch: &str, status: &StatusEvent) -> String {
    let failed_check = failed_check(status);
    let repository = hyperlink(&status.repository.full_name, &status.repository.html_url);
    let commit = hyperlink(&status.commit.sha, &status.commit.html_url);
    let committer = match &status.commit.author {
        Some(author) if !author.html_url.is_empty() => hyperlink(&author.login, &author.html_url),
        Some(author) => author.login.clone(),
        None => "unknown".to_string(),
    };

    format!(
        "Looks like the build on branch `{branch}` in *{repository}* is broken.\n\
         ---\n\
         Check: *{failed_check}*\n\
         Commit: *{commit}*\n\
         Committer: *{committer}*"
    )
}

pub fn direct_message(branch: &str, status: &StatusEvent) -> String {
    let commit = hyperlink("commit", &status.commit.html_url);
    let repository = hyperlink(&status.repository.full_name, &status.repository.html_url);
    format!(
        "Looks like you pushed a {commit} on branch `{branch}` in *{repository}* that failed the *{}* check. \
         Please go address this.",
        failed_check(status)
    )
}

/// Returns whether an alert was posted.
pub async fn run_broken_branch<C>(chat: &C, event: &GitHubEvent, config: &AlertConfig) -> Result<bool>
where
    C: ChatNotifier + ?Sized,
{
    let GitHubEvent::Status(status) = event else {
        return Err(ActionError::UnsupportedEvent {
            event: event.name().to_string(),
        });
    };

    match should_alert(config, status) {
        AlertDecision::NotFailure => {
            tracing::info!("status state not failure, skipping");
            return Ok(false);
        }
        AlertDecision::IgnoredCheck => {
            tracing::info!("failed check ({}) is in ignored checks, skipping", status.context);
            return Ok(false);
        }
        AlertDecision::Alert => {}
    }

    if !status.branches.iter().any(|branch| branch.name == config.branch) {
        tracing::info!("did not find branch {:?} in status event payload", config.branch);
    }

    let mut message = channel_message(&config.branch, status);
    if let Some(email) = &config.committer_email {
        match chat.direct_message(email, &direct_message(&config.branch, status)).await {
            Ok(()) => tracing::info!("sent broken branch DM to committer"),
            Err(e) => {
                tracing::warn!("unable to DM the committer: {}", e);
                message.push_str(&format!("\n\n:warning: *Was unable to DM the committer* due to error: {e}"));
            }
        }
    }

    chat.post_message(&config.channel, &message)
        .await
        .map_err(|e| ActionError::upstream("post message to channel", e))?;

    tracing::info!("posted broken branch alert to {}", config.channel);
    Ok(true)
}
