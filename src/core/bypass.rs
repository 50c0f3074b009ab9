//! Which commit authors may skip the single-commit title check.

use crate::domain::model::CommitRecord;
use std::collections::BTreeSet;

/// Authors exempt on every repository.
pub const BUILT_IN_BYPASS_EMAILS: [&str; 1] = ["49699333+dependabot[bot]@users.noreply.github.com"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotExempt,
    /// The author is exempt but the commit signature was not verified, so the
    /// author field may be spoofed.
    UnverifiedSignature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassDecision {
    Granted,
    Denied(DenyReason),
}

impl BypassDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Exempt author emails for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassPolicy {
    emails: BTreeSet<String>,
}

impl BypassPolicy {
    /// Built-in emails plus the space-delimited `extra` list.
    pub fn new(extra: &str) -> Self {
        let emails = BUILT_IN_BYPASS_EMAILS
            .iter()
            .map(|email| email.to_string())
            .chain(extra.split_whitespace().map(str::to_string))
            .collect();
        Self { emails }
    }

    pub fn is_exempt(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    pub fn evaluate(&self, commit: &CommitRecord) -> BypassDecision {
        let Some(email) = commit.author_email.as_deref() else {
            return BypassDecision::Denied(DenyReason::NotExempt);
        };

        if !self.is_exempt(email) {
            return BypassDecision::Denied(DenyReason::NotExempt);
        }

        if !commit.verified {
            tracing::warn!(
                "commit {} is authored by bypass email {:?} but its signature is not verified, refusing bypass (author may be spoofed)",
                commit.sha,
                email
            );
            return BypassDecision::Denied(DenyReason::UnverifiedSignature);
        }

        BypassDecision::Granted
    }

    pub fn allows(&self, commit: &CommitRecord) -> bool {
        self.evaluate(commit).is_granted()
    }
}

impl Default for BypassPolicy {
    fn default() -> Self {
        Self::new("")
    }
}
