//! Conventional commit titles: `type(scope)!: description`.

use crate::utils::error::{ActionError, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Allowed values of the `type` group.
pub const ALLOWED_COMMIT_TYPES: [&str; 11] = [
    "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore", "revert",
];

// Type and scope are ASCII word characters. Exactly one space after the colon,
// and the description starts right after it.
static CONVENTIONAL_COMMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z0-9_]+)(?:\((?P<scope>[-A-Za-z0-9_/]+)\))?(?P<breaking>!)?: (?P<message>\S.*)$")
        .expect("conventional commit pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTitle {
    pub commit_type: String,
    pub scope: Option<String>,
    pub breaking: bool,
    pub message: String,
}

impl fmt::Display for CommitTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.commit_type)?;
        if let Some(scope) = &self.scope {
            write!(f, "({})", scope)?;
        }
        if self.breaking {
            f.write_str("!")?;
        }
        write!(f, ": {}", self.message)
    }
}

pub fn parse_title(title: &str) -> Result<CommitTitle> {
    let captures = CONVENTIONAL_COMMIT
        .captures(title)
        .ok_or_else(|| ActionError::InvalidFormat {
            title: title.to_string(),
        })?;

    let commit_type = &captures["type"];
    if !ALLOWED_COMMIT_TYPES.contains(&commit_type) {
        return Err(ActionError::UnknownType {
            commit_type: commit_type.to_string(),
        });
    }

    Ok(CommitTitle {
        commit_type: commit_type.to_string(),
        scope: captures.name("scope").map(|m| m.as_str().to_string()),
        breaking: captures.name("breaking").is_some(),
        message: captures["message"].to_string(),
    })
}

/// First line of a commit message.
pub fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}

/// A single-commit branch must carry the PR title as its commit title.
pub fn check_single_commit_title(pr_title: &str, commit_title: &str) -> Result<()> {
    if pr_title.trim() != commit_title.trim() {
        return Err(ActionError::TitleMismatch {
            pr_title: pr_title.to_string(),
            commit_title: commit_title.to_string(),
        });
    }
    Ok(())
}
