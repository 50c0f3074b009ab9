use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("pr title does not match conventional commit syntax: {title:?}")]
    InvalidFormat { title: String },

    #[error("commit type {commit_type:?} is not in the list of allowed commit types")]
    UnknownType { commit_type: String },

    #[error(
        "since branch has 1 commit, PR title and commit title must match and both be in conventional commit format (pr: {pr_title:?}, commit: {commit_title:?})"
    )]
    TitleMismatch {
        pr_title: String,
        commit_title: String,
    },

    #[error("branch does not contain required commit sha, please rebase (comparison status: {status})")]
    DivergedHistory { status: String },

    #[error("{operation}: {message}")]
    UpstreamApi { operation: String, message: String },

    #[error("{operation}: upstream returned {status}: {body}")]
    UpstreamStatus {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("parse {event:?} event payload: {source}")]
    EventDecode {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown event type {event:?}")]
    UnsupportedEvent { event: String },

    #[error("missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("invalid value {value:?} for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("unsupported lifecycle {index} {name}")]
    UnsupportedLifecycle { index: i64, name: String },

    #[error("no objects found in bucket {bucket:?} and prefix {prefix:?}")]
    NoSchemaObjects { bucket: String, prefix: String },

    #[error("action did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The check ran and failed; the author has to act.
    High,
    /// A collaborator failed; re-running the job may help.
    Medium,
    /// The run never got to finish.
    Critical,
}

impl ActionError {
    pub fn upstream(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::UpstreamApi {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UpstreamApi { .. } | Self::UpstreamStatus { .. } | Self::Io(_) => {
                ErrorSeverity::Medium
            }
            Self::Timeout { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::InvalidFormat { .. } | Self::UnknownType { .. } => {
                "Rename the pull request to `type(scope)!: description`, e.g. `feat(api): add pagination`"
            }
            Self::TitleMismatch { .. } => {
                "Reword the single commit (or the PR title) so both titles are identical"
            }
            Self::DivergedHistory { .. } => "Rebase the branch onto the default branch and push again",
            Self::UpstreamApi { .. } | Self::UpstreamStatus { .. } => {
                "Check the token permissions and re-run the job"
            }
            Self::EventDecode { .. } | Self::UnsupportedEvent { .. } => {
                "Check the workflow trigger configured for this action"
            }
            Self::MissingConfig { .. } | Self::InvalidConfigValue { .. } => {
                "Check the inputs and environment passed to the action"
            }
            Self::UnsupportedLifecycle { .. } => "Map the new lifecycle to a maturity level",
            Self::NoSchemaObjects { .. } => "Check the schema bucket and prefix",
            Self::Timeout { .. } => "Re-run the job; raise --timeout-secs if it keeps timing out",
            Self::Io(_) => "Check the event payload and generated files",
        }
    }
}

pub type Result<T> = std::result::Result<T, ActionError>;
