use std::fs;
use std::path::Path;

use crate::domain::event::GitHubEvent;
use crate::utils::error::Result;

/// Webhook payload written by the runner at `GITHUB_EVENT_PATH`.
#[derive(Debug, Clone)]
pub struct EventFile {
    event_name: String,
    path: std::path::PathBuf,
}

impl EventFile {
    pub fn new(event_name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            event_name: event_name.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn load(&self) -> Result<GitHubEvent> {
        let payload = fs::read(&self.path)?;
        tracing::debug!("read {} bytes of {} payload from {}", payload.len(), self.event_name, self.path.display());
        GitHubEvent::decode(&self.event_name, &payload)
    }
}
