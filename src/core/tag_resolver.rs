//! Finds the commit the newest marker tag points at.
//!
//! Marker tags are created by hand, e.g.
//!
//! ```text
//! CM_TAG_NAME="CommitGuard-$(date +%s)"
//! git tag -a $CM_TAG_NAME
//! git push origin $CM_TAG_NAME
//! ```
//!
//! and the one with the largest timestamp wins.

use crate::core::pagination::Paginator;
use crate::domain::model::{MarkerTag, RepoId, Tag};
use crate::domain::ports::SourceControl;
use crate::utils::error::Result;

/// Marker prefix, matched case-insensitively.
pub const COMMITGUARD_TAG_PREFIX: &str = "commitguard-";

pub const TAGS_PER_PAGE: u32 = 100;

pub fn has_marker_prefix(name: &str, prefix: &str) -> bool {
    name.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// `None` unless the tag is `<prefix><u64>`.
pub fn parse_marker_tag(tag: &Tag, prefix: &str) -> Option<MarkerTag> {
    let name = tag.name.to_lowercase();
    let timestamp = name
        .strip_prefix(&prefix.to_lowercase())?
        .parse::<u64>()
        .ok()?;

    Some(MarkerTag {
        name: tag.name.clone(),
        timestamp,
        commit_sha: tag.commit_sha.clone(),
    })
}

/// Keeps the running maximum; ties keep the first tag seen.
#[derive(Debug, Default)]
pub struct MarkerSelection {
    best: Option<MarkerTag>,
}

impl MarkerSelection {
    pub fn offer(&mut self, marker: MarkerTag) {
        match &self.best {
            Some(best) if marker.timestamp <= best.timestamp => {}
            _ => self.best = Some(marker),
        }
    }

    pub fn into_best(self) -> Option<MarkerTag> {
        self.best
    }
}

pub fn select_required_commit<'a>(tags: impl IntoIterator<Item = &'a Tag>, prefix: &str) -> Option<String> {
    let mut selection = MarkerSelection::default();
    for marker in tags.into_iter().filter_map(|tag| parse_marker_tag(tag, prefix)) {
        selection.offer(marker);
    }
    selection.into_best().map(|marker| marker.commit_sha)
}

/// Pages through every tag of `repo`; `None` means the gate is inactive.
pub async fn resolve_required_commit<S>(scm: &S, repo: &RepoId, prefix: &str) -> Result<Option<String>>
where
    S: SourceControl + ?Sized,
{
    let mut pages = Paginator::new(move |cursor: Option<String>| scm.list_tags(repo, TAGS_PER_PAGE, cursor));
    let mut selection = MarkerSelection::default();

    while let Some(tags) = pages.next_page().await? {
        for tag in &tags {
            match parse_marker_tag(tag, prefix) {
                Some(marker) => selection.offer(marker),
                None if has_marker_prefix(&tag.name, prefix) => {
                    tracing::debug!("ignoring marker tag with unparsable timestamp: {}", tag.name);
                }
                None => {}
            }
        }
    }

    let best = selection.into_best();
    if let Some(marker) = &best {
        tracing::debug!(
            "newest marker tag {} ({} pages scanned)",
            marker.name,
            pages.pages_fetched()
        );
    }
    Ok(best.map(|marker| marker.commit_sha))
}
