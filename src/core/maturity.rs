//! Tells owning teams when a catalog service is below the maturity level its
//! lifecycle requires.

use std::collections::HashMap;

use crate::core::broken_branch::hyperlink;
use crate::core::pagination::Paginator;
use crate::domain::model::{CatalogService, Lifecycle, MaturityLevel};
use crate::domain::ports::{ChatNotifier, ServiceCatalog};
use crate::utils::error::{ActionError, Result};

/// Minimum maturity level index, keyed by lifecycle index. Lifecycles past the
/// end of the table are unsupported.
pub const LIFECYCLE_TO_LEVEL: [i64; 6] = [0, 0, 2, 2, 2, 2];

pub const SLACK_CONTACT_TYPE: &str = "slack";

pub const DEPLOY_WARNING: &str =
    "Starting next quarter, this repository will no longer be able to deploy.\nPlease update it to the specified maturity level";

pub fn required_level_index(lifecycle: &Lifecycle) -> Result<i64> {
    usize::try_from(lifecycle.index)
        .ok()
        .and_then(|index| LIFECYCLE_TO_LEVEL.get(index))
        .copied()
        .ok_or_else(|| ActionError::UnsupportedLifecycle {
            index: lifecycle.index,
            name: lifecycle.name.clone(),
        })
}

fn lifecycle_of(service: &CatalogService) -> Result<&Lifecycle> {
    service.lifecycle.as_ref().ok_or_else(|| ActionError::UnsupportedLifecycle {
        index: 0,
        name: "none".to_string(),
    })
}

/// A service without a maturity level counts as level 0.
pub fn is_compliant(service: &CatalogService) -> Result<bool> {
    let required = required_level_index(lifecycle_of(service)?)?;
    let current = service.level.as_ref().map_or(0, |level| level.index);
    Ok(current >= required)
}

pub fn expected_level_name(service: &CatalogService, levels: &[MaturityLevel]) -> Result<String> {
    let required = required_level_index(lifecycle_of(service)?)?;
    levels
        .iter()
        .find(|level| level.index == required)
        .map(|level| level.name.clone())
        .ok_or_else(|| ActionError::upstream("get expected level", format!("unable to find level index {required}")))
}

pub fn slack_contact(service: &CatalogService) -> Option<&str> {
    service
        .team_contacts
        .iter()
        .find(|contact| contact.kind == SLACK_CONTACT_TYPE)
        .map(|contact| contact.address.as_str())
}

pub fn maturity_report_url(service: &CatalogService) -> String {
    format!("{}/maturity-report", service.html_url)
}

pub fn maturity_message(service: &CatalogService, expected: &str) -> Result<String> {
    let repository_url = service
        .repository_urls
        .first()
        .ok_or_else(|| ActionError::upstream("get repository hyperlink", "no repositories linked to service"))?;
    let actual = service.level.as_ref().map_or("None", |level| level.name.as_str());

    Ok(format!(
        "Looks like `{}` does not meet the specified level in OpsLevel.\n\
         ---\n\
         Expected Level: *{}*\n\
         Actual Level: *{}*\n\
         OpsLevel Maturity Report: *{}*\n{}",
        hyperlink(&service.name, repository_url),
        expected,
        actual,
        hyperlink("Maturity Report", &maturity_report_url(service)),
        DEPLOY_WARNING
    ))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaturitySummary {
    pub checked: usize,
    pub notified: Vec<String>,
    /// Service name and the error that stopped its notification.
    pub failed: Vec<(String, String)>,
}

/// Channel names to IDs, loaded on first use.
struct ChannelDirectory<'a, C: ChatNotifier + ?Sized> {
    chat: &'a C,
    ids: Option<HashMap<String, String>>,
}

impl<'a, C: ChatNotifier + ?Sized> ChannelDirectory<'a, C> {
    fn new(chat: &'a C) -> Self {
        Self { chat, ids: None }
    }

    async fn resolve(&mut self, name: &str) -> Result<String> {
        if self.ids.is_none() {
            let chat = self.chat;
            let channels = Paginator::new(move |cursor: Option<String>| chat.list_channels(cursor))
                .collect_all()
                .await
                .map_err(|e| ActionError::upstream("get slack conversations", e))?;
            tracing::debug!("loaded {} slack channels", channels.len());
            self.ids = Some(channels.into_iter().map(|c| (c.name, c.id)).collect());
        }

        let name = name.trim_start_matches('#');
        self.ids
            .as_ref()
            .and_then(|ids| ids.get(name))
            .cloned()
            .ok_or_else(|| ActionError::upstream("find slack channel", format!("could not find slack channel {name:?}")))
    }
}

async fn notify_service<C>(
    chat: &C,
    channels: &mut ChannelDirectory<'_, C>,
    service: &CatalogService,
    levels: &[MaturityLevel],
) -> Result<bool>
where
    C: ChatNotifier + ?Sized,
{
    if is_compliant(service)? {
        return Ok(false);
    }

    let expected = expected_level_name(service, levels)?;
    let message = maturity_message(service, &expected)?;
    let channel = slack_contact(service)
        .ok_or_else(|| ActionError::upstream("get slack channel", "no slack channel found for team"))?;

    let channel_id = channels.resolve(channel).await?;
    chat.join_channel(&channel_id)
        .await
        .map_err(|e| ActionError::upstream("join slack conversation", e))?;
    chat.post_message(&channel_id, &message)
        .await
        .map_err(|e| ActionError::upstream("post slack message", e))?;

    Ok(true)
}

/// Walks every catalog service; one service failing never stops the rest.
pub async fn run_maturity_check<K, C>(catalog: &K, chat: &C) -> Result<MaturitySummary>
where
    K: ServiceCatalog + ?Sized,
    C: ChatNotifier + ?Sized,
{
    let levels = catalog
        .list_levels()
        .await
        .map_err(|e| ActionError::upstream("list levels", e))?;
    let mut services = Paginator::new(move |cursor: Option<String>| catalog.list_services(cursor));
    let mut channels = ChannelDirectory::new(chat);
    let mut summary = MaturitySummary::default();

    while let Some(page) = services
        .next_page()
        .await
        .map_err(|e| ActionError::upstream("could not list services", e))?
    {
        for service in page {
            summary.checked += 1;
            match notify_service(chat, &mut channels, &service, &levels).await {
                Ok(true) => {
                    tracing::info!("notified owners of {}", service.name);
                    summary.notified.push(service.name);
                }
                Ok(false) => tracing::debug!("{} meets its maturity level", service.name),
                Err(e) => {
                    tracing::error!("{}: {}", service.name, e);
                    summary.failed.push((service.name, e.to_string()));
                }
            }
        }
    }

    Ok(summary)
}
