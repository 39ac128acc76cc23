//! Tab locator: finds the open page hosting the target application.

use async_trait::async_trait;
use tracing::debug;

use promptwire_protocols::TargetContext;

use crate::cdp::{CdpError, PageInfo};
use crate::config::DriverConfig;

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;

/// Locates the target page context among all open pages.
///
/// Implementations must re-scan on every call: tabs close and navigate
/// between requests, so a located context is never cached.
#[async_trait]
pub trait TargetLocator: Send + Sync {
    async fn resolve(&self) -> Result<Option<TargetContext>, CdpError>;
}

/// Production locator backed by the DevTools `/json/list` endpoint.
pub struct CdpTargetLocator {
    endpoint: String,
    config: DriverConfig,
}

impl CdpTargetLocator {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            config,
        }
    }
}

#[async_trait]
impl TargetLocator for CdpTargetLocator {
    async fn resolve(&self) -> Result<Option<TargetContext>, CdpError> {
        let url = format!("{}/json/list", self.endpoint);
        let pages: Vec<PageInfo> = reqwest::get(&url).await?.json().await?;
        Ok(first_matching_page(&self.config, &pages))
    }
}

/// First open page whose URL matches the host allow-list.
pub(crate) fn first_matching_page(config: &DriverConfig, pages: &[PageInfo]) -> Option<TargetContext> {
    let found = pages
        .iter()
        .find(|p| p.page_type == "page" && config.url_allowed(&p.url))?;
    debug!("located target page {} at {}", found.id, found.url);
    Some(TargetContext::new(found.id.clone(), found.url.clone()))
}
