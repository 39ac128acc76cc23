//! Driver configuration: DevTools endpoint, host allow-list, site profiles.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Configuration load errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Selector bundle for one supported chat host.
///
/// Selector lists are ordered by descending specificity; the first match
/// wins. Profiles ship built in and can be overridden wholesale from the
/// config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Short name, e.g. "chatgpt".
    pub name: String,
    /// Hosts this profile serves; a URL host matches when it equals an
    /// entry or is a subdomain of one.
    pub hosts: Vec<String>,
    /// Prompt input surface.
    pub input_selectors: Vec<String>,
    /// Submit control chain.
    pub submit_selectors: Vec<String>,
    /// "Stop generating" controls shown while the answer streams.
    pub stop_selectors: Vec<String>,
    /// Visual streaming-state indicator on the output area.
    pub streaming_indicator: String,
    /// Response block chain; the last match holds the streamed answer.
    pub response_selectors: Vec<String>,
}

/// Top-level driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// DevTools HTTP endpoint.
    pub endpoint: String,
    /// Default overall deadline for one prompt round-trip, in seconds.
    pub default_timeout_secs: u64,
    /// Supported sites, in priority order.
    pub sites: Vec<SiteProfile>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9222".to_string(),
            default_timeout_secs: 300,
            sites: vec![chatgpt_profile(), claude_profile()],
        }
    }
}

fn chatgpt_profile() -> SiteProfile {
    SiteProfile {
        name: "chatgpt".to_string(),
        hosts: vec!["chatgpt.com".to_string(), "chat.openai.com".to_string()],
        input_selectors: vec![
            "div#prompt-textarea".to_string(),
            "textarea#prompt-textarea".to_string(),
            "div[contenteditable=\"true\"].ProseMirror".to_string(),
        ],
        submit_selectors: vec![
            "button[data-testid=\"send-button\"]".to_string(),
            "button[aria-label=\"Send prompt\"]".to_string(),
        ],
        stop_selectors: vec![
            "button[data-testid=\"stop-button\"]".to_string(),
            "button[aria-label=\"Stop generating\"]".to_string(),
            "button[aria-label=\"Stop streaming\"]".to_string(),
        ],
        streaming_indicator: ".result-streaming".to_string(),
        response_selectors: vec![
            "article [data-message-author-role=\"assistant\"] .markdown".to_string(),
            "[data-message-author-role=\"assistant\"]".to_string(),
        ],
    }
}

fn claude_profile() -> SiteProfile {
    SiteProfile {
        name: "claude".to_string(),
        hosts: vec!["claude.ai".to_string()],
        input_selectors: vec![
            "div.ProseMirror".to_string(),
            "div[contenteditable=\"true\"]".to_string(),
        ],
        submit_selectors: vec![
            "button[aria-label=\"Send Message\"]".to_string(),
            "button[aria-label=\"Send message\"]".to_string(),
        ],
        stop_selectors: vec![
            "button[aria-label=\"Stop Response\"]".to_string(),
            "button[aria-label=\"Stop response\"]".to_string(),
        ],
        streaming_indicator: "[data-is-streaming=\"true\"]".to_string(),
        response_selectors: vec![
            ".font-claude-message".to_string(),
            "[data-testid=\"assistant-message\"]".to_string(),
        ],
    }
}

impl DriverConfig {
    /// Load configuration from a TOML file, layered over the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: DriverConfig = toml::from_str(&raw)?;
        Ok(config)
    }

    /// The flattened host allow-list across all site profiles.
    pub fn allowed_hosts(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().flat_map(|s| s.hosts.iter().map(String::as_str))
    }

    /// Find the site profile serving a page URL, if any.
    pub fn profile_for_url(&self, url: &str) -> Option<&SiteProfile> {
        let host = Url::parse(url).ok()?.host_str()?.to_ascii_lowercase();
        self.sites
            .iter()
            .find(|site| site.hosts.iter().any(|h| host_matches(&host, h)))
    }

    /// Whether a page URL matches the host allow-list at all.
    pub fn url_allowed(&self, url: &str) -> bool {
        self.profile_for_url(url).is_some()
    }
}

/// A host matches a pattern when equal to it or a subdomain of it.
pub(crate) fn host_matches(host: &str, pattern: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    host == pattern || host.ends_with(&format!(".{}", pattern))
}
