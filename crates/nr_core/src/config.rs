use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::layout::{default_layouts, LayoutDefinition};
use crate::{Error, Result};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Statuses that usually mean a bot-mitigation interstitial rather than content.
pub const DEFAULT_CHALLENGE_STATUSES: [u16; 4] = [202, 403, 429, 503];

/// Immutable scraper configuration, shared read-only by every request.
///
/// Every field has a default so a TOML file only needs to name what it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub user_agent: String,
    pub allowed_hosts: Vec<String>,
    /// Origin that relative article links are resolved against.
    pub base_origin: String,
    pub direct_timeout_secs: u64,
    pub challenge_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub scroll_for_lazy_content: bool,
    pub relax_challenge_tls: bool,
    pub challenge_statuses: Vec<u16>,
    /// FlareSolverr-compatible service; when unset the challenge tier uses its own client.
    pub solver_endpoint: Option<String>,
    pub max_records: usize,
    pub fetch_details: bool,
    pub detail_concurrency: usize,
    pub max_browser_sessions: usize,
    pub chrome_executable: Option<PathBuf>,
    pub browser_no_sandbox: bool,
    /// Selector the browser tier waits for; defaults to the union of layout containers.
    pub wait_selector: Option<String>,
    pub layouts: Vec<LayoutDefinition>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allowed_hosts: vec!["makeone.com.br".to_string()],
            base_origin: "https://makeone.com.br".to_string(),
            direct_timeout_secs: 15,
            challenge_timeout_secs: 30,
            render_timeout_secs: 25,
            settle_delay_ms: 1500,
            scroll_for_lazy_content: true,
            relax_challenge_tls: true,
            challenge_statuses: DEFAULT_CHALLENGE_STATUSES.to_vec(),
            solver_endpoint: None,
            max_records: 15,
            fetch_details: false,
            detail_concurrency: 4,
            max_browser_sessions: 2,
            chrome_executable: None,
            browser_no_sandbox: false,
            wait_selector: None,
            layouts: default_layouts(),
        }
    }
}

impl ScrapeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: ScrapeConfig =
            toml::from_str(raw).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.allowed_hosts.iter().all(|h| h.trim().is_empty()) {
            return Err(Error::Config("allowed_hosts must name at least one host".to_string()));
        }
        self.base_url()?;
        if self.max_records == 0 {
            return Err(Error::Config("max_records must be greater than zero".to_string()));
        }
        if self.detail_concurrency == 0 || self.max_browser_sessions == 0 {
            return Err(Error::Config(
                "detail_concurrency and max_browser_sessions must be greater than zero".to_string(),
            ));
        }
        if self.direct_timeout_secs == 0 || self.challenge_timeout_secs == 0 || self.render_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be greater than zero".to_string()));
        }
        if self.layouts.is_empty() {
            return Err(Error::Config("at least one layout is required".to_string()));
        }
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_origin)
            .map_err(|e| Error::Config(format!("Invalid base_origin {}: {}", self.base_origin, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::Config(format!("base_origin must be http(s), got {}", other))),
        }
    }

    pub fn direct_timeout(&self) -> Duration {
        Duration::from_secs(self.direct_timeout_secs)
    }

    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_secs(self.challenge_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn is_challenge_status(&self, status: u16) -> bool {
        self.challenge_statuses.contains(&status)
    }

    pub fn effective_wait_selector(&self) -> String {
        match &self.wait_selector {
            Some(selector) if !selector.trim().is_empty() => selector.clone(),
            _ => self
                .layouts
                .iter()
                .map(|l| l.container.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
