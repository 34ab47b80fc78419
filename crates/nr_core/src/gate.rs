use tracing::debug;
use url::Url;

use crate::{Error, Result};

/// Validates caller-supplied URLs before any network work happens.
#[derive(Debug, Clone)]
pub struct RequestGate {
    allowed_hosts: Vec<String>,
}

impl RequestGate {
    pub fn new<I, S>(allowed_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_hosts = allowed_hosts
            .into_iter()
            .map(|h| normalize_host(h.as_ref()))
            .filter(|h| !h.is_empty())
            .collect();
        Self { allowed_hosts }
    }

    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }

    /// Accepts `host` itself and its `www.` twin; other subdomains must be listed explicitly.
    pub fn is_allowed(&self, host: &str) -> bool {
        let host = normalize_host(host);
        let bare = host.strip_prefix("www.").unwrap_or(&host);
        self.allowed_hosts.iter().any(|allowed| {
            let allowed = allowed.strip_prefix("www.").unwrap_or(allowed);
            allowed == bare
        })
    }

    pub fn validate(&self, raw: Option<&str>) -> Result<Url> {
        let raw = raw.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(Error::InvalidRequest("No URL provided".to_string()));
        }

        let url = Url::parse(raw)
            .map_err(|e| Error::InvalidRequest(format!("Malformed URL {}: {}", raw, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidRequest(format!(
                "Unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidRequest(format!("URL has no host: {}", raw)))?;

        if !self.is_allowed(host) {
            debug!(%host, "Rejected URL outside allow-list");
            return Err(Error::ForbiddenDomain(format!("Domain not allowed: {}", host)));
        }

        Ok(url)
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}
