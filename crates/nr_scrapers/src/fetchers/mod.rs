//! The fetch tiers, cheapest first.
//!
//! | Tier | Type | Mechanism |
//! |------|------|-----------|
//! | direct | [`DirectFetcher`] | plain GET with a desktop user agent |
//! | challenge | [`ChallengeFetcher`] | solver service, or a cookie-keeping client with full browser headers |
//! | browser | [`BrowserFetcher`] | headless Chromium render |

use nr_core::{Error, Fetcher, Result, ScrapeConfig};
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::sync::Arc;

pub mod browser;
pub mod challenge;
pub mod direct;

pub use browser::BrowserFetcher;
pub use challenge::ChallengeFetcher;
pub use direct::DirectFetcher;

/// The standard chain: direct, challenge, browser. The direct fetcher is also
/// returned on its own for the detail pass.
pub fn default_fetchers(config: &Arc<ScrapeConfig>) -> Result<(Vec<Arc<dyn Fetcher>>, Arc<dyn Fetcher>)> {
    let direct: Arc<dyn Fetcher> = Arc::new(DirectFetcher::new(config.clone())?);
    let fetchers: Vec<Arc<dyn Fetcher>> = vec![
        direct.clone(),
        Arc::new(ChallengeFetcher::new(config.clone())?),
        Arc::new(BrowserFetcher::new(config.clone())),
    ];
    Ok((fetchers, direct))
}

/// Headers a desktop browser sends on a top-level navigation.
pub(crate) fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}

pub(crate) fn transport_error(url: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Transport(format!("GET {} timed out", url))
    } else {
        Error::Transport(format!("GET {} failed: {}", url, err))
    }
}
