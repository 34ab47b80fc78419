use futures::stream::{self, StreamExt};
use nr_core::{ArticleRecord, Fetcher, Result, ScrapeConfig, ScrapeReport};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

use crate::chain::TierChain;
use crate::extract::body_from_markup;
use crate::fetchers::{default_fetchers, DirectFetcher};
use crate::layouts::LayoutMatcher;

/// Owns the whole listing pipeline: tier chain, layout matcher and the
/// optional detail pass. Built once and shared read-only across requests.
pub struct ScraperManager {
    config: Arc<ScrapeConfig>,
    matcher: LayoutMatcher,
    chain: TierChain,
    detail: Option<Arc<dyn Fetcher>>,
}

impl ScraperManager {
    pub fn new(config: Arc<ScrapeConfig>) -> Result<Self> {
        let (fetchers, detail) = default_fetchers(&config)?;
        Self::with_fetchers(config, fetchers, Some(detail))
    }

    /// Builds a manager around caller-supplied tiers. `detail` is only used
    /// when `fetch_details` is on; `None` falls back to a direct fetcher.
    pub fn with_fetchers(
        config: Arc<ScrapeConfig>,
        fetchers: Vec<Arc<dyn Fetcher>>,
        detail: Option<Arc<dyn Fetcher>>,
    ) -> Result<Self> {
        config.validate()?;
        let matcher = LayoutMatcher::from_config(&config)?;
        let detail = match detail {
            Some(detail) => Some(detail),
            None if config.fetch_details => Some(Arc::new(DirectFetcher::new(config.clone())?) as Arc<dyn Fetcher>),
            None => None,
        };
        Ok(Self {
            config,
            matcher,
            chain: TierChain::new(fetchers),
            detail,
        })
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    pub fn layout_names(&self) -> Vec<&str> {
        self.matcher.layout_names()
    }

    pub fn chain(&self) -> &TierChain {
        &self.chain
    }

    /// Runs the tier chain for an already validated URL. Never fails: an
    /// exhausted chain is an empty report.
    #[instrument(level = "debug", skip(self))]
    pub async fn scrape(&self, url: &Url) -> ScrapeReport {
        let mut report = self.chain.run(url.as_str(), &self.matcher).await;

        if self.config.fetch_details && !report.records.is_empty() {
            if let Some(detail) = &self.detail {
                info!("📰 Fetching {} article bodies", report.records.len());
                report.records = self.fill_content(detail.clone(), report.records).await;
            }
        }
        report
    }

    async fn fill_content(&self, detail: Arc<dyn Fetcher>, records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
        stream::iter(records)
            .map(|mut record| {
                let detail = detail.clone();
                async move {
                    record.content = fetch_body(detail.as_ref(), &record.url).await;
                    record
                }
            })
            .buffered(self.config.detail_concurrency)
            .collect()
            .await
    }
}

async fn fetch_body(fetcher: &dyn Fetcher, url: &str) -> Option<String> {
    match fetcher.fetch(url).await {
        nr_core::FetchOutcome::Markup(page) => {
            if let Some(status) = page.status.filter(|s| !(200..300).contains(s)) {
                debug!(status, %url, "Skipping detail body");
                return None;
            }
            body_from_markup(&page.body)
        }
        nr_core::FetchOutcome::Failed { reason, .. } => {
            debug!(error = %reason, %url, "Detail fetch failed");
            None
        }
    }
}
