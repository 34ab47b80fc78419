use nr_core::{FetchOutcome, Fetcher, ScrapeReport, Tier};
use std::sync::Arc;

use crate::layouts::LayoutMatcher;
use crate::logging::Logger;

/// Ordered fetch strategies, cheapest first.
///
/// Each tier runs at most once per request and strictly after the previous
/// one has finished. A tier counts as successful only when its markup yields
/// at least one record; the HTTP status is never enough on its own.
pub struct TierChain {
    fetchers: Vec<Arc<dyn Fetcher>>,
}

impl TierChain {
    pub fn new(fetchers: Vec<Arc<dyn Fetcher>>) -> Self {
        Self { fetchers }
    }

    pub fn tiers(&self) -> Vec<Tier> {
        self.fetchers.iter().map(|f| f.tier()).collect()
    }

    pub async fn run(&self, url: &str, matcher: &LayoutMatcher) -> ScrapeReport {
        let logger = Logger::new().with_prefix(format!("[{}]", url));

        for fetcher in &self.fetchers {
            let tier = fetcher.tier();
            let logger = logger.clone().with_prefix(format!("[{}]", tier));
            logger.debug("🦗 Attempting tier");

            match fetcher.fetch(url).await {
                FetchOutcome::Markup(page) => {
                    let Some(found) = matcher.match_markup(&page.body) else {
                        logger.info(&format!(
                            "⏭️ No records in markup (status {}), escalating",
                            page.status.map_or_else(|| "n/a".to_string(), |s| s.to_string())
                        ));
                        continue;
                    };
                    logger.info(&format!(
                        "✨ {} records via layout {}",
                        found.records.len(),
                        found.layout
                    ));
                    return ScrapeReport {
                        records: found.records,
                        layout: Some(found.layout),
                        tier: Some(tier),
                    };
                }
                FetchOutcome::Failed { reason, .. } => {
                    logger.warn(&format!("⚠️ Tier failed: {}", reason));
                }
            }
        }

        logger.info("🫙 All tiers exhausted without records");
        ScrapeReport::empty()
    }
}
