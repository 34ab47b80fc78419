use async_trait::async_trait;
use crate::types::Tier;
use crate::Error;

/// Raw markup returned by one tier.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub tier: Tier,
    /// HTTP status when the tier saw one; the browser tier does not.
    pub status: Option<u16>,
    pub body: String,
}

/// The result of a single tier attempt. Lives for one request only.
#[derive(Debug)]
pub enum FetchOutcome {
    Markup(FetchedPage),
    Failed { tier: Tier, reason: Error },
}

impl FetchOutcome {
    pub fn failed(tier: Tier, reason: Error) -> Self {
        FetchOutcome::Failed { tier, reason }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// The tier this fetcher implements
    fn tier(&self) -> Tier;

    /// Acquire markup for `url`. Implementations never panic or bubble errors;
    /// every failure is reported as `FetchOutcome::Failed`.
    async fn fetch(&self, url: &str) -> FetchOutcome;
}
