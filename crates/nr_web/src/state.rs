use nr_core::{RequestGate, Result, ScrapeConfig};
use nr_scrapers::ScraperManager;
use std::sync::Arc;

pub struct AppState {
    pub manager: Arc<ScraperManager>,
    pub gate: RequestGate,
}

impl AppState {
    pub fn new(manager: Arc<ScraperManager>) -> Self {
        let gate = RequestGate::new(&manager.config().allowed_hosts);
        Self { manager, gate }
    }

    /// State with the default tier chain for `config`.
    pub fn from_config(config: Arc<ScrapeConfig>) -> Result<Self> {
        Ok(Self::new(Arc::new(ScraperManager::new(config)?)))
    }
}
