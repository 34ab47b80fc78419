use clap::{Args, Subcommand};
use nr_core::{RequestGate, Result};

use crate::manager::ScraperManager;

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// Scrape one listing page and print its records as JSON
    Url {
        /// Listing or search URL on an allowed host (e.g. https://makeone.com.br/blog/)
        url: String,
    },
    /// List configured layouts in priority order
    Layouts,
}

pub async fn handle_command(args: ScraperArgs, manager: &ScraperManager, gate: &RequestGate) -> Result<()> {
    match args.command {
        ScraperCommands::Url { url } => {
            let url = gate.validate(Some(url.as_str()))?;
            let report = manager.scrape(&url).await;
            match (&report.layout, report.tier) {
                (Some(layout), Some(tier)) => {
                    tracing::info!("🦗 {} records from layout {} via {} tier", report.records.len(), layout, tier)
                }
                _ => tracing::info!("🫙 No records found"),
            }
            println!("{}", serde_json::to_string_pretty(&report.records)?);
        }
        ScraperCommands::Layouts => {
            println!("Configured layouts:");
            for (i, layout) in manager.config().layouts.iter().enumerate() {
                println!("  {}. {} ({})", i + 1, layout.name, layout.container);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::tests::{home_listing, MockFetcher};
    use nr_core::{Error, Fetcher, ScrapeConfig, Tier};
    use std::sync::Arc;

    fn manager(fetcher: Arc<MockFetcher>) -> ScraperManager {
        ScraperManager::with_fetchers(
            Arc::new(ScrapeConfig::default()),
            vec![fetcher as Arc<dyn Fetcher>],
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_url_command_rejects_foreign_host() {
        let fetcher = MockFetcher::markup(Tier::Direct, Some(200), home_listing(1));
        let args = ScraperArgs {
            command: ScraperCommands::Url {
                url: "https://evil.example.com/".to_string(),
            },
        };
        let result = handle_command(args, &manager(fetcher.clone()), &RequestGate::new(["makeone.com.br"])).await;
        assert!(matches!(result, Err(Error::ForbiddenDomain(_))));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_url_command_runs_pipeline() {
        let fetcher = MockFetcher::markup(Tier::Direct, Some(200), home_listing(2));
        let args = ScraperArgs {
            command: ScraperCommands::Url {
                url: "https://www.makeone.com.br/blog/".to_string(),
            },
        };
        let result = handle_command(args, &manager(fetcher.clone()), &RequestGate::new(["makeone.com.br"])).await;
        assert!(result.is_ok());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_layouts_command() {
        let fetcher = MockFetcher::failing(Tier::Direct);
        let args = ScraperArgs {
            command: ScraperCommands::Layouts,
        };
        let result = handle_command(args, &manager(fetcher), &RequestGate::new(["makeone.com.br"])).await;
        assert!(result.is_ok());
    }
}
