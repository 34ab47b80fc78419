pub mod config;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod layout;
pub mod types;

pub use config::ScrapeConfig;
pub use error::{Error, Result};
pub use fetch::{FetchOutcome, FetchedPage, Fetcher};
pub use gate::RequestGate;
pub use layout::{default_layouts, LayoutDefinition};
pub use types::{ArticleRecord, ScrapeReport, Tier};
