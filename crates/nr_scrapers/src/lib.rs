pub mod chain;
pub mod cli;
pub mod extract;
pub mod fetchers;
pub mod layouts;
pub mod logging;
pub mod manager;

pub use chain::TierChain;
pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use layouts::{LayoutMatch, LayoutMatcher};
pub use manager::ScraperManager;
