use clap::Parser;
use nr_core::{RequestGate, Result, ScrapeConfig};
use nr_scrapers::cli::{handle_command, ScraperArgs};
use nr_scrapers::logging::init_logging;
use nr_scrapers::ScraperManager;
use nr_web::{create_app, serve, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| format!("Duration too large: {}", s))?;
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A bare number is seconds
        if !current_number.is_empty() {
            let secs = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(secs)
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Scrape article listings from allowed blogs", long_about = None)]
struct Cli {
    /// TOML file with scraper settings; flags and env vars override it
    #[arg(long, env = "NR_CONFIG")]
    config: Option<PathBuf>,
    /// Hosts requests may target (comma separated)
    #[arg(long, env = "NR_ALLOWED_HOSTS", value_delimiter = ',')]
    allowed_hosts: Option<Vec<String>>,
    /// Origin relative article links are resolved against
    #[arg(long, env = "NR_BASE_ORIGIN")]
    base_origin: Option<String>,
    /// FlareSolverr-compatible endpoint for the challenge tier
    #[arg(long, env = "NR_SOLVER_ENDPOINT")]
    solver_endpoint: Option<String>,
    #[arg(long, env = "NR_CHROME_PATH")]
    chrome_path: Option<PathBuf>,
    /// Launch Chromium without its sandbox (containers running as root)
    #[arg(long, env = "NR_BROWSER_NO_SANDBOX")]
    no_sandbox: bool,
    /// Fetch each article page and attach its body as `content`
    #[arg(long, env = "NR_FETCH_DETAILS")]
    fetch_details: bool,
    #[arg(long, env = "NR_MAX_RECORDS")]
    max_records: Option<usize>,
    /// Direct tier timeout (e.g. 15s, 1m)
    #[arg(long, env = "NR_DIRECT_TIMEOUT")]
    direct_timeout: Option<HumanDuration>,
    #[arg(long, env = "NR_CHALLENGE_TIMEOUT")]
    challenge_timeout: Option<HumanDuration>,
    #[arg(long, env = "NR_RENDER_TIMEOUT")]
    render_timeout: Option<HumanDuration>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve `GET /scrape?url=...`
    Serve {
        #[arg(long, env = "NR_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,
    },
    /// Run the scraper once from the command line
    Scrape(ScraperArgs),
}

impl Cli {
    fn scrape_config(&self) -> Result<ScrapeConfig> {
        let mut config = match &self.config {
            Some(path) => ScrapeConfig::from_file(path)?,
            None => ScrapeConfig::default(),
        };

        if let Some(hosts) = &self.allowed_hosts {
            config.allowed_hosts = hosts.iter().map(|h| h.trim().to_string()).collect();
        }
        if let Some(origin) = &self.base_origin {
            config.base_origin = origin.clone();
        }
        if let Some(endpoint) = &self.solver_endpoint {
            config.solver_endpoint = Some(endpoint.clone());
        }
        if let Some(path) = &self.chrome_path {
            config.chrome_executable = Some(path.clone());
        }
        if self.no_sandbox {
            config.browser_no_sandbox = true;
        }
        if self.fetch_details {
            config.fetch_details = true;
        }
        if let Some(max) = self.max_records {
            config.max_records = max;
        }
        if let Some(HumanDuration(d)) = self.direct_timeout {
            config.direct_timeout_secs = d.as_secs();
        }
        if let Some(HumanDuration(d)) = self.challenge_timeout {
            config.challenge_timeout_secs = d.as_secs();
        }
        if let Some(HumanDuration(d)) = self.render_timeout {
            config.render_timeout_secs = d.as_secs();
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = Arc::new(cli.scrape_config()?);
    info!("🔒 Allowed hosts: {}", config.allowed_hosts.join(", "));
    if let Some(endpoint) = &config.solver_endpoint {
        info!("🧩 Challenge tier delegating to solver at {}", endpoint);
    }

    let manager = Arc::new(ScraperManager::new(config.clone())?);
    info!("🦗 Layouts initialized: {}", manager.layout_names().join(", "));

    match cli.command {
        Commands::Serve { bind } => {
            let app = create_app(AppState::new(manager));
            serve(app, bind).await?;
        }
        Commands::Scrape(args) => {
            let gate = RequestGate::new(&config.allowed_hosts);
            handle_command(args, &manager, &gate).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nr_scrapers::ScraperCommands;

    #[test]
    fn test_human_duration() {
        assert_eq!("15s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(15));
        assert_eq!("1m30s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(90));
        assert_eq!("1h".parse::<HumanDuration>().unwrap().0, Duration::from_secs(3600));
        assert_eq!("45".parse::<HumanDuration>().unwrap().0, Duration::from_secs(45));
        assert!("".parse::<HumanDuration>().is_err());
        assert!("10x".parse::<HumanDuration>().is_err());
        assert!("s".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_human_duration_overflow_is_an_error() {
        assert!("99999999999999999h".parse::<HumanDuration>().is_err());
        assert!("18446744073709551615s1s".parse::<HumanDuration>().is_err());
        assert!("99999999999999999999".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_zero_timeout_override_is_rejected() {
        let cli = Cli::try_parse_from(["nr", "--direct-timeout", "0s", "scrape", "layouts"]).unwrap();
        assert!(matches!(cli.scrape_config(), Err(nr_core::Error::Config(_))));
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let cli = Cli::try_parse_from([
            "nr",
            "--allowed-hosts",
            "makeone.com.br,blog.makeone.com.br",
            "--max-records",
            "20",
            "--render-timeout",
            "1m",
            "--fetch-details",
            "scrape",
            "layouts",
        ])
        .unwrap();
        let config = cli.scrape_config().unwrap();
        assert_eq!(config.allowed_hosts, vec!["makeone.com.br", "blog.makeone.com.br"]);
        assert_eq!(config.max_records, 20);
        assert_eq!(config.render_timeout_secs, 60);
        assert!(config.fetch_details);
        assert_eq!(config.direct_timeout_secs, 15);
        assert!(matches!(
            cli.command,
            Commands::Scrape(ScraperArgs { command: ScraperCommands::Layouts })
        ));
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let cli = Cli::try_parse_from(["nr", "--max-records", "0", "scrape", "layouts"]).unwrap();
        assert!(matches!(cli.scrape_config(), Err(nr_core::Error::Config(_))));
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["nr", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind, "0.0.0.0:8000".parse().unwrap()),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
