use async_trait::async_trait;
use nr_core::{FetchOutcome, FetchedPage, Fetcher, Result, ScrapeConfig, Tier};
use reqwest::{redirect, Client};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::transport_error;

/// Tier 1: a plain GET with the configured user agent.
pub struct DirectFetcher {
    client: Client,
    config: Arc<ScrapeConfig>,
}

impl DirectFetcher {
    pub fn new(config: Arc<ScrapeConfig>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.direct_timeout())
            .redirect(redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client, config })
    }

    /// Status and body of `url`; any transport problem is an `Error::Transport`.
    pub async fn get(&self, url: &str) -> Result<(u16, String)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| transport_error(url, e))?;
        Ok((status, body))
    }
}

#[async_trait]
impl Fetcher for DirectFetcher {
    fn tier(&self) -> Tier {
        Tier::Direct
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.get(url).await {
            Ok((status, body)) => {
                if self.config.is_challenge_status(status) {
                    // Only a hint: extraction still decides whether to escalate.
                    warn!(status, %url, "Response status suggests bot mitigation");
                } else {
                    debug!(status, bytes = body.len(), "Direct fetch complete");
                }
                FetchOutcome::Markup(FetchedPage {
                    tier: Tier::Direct,
                    status: Some(status),
                    body,
                })
            }
            Err(e) => FetchOutcome::failed(Tier::Direct, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nr_core::Error;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(config: ScrapeConfig) -> DirectFetcher {
        DirectFetcher::new(Arc::new(config)).unwrap()
    }

    #[tokio::test]
    async fn test_sends_user_agent_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher(ScrapeConfig::default())
            .fetch(&format!("{}/blog/", server.uri()))
            .await;
        match outcome {
            FetchOutcome::Markup(page) => {
                assert_eq!(page.tier, Tier::Direct);
                assert_eq!(page.status, Some(200));
                assert_eq!(page.body, "<html>ok</html>");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let requests = server.received_requests().await.unwrap();
        assert_eq!(
            requests[0].headers.get("user-agent").unwrap().to_str().unwrap(),
            nr_core::config::DEFAULT_USER_AGENT
        );
    }

    #[tokio::test]
    async fn test_challenge_status_still_returns_markup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("<html>Just a moment...</html>"))
            .mount(&server)
            .await;

        let outcome = fetcher(ScrapeConfig::default()).fetch(&server.uri()).await;
        assert!(matches!(outcome, FetchOutcome::Markup(FetchedPage { status: Some(403), .. })));
    }

    #[tokio::test]
    async fn test_timeout_is_a_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = ScrapeConfig {
            direct_timeout_secs: 1,
            ..ScrapeConfig::default()
        };
        let outcome = fetcher(config).fetch(&server.uri()).await;
        assert!(matches!(
            outcome,
            FetchOutcome::Failed { tier: Tier::Direct, reason: Error::Transport(_) }
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_transport_failure() {
        let outcome = fetcher(ScrapeConfig::default()).fetch("http://127.0.0.1:9/").await;
        assert!(matches!(outcome, FetchOutcome::Failed { reason: Error::Transport(_), .. }));
    }
}
