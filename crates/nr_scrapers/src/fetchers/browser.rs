//! Tier 3: render the page in a headless Chromium and serialize the DOM.
//!
//! Each attempt launches its own browser. A [`tokio::sync::Semaphore`] caps how
//! many run at once, and the session guard tears the process down on every
//! exit path, including timeouts and panics.

use async_trait::async_trait;
use nr_core::{FetchOutcome, Fetcher, ScrapeConfig, Tier};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct BrowserFetcher {
    config: Arc<ScrapeConfig>,
    sessions: Arc<Semaphore>,
}

impl BrowserFetcher {
    pub fn new(config: Arc<ScrapeConfig>) -> Self {
        let sessions = Arc::new(Semaphore::new(config.max_browser_sessions));
        Self { config, sessions }
    }

    /// Sessions that could start right now without waiting.
    pub fn available_sessions(&self) -> usize {
        self.sessions.available_permits()
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl Fetcher for BrowserFetcher {
    fn tier(&self) -> Tier {
        Tier::Browser
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> FetchOutcome {
        use nr_core::{Error, FetchedPage};
        use tracing::{info, warn};

        let permit = match self.sessions.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => return FetchOutcome::failed(Tier::Browser, Error::RenderFailure(e.to_string())),
        };

        let session = match session::BrowserSession::launch(&self.config, permit).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Could not start browser");
                return FetchOutcome::failed(Tier::Browser, e);
            }
        };

        let rendered = session.render(url, &self.config).await;
        session.close().await;

        match rendered {
            Ok(body) => {
                info!(bytes = body.len(), "Rendered page");
                FetchOutcome::Markup(FetchedPage {
                    tier: Tier::Browser,
                    status: None,
                    body,
                })
            }
            Err(e) => {
                warn!(error = %e, %url, "Browser tier failed");
                FetchOutcome::failed(Tier::Browser, e)
            }
        }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl Fetcher for BrowserFetcher {
    fn tier(&self) -> Tier {
        Tier::Browser
    }

    async fn fetch(&self, _url: &str) -> FetchOutcome {
        FetchOutcome::failed(
            Tier::Browser,
            nr_core::Error::RenderFailure("built without the `browser` feature".to_string()),
        )
    }
}

#[cfg(feature = "browser")]
mod session {
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use nr_core::{Error, Result, ScrapeConfig};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::OwnedSemaphorePermit;
    use tokio::task::JoinHandle;
    use tracing::{debug, warn};

    const POLL_INTERVAL: Duration = Duration::from_millis(250);
    const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
    /// Budget for scroll and serialization once the content is on the page;
    /// the settle delay is added on top.
    const FINISH_BUDGET: Duration = Duration::from_secs(5);
    const CLOSE_BUDGET: Duration = Duration::from_secs(5);
    const KILL_BUDGET: Duration = Duration::from_secs(2);

    static SESSION_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn render_failure(context: &str, err: impl std::fmt::Display) -> Error {
        Error::RenderFailure(format!("{}: {}", context, err))
    }

    /// One browser process plus its CDP handler task.
    ///
    /// `close` shuts it down gracefully; dropping it without `close` still kills
    /// the process (chromiumoxide's `Browser` drop), stops the handler and
    /// removes the profile directory. The semaphore permit is released last.
    pub(super) struct BrowserSession {
        browser: Browser,
        handler: JoinHandle<()>,
        profile_dir: PathBuf,
        _permit: OwnedSemaphorePermit,
    }

    impl BrowserSession {
        pub(super) async fn launch(config: &ScrapeConfig, permit: OwnedSemaphorePermit) -> Result<Self> {
            let profile_dir = std::env::temp_dir().join(format!(
                "nr-browser-{}-{}",
                std::process::id(),
                SESSION_COUNTER.fetch_add(1, Ordering::Relaxed)
            ));

            let mut builder = BrowserConfig::builder()
                .user_data_dir(&profile_dir)
                .request_timeout(config.render_timeout())
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--disable-extensions")
                .arg("--disable-background-networking")
                .arg(format!("--user-agent={}", config.user_agent));
            if let Some(path) = &config.chrome_executable {
                builder = builder.chrome_executable(path);
            }
            if config.browser_no_sandbox {
                builder = builder.no_sandbox();
            }
            let browser_config = builder
                .build()
                .map_err(|e| render_failure("invalid browser config", e))?;

            let (browser, mut handler) = Browser::launch(browser_config)
                .await
                .map_err(|e| render_failure("failed to launch Chromium", e))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            debug!(profile = %profile_dir.display(), "Browser session started");
            Ok(Self {
                browser,
                handler,
                profile_dir,
                _permit: permit,
            })
        }

        /// Navigates and waits for `wait_selector` within `render_timeout`,
        /// then scrolls, settles and serializes under a separate short bound.
        pub(super) async fn render(&self, url: &str, config: &ScrapeConfig) -> Result<String> {
            let render_timeout = config.render_timeout();
            let selector = config.effective_wait_selector();
            let page = tokio::time::timeout(render_timeout, async {
                let page = self
                    .browser
                    .new_page(url)
                    .await
                    .map_err(|e| render_failure("navigation failed", e))?;
                wait_for_selector(&page, &selector).await;
                Ok::<_, Error>(page)
            })
            .await
            .map_err(|_| Error::RenderTimeout(render_timeout))??;

            let finish_timeout = config.settle_delay() + FINISH_BUDGET;
            let html = tokio::time::timeout(finish_timeout, finish(&page, config))
                .await
                .map_err(|_| Error::RenderTimeout(finish_timeout))?;

            match tokio::time::timeout(KILL_BUDGET, page.close()).await {
                Ok(Err(e)) => debug!(error = %e, "Page close failed"),
                Err(_) => debug!("Page close timed out"),
                Ok(Ok(())) => {}
            }
            html
        }

        /// Graceful shutdown within `CLOSE_BUDGET`; a browser that does not
        /// exit by then is killed.
        pub(super) async fn close(mut self) {
            let graceful = tokio::time::timeout(CLOSE_BUDGET, async {
                if let Err(e) = self.browser.close().await {
                    debug!(error = %e, "Browser close command failed");
                }
                if let Err(e) = self.browser.wait().await {
                    debug!(error = %e, "Waiting for browser exit failed");
                }
            })
            .await;

            if graceful.is_err() {
                warn!("Browser did not exit in {:?}, killing it", CLOSE_BUDGET);
                match tokio::time::timeout(KILL_BUDGET, self.browser.kill()).await {
                    Ok(Some(Err(e))) => debug!(error = %e, "Browser kill failed"),
                    Ok(_) => {}
                    Err(_) => warn!("Browser kill did not complete"),
                }
            }

            self.handler.abort();
            if let Err(e) = tokio::fs::remove_dir_all(&self.profile_dir).await {
                debug!(error = %e, profile = %self.profile_dir.display(), "Profile cleanup failed");
            }
        }
    }

    impl Drop for BrowserSession {
        fn drop(&mut self) {
            self.handler.abort();
            // Already gone after a successful close
            if self.profile_dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&self.profile_dir) {
                    debug!(error = %e, profile = %self.profile_dir.display(), "Profile cleanup failed");
                }
            }
        }
    }

    async fn finish(page: &Page, config: &ScrapeConfig) -> Result<String> {
        if config.scroll_for_lazy_content {
            if let Err(e) = page.evaluate(SCROLL_TO_BOTTOM).await {
                debug!(error = %e, "Scroll script failed");
            }
        }
        tokio::time::sleep(config.settle_delay()).await;
        page.content()
            .await
            .map_err(|e| render_failure("failed to serialize DOM", e))
    }

    /// Polls until `selector` is present; the caller bounds the wait.
    async fn wait_for_selector(page: &Page, selector: &str) {
        loop {
            if page.find_element(selector).await.is_ok() {
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_session_pool_size_follows_config() {
        let config = ScrapeConfig {
            max_browser_sessions: 3,
            ..ScrapeConfig::default()
        };
        let fetcher = BrowserFetcher::new(Arc::new(config));
        assert_eq!(fetcher.tier(), Tier::Browser);
        assert_eq!(fetcher.available_sessions(), 3);
    }

    #[tokio::test]
    async fn test_failed_launch_releases_sessions() {
        let config = ScrapeConfig {
            max_browser_sessions: 2,
            chrome_executable: Some(PathBuf::from("/nonexistent/nr/chromium")),
            render_timeout_secs: 5,
            ..ScrapeConfig::default()
        };
        let fetcher = BrowserFetcher::new(Arc::new(config));

        let (first, second) = tokio::join!(
            fetcher.fetch("https://makeone.com.br/"),
            fetcher.fetch("https://makeone.com.br/blog/")
        );
        for outcome in [first, second] {
            assert!(matches!(outcome, FetchOutcome::Failed { tier: Tier::Browser, .. }));
        }
        assert_eq!(fetcher.available_sessions(), 2);

        let third = fetcher.fetch("https://makeone.com.br/?s=rust").await;
        assert!(matches!(third, FetchOutcome::Failed { tier: Tier::Browser, .. }));
        assert_eq!(fetcher.available_sessions(), 2);
    }

    #[cfg(feature = "browser")]
    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_renders_script_built_listing() {
        let config = ScrapeConfig {
            browser_no_sandbox: true,
            settle_delay_ms: 100,
            ..ScrapeConfig::default()
        };
        let fetcher = BrowserFetcher::new(Arc::new(config));
        let url = "data:text/html,<div id=root></div><script>document.getElementById('root').innerHTML='<article class=elementor-post></article>'</script>";
        match fetcher.fetch(url).await {
            FetchOutcome::Markup(page) => assert!(page.body.contains("elementor-post")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(fetcher.available_sessions(), 2);
    }
}
