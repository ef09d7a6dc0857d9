use crate::{DEFAULT_USER_AGENT, extract};
use async_trait::async_trait;
use brandbook_common::{BrandbookError, Result};
use brandbook_http::{HttpClient, RequestOpts};
use std::time::Duration;
use url::Url;

/// Tuning for [`HttpPageFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    /// Cap on the characters returned by `fetch_contents`.
    pub max_chars: usize,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_chars: 2_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Retrieves pages for the brochure pipeline.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Title plus visible body text of the page.
    async fn fetch_contents(&self, url: &str) -> Result<String>;

    /// Every anchor `href` on the page, unmodified.
    async fn fetch_links(&self, url: &str) -> Result<Vec<String>>;
}

/// [`PageFetcher`] over plain HTTP GETs.
#[derive(Clone)]
pub struct HttpPageFetcher {
    http: HttpClient,
    max_chars: usize,
}

impl HttpPageFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let http = HttpClient::unanchored(&config.user_agent)
            .map_err(|e| BrandbookError::Config(format!("page fetcher init failed: {e}")))?
            .with_timeout(config.timeout);
        Ok(Self {
            http,
            max_chars: config.max_chars,
        })
    }

    async fn get_html(&self, url: &str) -> Result<String> {
        let parsed =
            Url::parse(url).map_err(|e| BrandbookError::Fetch(format!("invalid URL {url}: {e}")))?;
        let started = std::time::Instant::now();
        let html = self
            .http
            .get_text(
                parsed.as_str(),
                RequestOpts {
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| BrandbookError::Fetch(format!("{url}: {e}")))?;
        tracing::debug!(
            target: "web.fetch",
            url,
            bytes = html.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "page fetched"
        );
        Ok(html)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_contents(&self, url: &str) -> Result<String> {
        let html = self.get_html(url).await?;
        Ok(extract::page_text(&html, self.max_chars))
    }

    async fn fetch_links(&self, url: &str) -> Result<Vec<String>> {
        let html = self.get_html(url).await?;
        let links = extract::links(&html);
        tracing::debug!(target: "web.fetch", url, count = links.len(), "links extracted");
        Ok(links)
    }
}
