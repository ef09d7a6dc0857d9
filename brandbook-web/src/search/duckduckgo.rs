//! DuckDuckGo search over the HTML endpoint. No API key required.

use super::{SearchError, SearchProvider, SearchResult};
use async_trait::async_trait;
use brandbook_http::{HttpClient, HttpError, RequestOpts};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

pub const DDG_HTML_BASE: &str = "https://html.duckduckgo.com/";

pub struct DuckDuckGoSearch {
    http: HttpClient,
    timeout: Duration,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, SearchError> {
        Self::with_base_url(DDG_HTML_BASE, timeout, user_agent)
    }

    /// Point the provider at another host (tests use a mock server).
    pub fn with_base_url(
        base_url: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, SearchError> {
        let http = HttpClient::with_user_agent(base_url, user_agent).map_err(|e| {
            SearchError::Api {
                status: 0,
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            http: http.with_timeout(timeout),
            timeout,
        })
    }

    fn map_http(&self, e: HttpError) -> SearchError {
        match e {
            HttpError::Timeout(_) => SearchError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            },
            HttpError::Api {
                status, message, ..
            } => SearchError::Api {
                status: status.as_u16(),
                message,
            },
            other => SearchError::Api {
                status: 0,
                message: other.to_string(),
            },
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let html = self
            .http
            .post_form_text("html/", &[("q", query)], RequestOpts::default())
            .await
            .map_err(|e| self.map_http(e))?;

        let results = parse_results(&html, max_results)?;
        tracing::debug!(
            target: "web.search",
            query,
            hits = results.len(),
            "duckduckgo.search"
        );
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "duckduckgo"
    }
}

/// Extract organic results (ads skipped) from a DuckDuckGo HTML page.
fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    let parse = |css: &str| Selector::parse(css).map_err(|e| SearchError::Parse(e.to_string()));
    let block_sel = parse(".result")?;
    let title_sel = parse("a.result__a")?;
    let snippet_sel = parse(".result__snippet")?;

    let document = Html::parse_document(html);
    let results = document
        .select(&block_sel)
        .filter(|b| !b.value().classes().any(|c| c == "result--ad"))
        .filter_map(|b| {
            let anchor = b.select(&title_sel).next()?;
            let href = unwrap_redirect(anchor.value().attr("href")?)?;
            let snippet = b.select(&snippet_sel).next().map(text_of).unwrap_or_default();
            Some(SearchResult {
                title: text_of(anchor),
                href,
                snippet,
            })
        })
        .take(max_results)
        .collect();
    Ok(results)
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `//duckduckgo.com/l/?uddg=https%3A%2F%2Facme.com&rut=..` -> `https://acme.com`
fn unwrap_redirect(href: &str) -> Option<String> {
    let base = Url::parse("https://duckduckgo.com/").ok()?;
    let absolute = base.join(href).ok()?;
    if let Some((_, target)) = absolute.query_pairs().find(|(k, _)| k == "uddg") {
        return Some(target.into_owned());
    }
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    None
}
