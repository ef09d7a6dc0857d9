//! Web search.
//!
//! [`SearchProvider`] is the seam the URL resolver depends on;
//! [`DuckDuckGoSearch`] is the keyless implementation.

mod duckduckgo;
mod types;

pub use duckduckgo::{DDG_HTML_BASE, DuckDuckGoSearch};
pub use types::{SearchError, SearchResult};

use async_trait::async_trait;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query`, returning at most `max_results` hits in engine order.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
