//! Web acquisition utilities.
//!
//! - Page fetching and text/link extraction (`fetch`, `extract`)
//! - Web search over the DuckDuckGo HTML endpoint (`search`)
//!
//! HTML is parsed with `scraper`. Parsed documents are not `Send`, so all
//! parsing happens in the synchronous helpers of [`extract`] after the body
//! has been read.

pub mod extract;
pub mod fetch;
pub mod search;

pub use fetch::{FetcherConfig, HttpPageFetcher, PageFetcher};
pub use search::{DuckDuckGoSearch, SearchError, SearchProvider, SearchResult};

/// Desktop browser identity; several sites refuse obvious bot agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36";
