use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub href: String,
    #[serde(default, alias = "body")]
    pub snippet: String,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        href: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
            snippet: snippet.into(),
        }
    }
}

/// Errors that can occur during one search query.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Search timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Failed to parse search results: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_accepted_for_snippet() {
        let hit: SearchResult = serde_json::from_value(serde_json::json!({
            "title": "Acme",
            "href": "https://acme.com",
            "body": "Rockets"
        }))
        .unwrap();
        assert_eq!(hit, SearchResult::new("Acme", "https://acme.com", "Rockets"));
    }
}
