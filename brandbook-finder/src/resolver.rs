use crate::scorer::score_and_select;
use brandbook_common::{ProviderKind, Result};
use brandbook_llm::{ChatMessage, traits::ChatProvider};
use brandbook_web::{SearchError, SearchProvider, SearchResult};
use std::sync::Arc;

/// Domain guesses tried for the slugified company name, in order.
pub const GUESSED_TLDS: &[&str] = &[".com", ".co", ".ai", ".io"];

/// Results shown to the model when the scorer finds nothing.
pub const PROMPT_RESULT_LIMIT: usize = 8;
const SNIPPET_PREVIEW_CHARS: usize = 150;

/// One planned search: query text and result cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub max_results: usize,
}

impl SearchQuery {
    fn new(text: impl Into<String>, max_results: usize) -> Self {
        Self {
            text: text.into(),
            max_results,
        }
    }
}

/// Aggregated outcome of the query battery. Failed queries contribute
/// nothing but are counted.
#[derive(Debug, Default)]
pub struct SearchBattery {
    pub results: Vec<SearchResult>,
    pub failed_queries: usize,
}

impl SearchBattery {
    fn absorb(mut self, query: &SearchQuery, outcome: std::result::Result<Vec<SearchResult>, SearchError>) -> Self {
        match outcome {
            Ok(hits) => {
                tracing::debug!(query = %query.text, hits = hits.len(), "search query done");
                self.results.extend(hits);
            }
            Err(e) => {
                tracing::debug!(query = %query.text, error = %e, "search query skipped");
                self.failed_queries += 1;
            }
        }
        self
    }
}

/// Finds a company's official website from its name.
pub struct UrlResolver {
    search: Arc<dyn SearchProvider>,
}

impl UrlResolver {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self { search }
    }

    /// Resolve `company` to one URL, or `None` when every strategy fails.
    ///
    /// The scorer is tried first; the model is only consulted when the
    /// search produced results but none scored.
    pub async fn resolve(&self, company: &str, gateway: &dyn ChatProvider) -> Option<String> {
        tracing::info!(company, search = self.search.name(), "resolving website");
        match self.try_resolve(company, gateway).await {
            Ok(Some(url)) => {
                tracing::info!(company, %url, "website found");
                Some(url)
            }
            Ok(None) => {
                tracing::warn!(company, "could not resolve website");
                None
            }
            Err(e) => {
                tracing::warn!(company, error = %e, "could not resolve website");
                None
            }
        }
    }

    async fn try_resolve(&self, company: &str, gateway: &dyn ChatProvider) -> Result<Option<String>> {
        let battery = self.run_battery(company).await;
        if battery.results.is_empty() {
            return Ok(None);
        }

        if let Some(url) = score_and_select(&battery.results) {
            return Ok(Some(url));
        }

        if gateway.kind() == ProviderKind::Gemini {
            return Ok(battery
                .results
                .first()
                .map(|r| r.href.clone())
                .filter(|href| !href.is_empty()));
        }

        tracing::info!(
            results = battery.results.len(),
            provider = %gateway.kind(),
            model = gateway.model_name(),
            "asking model to pick the website"
        );
        let prompt = extraction_prompt(company, &battery.results);
        let answer = gateway.complete(&[ChatMessage::user(prompt)], false).await?;
        Ok(post_process_answer(&answer))
    }

    /// Run every query of [`query_battery`] in order, skipping failures.
    pub async fn run_battery(&self, company: &str) -> SearchBattery {
        let mut battery = SearchBattery::default();
        for query in query_battery(company) {
            let outcome = self.search.search(&query.text, query.max_results).await;
            battery = battery.absorb(&query, outcome);
        }
        tracing::info!(
            company,
            results = battery.results.len(),
            failed_queries = battery.failed_queries,
            "search battery finished"
        );
        battery
    }
}

/// `site:` and bare guesses per TLD, then the plain name and an
/// "official website" query.
pub fn query_battery(company: &str) -> Vec<SearchQuery> {
    let slug = slugify(company);
    let mut queries = Vec::with_capacity(GUESSED_TLDS.len() * 2 + 2);
    for tld in GUESSED_TLDS {
        queries.push(SearchQuery::new(format!("site:{slug}{tld}"), 2));
        queries.push(SearchQuery::new(format!("{slug}{tld}"), 2));
    }
    queries.push(SearchQuery::new(company, 5));
    queries.push(SearchQuery::new(format!("{company} official website"), 3));
    queries
}

fn slugify(company: &str) -> String {
    company.to_lowercase().replace([' ', '-'], "")
}

/// Numbered listing of the first results for the model prompt.
pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .take(PROMPT_RESULT_LIMIT)
        .enumerate()
        .map(|(i, r)| {
            let description: String = r.snippet.chars().take(SNIPPET_PREVIEW_CHARS).collect();
            format!(
                "{}. {}\n   URL: {}\n   Description: {}\n\n",
                i + 1,
                r.title,
                r.href,
                description
            )
        })
        .collect()
}

pub fn extraction_prompt(company: &str, results: &[SearchResult]) -> String {
    format!(
        "Based on the following search results, extract the official website URL for {company}.


Search Results:
{}

Instructions:
- Return ONLY the URL (e.g., https://example.com)
- Choose the most official-looking domain
- Do not include any explanation, just the URL
- If multiple URLs found, choose the main one
- The URL should start with http:// or https://

Official Website URL:",
        format_results(results)
    )
}

/// Normalise a free-text model answer into a URL.
///
/// Quotes are dropped; a bare domain gets `https://`. Anything without a
/// scheme or a dot is rejected.
pub fn post_process_answer(answer: &str) -> Option<String> {
    let url = answer.trim().replace(['"', '\''], "");
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        return Some(url.to_string());
    }
    if url.contains('.') {
        return Some(format!("https://{url}"));
    }
    tracing::warn!(answer, "model answer is not a URL");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_order_and_caps() {
        let queries = query_battery("Hugging Face-Inc");
        let rendered: Vec<(&str, usize)> =
            queries.iter().map(|q| (q.text.as_str(), q.max_results)).collect();
        assert_eq!(
            rendered,
            vec![
                ("site:huggingfaceinc.com", 2),
                ("huggingfaceinc.com", 2),
                ("site:huggingfaceinc.co", 2),
                ("huggingfaceinc.co", 2),
                ("site:huggingfaceinc.ai", 2),
                ("huggingfaceinc.ai", 2),
                ("site:huggingfaceinc.io", 2),
                ("huggingfaceinc.io", 2),
                ("Hugging Face-Inc", 5),
                ("Hugging Face-Inc official website", 3),
            ]
        );
    }

    #[test]
    fn results_listing_is_numbered_and_capped() {
        let results: Vec<SearchResult> = (1..=10)
            .map(|i| SearchResult::new(format!("Hit {i}"), format!("https://hit{i}.org/a/b"), "x".repeat(200)))
            .collect();
        let listing = format_results(&results);
        assert!(listing.starts_with(&format!(
            "1. Hit 1\n   URL: https://hit1.org/a/b\n   Description: {}\n\n",
            "x".repeat(150)
        )));
        assert!(listing.contains("8. Hit 8"));
        assert!(!listing.contains("9. Hit 9"));
    }

    #[test]
    fn prompt_names_company_and_ends_with_cue() {
        let prompt = extraction_prompt("Acme", &[SearchResult::new("Acme", "https://acme.org/a/b", "")]);
        assert!(prompt.starts_with(
            "Based on the following search results, extract the official website URL for Acme."
        ));
        assert!(prompt.contains("Search Results:\n1. Acme\n   URL: https://acme.org/a/b"));
        assert!(prompt.ends_with("Official Website URL:"));
    }

    #[test]
    fn answers_are_normalised() {
        assert_eq!(post_process_answer(" \"https://acme.com\" \n").as_deref(), Some("https://acme.com"));
        assert_eq!(post_process_answer("'acme.com'").as_deref(), Some("https://acme.com"));
        assert_eq!(post_process_answer("http://acme.org").as_deref(), Some("http://acme.org"));
        assert_eq!(post_process_answer("I don't know"), None);
        assert_eq!(post_process_answer(""), None);
    }
}
