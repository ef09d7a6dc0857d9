//! Heuristic ranking of search results into one likely official domain.
//!
//! The weights are ad hoc. They favour bare hosts and `.com`/`.co` names,
//! penalise depth, and drop social, encyclopedia and forum hosts outright.

use brandbook_web::SearchResult;
use regex::Regex;
use std::sync::LazyLock;

/// Hosts that are never a company's own site. Matched as plain substrings
/// of the href, so `x.com` also rules out e.g. `netflix.com`.
pub const DENYLIST: &[&str] = &[
    "wikipedia.org",
    "twitter.com",
    "x.com",
    "facebook.com",
    "linkedin.com",
    "youtube.com",
    "stackoverflow.com",
    "github.com",
    "reddit.com",
    "instagram.com",
    "tiktok.com",
    "sotwe.com",
    "1319lm.top",
    "medium.com",
    "quora.com",
];

static HOST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://(?:www\.)?([^/]+)").expect("valid host regex"));
/// Scheme plus host, keeping any `www.` prefix.
static BASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(https?://(?:www\.)?[^/]+)").expect("valid base regex"));
const REJECTED_SUFFIXES: &[&str] = &[".html", ".htm", ".php"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
    pub url: String,
    pub score: i32,
}

/// Every surviving candidate, best first. Equal scores keep input order.
pub fn rank(results: &[SearchResult]) -> Vec<ScoredCandidate> {
    let mut candidates: Vec<ScoredCandidate> = results
        .iter()
        .map(|r| r.href.as_str())
        .filter(|href| !DENYLIST.iter().any(|deny| href.contains(deny)))
        .filter(|href| href.starts_with("http") && HOST_RE.is_match(href))
        .filter_map(|href| {
            let url = clean(href);
            if REJECTED_SUFFIXES.iter().any(|s| url.ends_with(s)) {
                return None;
            }
            Some(ScoredCandidate {
                score: score(href),
                url,
            })
        })
        .collect();

    // sort_by is stable
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// Pick the best candidate official URL, or `None` when nothing survives.
///
/// ```
/// use brandbook_finder::score_and_select;
/// use brandbook_web::SearchResult;
///
/// let results = vec![
///     SearchResult::new("Acme on X", "https://twitter.com/acme", ""),
///     SearchResult::new("Acme", "https://acme.com/", ""),
/// ];
/// assert_eq!(score_and_select(&results).as_deref(), Some("https://acme.com"));
/// ```
pub fn score_and_select(results: &[SearchResult]) -> Option<String> {
    let best = rank(results).into_iter().next()?;
    let Some(base) = BASE_RE.captures(&best.url).and_then(|c| c.get(1)) else {
        return Some(best.url);
    };
    let base = base.as_str();

    if best.url == base || best.url == format!("{base}/") {
        return Some(base.to_string());
    }
    if slashes(&best.url) <= 3 {
        return Some(best.url);
    }
    Some(base.to_string())
}

fn score(href: &str) -> i32 {
    let path_count = slashes(href.trim_end_matches('/'));
    let mut score = match path_count {
        2 => 10,
        3 => 5,
        _ => 0,
    };

    if href.contains(".com") {
        score += 5;
    } else if href.contains(".co/") || href.ends_with(".co") {
        score += 4;
    } else if href.contains(".io") || href.contains(".ai") {
        score += 2;
    }

    score - path_count
}

/// Query string and trailing slashes removed.
fn clean(href: &str) -> String {
    href.split('?')
        .next()
        .unwrap_or(href)
        .trim_end_matches('/')
        .to_string()
}

fn slashes(s: &str) -> i32 {
    s.matches('/').count() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(hrefs: &[&str]) -> Vec<SearchResult> {
        hrefs
            .iter()
            .map(|h| SearchResult::new("t", *h, ""))
            .collect()
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert_eq!(score_and_select(&[]), None);
    }

    #[test]
    fn denylisted_only_selects_nothing() {
        let results = hits(&[
            "https://en.wikipedia.org/wiki/Acme",
            "https://twitter.com/acme",
            "https://www.linkedin.com/company/acme",
            "https://github.com/acme",
        ]);
        assert_eq!(score_and_select(&results), None);
    }

    #[test]
    fn social_hosts_lose_to_company_site() {
        let results = hits(&[
            "https://twitter.com/company",
            "https://facebook.com/company",
            "https://company.com",
        ]);
        assert_eq!(score_and_select(&results).as_deref(), Some("https://company.com"));
    }

    #[test]
    fn root_com_beats_ai_subpage() {
        let results = hits(&["https://company.ai/about", "https://company.com"]);
        let ranked = rank(&results);
        assert_eq!(
            ranked,
            vec![
                ScoredCandidate {
                    url: "https://company.com".into(),
                    score: 13,
                },
                ScoredCandidate {
                    url: "https://company.ai/about".into(),
                    score: 4,
                },
            ]
        );
        assert_eq!(score_and_select(&results).as_deref(), Some("https://company.com"));
    }

    #[test]
    fn page_files_are_never_selected() {
        let results = hits(&[
            "https://acme.com/index.html",
            "https://acme.com/home.htm",
            "https://acme.com/index.php",
        ]);
        assert_eq!(score_and_select(&results), None);

        let mut mixed = results.clone();
        mixed.push(SearchResult::new("deep", "https://acme.org/a/b/c/d", ""));
        assert_eq!(score_and_select(&mixed).as_deref(), Some("https://acme.org"));
    }

    #[test]
    fn ties_keep_input_order() {
        let results = hits(&["https://first.com", "https://second.com"]);
        assert_eq!(score_and_select(&results).as_deref(), Some("https://first.com"));
        let results = hits(&["https://second.com", "https://first.com"]);
        assert_eq!(score_and_select(&results).as_deref(), Some("https://second.com"));
    }

    #[test]
    fn one_segment_paths_survive_and_deeper_paths_collapse() {
        assert_eq!(
            score_and_select(&hits(&["https://acme.io/platform"])).as_deref(),
            Some("https://acme.io/platform")
        );
        assert_eq!(
            score_and_select(&hits(&["https://www.acme.com/en/products/rockets"])).as_deref(),
            Some("https://www.acme.com")
        );
    }

    #[test]
    fn query_strings_and_trailing_slashes_are_dropped() {
        assert_eq!(
            score_and_select(&hits(&["https://acme.co/?utm_source=ddg"])).as_deref(),
            Some("https://acme.co")
        );
    }

    #[test]
    fn non_http_links_are_ignored() {
        assert_eq!(score_and_select(&hits(&["ftp://acme.com", "", "mailto:a@acme.com"])), None);
    }

    #[test]
    fn denylist_matches_substrings() {
        assert_eq!(score_and_select(&hits(&["https://netflix.com"])), None);
    }

    #[test]
    fn tld_weights() {
        assert_eq!(score("https://a.com"), 13);
        assert_eq!(score("https://a.co"), 12);
        assert_eq!(score("https://a.co/x"), 6);
        assert_eq!(score("https://a.io"), 10);
        assert_eq!(score("https://a.ai"), 10);
        assert_eq!(score("https://a.org"), 8);
        assert_eq!(score("https://a.org/x/y"), -4);
    }

    #[test]
    fn selection_is_idempotent() {
        let inputs = [
            "https://company.com/",
            "https://www.acme.com/en/products/rockets",
            "https://acme.io/platform",
            "https://acme.co/?utm_source=ddg",
        ];
        for href in inputs {
            let first = score_and_select(&hits(&[href])).unwrap();
            let second = score_and_select(&hits(&[first.as_str()])).unwrap();
            assert_eq!(first, second, "{href}");
        }
    }

    #[test]
    fn repeated_selection_over_tied_scores_is_stable() {
        let results = hits(&[
            "https://beta.com",
            "https://alpha.com",
            "https://gamma.com/",
            "https://twitter.com/beta",
        ]);
        let first_rank = rank(&results);
        assert!(first_rank.iter().all(|c| c.score == 13));
        assert_eq!(first_rank, rank(&results));

        let first = score_and_select(&results);
        let second = score_and_select(&results);
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("https://beta.com"));
    }

    #[test]
    fn host_and_base_patterns() {
        assert_eq!(&HOST_RE.captures("https://www.acme.com/x").unwrap()[1], "acme.com");
        assert_eq!(&BASE_RE.captures("https://www.acme.com/x").unwrap()[1], "https://www.acme.com");
        assert!(!HOST_RE.is_match("ftp://acme.com"));
    }
}
