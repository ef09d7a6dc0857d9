//! HTML extraction helpers.
//!
//! These are synchronous so the non-`Send` parsed document never lives
//! across an `.await`.

use scraper::{ElementRef, Html, Selector};

/// Elements whose content never counts as visible text.
const SKIPPED_TAGS: &[&str] = &["script", "style", "img", "input"];

const NO_TITLE: &str = "No title found";

fn selector(css: &'static str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::error!(css, error = %e, "invalid css selector");
            None
        }
    }
}

/// Page title, then a blank line, then the body's visible text (one text
/// node per line), cut to at most `max_chars` characters.
pub fn page_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let title = selector("title")
        .and_then(|s| document.select(&s).next())
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let mut lines = Vec::new();
    if let Some(body) = selector("body").and_then(|s| document.select(&s).next()) {
        visible_text(body, &mut lines);
    }

    let full = format!("{title}\n\n{}", lines.join("\n"));
    truncate_chars(&full, max_chars)
}

fn visible_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        } else if let Some(el) = ElementRef::wrap(child) {
            if SKIPPED_TAGS.contains(&el.value().name()) {
                continue;
            }
            visible_text(el, out);
        }
    }
}

/// Every `href` of every anchor, in document order and unmodified.
pub fn links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Some(anchors) = selector("a[href]") else {
        return Vec::new();
    };
    document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

/// Character-count prefix of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
