//! HTML result extraction
//!
//! Heuristic and coupled to whatever markup the explorer happens to serve,
//! so it stays a pure function of `(body, selectors, base)`:
//! - try each result selector in order, first one with a match wins
//! - derive title/url/snippet from each matched element
//! - with no structured match, fall back to the first links in the document

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::SearchResult;

/// Number of links collected by the bare-link fallback
pub const MAX_FALLBACK_LINKS: usize = 20;

const LINK_SELECTOR: &str = "a[href]";
const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";
const SNIPPET_SELECTOR: &str = "p, .summary, .snippet, .description";

/// Extract candidate records from an HTML document
///
/// Never fails: selectors that do not parse are skipped, and a document with
/// nothing recognizable yields an empty list.
pub fn extract(body: &str, selectors: &[&str], base: Option<&Url>) -> Vec<SearchResult> {
    let document = Html::parse_document(body);

    for pattern in selectors {
        let selector = match Selector::parse(pattern) {
            Ok(selector) => selector,
            Err(e) => {
                tracing::warn!("skipping invalid result selector {pattern:?}: {e:?}");
                continue;
            }
        };

        let matched: Vec<ElementRef> = document.select(&selector).collect();
        if !matched.is_empty() {
            tracing::debug!("result selector {pattern:?} matched {} elements", matched.len());
            return matched
                .iter()
                .map(|element| element_record(element, base))
                .collect();
        }
    }

    link_fallback(&document, base)
}

/// Build a record from one matched result element
fn element_record(element: &ElementRef, base: Option<&Url>) -> SearchResult {
    let link = if is_link(element) {
        Some(*element)
    } else {
        first_match(element, LINK_SELECTOR)
    };
    let url = link
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| resolve_href(href, base));

    let title = link
        .map(|link| extract_clean_text(&link))
        .filter(|text| !text.is_empty())
        .or_else(|| {
            link.and_then(|link| link.value().attr("title"))
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .map(str::to_string)
        })
        .or_else(|| url.clone())
        .or_else(|| {
            first_match(element, HEADING_SELECTOR)
                .map(|heading| extract_clean_text(&heading))
                .filter(|text| !text.is_empty())
        })
        .unwrap_or_else(|| extract_clean_text(element));

    let snippet = first_match(element, SNIPPET_SELECTOR)
        .map(|snippet| extract_clean_text(&snippet))
        .unwrap_or_default();

    SearchResult {
        title,
        url,
        snippet,
    }
}

/// Last resort: the first links anywhere in the document
fn link_fallback(document: &Html, base: Option<&Url>) -> Vec<SearchResult> {
    let Ok(selector) = Selector::parse(LINK_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|link| {
            let url = resolve_href(link.value().attr("href")?, base)?;
            let text = extract_clean_text(&link);
            Some(SearchResult {
                title: if text.is_empty() { url.clone() } else { text },
                url: Some(url),
                snippet: String::new(),
            })
        })
        .take(MAX_FALLBACK_LINKS)
        .collect()
}

fn is_link(element: &ElementRef) -> bool {
    element.value().name() == "a" && element.value().attr("href").is_some()
}

/// First descendant of `element` matching `pattern`
fn first_match<'a>(element: &ElementRef<'a>, pattern: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(pattern).ok()?;
    element.select(&selector).next()
}

/// Resolve a link target the way a browser would for the given base
///
/// Empty and fragment-only targets point back at the page itself and carry
/// no address.
pub fn resolve_href(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };

    Some(resolved.map(String::from).unwrap_or_else(|_| href.to_string()))
}

/// Extract clean text from element, excluding script/style/etc tags
fn extract_clean_text(elem: &ElementRef) -> String {
    let text = elem
        .descendants()
        .filter(|node| {
            !node.ancestors().any(|ancestor| {
                ElementRef::wrap(ancestor).is_some_and(|element| {
                    matches!(element.value().name(), "script" | "style" | "noscript")
                })
            })
        })
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect::<String>();

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
