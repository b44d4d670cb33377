//! Structured (JSON) response shapes
//!
//! The upstream has no fixed schema, so a payload is classified into one of a
//! small ordered set of known shapes, with a catch-all at the end.

use serde_json::{Map, Value};

use super::{MAX_SYNTHESIZED_TITLE, SearchResult, truncate_chars};

const TITLE_KEYS: &[&str] = &["title", "name", "heading"];
const URL_KEYS: &[&str] = &["url", "link", "href"];
const SNIPPET_KEYS: &[&str] = &["snippet", "summary", "description"];

/// Keys that mark an object as a single result on its own
const SINGLE_ITEM_KEYS: &[&str] = &["title", "name"];

/// Known payload shapes, in matching priority
#[derive(Debug, PartialEq)]
pub enum Shape<'a> {
    /// A plain list of items
    List(&'a [Value]),
    /// `{"results": [...]}`
    Results(&'a [Value]),
    /// `{"items": [...]}`
    Items(&'a [Value]),
    /// An object that is itself one result
    Single(&'a Map<String, Value>),
    /// Anything else
    Opaque(&'a Value),
}

/// Classify a payload
pub fn classify(value: &Value) -> Shape<'_> {
    match value {
        Value::Array(list) => Shape::List(list),
        Value::Object(map) => {
            if let Some(Value::Array(list)) = map.get("results") {
                Shape::Results(list)
            } else if let Some(Value::Array(list)) = map.get("items") {
                Shape::Items(list)
            } else if SINGLE_ITEM_KEYS.iter().any(|key| map.contains_key(*key)) {
                Shape::Single(map)
            } else {
                Shape::Opaque(value)
            }
        }
        other => Shape::Opaque(other),
    }
}

/// Parse a body as JSON and turn it into candidate records
///
/// Returns `None` when the body is not JSON at all.
pub fn parse(body: &str) -> Option<Vec<SearchResult>> {
    let value: Value = serde_json::from_str(body.trim()).ok()?;
    Some(records(&value))
}

/// Turn a payload into candidate records
pub fn records(value: &Value) -> Vec<SearchResult> {
    match classify(value) {
        Shape::List(list) | Shape::Results(list) | Shape::Items(list) => {
            list.iter().map(item_record).collect()
        }
        Shape::Single(map) => vec![object_record(map, value)],
        Shape::Opaque(value) => vec![opaque_record(value)],
    }
}

/// One list entry
fn item_record(item: &Value) -> SearchResult {
    match item {
        Value::String(title) => SearchResult::titled(title.as_str()),
        Value::Object(map) => object_record(map, item),
        other => opaque_record(other),
    }
}

fn object_record(map: &Map<String, Value>, raw: &Value) -> SearchResult {
    let title = first_text(map, TITLE_KEYS);
    let url = first_text(map, URL_KEYS);
    let snippet = first_text(map, SNIPPET_KEYS).unwrap_or_default();

    let title = match (title, &url) {
        (Some(title), _) => title,
        (None, Some(url)) => url.clone(),
        (None, None) => serialize_truncated(raw),
    };

    SearchResult {
        title,
        url,
        snippet,
    }
}

fn opaque_record(value: &Value) -> SearchResult {
    SearchResult::titled(serialize_truncated(value))
}

/// First key holding a non-blank scalar, rendered as text
fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn serialize_truncated(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_chars(&text, MAX_SYNTHESIZED_TITLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_list() {
        let value = json!(["a", "b"]);
        assert!(matches!(classify(&value), Shape::List(list) if list.len() == 2));
    }

    #[test]
    fn test_classify_prefers_results_over_items() {
        let value = json!({"results": [1], "items": [1, 2], "title": "x"});
        assert!(matches!(classify(&value), Shape::Results(list) if list.len() == 1));
    }

    #[test]
    fn test_classify_items() {
        let value = json!({"items": [], "name": "x"});
        assert!(matches!(classify(&value), Shape::Items(list) if list.is_empty()));
    }

    #[test]
    fn test_classify_non_list_results_is_not_a_wrapper() {
        let value = json!({"results": "none", "title": "Block 1"});
        assert!(matches!(classify(&value), Shape::Single(_)));

        let value = json!({"results": {"nested": true}});
        assert!(matches!(classify(&value), Shape::Opaque(_)));
    }

    #[test]
    fn test_classify_single() {
        assert!(matches!(classify(&json!({"name": "Block 1"})), Shape::Single(_)));
        // heading alone does not make a single result
        assert!(matches!(classify(&json!({"heading": "h"})), Shape::Opaque(_)));
    }

    #[test]
    fn test_classify_opaque() {
        assert!(matches!(classify(&json!(42)), Shape::Opaque(_)));
        assert!(matches!(classify(&json!(null)), Shape::Opaque(_)));
        assert!(matches!(classify(&json!({"error": "boom"})), Shape::Opaque(_)));
    }

    #[test]
    fn test_string_items_become_titles() {
        let records = records(&json!(["GaddrA", "GaddrB"]));
        assert_eq!(
            records,
            vec![SearchResult::titled("GaddrA"), SearchResult::titled("GaddrB")]
        );
    }

    #[test]
    fn test_object_item_key_aliases() {
        let records = records(&json!([
            {"heading": "H", "href": "https://x/h", "description": "d"},
            {"name": "N", "link": "https://x/n", "summary": "s"},
            {"title": "T", "url": "https://x/t", "snippet": "p", "name": "ignored"},
        ]));
        let summary: Vec<_> = records
            .iter()
            .map(|r| (r.title.as_str(), r.url.as_deref(), r.snippet.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("H", Some("https://x/h"), "d"),
                ("N", Some("https://x/n"), "s"),
                ("T", Some("https://x/t"), "p"),
            ]
        );
    }

    #[test]
    fn test_object_item_without_title_uses_url() {
        let records = records(&json!([{"url": "https://x/1"}]));
        assert_eq!(records[0].title, "https://x/1");
        assert_eq!(records[0].url.as_deref(), Some("https://x/1"));
    }

    #[test]
    fn test_object_item_without_title_or_url_is_serialized() {
        let records = records(&json!([{"height": 7}]));
        assert_eq!(records[0].title, r#"{"height":7}"#);
        assert_eq!(records[0].url, None);
    }

    #[test]
    fn test_single_object() {
        let records = records(&json!({"title": "Block 1", "url": "https://x/b/1"}));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Block 1");
    }

    #[test]
    fn test_numeric_title() {
        let records = records(&json!({"name": 700_000}));
        assert_eq!(records[0].title, "700000");
    }

    #[test]
    fn test_opaque_payload_is_truncated() {
        let long = "x".repeat(500);
        let records = records(&json!({ "error": long }));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title.chars().count(), MAX_SYNTHESIZED_TITLE);
        assert!(records[0].title.starts_with(r#"{"error":"xxx"#));
        assert_eq!(records[0].url, None);
        assert!(records[0].snippet.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(parse("<html></html>").is_none());
        assert!(parse("not json").is_none());
        assert_eq!(parse(" [] ").map(|r| r.len()), Some(0));
    }
}
