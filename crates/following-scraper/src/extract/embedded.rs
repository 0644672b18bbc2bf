//! Embedded structured data: JSON blobs shipped inside the page or returned
//! directly by continuation requests.
//!
//! Listings are modelled as connections: an object with an `edges` array
//! (each edge wrapping a `node`) and a `page_info` object carrying the end
//! cursor. The walk is shape-based rather than path-based so it survives
//! the surrounding payload being reshuffled.

use super::{ExtractStrategy, StrategyOutput};
use crate::fetch::PageFragment;
use crate::model::{CandidateSource, RawCandidate};
use scraper::{Html, Selector};
use serde_json::{Map, Value};

/// Anti-JSON-hijacking prefix some endpoints put before the payload.
const JSON_PREFIX: &str = "for (;;);";

/// Keys that make a node plausibly a profile rather than some other entity.
const PROFILE_KEYS: &[&str] = &["title", "name", "url", "profile_url", "profileUrl"];

/// Reads listing connections out of embedded JSON.
pub struct EmbeddedDataStrategy;

impl ExtractStrategy for EmbeddedDataStrategy {
    fn name(&self) -> &'static str {
        "embedded-data"
    }

    fn apply(&self, fragment: &PageFragment) -> Option<StrategyOutput> {
        let mut connections = Vec::new();
        for blob in collect_blobs(&fragment.body) {
            find_connections(&blob, &mut connections);
        }
        let primary = primary_connection(connections)?;

        let next_token = if primary.has_page_info {
            primary.end_cursor.or(primary.last_edge_cursor)
        } else {
            primary.last_edge_cursor
        };
        Some(StrategyOutput {
            candidates: primary.candidates,
            next_token,
            has_more: primary.has_next_page,
        })
    }
}

/// The listing itself among all connections on the page: paged connections
/// beat unpaged ones (sidebars, suggestion rails), then the one with the most
/// profile candidates wins, earliest first on ties.
fn primary_connection(connections: Vec<Connection>) -> Option<Connection> {
    let any_paged = connections.iter().any(|c| c.has_page_info);
    let mut best: Option<Connection> = None;
    for conn in connections {
        if conn.has_page_info != any_paged {
            continue;
        }
        if best
            .as_ref()
            .map_or(true, |b| conn.candidates.len() > b.candidates.len())
        {
            best = Some(conn);
        }
    }
    best
}

/// One `edges` container found in a blob.
struct Connection {
    candidates: Vec<RawCandidate>,
    has_page_info: bool,
    end_cursor: Option<String>,
    has_next_page: Option<bool>,
    last_edge_cursor: Option<String>,
}

impl Connection {
    fn from_parts(edges: &[Value], container: &Map<String, Value>) -> Self {
        let mut candidates = Vec::new();
        let mut last_edge_cursor = None;

        for edge in edges {
            let Value::Object(edge_map) = edge else {
                continue;
            };
            if let Some(cursor) = edge_map.get("cursor").and_then(Value::as_str) {
                last_edge_cursor = Some(cursor.to_string());
            }
            let node = match edge_map.get("node") {
                Some(Value::Object(node)) => node,
                _ => edge_map,
            };
            if PROFILE_KEYS.iter().any(|k| node.contains_key(*k)) {
                candidates.push(RawCandidate::from_map(
                    CandidateSource::EmbeddedData,
                    node.clone(),
                ));
            }
        }

        let page_info = container
            .get("page_info")
            .or_else(|| container.get("pageInfo"))
            .and_then(Value::as_object);
        let end_cursor = page_info
            .and_then(|p| p.get("end_cursor").or_else(|| p.get("endCursor")))
            .and_then(Value::as_str)
            .map(str::to_string);
        let has_next_page = page_info
            .and_then(|p| p.get("has_next_page").or_else(|| p.get("hasNextPage")))
            .and_then(Value::as_bool);

        Self {
            candidates,
            has_page_info: page_info.is_some(),
            end_cursor,
            has_next_page,
            last_edge_cursor,
        }
    }
}

/// Parse every JSON document the body carries: the body itself when it is
/// JSON (possibly prefixed, possibly several concatenated documents), else
/// each `<script type="application/json">` in the markup.
fn collect_blobs(body: &str) -> Vec<Value> {
    let trimmed = body.trim_start();
    let trimmed = trimmed.strip_prefix(JSON_PREFIX).unwrap_or(trimmed).trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        let docs: Vec<Value> = serde_json::Deserializer::from_str(trimmed)
            .into_iter::<Value>()
            .map_while(Result::ok)
            .collect();
        if !docs.is_empty() {
            return docs;
        }
    }

    script_blobs(body)
}

fn script_blobs(html: &str) -> Vec<Value> {
    let Ok(sel) = Selector::parse(r#"script[type="application/json"]"#) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&sel)
        .filter_map(|el| {
            let text: String = el.text().collect();
            serde_json::from_str(text.trim()).ok()
        })
        .collect()
}

fn find_connections(value: &Value, out: &mut Vec<Connection>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(edges)) = map.get("edges") {
                out.push(Connection::from_parts(edges, map));
                // Connections nested inside a node belong to that profile
                // (mutual friends and the like), so edges are not descended.
                for (key, child) in map {
                    if key != "edges" {
                        find_connections(child, out);
                    }
                }
                return;
            }
            for child in map.values() {
                find_connections(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                find_connections(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(body: &str) -> Option<StrategyOutput> {
        EmbeddedDataStrategy.apply(&PageFragment::from_body("https://www.facebook.com/x", body))
    }

    #[test]
    fn test_script_blob_in_markup() {
        let html = r#"
        <html><body>
        <script type="application/json" data-sjs>
        {"require": [["ScheduledServerJS", "handle", null, [{"__bbox": {"result": {"data": {
            "node": {"all_collections": {"nodes": [{"style_renderer": {"collection": {"pageItems": {
                "edges": [
                    {"node": {"id": "col:1", "title": {"text": "Uncut Magazine"},
                              "url": "https://www.facebook.com/UncutMagazine",
                              "image": {"uri": "https://scontent.example/1.jpg"},
                              "subtitle_text": {"text": ""},
                              "node": {"id": "100064487118317"}},
                     "cursor": "e1"},
                    {"node": {"id": "col:2", "title": {"text": "Example Profile"},
                              "url": "https://www.facebook.com/example.profile"},
                     "cursor": "e2"}
                ],
                "page_info": {"has_next_page": true, "end_cursor": "AQHRend"}
            }}}}]}}
        }}}}]]]}
        </script>
        </body></html>"#;

        let out = apply(html).expect("connection found");
        assert_eq!(out.candidates.len(), 2);
        assert_eq!(out.next_token.as_deref(), Some("AQHRend"));
        assert_eq!(out.has_more, Some(true));
        assert_eq!(out.candidates[0].source, CandidateSource::EmbeddedData);
        assert_eq!(out.candidates[0].get("node").unwrap()["id"], "100064487118317");
    }

    #[test]
    fn test_prefixed_concatenated_json_body() {
        let body = r#"for (;;);{"data": {"edges": [{"node": {"name": "A", "url": "https://x.com/a"}}],
            "pageInfo": {"hasNextPage": false, "endCursor": null}}}
            {"extensions": {"is_final": true}}"#;
        let out = apply(body).expect("connection found");
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.has_more, Some(false));
        assert_eq!(out.next_token, None);
    }

    #[test]
    fn test_edge_cursor_fallback_without_page_info() {
        let body = r#"{"edges": [{"node": {"name": "A"}, "cursor": "c1"},
                                  {"node": {"name": "B"}, "cursor": "c2"}]}"#;
        let out = apply(body).unwrap();
        assert_eq!(out.next_token.as_deref(), Some("c2"));
        assert_eq!(out.has_more, None);
    }

    #[test]
    fn test_non_profile_nodes_skipped_but_applicable() {
        let body = r#"{"edges": [{"node": {"__typename": "Ad"}}],
                       "page_info": {"has_next_page": true, "end_cursor": "n"}}"#;
        let out = apply(body).unwrap();
        assert!(out.candidates.is_empty());
        assert_eq!(out.next_token.as_deref(), Some("n"));
    }

    #[test]
    fn test_nested_profile_connections_ignored() {
        let body = r#"{"edges": [{"node": {"name": "A",
            "mutuals": {"edges": [{"node": {"name": "Z"}}]}}}]}"#;
        let out = apply(body).unwrap();
        assert_eq!(out.candidates.len(), 1);
    }

    #[test]
    fn test_listing_connection_wins_over_side_rails() {
        let body = r#"{"data": {
            "following": {
                "edges": [
                    {"node": {"name": "A", "url": "https://x.com/a"}},
                    {"node": {"name": "B", "url": "https://x.com/b"}},
                    {"node": {"name": "C", "url": "https://x.com/c"}}
                ],
                "page_info": {"has_next_page": true, "end_cursor": "main"}
            },
            "suggestions": {
                "edges": [{"node": {"name": "Suggested", "url": "https://x.com/s"}}],
                "page_info": {"has_next_page": false, "end_cursor": "side"}
            },
            "sidebar": {"edges": [
                {"node": {"name": "S1"}, "cursor": "s1"},
                {"node": {"name": "S2"}, "cursor": "s2"},
                {"node": {"name": "S3"}, "cursor": "s3"},
                {"node": {"name": "S4"}, "cursor": "s4"}
            ]}
        }}"#;
        let out = apply(body).unwrap();
        let names: Vec<_> = out.candidates.iter().map(|c| c.get("name").unwrap().clone()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(out.next_token.as_deref(), Some("main"));
        assert_eq!(out.has_more, Some(true));
    }

    #[test]
    fn test_not_applicable_without_connections() {
        assert!(apply("<html><body><p>hello</p></body></html>").is_none());
        assert!(apply(r#"{"data": {"viewer": null}}"#).is_none());
    }
}
