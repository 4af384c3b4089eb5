//! Locating the list of post records inside an API payload.
//!
//! The upstream API is not consistent about where it puts posts: filter
//! endpoints answer `{"posts": [...]}`, edition pages nest them under
//! `content.items`, and some endpoints return a bare array. Anything else is
//! searched for a nested list of article-like objects.

use serde_json::Value;

/// How deep the fallback search descends below the payload root
const SCAN_MAX_DEPTH: usize = 4;

/// An object carrying any of these keys looks like an article
const ARTICLE_KEYS: &[&str] = &["id", "title", "url_path", "first_published_at"];

/// Return the post records found in `payload`, or an empty list when the shape
/// is not recognized.
pub fn extract_posts(payload: &Value) -> Vec<Value> {
    if let Some(posts) = non_empty_list(payload.get("posts")) {
        return posts.clone();
    }

    let content = payload.get("content");

    if let Some(items) = list(content.and_then(|c| c.get("items"))) {
        return items.clone();
    }

    if let Value::Array(posts) = payload {
        return posts.clone();
    }

    if let Some(items) = non_empty_list(payload.get("items")) {
        return items.clone();
    }

    if let Some(posts) = non_empty_list(content.and_then(|c| c.get("posts"))) {
        return posts.clone();
    }

    if let Some(sections) = list(content.and_then(|c| c.get("sections"))) {
        return sections
            .iter()
            .filter_map(|section| list(section.get("items")))
            .flatten()
            .cloned()
            .collect();
    }

    let mut found = Vec::new();
    find_article_lists(payload, 0, &mut found);

    // Longest list wins, the first one found on a tie
    found
        .into_iter()
        .fold(None::<&Vec<Value>>, |best, list| match best {
            Some(best) if best.len() >= list.len() => Some(best),
            _ => Some(list),
        })
        .cloned()
        .unwrap_or_default()
}

/// Collect nested lists whose elements are all article-like objects.
/// A matching list is not searched further.
fn find_article_lists<'a>(value: &'a Value, depth: usize, found: &mut Vec<&'a Vec<Value>>) {
    if depth > SCAN_MAX_DEPTH {
        return;
    }

    match value {
        Value::Array(items) if looks_like_articles(items) => found.push(items),
        Value::Array(items) => {
            for item in items {
                find_article_lists(item, depth + 1, found);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                find_article_lists(child, depth + 1, found);
            }
        }
        _ => {}
    }
}

fn looks_like_articles(items: &[Value]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| {
            item.as_object()
                .map(|obj| ARTICLE_KEYS.iter().any(|key| obj.contains_key(*key)))
                .unwrap_or(false)
        })
}

/// Concatenate the posts of several payloads in order, without deduplication.
pub fn extract_all<'a, I>(payloads: I) -> Vec<Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    payloads.into_iter().flat_map(extract_posts).collect()
}

fn list(value: Option<&Value>) -> Option<&Vec<Value>> {
    value.and_then(Value::as_array)
}

fn non_empty_list(value: Option<&Value>) -> Option<&Vec<Value>> {
    list(value).filter(|items| !items.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_posts_key() {
        let payload = json!({"posts": [{"title": "a"}, {"title": "b"}]});
        let posts = extract_posts(&payload);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0]["title"], "a");
    }

    #[test]
    fn test_content_items() {
        let payload = json!({"content": {"items": [{"title": "nested"}]}});
        let posts = extract_posts(&payload);
        assert_eq!(posts, vec![json!({"title": "nested"})]);
    }

    #[test]
    fn test_empty_posts_falls_through_to_content_items() {
        let payload = json!({
            "posts": [],
            "content": {"items": [{"title": "from content"}]}
        });
        let posts = extract_posts(&payload);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["title"], "from content");
    }

    #[test]
    fn test_posts_wins_over_content_items() {
        let payload = json!({
            "posts": [{"title": "first"}],
            "content": {"items": [{"title": "second"}]}
        });
        let posts = extract_posts(&payload);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["title"], "first");
    }

    #[test]
    fn test_bare_list() {
        let payload = json!([{"title": "x"}, {"title": "y"}, {"title": "z"}]);
        assert_eq!(extract_posts(&payload).len(), 3);
    }

    #[test]
    fn test_top_level_items() {
        let payload = json!({"items": [{"title": "x"}]});
        assert_eq!(extract_posts(&payload).len(), 1);
    }

    #[test]
    fn test_content_posts() {
        let payload = json!({"content": {"posts": [{"title": "x"}, {"title": "y"}]}});
        assert_eq!(extract_posts(&payload).len(), 2);
    }

    #[test]
    fn test_content_sections_are_flattened() {
        let payload = json!({
            "content": {
                "sections": [
                    {"items": [{"title": "s1a"}, {"title": "s1b"}]},
                    {"heading": "no items here"},
                    {"items": [{"title": "s3a"}]}
                ]
            }
        });
        let posts = extract_posts(&payload);
        let titles: Vec<_> = posts.iter().map(|p| p["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["s1a", "s1b", "s3a"]);
    }

    mod deep_scan_tests {
        use super::*;

        #[test]
        fn test_nested_article_list_found() {
            let payload = json!({
                "data": {
                    "page": {
                        "articles": [
                            {"id": 1, "title": "one"},
                            {"url_path": "/home/news/two"}
                        ]
                    }
                }
            });
            let posts = extract_posts(&payload);
            assert_eq!(posts.len(), 2);
            assert_eq!(posts[0]["title"], "one");
        }

        #[test]
        fn test_longest_list_wins() {
            let payload = json!({
                "data": {
                    "featured": [{"id": 1}],
                    "latest": [{"id": 2}, {"id": 3}, {"id": 4}]
                }
            });
            let ids: Vec<_> = extract_posts(&payload)
                .iter()
                .map(|p| p["id"].as_i64().unwrap())
                .collect();
            assert_eq!(ids, vec![2, 3, 4]);
        }

        #[test]
        fn test_lists_of_other_things_ignored() {
            let payload = json!({
                "meta": {"tags": ["a", "b"], "authors": [{"email": "x@example.com"}]},
                "data": {"mixed": [{"title": "ok"}, "not an object"]}
            });
            assert!(extract_posts(&payload).is_empty());
        }

        #[test]
        fn test_search_depth_is_bounded() {
            let reachable = json!({"a": {"b": {"c": {"items": [{"id": 1}]}}}});
            assert_eq!(extract_posts(&reachable).len(), 1);

            let too_deep = json!({"a": {"b": {"c": {"d": {"items": [{"id": 1}]}}}}});
            assert!(extract_posts(&too_deep).is_empty());
        }

        #[test]
        fn test_known_shapes_take_precedence() {
            let payload = json!({
                "posts": [{"id": 1}],
                "archive": {"list": [{"id": 2}, {"id": 3}]}
            });
            assert_eq!(extract_posts(&payload).len(), 1);
        }
    }

    #[test]
    fn test_unrecognized_shapes_degrade_to_empty() {
        assert!(extract_posts(&json!({"status": "ok"})).is_empty());
        assert!(extract_posts(&json!("just a string")).is_empty());
        assert!(extract_posts(&json!(42)).is_empty());
        assert!(extract_posts(&Value::Null).is_empty());
        assert!(extract_posts(&json!({"posts": "not a list"})).is_empty());
        assert!(extract_posts(&json!({"content": {"items": {"title": "x"}}})).is_empty());
    }

    #[test]
    fn test_extract_all_concatenates_in_order() {
        let first = json!({"posts": [{"id": 1}, {"id": 2}]});
        let failed = json!([]);
        let second = json!({"content": {"items": [{"id": 2}, {"id": 3}]}});

        let posts = extract_all([&first, &failed, &second]);
        let ids: Vec<_> = posts.iter().map(|p| p["id"].as_i64().unwrap()).collect();

        // Duplicates across endpoints are kept
        assert_eq!(ids, vec![1, 2, 2, 3]);
    }
}
