//! Plain HTML listing of the feed, for scrapers that can't read RSS.

use askama::Template;

use crate::feed::FeedDocument;

#[derive(Template)]
#[template(path = "index_plain.html")]
pub struct PlainIndexTemplate {
    pub title: String,
    pub language: String,
    pub entries: Vec<IndexEntry>,
}

pub struct IndexEntry {
    pub title: String,
    pub link: String,
    /// Publish date as `YYYY-MM-DD`
    pub date: String,
}

impl PlainIndexTemplate {
    pub fn from_document(document: &FeedDocument) -> Self {
        let entries = document
            .items
            .iter()
            .map(|post| IndexEntry {
                title: post.title.clone(),
                link: post.link.clone(),
                date: post.published_at.format("%Y-%m-%d").to_string(),
            })
            .collect();

        Self {
            title: document.channel.title.clone(),
            language: document.channel.language.clone(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::normalize::{CanonicalPost, ItemGuid};
    use chrono::{TimeZone, Utc};

    fn post(title: &str, link: &str) -> CanonicalPost {
        CanonicalPost {
            title: title.to_string(),
            link: link.to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            summary: String::new(),
            category: None,
            guid: ItemGuid::Permalink(link.to_string()),
        }
    }

    #[test]
    fn test_lists_every_item() {
        let posts = vec![
            post("First", "https://bonikbarta.com/news/1"),
            post("Second", "https://bonikbarta.com/news/2"),
        ];
        let doc = FeedDocument::build(&Config::default(), posts, Utc::now());

        let html = PlainIndexTemplate::from_document(&doc).render().unwrap();

        assert!(html.contains("<title>Bonik Barta RSS</title>"));
        assert!(html.contains(r#"<html lang="bn">"#));
        assert!(html.contains(r#"target="_blank">First</a> - 2024-03-01</li>"#));
        assert!(html.contains("bonikbarta.com"));
        assert_eq!(html.matches("<li>").count(), 2);
    }

    #[test]
    fn test_titles_are_html_escaped() {
        let doc = FeedDocument::build(
            &Config::default(),
            vec![post("<script>alert(1)</script>", "https://bonikbarta.com/x")],
            Utc::now(),
        );

        let html = PlainIndexTemplate::from_document(&doc).render().unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_placeholder_document_still_renders() {
        let doc = FeedDocument::build(&Config::default(), vec![], Utc::now());
        let html = PlainIndexTemplate::from_document(&doc).render().unwrap();

        assert!(html.contains("No posts available"));
    }
}
