use std::io::Write;

use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::config::{ChannelConfig, Config};
use crate::normalize::{to_rfc2822, CanonicalPost, ItemGuid};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// An RSS 2.0 channel ready to serialize. Always holds at least one item.
#[derive(Debug, Clone)]
pub struct FeedDocument {
    pub channel: ChannelConfig,
    pub build_date: DateTime<Utc>,
    pub items: Vec<CanonicalPost>,
    /// True when `items` is the single fetch-failure placeholder
    pub is_placeholder: bool,
}

impl FeedDocument {
    /// Assemble the document from normalized posts.
    ///
    /// Posts from several endpoints are sorted newest first (stable, so equal
    /// dates keep their fetch order). A single endpoint keeps upstream order.
    /// The result is capped at `max_items`; an empty result becomes the
    /// placeholder item.
    pub fn build(config: &Config, mut posts: Vec<CanonicalPost>, now: DateTime<Utc>) -> Self {
        if config.endpoints.len() > 1 {
            posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        }
        posts.truncate(config.max_items);

        let is_placeholder = posts.is_empty();
        if is_placeholder {
            posts.push(placeholder_item(&config.site_root(), now));
        }

        Self {
            channel: config.channel.clone(),
            build_date: now,
            items: posts,
            is_placeholder,
        }
    }

    /// Serialize to an XML string. `indent` of 0 writes everything on one line.
    pub fn to_xml(&self, indent: usize) -> anyhow::Result<String> {
        let mut writer = if indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', indent)
        } else {
            Writer::new(Vec::new())
        };

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        rss.push_attribute(("xmlns:atom", ATOM_NAMESPACE));
        writer.write_event(Event::Start(rss))?;
        writer.write_event(Event::Start(BytesStart::new("channel")))?;

        let channel = &self.channel;
        write_text_element(&mut writer, "title", &channel.title)?;
        write_text_element(&mut writer, "link", &channel.link)?;
        write_text_element(&mut writer, "description", &channel.description)?;
        write_text_element(&mut writer, "language", &channel.language)?;
        write_text_element(&mut writer, "lastBuildDate", &to_rfc2822(&self.build_date))?;
        write_text_element(&mut writer, "generator", &channel.generator)?;
        if let Some(ttl) = channel.ttl {
            write_text_element(&mut writer, "ttl", &ttl.to_string())?;
        }

        let mut self_link = BytesStart::new("atom:link");
        self_link.push_attribute(("href", channel.self_link.as_str()));
        self_link.push_attribute(("rel", "self"));
        self_link.push_attribute(("type", "application/rss+xml"));
        writer.write_event(Event::Empty(self_link))?;

        for item in &self.items {
            write_item(&mut writer, item)?;
        }

        writer.write_event(Event::End(BytesEnd::new("channel")))?;
        writer.write_event(Event::End(BytesEnd::new("rss")))?;

        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(String::from_utf8(bytes)?)
    }
}

/// The status item published when no source produced a post.
/// Its GUID only changes once an hour so readers don't see a new entry on every run.
pub fn placeholder_item(site_root: &str, now: DateTime<Utc>) -> CanonicalPost {
    CanonicalPost {
        title: "No posts available".to_string(),
        link: site_root.to_string(),
        published_at: now,
        summary: format!(
            "The feed could not fetch posts from the API at {}.",
            to_rfc2822(&now)
        ),
        category: None,
        guid: ItemGuid::Opaque(format!("fetch-status-{}", now.format("%Y%m%d%H"))),
    }
}

fn write_item<W: Write>(writer: &mut Writer<W>, item: &CanonicalPost) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;

    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "link", &item.link)?;
    write_text_element(writer, "pubDate", &item.pub_date())?;
    write_text_element(writer, "description", &item.summary)?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute((
        "isPermaLink",
        if item.guid.is_permalink() { "true" } else { "false" },
    ));
    writer.write_event(Event::Start(guid))?;
    writer.write_event(Event::Text(BytesText::from_escaped(escape(item.guid.value()))))?;
    writer.write_event(Event::End(BytesEnd::new("guid")))?;

    if let Some(category) = &item.category {
        write_text_element(writer, "category", category)?;
    }

    writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(escape(text))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
