//! Mapping raw post records onto [`CanonicalPost`].
//!
//! Every canonical field is resolved from an ordered list of candidate keys.
//! The first key holding a present, non-empty value wins and later keys are
//! never consulted, even if the winning value later fails to parse.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

const TITLE_KEYS: &[&str] = &["title", "post_title", "name"];
const LINK_KEYS: &[&str] = &["url_path", "link", "url", "permalink"];
const DATE_KEYS: &[&str] = &["first_published_at", "published_at", "date", "created_at"];
const SUMMARY_KEYS: &[&str] = &["summary", "excerpt", "description"];
const CATEGORY_KEYS: &[&str] = &["category", "categories"];

/// Body field used for the summary when no summary-like field exists
const CONTENT_KEY: &str = "content";
const CONTENT_SUMMARY_CHARS: usize = 200;

const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Upstream record identifier, mixed into opaque GUIDs when present
const ID_KEY: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemGuid {
    /// The GUID is the item link itself
    Permalink(String),
    /// An opaque identifier, not dereferenceable
    Opaque(String),
}

impl ItemGuid {
    pub fn value(&self) -> &str {
        match self {
            ItemGuid::Permalink(v) | ItemGuid::Opaque(v) => v,
        }
    }

    pub fn is_permalink(&self) -> bool {
        matches!(self, ItemGuid::Permalink(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPost {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub summary: String,
    pub category: Option<String>,
    pub guid: ItemGuid,
}

impl CanonicalPost {
    /// Publish date in the RFC 2822 form RSS readers expect
    pub fn pub_date(&self) -> String {
        to_rfc2822(&self.published_at)
    }
}

pub fn to_rfc2822(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("post record is {0}, expected an object")]
    NotAnObject(&'static str),
    #[error("field '{key}' holds {found}, expected text")]
    UnexpectedType { key: String, found: &'static str },
}

pub struct Normalizer {
    site_origin: String,
    summary_fallback: String,
}

impl Normalizer {
    pub fn new(site_origin: impl Into<String>, summary_fallback: impl Into<String>) -> Self {
        let site_origin: String = site_origin.into();
        Self {
            site_origin: site_origin.trim_end_matches('/').to_string(),
            summary_fallback: summary_fallback.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.site_origin.clone(), config.summary_fallback.clone())
    }

    pub fn site_root(&self) -> String {
        format!("{}/", self.site_origin)
    }

    /// Records explicitly flagged `"live": false` are unpublished drafts
    pub fn is_live(raw: &Value) -> bool {
        raw.get("live").and_then(Value::as_bool) != Some(false)
    }

    /// Normalize a whole batch, skipping unpublished records and records that fail.
    /// `index` used for placeholder titles is the 1-based position in `raws`.
    pub fn normalize_batch(&self, raws: &[Value]) -> Vec<CanonicalPost> {
        let now = Utc::now();
        let mut posts = Vec::with_capacity(raws.len());

        for (index, raw) in raws.iter().enumerate() {
            if !Self::is_live(raw) {
                debug!("Skipping unpublished post {}", index + 1);
                continue;
            }

            match self.normalize_at(raw, index, now) {
                Ok(post) => posts.push(post),
                Err(e) => warn!("Skipping post {}: {}", index + 1, e),
            }
        }

        posts
    }

    pub fn normalize(&self, raw: &Value, index: usize) -> Result<CanonicalPost, NormalizeError> {
        self.normalize_at(raw, index, Utc::now())
    }

    /// Normalize one record, using `now` wherever a timestamp must be invented
    pub fn normalize_at(
        &self,
        raw: &Value,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<CanonicalPost, NormalizeError> {
        let post = raw
            .as_object()
            .ok_or_else(|| NormalizeError::NotAnObject(type_name(raw)))?;

        let title = match first_present(post, TITLE_KEYS) {
            Some((key, value)) => sanitize(&text(key, value)?),
            None => String::new(),
        };
        let title = if title.is_empty() {
            format!("Post {}", index + 1)
        } else {
            title
        };

        let raw_date = match first_present(post, DATE_KEYS) {
            Some((key, value)) => Some(text(key, value)?),
            None => None,
        };
        let published_at = raw_date.as_deref().and_then(parse_date).unwrap_or(now);

        let (link, guid) = match first_present(post, LINK_KEYS) {
            Some((key, value)) => {
                let link = self.resolve_link(&sanitize(&text(key, value)?));
                (link.clone(), ItemGuid::Permalink(link))
            }
            None => {
                let id = post
                    .get(ID_KEY)
                    .filter(|v| is_present(v))
                    .and_then(|v| text(ID_KEY, v).ok());
                (
                    self.site_root(),
                    ItemGuid::Opaque(opaque_guid(id.as_deref(), &title, raw_date.as_deref())),
                )
            }
        };

        let summary = self.resolve_summary(post)?;
        let category = first_present(post, CATEGORY_KEYS).and_then(|(_, value)| category_name(value));

        Ok(CanonicalPost {
            title,
            link,
            published_at,
            summary,
            category,
            guid,
        })
    }

    /// Turn a link candidate into an absolute URL on the site.
    ///
    /// Absolute URLs pass through untouched. Relative paths lose their first
    /// `/home` segment and are joined onto the site origin with exactly one `/`.
    pub fn resolve_link(&self, candidate: &str) -> String {
        if candidate.starts_with("http") {
            return candidate.to_string();
        }

        let path = format!("/{}", candidate.trim_start_matches('/'));
        let path = strip_home_segment(&path);
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };

        format!("{}{}", self.site_origin, path)
    }

    fn resolve_summary(&self, post: &Map<String, Value>) -> Result<String, NormalizeError> {
        if let Some((key, value)) = first_present(post, SUMMARY_KEYS) {
            return Ok(sanitize(&text(key, value)?));
        }

        if let Some(value) = post.get(CONTENT_KEY).filter(|v| is_present(v)) {
            let content = sanitize(&text(CONTENT_KEY, value)?);
            return Ok(content.chars().take(CONTENT_SUMMARY_CHARS).collect());
        }

        Ok(self.summary_fallback.clone())
    }
}

/// Stable token for a post without a link. Only record content goes in, never
/// the run time, so the same post keeps its GUID across runs.
fn opaque_guid(id: Option<&str>, title: &str, raw_date: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.unwrap_or_default().as_bytes());
    hasher.update(b"|");
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(raw_date.unwrap_or_default().as_bytes());
    format!("post-{}", hex::encode(&hasher.finalize()[..8]))
}

/// First candidate key holding a present value, with that value
fn first_present<'a>(
    post: &'a Map<String, Value>,
    keys: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    keys.iter()
        .find_map(|&key| post.get(key).filter(|v| is_present(v)).map(|v| (key, v)))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn text(key: &str, value: &Value) -> Result<String, NormalizeError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(NormalizeError::UnexpectedType {
            key: key.to_string(),
            found: type_name(other),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Category values arrive as a string, a list of strings or objects, or an object with a `name`
fn category_name(value: &Value) -> Option<String> {
    let value = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let value = match value {
        Value::Object(map) => map.get("name")?,
        other => other,
    };

    let name = match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) if is_present(value) => {
            text("category", value).ok().map(|s| sanitize(&s))
        }
        _ => None,
    };

    name.filter(|s| !s.is_empty())
}

/// Trim and drop characters XML 1.0 cannot carry
pub fn sanitize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|&c| {
            !(c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
                && c != '\u{FFFE}'
                && c != '\u{FFFF}'
        })
        .collect()
}

/// Remove the first `/home` path segment, leaving `/homepage` and friends alone
fn strip_home_segment(path: &str) -> String {
    const SEGMENT: &str = "/home";

    let mut search_from = 0;
    while let Some(pos) = path[search_from..].find(SEGMENT) {
        let start = search_from + pos;
        let end = start + SEGMENT.len();
        let rest = &path[end..];
        if rest.is_empty() || rest.starts_with(['/', '?', '#']) {
            return format!("{}{}", &path[..start], rest);
        }
        search_from = end;
    }

    path.to_string()
}

/// Parse the date shapes the API has been seen to emit. `None` if none match.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(naive.and_utc());
    }

    // Date only: midnight UTC
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
