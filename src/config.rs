use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Origin prepended to relative post paths, e.g. `https://bonikbarta.com`
    #[serde(default = "default_site_origin")]
    pub site_origin: String,
    /// Value of the `root_path` query parameter sent with every request
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Where the RSS document is written
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Optional plain HTML listing of the same posts
    #[serde(default)]
    pub html_index: Option<PathBuf>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// UTC offset used to compute the `date` query parameter
    #[serde(default = "default_date_offset_hours")]
    pub date_offset_hours: i32,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Description used when a post has no summary-like field
    #[serde(default = "default_summary_fallback")]
    pub summary_fallback: String,
    /// Indentation width of the written XML, 0 for compact output
    #[serde(default = "default_indent")]
    pub indent: usize,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointConfig>,
}

fn default_site_origin() -> String {
    "https://bonikbarta.com".to_string()
}

fn default_root_path() -> String {
    "00000000010000000001".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("feed.xml")
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (RSS Generator)".to_string()
}

fn default_date_offset_hours() -> i32 {
    6
}

fn default_max_items() -> usize {
    50
}

fn default_summary_fallback() -> String {
    "No description available".to_string()
}

fn default_indent() -> usize {
    2
}

fn default_endpoints() -> Vec<EndpointConfig> {
    vec![EndpointConfig {
        name: "Latest".to_string(),
        url: "https://bonikbarta.com/api/post-filters/41".to_string(),
        with_date: false,
    }]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    #[serde(default = "default_channel_title")]
    pub title: String,
    #[serde(default = "default_channel_link")]
    pub link: String,
    #[serde(default = "default_channel_description")]
    pub description: String,
    #[serde(default = "default_channel_language")]
    pub language: String,
    #[serde(default = "default_channel_generator")]
    pub generator: String,
    /// Published URL of the feed itself, used for the `atom:link rel="self"`
    #[serde(default = "default_channel_self_link")]
    pub self_link: String,
    /// Minutes readers may cache the feed
    #[serde(default)]
    pub ttl: Option<u32>,
}

fn default_channel_title() -> String {
    "Bonik Barta RSS".to_string()
}

fn default_channel_link() -> String {
    "https://bonikbarta.com/".to_string()
}

fn default_channel_description() -> String {
    "Auto-generated feed from Bonik Barta".to_string()
}

fn default_channel_language() -> String {
    "bn".to_string()
}

fn default_channel_generator() -> String {
    "barta-feed".to_string()
}

fn default_channel_self_link() -> String {
    "https://bonikbarta.com/feed.xml".to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            title: default_channel_title(),
            link: default_channel_link(),
            description: default_channel_description(),
            language: default_channel_language(),
            generator: default_channel_generator(),
            self_link: default_channel_self_link(),
            ttl: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    /// Append today's date (`YYYY-MM-DD`) as the `date` query parameter
    #[serde(default)]
    pub with_date: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_origin: default_site_origin(),
            root_path: default_root_path(),
            output: default_output(),
            html_index: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            date_offset_hours: default_date_offset_hours(),
            max_items: default_max_items(),
            summary_fallback: default_summary_fallback(),
            indent: default_indent(),
            channel: ChannelConfig::default(),
            endpoints: default_endpoints(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to the built-in site defaults.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Site root used as the fallback link, always with a trailing slash
    pub fn site_root(&self) -> String {
        format!("{}/", self.site_origin.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        assert_eq!(default_timeout_secs(), 15);
        assert_eq!(default_max_items(), 50);
        assert_eq!(default_summary_fallback(), "No description available");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            site_origin = "https://news.example.com"
            root_path = "0001"
            output = "out/feed.xml"
            timeout_secs = 10
            max_items = 20

            [channel]
            title = "Example News"
            link = "https://news.example.com/"
            description = "Everything from Example"
            language = "en"
            self_link = "https://feeds.example.com/news.xml"
            ttl = 30

            [[endpoints]]
            name = "Front page"
            url = "https://news.example.com/api/front"

            [[endpoints]]
            name = "Print edition"
            url = "https://news.example.com/api/print/3"
            with_date = true
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.site_origin, "https://news.example.com");
        assert_eq!(config.root_path, "0001");
        assert_eq!(config.output, PathBuf::from("out/feed.xml"));
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_items, 20);
        assert_eq!(config.channel.title, "Example News");
        assert_eq!(config.channel.language, "en");
        assert_eq!(config.channel.ttl, Some(30));
        assert_eq!(config.channel.generator, "barta-feed");
        assert_eq!(config.endpoints.len(), 2);
        assert!(!config.endpoints[0].with_date);
        assert!(config.endpoints[1].with_date);
    }

    #[test]
    fn test_empty_config_uses_site_defaults() {
        let config = Config::from_str("").unwrap();

        assert_eq!(config.site_origin, "https://bonikbarta.com");
        assert_eq!(config.root_path, "00000000010000000001");
        assert_eq!(config.output, PathBuf::from("feed.xml"));
        assert_eq!(config.indent, 2);
        assert!(config.html_index.is_none());
        assert_eq!(config.channel.language, "bn");
        assert_eq!(config.endpoints.len(), 1);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config.max_items, 50);
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_endpoint_missing_url() {
        let content = r#"
            [[endpoints]]
            name = "Broken"
        "#;

        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_empty_endpoint_list() {
        let config = Config::from_str("endpoints = []").unwrap();
        assert!(config.endpoints.is_empty());
    }

    #[test]
    fn test_site_root() {
        let mut config = Config::default();
        assert_eq!(config.site_root(), "https://bonikbarta.com/");

        config.site_origin = "https://example.com/".to_string();
        assert_eq!(config.site_root(), "https://example.com/");
    }
}
