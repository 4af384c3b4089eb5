use askama::Template;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::Config;
use crate::extract::extract_all;
use crate::feed::FeedDocument;
use crate::fetcher::Fetcher;
use crate::index::PlainIndexTemplate;
use crate::normalize::Normalizer;
use crate::output::write_atomic;

/// What one run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Post records found across all endpoints
    pub extracted: usize,
    /// Records that survived normalization
    pub normalized: usize,
    /// Items written to the feed, placeholder included
    pub published: usize,
    pub placeholder: bool,
}

/// fetch → extract → normalize → render → write, once
pub struct Pipeline {
    config: Config,
    fetcher: Fetcher,
    normalizer: Normalizer,
}

impl Pipeline {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        let normalizer = Normalizer::from_config(&config);

        Ok(Self {
            config,
            fetcher,
            normalizer,
        })
    }

    /// Fetch and normalize without writing anything
    pub async fn build_document(&self) -> (FeedDocument, RunSummary) {
        let payloads = self.fetcher.fetch_all(&self.config.endpoints).await;
        let raw_posts = extract_all(&payloads);
        info!("Extracted {} post records", raw_posts.len());

        let posts = self.normalizer.normalize_batch(&raw_posts);
        let normalized = posts.len();

        let document = FeedDocument::build(&self.config, posts, Utc::now());
        if document.is_placeholder {
            warn!("No posts available from any endpoint, publishing placeholder item");
        }

        let summary = RunSummary {
            extracted: raw_posts.len(),
            normalized,
            published: document.items.len(),
            placeholder: document.is_placeholder,
        };

        (document, summary)
    }

    /// Run once. Only rendering and file write failures are returned.
    pub async fn run(&self) -> anyhow::Result<RunSummary> {
        let (document, summary) = self.build_document().await;

        let xml = document.to_xml(self.config.indent)?;
        write_atomic(&self.config.output, &xml)?;
        info!(
            "RSS feed generated with {} items (saved to {})",
            summary.published,
            self.config.output.display()
        );

        if let Some(index_path) = &self.config.html_index {
            let html = PlainIndexTemplate::from_document(&document).render()?;
            write_atomic(index_path, &html)?;
            info!("Plain HTML index saved to {}", index_path.display());
        }

        Ok(summary)
    }
}
