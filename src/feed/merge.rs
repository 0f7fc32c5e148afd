use std::collections::HashSet;

use super::fetcher::RawFeed;
use super::parser::{parse_feed, FeedItem};

/// How items from several sources are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Every item of every source, in source order, no deduplication.
    Concat,
    /// Deduplicate by guid (first seen wins), then order newest first.
    #[default]
    Merge,
}

/// Feed-level metadata applied to the merged result.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub title: String,
    /// Synthesized from the number of contributing sources when `None`.
    pub description: Option<String>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            title: "Merged Feed".to_string(),
            description: None,
        }
    }
}

/// A single feed combined from all sources of one request.
#[derive(Debug, Clone)]
pub struct MergedFeed {
    pub title: String,
    /// Always the source the feed list was resolved from.
    pub link: String,
    pub description: String,
    pub items: Vec<FeedItem>,
}

/// Combines fetched documents into one feed.
///
/// Failed fetches and documents that do not parse contribute nothing. The
/// envelope link is set to `link` regardless of what individual feeds carry.
pub fn merge(raw: &[RawFeed], mode: MergeMode, envelope: &Envelope, link: &str) -> MergedFeed {
    let mut per_source = Vec::with_capacity(raw.len());
    let mut unparsed = 0usize;

    for feed in raw {
        let Ok(body) = &feed.body else {
            continue;
        };
        match parse_feed(body) {
            Ok(parsed) => per_source.push(parsed.items),
            Err(e) => {
                unparsed += 1;
                tracing::warn!(feed = %feed.source, error = %e, "Skipping unparseable feed");
            }
        }
    }

    let contributing = per_source.len();
    let items = match mode {
        MergeMode::Concat => concat_items(per_source),
        MergeMode::Merge => merge_items(per_source),
    };

    tracing::debug!(
        sources = raw.len(),
        contributing = contributing,
        unparsed = unparsed,
        items = items.len(),
        mode = ?mode,
        "Merged feeds"
    );

    MergedFeed {
        title: envelope.title.clone(),
        link: link.to_string(),
        description: envelope
            .description
            .clone()
            .unwrap_or_else(|| format!("Merged from {} feeds", contributing)),
        items,
    }
}

/// Flattens per-source item lists, preserving source order then item order.
pub fn concat_items(per_source: Vec<Vec<FeedItem>>) -> Vec<FeedItem> {
    per_source.into_iter().flatten().collect()
}

/// Deduplicates by guid, keeping the first occurrence in source order, then
/// sorts newest first. The sort is stable, so items with equal timestamps
/// keep their source order and undated items trail all dated ones.
pub fn merge_items(per_source: Vec<Vec<FeedItem>>) -> Vec<FeedItem> {
    let mut seen = HashSet::new();
    let mut items: Vec<FeedItem> = per_source
        .into_iter()
        .flatten()
        .filter(|item| seen.insert(item.guid.clone()))
        .collect();

    // Option orders None < Some, so reversing puts undated items last
    items.sort_by(|a, b| b.created.cmp(&a.created));
    items
}
