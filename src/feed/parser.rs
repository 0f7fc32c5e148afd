use chrono::{DateTime, Utc};
use feed_rs::parser;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::util::clean_text;

#[derive(Debug, Error)]
#[error("Feed parse error: {0}")]
pub struct ParseError(#[from] feed_rs::parser::ParseFeedError);

/// One entry of a parsed feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    /// Identity used for deduplication in merge mode.
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    /// Publication time, falling back to the last update time.
    pub created: Option<DateTime<Utc>>,
}

/// Feed-level metadata plus the items of one source document.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub items: Vec<FeedItem>,
}

/// Parses an RSS, Atom or JSON Feed document.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let feed = parser::parse(bytes)?;

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .and_then(|l| clean_text(&l.href));
            let created = entry.published.or(entry.updated);
            let description = entry.summary.and_then(|s| clean_text(&s.content));
            let content = entry
                .content
                .and_then(|c| c.body)
                .and_then(|body| clean_text(&body));
            let author = entry.authors.first().and_then(|p| clean_text(&p.name));
            let title = entry
                .title
                .and_then(|t| clean_text(&t.content))
                .unwrap_or_else(|| "Untitled".to_string());

            let guid = generate_guid(Some(entry.id.as_str()), link.as_deref(), &title, created);

            FeedItem {
                guid,
                title,
                link,
                description,
                content,
                author,
                created,
            }
        })
        .collect();

    Ok(ParsedFeed {
        title: feed.title.and_then(|t| clean_text(&t.content)),
        link: feed.links.first().and_then(|l| clean_text(&l.href)),
        description: feed.description.and_then(|d| clean_text(&d.content)),
        items,
    })
}

/// Returns the entry's own id when present, otherwise a content hash.
///
/// feed-rs synthesizes an id for entries that carry none, so the hash path
/// is only reached for ids that are blank after trimming.
fn generate_guid(
    existing: Option<&str>,
    link: Option<&str>,
    title: &str,
    created: Option<DateTime<Utc>>,
) -> String {
    if let Some(guid) = existing {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        link.unwrap_or(""),
        title,
        created.map(|c| c.timestamp().to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
