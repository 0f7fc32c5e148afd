//! Feed pipeline: resolve a feed list, fetch every feed, merge, filter, render.
//!
//! - [`source_list`] - Turns the `source` URL into feed URLs (OPML or plain text)
//! - [`fetcher`] - Bounded-concurrency fetching; failures become `Err` bodies
//! - [`parser`] - RSS/Atom/JSON Feed parsing using the `feed-rs` crate
//! - [`merge`] - Concatenation or guid-deduplicating merge into one feed
//! - [`filter`] - Trailing time window anchored on the first merged item
//! - [`render`] - RSS 2.0 output via the `rss` crate
//!
//! # Example
//!
//! ```ignore
//! let urls = resolve_feed_list(&client, &source, &ResolveOptions::default()).await?;
//! let raw = fetch_all(&client, urls, &FetchOptions::default()).await;
//! let mut merged = merge(&raw, MergeMode::Merge, &Envelope::default(), source.as_str());
//! merged.items = filter_recent(merged.items, true, DAY_WINDOW);
//! let xml = render_rss(&merged)?;
//! ```

mod fetcher;
mod filter;
mod merge;
mod opml;
mod parser;
mod render;
mod source_list;

pub use fetcher::{fetch_all, fetch_one, FetchError, FetchOptions, RawFeed};
pub use filter::{filter_recent, DAY_WINDOW};
pub use merge::{concat_items, merge, merge_items, Envelope, MergeMode, MergedFeed};
pub use opml::{parse_opml, OpmlError};
pub use parser::{parse_feed, FeedItem, ParseError, ParsedFeed};
pub use render::{render_rss, RenderError};
pub use source_list::{parse_feed_list, resolve_feed_list, ListError, ResolveOptions};
