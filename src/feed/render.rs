use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use thiserror::Error;

use super::merge::MergedFeed;
use super::parser::FeedItem;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("RSS write error: {0}")]
    Rss(#[from] rss::Error),
    #[error("RSS output is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Serializes a merged feed as an RSS 2.0 document.
pub fn render_rss(feed: &MergedFeed) -> Result<String, RenderError> {
    let bytes = to_channel(feed).write_to(Vec::new())?;
    Ok(String::from_utf8(bytes)?)
}

fn to_channel(feed: &MergedFeed) -> Channel {
    ChannelBuilder::default()
        .title(feed.title.clone())
        .link(feed.link.clone())
        .description(feed.description.clone())
        .generator(Some(concat!("rssmerge ", env!("CARGO_PKG_VERSION")).to_string()))
        .items(feed.items.iter().map(to_item).collect::<Vec<_>>())
        .build()
}

fn to_item(item: &FeedItem) -> Item {
    let guid = GuidBuilder::default()
        .value(item.guid.clone())
        .permalink(false)
        .build();

    ItemBuilder::default()
        .title(Some(item.title.clone()))
        .link(item.link.clone())
        // Full content only stands in when the source had no summary
        .description(item.description.clone().or_else(|| item.content.clone()))
        .author(item.author.clone())
        .guid(Some(guid))
        .pub_date(item.created.map(|created| created.to_rfc2822()))
        .build()
}
