use chrono::Duration;

use super::parser::FeedItem;

/// Default trailing window for the `day` filter.
pub const DAY_WINDOW: Duration = Duration::hours(24);

/// Keeps the items created within `window` before the first item.
///
/// The anchor is `items[0].created`, not the current time, so a feed whose
/// newest entry is a week old still yields that day's worth of items. An item
/// passes when it is strictly newer than `anchor - window`. Undated items
/// never pass. When the first item is undated there is no lower bound and
/// every dated item passes. Order is preserved.
///
/// With `enabled == false` the items are returned untouched.
pub fn filter_recent(items: Vec<FeedItem>, enabled: bool, window: Duration) -> Vec<FeedItem> {
    if !enabled {
        return items;
    }

    let Some(first) = items.first() else {
        return items;
    };

    let cutoff = first.created.map(|anchor| anchor - window);
    if cutoff.is_none() {
        tracing::debug!("First item has no date, day filter keeps all dated items");
    }

    let before = items.len();
    let kept: Vec<FeedItem> = items
        .into_iter()
        .filter(|item| match (item.created, cutoff) {
            (Some(created), Some(cutoff)) => created > cutoff,
            (Some(_), None) => true,
            (None, _) => false,
        })
        .collect();

    tracing::debug!(
        cutoff = ?cutoff,
        before = before,
        after = kept.len(),
        "Applied day filter"
    );
    kept
}
