use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use url::Url;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::feed::{
    fetch_all, filter_recent, merge, render_rss, resolve_feed_list, MergeMode, MergedFeed,
};
use crate::util::check_url;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// Query parameters of a merge request.
///
/// `day` and `concat` are presence flags: `?day`, `?day=` and `?day=1` all
/// enable the filter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeQuery {
    /// First `source` value, if any.
    pub source: Option<String>,
    pub day: bool,
    pub concat: bool,
}

impl MergeQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut query = MergeQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "source" if query.source.is_none() => query.source = Some(value.clone()),
                "day" => query.day = true,
                "concat" => query.concat = true,
                _ => {}
            }
        }
        query
    }

    pub fn mode(&self) -> MergeMode {
        if self.concat {
            MergeMode::Concat
        } else {
            MergeMode::Merge
        }
    }
}

/// `GET /` - resolve `source`, fetch all feeds, merge and return RSS.
pub async fn merge_feeds(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<impl IntoResponse> {
    let query = MergeQuery::from_pairs(&pairs);
    let merged = run_merge(&state, &query).await?;
    let body = render_rss(&merged)?;
    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], body))
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// Runs the pipeline for one request, up to but excluding serialization.
pub async fn run_merge(state: &AppState, query: &MergeQuery) -> ApiResult<MergedFeed> {
    let source = query.source.as_deref().ok_or(ApiError::MissingSource)?;
    let source_url = parse_source(source, state)?;

    let resolve_options = state.config.resolve_options();
    let feed_urls = resolve_feed_list(&state.client, &source_url, &resolve_options).await?;

    tracing::info!(
        source = %source_url,
        feeds = feed_urls.len(),
        day = query.day,
        concat = query.concat,
        "Merging feeds"
    );

    let raw = fetch_all(&state.client, feed_urls, &state.config.fetch_options()).await;

    // The envelope link echoes `source` exactly as the caller sent it
    let mut merged = merge(&raw, query.mode(), &state.config.envelope(), source);
    merged.items = filter_recent(merged.items, query.day, state.config.day_window());

    Ok(merged)
}

fn parse_source(source: &str, state: &AppState) -> ApiResult<Url> {
    let url = Url::parse(source.trim()).map_err(|e| ApiError::InvalidSource(e.to_string()))?;
    check_url(&url, state.config.host_policy())
        .map_err(|e| ApiError::InvalidSource(e.to_string()))?;
    Ok(url)
}
