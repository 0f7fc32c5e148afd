use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::fetcher::{read_limited_bytes, FetchError};
use super::opml::{looks_like_opml, parse_opml, OpmlError};
use crate::util::{check_url, validate_url, HostPolicy};

/// Errors that abort a request before any feed is fetched.
#[derive(Debug, Error)]
pub enum ListError {
    /// The list URL itself is not allowed under the host policy.
    #[error("invalid list URL: {0}")]
    InvalidUrl(String),
    /// Fetching the list failed (network, status, timeout, size).
    #[error("failed to fetch feed list: {0}")]
    Fetch(#[from] FetchError),
    /// The list body is not valid UTF-8.
    #[error("feed list is not valid UTF-8")]
    Encoding,
    /// The list looked like OPML but could not be parsed.
    #[error("failed to parse feed list: {0}")]
    Opml(#[from] OpmlError),
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub timeout: Duration,
    pub max_body_size: usize,
    pub host_policy: HostPolicy,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_body_size: 10 * 1024 * 1024,
            host_policy: HostPolicy::PublicOnly,
        }
    }
}

/// Resolves `source` into the ordered list of feed URLs to merge.
///
/// The document behind `source` is either OPML (every `xmlUrl` outline) or a
/// plain-text list with one URL per line, where blank lines and lines
/// starting with `#` are ignored. Invalid entries are skipped; duplicates
/// keep their first position.
///
/// # Errors
///
/// Returns [`ListError`] if the list URL is disallowed, the fetch fails
/// for any reason, or an OPML document is malformed.
pub async fn resolve_feed_list(
    client: &reqwest::Client,
    source: &Url,
    options: &ResolveOptions,
) -> Result<Vec<Url>, ListError> {
    check_url(source, options.host_policy)
        .map_err(|e| ListError::InvalidUrl(e.to_string()))?;

    let bytes = tokio::time::timeout(options.timeout, async {
        let response = client
            .get(source.clone())
            .send()
            .await
            .map_err(FetchError::Network)?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }
        read_limited_bytes(response, options.max_body_size).await
    })
    .await
    .map_err(|_| FetchError::Timeout)??;

    let text = String::from_utf8(bytes).map_err(|_| ListError::Encoding)?;
    let urls = parse_feed_list(&text, options.host_policy)?;

    tracing::debug!(source = %source, feeds = urls.len(), "Resolved feed list");
    Ok(urls)
}

/// Parses the body of a feed list. See [`resolve_feed_list`] for the formats.
pub fn parse_feed_list(content: &str, policy: HostPolicy) -> Result<Vec<Url>, ListError> {
    let urls = if looks_like_opml(content) {
        parse_opml(content, policy)?
    } else {
        parse_plain_list(content, policy)
    };
    Ok(dedup(urls))
}

fn parse_plain_list(content: &str, policy: HostPolicy) -> Vec<Url> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match validate_url(line, policy) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(url = %line, error = %e, "Skipping invalid feed URL");
                None
            }
        })
        .collect()
}

fn dedup(urls: Vec<Url>) -> Vec<Url> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.as_str().to_owned()))
        .collect()
}
