use futures::stream::{self, StreamExt};
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Errors that can occur while fetching one feed.
///
/// None of these reach the HTTP caller: a failed source simply contributes
/// no items to the merged feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, body read, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request plus body read exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Tuning for [`fetch_all`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum number of fetches in flight at once.
    pub workers: usize,
    /// Timeout covering the request and the full body read.
    pub timeout: Duration,
    pub max_body_size: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            workers: 20,
            timeout: Duration::from_secs(5),
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// The fetched body of one feed source, or why it could not be fetched.
#[derive(Debug)]
pub struct RawFeed {
    pub source: Url,
    pub body: Result<Vec<u8>, FetchError>,
}

impl RawFeed {
    pub fn is_ok(&self) -> bool {
        self.body.is_ok()
    }
}

/// Fetches every source with at most `options.workers` requests in flight.
///
/// # Returns
///
/// Exactly one [`RawFeed`] per input source, in input order. A source that
/// fails (network error, timeout, non-2xx status, oversized or truncated body)
/// yields an `Err` body instead of aborting the others.
///
/// # Behavior
///
/// - Workers beyond the number of sources stay idle
/// - A worker that finishes picks up the next source immediately, even while
///   an earlier source is still in flight
/// - No retries: a failed fetch is final for this call
/// - Each fetch is independently bounded by `options.timeout`
pub async fn fetch_all(
    client: &reqwest::Client,
    sources: Vec<Url>,
    options: &FetchOptions,
) -> Vec<RawFeed> {
    if sources.is_empty() {
        return Vec::new();
    }

    let total = sources.len();
    let started = Instant::now();

    let mut indexed: Vec<(usize, RawFeed)> = stream::iter(sources.into_iter().enumerate())
        .map(|(index, source)| async move {
            let body = fetch_one(client, &source, options).await;
            if let Err(e) = &body {
                tracing::warn!(feed = %source, error = %e, "Feed fetch failed, treating as empty");
            }
            (index, RawFeed { source, body })
        })
        .buffer_unordered(options.workers.max(1))
        .collect()
        .await;

    // Completion order is arbitrary; restore input order
    indexed.sort_unstable_by_key(|(index, _)| *index);
    let results: Vec<RawFeed> = indexed.into_iter().map(|(_, feed)| feed).collect();

    let failed = results.iter().filter(|r| !r.is_ok()).count();
    tracing::debug!(
        total = total,
        failed = failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Fetched feeds"
    );

    results
}

/// Fetches a single source, bounding the whole exchange by `options.timeout`.
pub async fn fetch_one(
    client: &reqwest::Client,
    source: &Url,
    options: &FetchOptions,
) -> Result<Vec<u8>, FetchError> {
    tokio::time::timeout(options.timeout, async {
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
    .map_err(|_| FetchError::Timeout)?
}

/// Reads a response body, failing once it grows past `limit` bytes.
pub(crate) async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><guid>1</guid><title>Test</title></item>
</channel></rss>"#;

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    fn quick_options() -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_millis(500),
            ..FetchOptions::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let body = fetch_one(&client, &url(&mock_server, "/feed"), &quick_options())
            .await
            .unwrap();
        assert_eq!(body, VALID_RSS.as_bytes());
    }

    #[tokio::test]
    async fn test_fetch_404_is_status_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        match fetch_one(&client, &url(&mock_server, "/feed"), &quick_options()).await {
            Err(FetchError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_500_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = fetch_one(&client, &url(&mock_server, "/feed"), &quick_options()).await;
        assert!(matches!(result, Err(FetchError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let options = FetchOptions {
            timeout: Duration::from_millis(100),
            ..FetchOptions::default()
        };
        let result = fetch_one(&client, &url(&mock_server, "/feed"), &options).await;
        assert!(matches!(result, Err(FetchError::Timeout)));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let options = FetchOptions {
            max_body_size: 1024,
            ..quick_options()
        };
        let result = fetch_one(&client, &url(&mock_server, "/feed"), &options).await;
        assert!(matches!(result, Err(FetchError::ResponseTooLarge)));
    }

    #[tokio::test]
    async fn test_fetch_all_empty_input() {
        let client = reqwest::Client::new();
        let results = fetch_all(&client, Vec::new(), &FetchOptions::default()).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_count_and_order_with_failures() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&mock_server)
            .await;

        // Connection refused: nothing listens on the discard port
        let unreachable = Url::parse("http://127.0.0.1:9/feed").unwrap();
        let sources = vec![
            url(&mock_server, "/gone"),
            url(&mock_server, "/ok"),
            unreachable.clone(),
            url(&mock_server, "/ok"),
        ];

        let client = reqwest::Client::new();
        let results = fetch_all(&client, sources.clone(), &quick_options()).await;

        assert_eq!(results.len(), sources.len());
        let returned: Vec<&Url> = results.iter().map(|r| &r.source).collect();
        assert_eq!(returned, sources.iter().collect::<Vec<_>>());
        assert!(!results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(!results[2].is_ok());
        assert!(results[3].is_ok());
    }

    #[tokio::test]
    async fn test_fetch_all_with_more_sources_than_workers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .expect(7)
            .mount(&mock_server)
            .await;

        let sources: Vec<Url> = (0..7)
            .map(|i| url(&mock_server, &format!("/feed/{i}")))
            .collect();
        let options = FetchOptions {
            workers: 2,
            ..quick_options()
        };

        let client = reqwest::Client::new();
        let results = fetch_all(&client, sources, &options).await;
        assert_eq!(results.len(), 7);
        assert!(results.iter().all(RawFeed::is_ok));
    }

    #[tokio::test]
    async fn test_fast_sources_do_not_wait_behind_slow_one() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .set_delay(Duration::from_secs(1)),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fast"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let sources = vec![
            url(&mock_server, "/slow"),
            url(&mock_server, "/fast"),
            url(&mock_server, "/slow"),
            url(&mock_server, "/fast"),
        ];
        let options = FetchOptions {
            workers: 2,
            timeout: Duration::from_secs(5),
            ..FetchOptions::default()
        };

        let client = reqwest::Client::new();
        let started = Instant::now();
        let results = fetch_all(&client, sources.clone(), &options).await;
        let elapsed = started.elapsed();

        // Both slow sources run side by side; a worker freed by a fast source
        // must not idle until the first slow one completes
        assert!(elapsed < Duration::from_millis(1500), "fetch took {elapsed:?}");
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(RawFeed::is_ok));
        let returned: Vec<&Url> = results.iter().map(|r| &r.source).collect();
        assert_eq!(returned, sources.iter().collect::<Vec<_>>());
    }

    /// Serves one response that announces more bytes than it sends, then hangs up.
    async fn truncated_server() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n<rss>")
                    .await;
                let _ = socket.shutdown().await;
            }
        });
        Url::parse(&format!("http://{addr}/feed")).unwrap()
    }

    #[tokio::test]
    async fn test_truncated_body_is_error() {
        let client = reqwest::Client::new();
        let result = fetch_one(&client, &truncated_server().await, &quick_options()).await;
        assert!(
            matches!(
                result,
                Err(FetchError::Network(_)) | Err(FetchError::IncompleteResponse { .. })
            ),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_slot_for_truncated_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let sources = vec![
            url(&mock_server, "/ok"),
            truncated_server().await,
            url(&mock_server, "/ok"),
        ];

        let client = reqwest::Client::new();
        let results = fetch_all(&client, sources, &quick_options()).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(!results[1].is_ok());
        assert!(results[2].is_ok());
    }
}
