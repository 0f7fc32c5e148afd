//! HTTP surface: one merge endpoint plus a health check.

mod error;
mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use reqwest::redirect::Policy;

use crate::config::Config;
use crate::util::{check_url, HostPolicy};

pub use error::{ApiError, ApiResult};
pub use handlers::{run_merge, MergeQuery, RSS_CONTENT_TYPE};

/// Shared per-process state. Cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the outbound HTTP client from the configuration.
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(create_redirect_policy(config.host_policy()))
            .build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }
}

/// Maximum redirect hops followed for a list or feed fetch.
const MAX_REDIRECTS: usize = 5;

/// Redirect policy applying the host policy to every hop.
///
/// - Limits redirects to [`MAX_REDIRECTS`] hops
/// - Detects redirect loops (same URL appearing twice in chain)
/// - Rejects targets that `check_url` rejects under `host_policy`
fn create_redirect_policy(host_policy: HostPolicy) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error(format!("Too many redirects (max {MAX_REDIRECTS})"));
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        if let Err(e) = check_url(url, host_policy) {
            tracing::warn!(to = %url, error = %e, "Refusing redirect");
            return attempt.error(e);
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::merge_feeds))
        .route("/health", get(handlers::health))
        .with_state(state)
}
