//! HTTP clients for the external lookup providers.
//!
//! Each client owns its `reqwest::Client` (timeout, user agent and, for
//! YouTube, the optional API key) and is constructed explicitly from settings.

mod html;
pub mod web;
pub mod youtube;

pub use web::{SearchClient, SearchHit};
pub use youtube::{VideoHit, YouTubeClient};

use crate::error::{MarqueeError, Result};
use reqwest::StatusCode;
use std::time::Duration;

/// Build an HTTP client with the given user agent and timeout.
pub(crate) fn http_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| MarqueeError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Map throttling and other non-2xx responses to errors.
pub(crate) fn check_status(service: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(MarqueeError::RateLimit(service.to_string()));
    }
    if !status.is_success() {
        return Err(MarqueeError::UnexpectedStatus {
            service: service.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// Reject empty queries and zero result counts before any request is made.
pub(crate) fn validate_query(tool: &str, query: &str, max_results: usize) -> Result<()> {
    if query.trim().is_empty() {
        return Err(MarqueeError::invalid_arguments(tool, "query must not be empty"));
    }
    if max_results == 0 {
        return Err(MarqueeError::invalid_arguments(
            tool,
            "num_results must be a positive integer",
        ));
    }
    Ok(())
}
