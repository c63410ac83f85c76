//! Search quota probe
//!
//! The rate limit status endpoint reports, per resource, how many requests
//! remain in the current 15-minute window and when the window resets. Only
//! the `/search/tweets` entry matters to the relay.

use serde::Deserialize;

use crate::constants::{Endpoints, SEARCH_RESOURCE, SEARCH_RESOURCE_FAMILY};
use crate::error::{Error, Result, status_error};

/// Quota window for one resource.
///
/// `reset` is an absolute unix timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitWindow {
    pub limit: u32,
    pub remaining: u32,
    pub reset: u64,
}

/// Fetch the current search quota window for a bearer token.
pub async fn search_rate_limit(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    bearer_token: &str,
) -> Result<RateLimitWindow> {
    let response = client
        .get(&endpoints.rate_limit_status)
        .bearer_auth(bearer_token)
        .query(&[("resources", SEARCH_RESOURCE_FAMILY)])
        .send()
        .await
        .map_err(|e| Error::Http(format!("rate limit status request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(status_error(response).await);
    }

    let document = response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| Error::Decode(format!("rate limit status is not JSON: {e}")))?;
    parse_search_window(&document)
}

/// Extract the `/search/tweets` window from a rate limit status document.
pub fn parse_search_window(document: &serde_json::Value) -> Result<RateLimitWindow> {
    let entry = document
        .get("resources")
        .and_then(|r| r.get(SEARCH_RESOURCE_FAMILY))
        .and_then(|r| r.get(SEARCH_RESOURCE))
        .ok_or_else(|| {
            Error::Decode(format!(
                "rate limit status has no resources.{SEARCH_RESOURCE_FAMILY}[\"{SEARCH_RESOURCE}\"] entry"
            ))
        })?;
    RateLimitWindow::deserialize(entry)
        .map_err(|e| Error::Decode(format!("malformed search rate limit entry: {e}")))
}
