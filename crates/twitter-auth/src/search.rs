//! Standard search request

use crate::constants::Endpoints;
use crate::error::{Error, Result, status_error};

/// Parameters for one search page. Absent values are omitted from the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams<'a> {
    pub q: Option<&'a str>,
    pub tweet_mode: &'a str,
    pub count: u32,
    pub lang: Option<&'a str>,
    pub max_id: Option<u64>,
    pub since_id: Option<u64>,
    pub geocode: Option<&'a str>,
}

impl SearchParams<'_> {
    /// Query string pairs in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(7);
        if let Some(q) = self.q {
            pairs.push(("q", q.to_string()));
        }
        if !self.tweet_mode.is_empty() {
            pairs.push(("tweet_mode", self.tweet_mode.to_string()));
        }
        pairs.push(("count", self.count.to_string()));
        if let Some(lang) = self.lang {
            pairs.push(("lang", lang.to_string()));
        }
        if let Some(max_id) = self.max_id {
            pairs.push(("max_id", max_id.to_string()));
        }
        if let Some(since_id) = self.since_id {
            pairs.push(("since_id", since_id.to_string()));
        }
        if let Some(geocode) = self.geocode {
            pairs.push(("geocode", geocode.to_string()));
        }
        pairs
    }
}

/// Fetch one page of statuses, newest first.
///
/// Non-success responses come back as `Error::Status` with the upstream body
/// so the caller can classify them.
pub async fn search_tweets(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    bearer_token: &str,
    params: &SearchParams<'_>,
) -> Result<Vec<serde_json::Value>> {
    let response = client
        .get(&endpoints.search)
        .bearer_auth(bearer_token)
        .query(&params.query_pairs())
        .send()
        .await
        .map_err(|e| Error::Http(format!("search request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(status_error(response).await);
    }

    let mut document = response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| Error::Decode(format!("search response is not JSON: {e}")))?;

    match document.get_mut("statuses").map(serde_json::Value::take) {
        Some(serde_json::Value::Array(statuses)) => Ok(statuses),
        Some(other) => Err(Error::Decode(format!(
            "search response 'statuses' is not an array: {other}"
        ))),
        None => Err(Error::Decode(
            "search response has no 'statuses' field".into(),
        )),
    }
}
