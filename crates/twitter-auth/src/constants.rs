//! Twitter API endpoint configuration
//!
//! Paths are relative to the API host so tests and alternate deployments can
//! point the client at a different base URL.

/// Public API host
pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

/// Application-only bearer token endpoint
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Rate limit status endpoint
pub const RATE_LIMIT_STATUS_PATH: &str = "/1.1/application/rate_limit_status.json";

/// Standard search endpoint
pub const SEARCH_PATH: &str = "/1.1/search/tweets.json";

/// Resource family queried on the rate limit endpoint
pub const SEARCH_RESOURCE_FAMILY: &str = "search";

/// Key of the search endpoint inside the rate limit status document
pub const SEARCH_RESOURCE: &str = "/search/tweets";

/// Fully qualified endpoint URLs for one API host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub token: String,
    pub rate_limit_status: String,
    pub search: String,
}

impl Endpoints {
    /// Build endpoint URLs under the given base URL (trailing slash ignored).
    pub fn with_base(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            token: format!("{base}{TOKEN_PATH}"),
            rate_limit_status: format!("{base}{RATE_LIMIT_STATUS_PATH}"),
            search: format!("{base}{SEARCH_PATH}"),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::with_base(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoints_use_public_host() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.token, "https://api.twitter.com/oauth2/token");
        assert_eq!(
            endpoints.rate_limit_status,
            "https://api.twitter.com/1.1/application/rate_limit_status.json"
        );
        assert_eq!(
            endpoints.search,
            "https://api.twitter.com/1.1/search/tweets.json"
        );
    }

    #[test]
    fn with_base_strips_trailing_slash() {
        let endpoints = Endpoints::with_base("http://127.0.0.1:9000/");
        assert_eq!(endpoints.token, "http://127.0.0.1:9000/oauth2/token");
    }
}
