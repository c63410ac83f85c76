//! Error types for Twitter API calls

/// Errors from Twitter API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Non-success response. `body` carries the upstream error document.
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl Error {
    /// HTTP status of the failed response, if the upstream answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for Twitter API calls.
pub type Result<T> = std::result::Result<T, Error>;

/// Read a failed response into `Error::Status`.
pub(crate) async fn status_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    Error::Status { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_exposed_only_for_status_errors() {
        let err = Error::Status {
            status: 503,
            body: "over capacity".into(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "upstream returned 503: over capacity");
        assert_eq!(Error::Http("reset".into()).status(), None);
    }
}
