//! Error types for the polling core

use provider::ProviderError;

/// Errors that abort a polling run.
///
/// Recoverable upstream conditions never surface here; they are handled by
/// the state machine. What remains is fatal by policy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("upstream failure: {0}")]
    Upstream(#[from] ProviderError),

    #[error("sink {sink} failed: {message}")]
    Sink { sink: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("unexpected poll transition: {0}")]
    Transition(String),
}

/// Result alias for polling operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_wraps_provider_message() {
        let err: Error = ProviderError::Unclassified {
            status: 418,
            message: "teapot".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "upstream failure: unclassified upstream failure (418): teapot"
        );
    }

    #[test]
    fn sink_error_names_sink() {
        let err = Error::Sink {
            sink: "kafka".into(),
            message: "broker down".into(),
        };
        assert_eq!(err.to_string(), "sink kafka failed: broker down");
    }
}
