//! Common error types

use thiserror::Error;

/// Configuration and local I/O errors shared across crates
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a field validation failure.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let config_err = Error::Config("missing field".into());
        assert_eq!(config_err.to_string(), "Configuration error: missing field");

        let io_err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(
            io_err.to_string().starts_with("I/O error:"),
            "got: {}",
            io_err
        );
    }

    #[test]
    fn invalid_names_the_field() {
        let err = Error::invalid("count", "must be between 1 and 100, got 0");
        assert_eq!(
            err.to_string(),
            "Invalid value for count: must be between 1 and 100, got 0"
        );
        let debug = format!("{err:?}");
        assert!(debug.contains("Invalid"), "got: {debug}");
    }
}
