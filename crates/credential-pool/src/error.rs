//! Error types for pool operations

/// Errors from pool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no credentials configured: at least one client id/secret pair is required")]
    NoCredentials,
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
