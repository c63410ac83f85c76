//! Provider abstraction for the paginated search upstream
//!
//! Defines the `SearchProvider` trait that decouples the polling core from the
//! upstream's transport. The provider authenticates a credential pair, probes
//! the remaining search quota, and issues one paginated query, reporting the
//! outcome as a structured `PageResult` so the core never inspects raw error
//! text.
//!
//! Outcome flow:
//! 1. `authenticate()` exchanges a credential pair for a `Session`
//! 2. `quota()` reports how many searches the session may still issue
//! 3. `search()` returns a page, or a classified failure
//! 4. Failures the provider cannot classify come back as `Err` and abort the run

pub mod query;

pub use query::{PageRequest, QuerySpec, TweetMode};

use std::future::Future;
use std::pin::Pin;

use common::Secret;

/// Classification of upstream errors to determine the recovery strategy.
///
/// - RateLimited rotates to another credential (or waits for a quota reset)
/// - Transient retries the same query after a fixed backoff
/// - Permanent ends the run gracefully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// 429, the credential's search quota is spent
    RateLimited,
    /// 500/503, retry the same cursor later
    Transient,
    /// 401/403/404, nothing to gain by retrying
    Permanent,
}

impl ErrorClassification {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorClassification::RateLimited => "rate_limited",
            ErrorClassification::Transient => "transient",
            ErrorClassification::Permanent => "permanent",
        }
    }
}

/// One application credential pair as configured.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub id: String,
    pub secret: Secret<String>,
}

impl ClientCredentials {
    pub fn new(id: impl Into<String>, secret: impl Into<Secret<String>>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }
}

/// An authenticated session bound to one credential.
#[derive(Debug, Clone)]
pub struct Session {
    pub credential_id: String,
    pub token: Secret<String>,
}

/// Search quota reported by the upstream for one session.
///
/// `reset_at` is an absolute unix timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: u64,
}

/// Outcome of a single paginated query.
#[derive(Debug, Clone, PartialEq)]
pub enum PageResult {
    /// Records in upstream order (newest first). May be empty.
    Page(Vec<serde_json::Value>),
    RateLimited,
    TransientFailure(String),
    PermanentFailure(String),
}

impl PageResult {
    /// Build the failure outcome for a classified upstream error.
    pub fn from_classification(classification: ErrorClassification, message: String) -> Self {
        match classification {
            ErrorClassification::RateLimited => PageResult::RateLimited,
            ErrorClassification::Transient => PageResult::TransientFailure(message),
            ErrorClassification::Permanent => PageResult::PermanentFailure(message),
        }
    }
}

/// Errors from provider operations.
///
/// `search()` only returns these for failures it could not classify; the
/// polling core treats them as fatal.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("invalid upstream response: {0}")]
    Decode(String),

    #[error("unclassified upstream failure ({status}): {message}")]
    Unclassified { status: u16, message: String },
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Boxed future returned by provider methods.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Abstraction over the paginated search upstream.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn SearchProvider>`). Sessions are not designed for concurrent reuse;
/// callers issue one request at a time.
pub trait SearchProvider: Send + Sync {
    /// Identifier for logging (e.g. "twitter")
    fn id(&self) -> &str;

    /// Exchange a credential pair for an authenticated session.
    fn authenticate<'a>(&'a self, credentials: &'a ClientCredentials) -> ProviderFuture<'a, Session>;

    /// Probe the remaining search quota for a session.
    fn quota<'a>(&'a self, session: &'a Session) -> ProviderFuture<'a, QuotaStatus>;

    /// Issue one paginated query at the given cursor position.
    fn search<'a>(
        &'a self,
        session: &'a Session,
        query: &'a QuerySpec,
        page: PageRequest,
    ) -> ProviderFuture<'a, PageResult>;
}
