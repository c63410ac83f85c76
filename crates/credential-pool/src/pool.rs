//! Credential state and first-available selection
//!
//! The pool owns one `CredentialState` per configured pair. Selection walks the
//! pairs in configured order on every pass: the first credential whose probe
//! reports remaining quota wins. Probing is sequential; sessions are never
//! shared between concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use provider::{ClientCredentials, SearchProvider, Session};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::quota::{seconds_until_reset, unix_now};

/// Longest wait between acquisition passes, and the wait applied when no
/// probe in a pass reported a reset time: the upstream's 15-minute quota window.
pub const DEFAULT_QUOTA_WINDOW: Duration = Duration::from_secs(900);

/// Quota status of a credential as of its last probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    /// Remaining quota > 0
    Available,
    /// Quota spent until `quota_reset_at`
    Exhausted,
    /// Never probed successfully, or the last probe failed
    Unknown,
}

impl CredentialStatus {
    /// Status label for health/logging.
    pub fn label(&self) -> &'static str {
        match self {
            CredentialStatus::Available => "available",
            CredentialStatus::Exhausted => "exhausted",
            CredentialStatus::Unknown => "unknown",
        }
    }
}

/// One configured credential and its last observed quota.
#[derive(Debug)]
struct CredentialState {
    credentials: ClientCredentials,
    remaining_quota: Option<u32>,
    quota_reset_at: Option<u64>,
}

impl CredentialState {
    fn status(&self) -> CredentialStatus {
        match self.remaining_quota {
            Some(0) => CredentialStatus::Exhausted,
            Some(_) => CredentialStatus::Available,
            None => CredentialStatus::Unknown,
        }
    }
}

/// An authenticated credential with quota left, ready for queries.
#[derive(Debug, Clone)]
pub struct Lease {
    pub credential_id: String,
    pub session: Session,
    pub remaining: u32,
}

/// Outcome of one acquisition pass.
#[derive(Debug)]
pub enum Acquisition {
    Ready(Lease),
    /// Every credential is spent; sleep `wait` and try again.
    Blocked { wait: Duration },
}

/// Pool of application credentials for one upstream provider.
pub struct Pool {
    credentials: Vec<CredentialState>,
    provider: Arc<dyn SearchProvider>,
    default_wait: Duration,
}

impl Pool {
    /// Create a pool over the given credential pairs, kept in order.
    ///
    /// Returns `NoCredentials` for an empty list.
    pub fn new(credentials: Vec<ClientCredentials>, provider: Arc<dyn SearchProvider>) -> Result<Self> {
        if credentials.is_empty() {
            return Err(Error::NoCredentials);
        }
        info!(
            credentials = credentials.len(),
            provider = provider.id(),
            "credential pool initialized"
        );
        Ok(Self {
            credentials: credentials
                .into_iter()
                .map(|credentials| CredentialState {
                    credentials,
                    remaining_quota: None,
                    quota_reset_at: None,
                })
                .collect(),
            provider,
            default_wait: DEFAULT_QUOTA_WINDOW,
        })
    }

    /// Override the default (and longest) wait between passes.
    pub fn with_default_wait(mut self, wait: Duration) -> Self {
        self.default_wait = wait;
        self
    }

    /// Number of configured credentials.
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Run one acquisition pass against the wall clock.
    pub async fn acquire(&mut self) -> Acquisition {
        self.acquire_at(unix_now()).await
    }

    /// Run one acquisition pass, computing reset waits relative to `now`
    /// (unix seconds).
    ///
    /// Authenticates and probes each credential in order and returns the first
    /// with remaining quota. Probe failures are logged and the credential is
    /// skipped for this pass. If nothing is available, returns `Blocked` with
    /// the smallest `reset_at - now + 1` seen in this pass, capped at the
    /// default wait. The default wait also applies when no probe succeeded.
    pub async fn acquire_at(&mut self, now: u64) -> Acquisition {
        let provider = Arc::clone(&self.provider);
        let mut wait = self.default_wait;

        for state in self.credentials.iter_mut() {
            let id = state.credentials.id.clone();

            let session = match provider.authenticate(&state.credentials).await {
                Ok(session) => session,
                Err(e) => {
                    warn!(credential_id = %id, error = %e, "authentication failed, skipping credential");
                    state.remaining_quota = None;
                    continue;
                }
            };

            let quota = match provider.quota(&session).await {
                Ok(quota) => quota,
                Err(e) => {
                    warn!(credential_id = %id, error = %e, "quota probe failed, skipping credential");
                    state.remaining_quota = None;
                    continue;
                }
            };

            state.remaining_quota = Some(quota.remaining);
            state.quota_reset_at = Some(quota.reset_at);

            if quota.remaining > 0 {
                info!(
                    credential_id = %id,
                    remaining = quota.remaining,
                    limit = quota.limit,
                    "authenticated, {} remaining requests",
                    quota.remaining
                );
                return Acquisition::Ready(Lease {
                    credential_id: id,
                    session,
                    remaining: quota.remaining,
                });
            }

            let reset_in = seconds_until_reset(quota.reset_at, now);
            debug!(credential_id = %id, reset_in_secs = reset_in, "credential quota exhausted");
            wait = wait.min(Duration::from_secs(reset_in));
        }

        debug!(pool = %self.health(), "no credential with remaining quota");
        Acquisition::Blocked { wait }
    }

    /// Status of a credential by id, as of its last probe.
    pub fn status(&self, credential_id: &str) -> Option<CredentialStatus> {
        self.credentials
            .iter()
            .find(|state| state.credentials.id == credential_id)
            .map(CredentialState::status)
    }

    /// Pool snapshot for logging.
    ///
    /// Status mapping: all available → healthy, some available → degraded,
    /// none available → exhausted.
    pub fn health(&self) -> serde_json::Value {
        let mut available = 0usize;
        let credentials: Vec<serde_json::Value> = self
            .credentials
            .iter()
            .map(|state| {
                let status = state.status();
                if status == CredentialStatus::Available {
                    available += 1;
                }
                serde_json::json!({
                    "id": state.credentials.id,
                    "status": status.label(),
                    "remaining": state.remaining_quota,
                    "reset_at": state.quota_reset_at,
                })
            })
            .collect();

        let total = self.credentials.len();
        let pool_status = if available == total && total > 0 {
            "healthy"
        } else if available > 0 {
            "degraded"
        } else {
            "exhausted"
        };

        serde_json::json!({
            "status": pool_status,
            "credentials_total": total,
            "credentials_available": available,
            "credentials": credentials,
        })
    }
}
