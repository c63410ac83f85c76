//! Polling state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! The runner executes the I/O implied by each action and feeds the outcome
//! back as the next event.
//!
//! ```text
//! Initializing ──CredentialReady──▶ Fetching ──PageReceived──▶ Processing
//!                                    │  ▲                          │
//!                         RateLimited│  │CredentialReady           │PageProcessed
//!                                    ▼  │                          ▼
//!                            RateLimitRecovery            Fetching | Terminal
//!
//! Fetching ──TransientFailure──▶ TransientRetry ──RetryTimer──▶ Fetching
//! Fetching ──Exhausted | PermanentFailure | retries spent──▶ Terminal
//! ```

use std::fmt;
use std::time::Duration;

/// Default cap on consecutive transient failures in one episode.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default fixed backoff between transient retries.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(60);

/// Transient-failure retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failures allowed per episode; the failure that reaches this count ends the run
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Why a run ended. None of these is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Empty page, or the same page twice
    Exhausted,
    /// Capture limit or cursor bound reached
    LimitReached,
    /// Transient failures used up the episode budget
    RetriesExhausted(String),
    /// 401/403/404 from the upstream
    PermanentFailure(String),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted => f.write_str("exhausted"),
            Termination::LimitReached => f.write_str("limit reached"),
            Termination::RetriesExhausted(msg) => write!(f, "retries exhausted: {msg}"),
            Termination::PermanentFailure(msg) => write!(f, "permanent failure: {msg}"),
        }
    }
}

/// Poller states.
///
/// `retries` counts consecutive transient failures in the current episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// No credential yet
    Initializing,
    /// Ready to issue a query at the current cursor
    Fetching { retries: u32 },
    /// Publishing the records of a fetched page
    Processing,
    /// Re-acquiring a credential after a rate limit; cursor unchanged
    RateLimitRecovery { retries: u32 },
    /// Sleeping before retrying the same cursor
    TransientRetry { retries: u32 },
    /// Run finished
    Terminal(Termination),
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Terminal(_))
    }
}

/// Events that drive state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// The pool returned a credential with quota
    CredentialReady,
    /// Every credential is spent
    CredentialBlocked { wait: Duration },
    /// A non-empty, previously unseen page was fetched
    PageReceived,
    /// Empty or repeated page
    Exhausted,
    RateLimited,
    TransientFailure(String),
    PermanentFailure(String),
    /// Page processing finished; `terminal` when a stop condition fired
    PageProcessed { terminal: bool },
    /// Backoff expired
    RetryTimer,
}

/// Actions the runner should execute after a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAction {
    /// Run a credential pool pass
    AcquireCredential,
    /// Sleep until a quota resets, then run another pool pass
    WaitForQuota { delay: Duration },
    /// Query one page at the current cursor
    Query,
    /// Publish the fetched page
    ProcessPage,
    /// Sleep, then deliver `RetryTimer`
    ScheduleRetry { delay: Duration },
    /// Stop the run
    Stop,
    /// No-op
    None,
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(
    state: PollState,
    event: PollEvent,
    policy: &RetryPolicy,
) -> (PollState, PollAction) {
    match (state, event) {
        // --- Credential acquisition ---
        (PollState::Initializing, PollEvent::CredentialReady) => {
            (PollState::Fetching { retries: 0 }, PollAction::Query)
        }
        (PollState::RateLimitRecovery { retries }, PollEvent::CredentialReady) => {
            (PollState::Fetching { retries }, PollAction::Query)
        }
        (
            state @ (PollState::Initializing | PollState::RateLimitRecovery { .. }),
            PollEvent::CredentialBlocked { wait },
        ) => (state, PollAction::WaitForQuota { delay: wait }),

        // --- Fetching ---
        (PollState::Fetching { .. }, PollEvent::PageReceived) => {
            (PollState::Processing, PollAction::ProcessPage)
        }
        (PollState::Fetching { .. }, PollEvent::Exhausted) => {
            (PollState::Terminal(Termination::Exhausted), PollAction::Stop)
        }
        (PollState::Fetching { retries }, PollEvent::RateLimited) => (
            PollState::RateLimitRecovery { retries },
            PollAction::AcquireCredential,
        ),
        (PollState::Fetching { retries }, PollEvent::TransientFailure(message)) => {
            let retries = retries + 1;
            if retries < policy.max_retries {
                (
                    PollState::TransientRetry { retries },
                    PollAction::ScheduleRetry {
                        delay: policy.backoff,
                    },
                )
            } else {
                // Budget spent: the counter resets with the episode, which ends here
                (
                    PollState::Terminal(Termination::RetriesExhausted(message)),
                    PollAction::Stop,
                )
            }
        }
        (PollState::Fetching { .. }, PollEvent::PermanentFailure(message)) => (
            PollState::Terminal(Termination::PermanentFailure(message)),
            PollAction::Stop,
        ),

        // --- Processing ---
        (PollState::Processing, PollEvent::PageProcessed { terminal: false }) => {
            (PollState::Fetching { retries: 0 }, PollAction::Query)
        }
        (PollState::Processing, PollEvent::PageProcessed { terminal: true }) => {
            (PollState::Terminal(Termination::LimitReached), PollAction::Stop)
        }

        // --- Transient retry ---
        (PollState::TransientRetry { retries }, PollEvent::RetryTimer) => {
            (PollState::Fetching { retries }, PollAction::Query)
        }

        // --- Invalid/unhandled transition: stay in current state ---
        (state, _event) => (state, PollAction::None),
    }
}
