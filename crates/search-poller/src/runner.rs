//! Poll loop driver
//!
//! Executes the actions returned by `machine::handle_event`: pool passes,
//! queries, page processing and sleeps. One query is outstanding at a time and
//! every record is published before the next one is looked at.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use credential_pool::{Acquisition, Lease, Pool};
use provider::{PageResult, QuerySpec, SearchProvider};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cursor::{CursorTracker, Limits};
use crate::error::{Error, Result};
use crate::machine::{PollAction, PollEvent, PollState, RetryPolicy, Termination, handle_event};
use crate::metrics;
use crate::record::{FetchedRecord, record_id};
use crate::sink::RecordSink;

/// Minimum wall-clock time between progress log lines.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Per-run counters. Reset for every process run, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Records delivered to every sink
    pub captured: u64,
    /// Records dropped as invalid
    pub invalid: u64,
    /// Pages fetched and processed
    pub pages: u64,
    /// Transient failures seen across all episodes
    pub retries: u64,
    /// Credential re-acquisitions after a rate limit
    pub rotations: u64,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub counters: RunCounters,
    pub termination: Termination,
    /// Cursor position when the run stopped
    pub max_id: Option<u64>,
}

/// Counters plus throttled progress reporting for one run.
#[derive(Debug)]
struct RunContext {
    counters: RunCounters,
    progress_interval: Duration,
    last_progress: Instant,
}

impl RunContext {
    fn new(progress_interval: Duration) -> Self {
        Self {
            counters: RunCounters::default(),
            progress_interval,
            last_progress: Instant::now(),
        }
    }

    fn captured(&mut self) {
        self.counters.captured += 1;
        metrics::record_captured();
    }

    fn invalid(&mut self) {
        self.counters.invalid += 1;
        metrics::record_invalid();
    }

    fn page(&mut self) {
        self.counters.pages += 1;
        metrics::record_page();
    }

    fn rotation(&mut self) {
        self.counters.rotations += 1;
        metrics::record_rotation();
    }

    /// Log the captured count if the interval has elapsed. Returns whether it
    /// logged.
    fn report_progress(&mut self) -> bool {
        if self.last_progress.elapsed() <= self.progress_interval {
            return false;
        }
        info!(
            captured = self.counters.captured,
            "Captured {} record(s).",
            self.counters.captured
        );
        self.last_progress = Instant::now();
        true
    }
}

/// Sequential poller relaying one search to a set of sinks.
pub struct Poller {
    pool: Pool,
    provider: Arc<dyn SearchProvider>,
    query: QuerySpec,
    cursor: CursorTracker,
    sinks: Vec<Box<dyn RecordSink>>,
    policy: RetryPolicy,
    context: RunContext,
    lease: Option<Lease>,
    pending: Vec<Value>,
}

impl Poller {
    pub fn new(
        pool: Pool,
        provider: Arc<dyn SearchProvider>,
        query: QuerySpec,
        limits: Limits,
        sinks: Vec<Box<dyn RecordSink>>,
    ) -> Self {
        Self {
            pool,
            provider,
            query,
            cursor: CursorTracker::new(limits),
            sinks,
            policy: RetryPolicy::default(),
            context: RunContext::new(PROGRESS_INTERVAL),
            lease: None,
            pending: Vec::new(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.context.progress_interval = interval;
        self
    }

    pub fn counters(&self) -> RunCounters {
        self.context.counters
    }

    pub fn cursor(&self) -> &CursorTracker {
        &self.cursor
    }

    /// Run until the search is exhausted, a limit is reached, or the upstream
    /// fails in a way that ends the run.
    ///
    /// Sinks are flushed before returning a summary. Unclassified upstream
    /// failures and sink failures return `Err` without flushing.
    pub async fn run(&mut self) -> Result<RunSummary> {
        info!(
            provider = self.provider.id(),
            sinks = self.sinks.len(),
            credentials = self.pool.len(),
            "starting poll run"
        );

        let mut state = PollState::Initializing;
        let mut action = PollAction::AcquireCredential;

        loop {
            let event = match action {
                PollAction::AcquireCredential => self.acquire().await,
                PollAction::WaitForQuota { delay } => {
                    info!(
                        wait_secs = delay.as_secs(),
                        "0 requests left. Sleeping for {} seconds...",
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                    self.acquire().await
                }
                PollAction::Query => self.query().await?,
                PollAction::ProcessPage => self.process_page().await?,
                PollAction::ScheduleRetry { delay } => {
                    tokio::time::sleep(delay).await;
                    PollEvent::RetryTimer
                }
                PollAction::Stop => break,
                PollAction::None => {
                    return Err(Error::Transition(format!(
                        "no action available in state {state:?}"
                    )));
                }
            };

            let (next, next_action) = handle_event(state, event, &self.policy);
            self.report_transition(&next, &next_action);
            state = next;
            action = next_action;
        }

        let PollState::Terminal(termination) = state else {
            return Err(Error::Transition(format!(
                "stopped in non-terminal state {state:?}"
            )));
        };

        self.flush().await?;

        let counters = self.context.counters;
        info!(
            captured = counters.captured,
            invalid = counters.invalid,
            pages = counters.pages,
            rotations = counters.rotations,
            termination = %termination,
            "Total of {} captured record(s).",
            counters.captured
        );

        Ok(RunSummary {
            counters,
            termination,
            max_id: self.cursor.max_id(),
        })
    }

    /// Flush every sink.
    pub async fn flush(&mut self) -> Result<()> {
        for sink in self.sinks.iter_mut() {
            sink.flush().await?;
            debug!(sink = sink.name(), "sink flushed");
        }
        Ok(())
    }

    async fn acquire(&mut self) -> PollEvent {
        match self.pool.acquire().await {
            Acquisition::Ready(lease) => {
                if self.lease.is_some() {
                    self.context.rotation();
                }
                debug!(credential_id = %lease.credential_id, remaining = lease.remaining, "credential leased");
                self.lease = Some(lease);
                PollEvent::CredentialReady
            }
            Acquisition::Blocked { wait } => PollEvent::CredentialBlocked { wait },
        }
    }

    async fn query(&mut self) -> Result<PollEvent> {
        let Some(lease) = self.lease.as_ref() else {
            return Err(Error::Transition("query issued without a credential".into()));
        };
        let credential_id = lease.credential_id.clone();
        let request = self.cursor.request();
        debug!(
            credential_id = %credential_id,
            max_id = ?request.max_id,
            since_id = ?request.since_id,
            "querying page"
        );

        let outcome = self
            .provider
            .search(&lease.session, &self.query, request)
            .await?;

        let event = match outcome {
            PageResult::Page(records) => {
                let ids: BTreeSet<u64> = records.iter().filter_map(record_id).collect();
                if self.cursor.is_exhausted(&ids) {
                    info!(records = records.len(), "no new records, search exhausted");
                    PollEvent::Exhausted
                } else {
                    self.context.page();
                    debug!(records = records.len(), "page received");
                    self.pending = records;
                    PollEvent::PageReceived
                }
            }
            PageResult::RateLimited => {
                metrics::record_upstream_error("rate_limited");
                warn!(credential_id = %credential_id, "rate limited, rotating credentials");
                PollEvent::RateLimited
            }
            PageResult::TransientFailure(message) => {
                metrics::record_upstream_error("transient");
                self.context.counters.retries += 1;
                warn!(credential_id = %credential_id, error = %message, "transient upstream failure");
                PollEvent::TransientFailure(message)
            }
            PageResult::PermanentFailure(message) => {
                metrics::record_upstream_error("permanent");
                warn!(credential_id = %credential_id, error = %message, "permanent upstream failure");
                PollEvent::PermanentFailure(message)
            }
        };
        Ok(event)
    }

    /// Publish the pending page record by record, stopping at the first
    /// record that satisfies a stop condition. Records after it are dropped.
    async fn process_page(&mut self) -> Result<PollEvent> {
        let records = std::mem::take(&mut self.pending);
        let page_ids: BTreeSet<u64> = records.iter().filter_map(record_id).collect();
        let page_len = records.len();

        for (index, raw) in records.into_iter().enumerate() {
            if let Some(id) = record_id(&raw) {
                self.cursor.observe(id);
            }

            match FetchedRecord::from_value(raw) {
                Ok(record) => {
                    for sink in self.sinks.iter_mut() {
                        sink.publish(&record).await?;
                    }
                    self.context.captured();
                }
                Err(invalid) => {
                    error!(reason = invalid.reason, "Found invalid document: {}", invalid.raw);
                    self.context.invalid();
                }
            }

            self.context.report_progress();

            if let Some(hit) = self.cursor.limit_hit(self.context.counters.captured) {
                info!(
                    limit = hit.label(),
                    captured = self.context.counters.captured,
                    max_id = ?self.cursor.max_id(),
                    discarded = page_len - index - 1,
                    "stop condition reached"
                );
                return Ok(PollEvent::PageProcessed { terminal: true });
            }
        }

        self.cursor.advance(page_ids);
        Ok(PollEvent::PageProcessed { terminal: false })
    }

    fn report_transition(&self, state: &PollState, action: &PollAction) {
        match (state, action) {
            (PollState::TransientRetry { retries }, PollAction::ScheduleRetry { delay }) => {
                warn!(
                    retries,
                    max_retries = self.policy.max_retries,
                    "Sleeping for {} seconds...",
                    delay.as_secs()
                );
            }
            (PollState::Terminal(Termination::RetriesExhausted(message)), _) => {
                warn!(error = %message, "Reached maximum retries. Skipping...");
            }
            (PollState::Terminal(Termination::PermanentFailure(message)), _) => {
                warn!(error = %message, "permanent upstream failure. Skipping...");
            }
            _ => debug!(?state, ?action, "poll transition"),
        }
    }
}
