//! Polling core for the search relay
//!
//! Drives a paginated search upstream from the newest matching record
//! backwards, relaying each valid record to one or more sinks. The core owns
//! the pagination cursor and the run counters; credentials come from a
//! `credential_pool::Pool` and queries go through a `provider::SearchProvider`.
//!
//! Loop outline:
//! 1. Acquire a credential with quota (wait for a reset if all are spent)
//! 2. Query one page at the cursor
//! 3. Publish each valid record, checking stop conditions after every record
//! 4. Move the cursor below the page and repeat until exhausted or limited
//!
//! Failure handling is a pure state machine (`machine`) executed by the
//! `runner`: rate limits rotate credentials, transient failures back off and
//! retry a bounded number of times, permanent failures end the run, and
//! unclassified failures propagate as errors.

pub mod cursor;
pub mod error;
pub mod machine;
pub mod metrics;
pub mod record;
pub mod runner;
pub mod sink;

pub use cursor::{CursorTracker, LimitHit, Limits};
pub use error::{Error, Result};
pub use machine::{PollAction, PollEvent, PollState, RetryPolicy, Termination, handle_event};
pub use record::{Envelope, FetchedRecord, InvalidRecord, record_id};
pub use runner::{Poller, RunCounters, RunSummary};
pub use sink::{JsonLinesSink, RecordSink, SinkFuture};
