//! Pagination cursor and stop conditions
//!
//! The upstream returns records newest first. After each record the cursor's
//! `max_id` moves to one below that record's id, so the next query excludes
//! everything already seen. The tracker also remembers the previous page's id
//! set: an empty page, or a repeat of the previous page, means the search is
//! exhausted.

use std::collections::BTreeSet;

use provider::PageRequest;

/// Stop conditions for a run. `None` disables a condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    /// Stop once this many records were captured
    pub capture_limit: Option<u64>,
    /// Stop once the cursor has moved at or below this id
    pub max_id_limit: Option<u64>,
    /// Lower bound passed to the upstream; also stops the walk once reached
    pub since_id: Option<u64>,
}

impl Limits {
    /// Build limits from the CLI convention where 0 means "unset".
    pub fn from_raw(capture_limit: u64, max_id_limit: u64, since_id: u64) -> Self {
        let set = |v: u64| (v > 0).then_some(v);
        Self {
            capture_limit: set(capture_limit),
            max_id_limit: set(max_id_limit),
            since_id: set(since_id),
        }
    }
}

/// Which stop condition ended the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitHit {
    CaptureLimit,
    MaxIdLimit,
    SinceId,
}

impl LimitHit {
    pub fn label(&self) -> &'static str {
        match self {
            LimitHit::CaptureLimit => "capture_limit",
            LimitHit::MaxIdLimit => "max_id_limit",
            LimitHit::SinceId => "since_id",
        }
    }
}

/// Cursor state for one run.
#[derive(Debug, Clone)]
pub struct CursorTracker {
    max_id: Option<u64>,
    last_page_ids: BTreeSet<u64>,
    limits: Limits,
}

impl CursorTracker {
    pub fn new(limits: Limits) -> Self {
        Self {
            max_id: None,
            last_page_ids: BTreeSet::new(),
            limits,
        }
    }

    /// Current upper pagination bound; `None` before the first record.
    pub fn max_id(&self) -> Option<u64> {
        self.max_id
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Cursor position for the next query.
    pub fn request(&self) -> PageRequest {
        PageRequest {
            max_id: self.max_id,
            since_id: self.limits.since_id,
        }
    }

    /// True for an empty page or a page repeating the previous page's ids.
    pub fn is_exhausted(&self, page_ids: &BTreeSet<u64>) -> bool {
        page_ids.is_empty() || *page_ids == self.last_page_ids
    }

    /// Move the cursor below one record. Never moves it up.
    pub fn observe(&mut self, record_id: u64) {
        let next = record_id.saturating_sub(1);
        self.max_id = Some(self.max_id.map_or(next, |current| current.min(next)));
    }

    /// Close a fully processed page: cursor below the smallest id, and the id
    /// set remembered for duplicate detection.
    pub fn advance(&mut self, page_ids: BTreeSet<u64>) {
        if let Some(&min) = page_ids.first() {
            self.observe(min);
        }
        self.last_page_ids = page_ids;
    }

    /// First stop condition met for the given capture count, if any.
    pub fn limit_hit(&self, captured: u64) -> Option<LimitHit> {
        if self.limits.capture_limit.is_some_and(|limit| captured >= limit) {
            return Some(LimitHit::CaptureLimit);
        }
        let max_id = self.max_id?;
        if self.limits.max_id_limit.is_some_and(|floor| max_id <= floor) {
            return Some(LimitHit::MaxIdLimit);
        }
        if self.limits.since_id.is_some_and(|since| max_id <= since) {
            return Some(LimitHit::SinceId);
        }
        None
    }

    pub fn is_terminal(&self, captured: u64) -> bool {
        self.limit_hit(captured).is_some()
    }
}
