//! Fetched records and the envelope published downstream

use serde::Serialize;
use serde_json::Value;

/// Base URL for record permalinks.
const PERMALINK_BASE: &str = "https://twitter.com";

/// Numeric id of a raw record, if present and non-zero.
pub fn record_id(raw: &Value) -> Option<u64> {
    raw.get("id").and_then(Value::as_u64).filter(|id| *id > 0)
}

/// A raw upstream record that carries every field the relay relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRecord {
    pub record_id: u64,
    pub id_str: String,
    pub created_at: String,
    pub screen_name: String,
    /// The record exactly as the upstream returned it
    pub raw: Value,
}

/// A record that cannot be relayed. Carries the raw record for the log.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid record ({reason}): {raw}")]
pub struct InvalidRecord {
    pub reason: &'static str,
    pub raw: Value,
}

impl FetchedRecord {
    /// Validate a raw record.
    ///
    /// `id` and `created_at` are required. `id_str` falls back to the decimal
    /// id. The author's `user.screen_name` is needed to build the permalink.
    pub fn from_value(raw: Value) -> Result<Self, InvalidRecord> {
        let Some(id) = record_id(&raw) else {
            return Err(InvalidRecord {
                reason: "missing id",
                raw,
            });
        };
        let Some(created_at) = non_empty_str(raw.get("created_at")) else {
            return Err(InvalidRecord {
                reason: "missing created_at",
                raw,
            });
        };
        let Some(screen_name) = non_empty_str(raw.get("user").and_then(|u| u.get("screen_name")))
        else {
            return Err(InvalidRecord {
                reason: "missing user.screen_name",
                raw,
            });
        };
        let id_str = non_empty_str(raw.get("id_str")).unwrap_or_else(|| id.to_string());

        Ok(Self {
            record_id: id,
            id_str,
            created_at,
            screen_name,
            raw,
        })
    }

    /// Normalized shape published to the queue.
    pub fn envelope(&self) -> Envelope {
        Envelope {
            id: self.id_str.clone(),
            url: format!(
                "{PERMALINK_BASE}/{}/status/{}",
                self.screen_name, self.id_str
            ),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// `{"id": ..., "url": ...}`, keyed downstream by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub id: String,
    pub url: String,
}
