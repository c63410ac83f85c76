//! Query description and cursor position for one search request

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How the upstream renders record text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TweetMode {
    /// Full text and extended entities
    #[default]
    Extended,
    /// Legacy 140-character rendering
    Compat,
}

impl TweetMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TweetMode::Extended => "extended",
            TweetMode::Compat => "compat",
        }
    }
}

impl fmt::Display for TweetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TweetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extended" => Ok(TweetMode::Extended),
            "compat" => Ok(TweetMode::Compat),
            other => Err(format!(
                "unknown tweet mode '{other}', expected 'extended' or 'compat'"
            )),
        }
    }
}

/// Search parameters, immutable for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub search_terms: Option<String>,
    pub language: Option<String>,
    /// `lat,long,radius`
    pub geocode: Option<String>,
    pub page_size: u32,
    pub result_format: TweetMode,
}

/// Cursor position for one query.
///
/// `max_id` is an exclusive upper bound after the first page (the tracker
/// stores one less than the smallest id seen); `since_id` is the lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub max_id: Option<u64>,
    pub since_id: Option<u64>,
}
