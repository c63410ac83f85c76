//! Twitter application-only API client
//!
//! Thin async wrappers over the three Twitter v1.1 endpoints the relay needs.
//! This crate is a standalone library with no dependency on the polling core;
//! it reports HTTP failures with their status code and leaves classification
//! to the caller.
//!
//! Request flow:
//! 1. `token::obtain_bearer_token()` exchanges a consumer key/secret for a bearer token
//! 2. `rate_limit::search_rate_limit()` reports the remaining search quota
//! 3. `search::search_tweets()` fetches one page of statuses

pub mod constants;
pub mod error;
pub mod rate_limit;
pub mod search;
pub mod token;

#[cfg(test)]
mod test_server;

pub use constants::*;
pub use error::{Error, Result};
pub use rate_limit::{RateLimitWindow, search_rate_limit};
pub use search::{SearchParams, search_tweets};
pub use token::{BearerToken, obtain_bearer_token};
