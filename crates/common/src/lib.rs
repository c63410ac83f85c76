//! Common types shared by the tweet-relay crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
