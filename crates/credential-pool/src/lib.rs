//! Credential pool for the quota-limited search upstream
//!
//! Holds one or more application credential pairs and hands out the first one
//! that still has search quota. Every acquisition pass authenticates and probes
//! each credential in configured order, so quota state is always fresh; when
//! every credential is spent the pool reports how long to wait for the
//! earliest quota reset.
//!
//! Credential lifecycle within a pass:
//! 1. Authenticate the pair → bearer session (failure: logged, skipped)
//! 2. Probe the search quota → remaining/reset recorded (failure: logged, skipped)
//! 3. Remaining > 0 → returned as a `Lease`, pass ends
//! 4. No credential left → `Blocked` with the minimum wait until a reset

pub mod error;
pub mod pool;
pub mod quota;

pub use error::{Error, Result};
pub use pool::{Acquisition, CredentialStatus, DEFAULT_QUOTA_WINDOW, Lease, Pool};
pub use quota::{classify_status, seconds_until_reset, unix_now};
