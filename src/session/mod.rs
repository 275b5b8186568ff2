//! Session pool module
//!
//! Owns the authenticated sessions used for upstream requests: loading them
//! from the session file, rotating across them, and quarantining the ones the
//! upstream throttles or rejects. Sessions never leave the pool; callers get a
//! [`SessionLease`] carrying just what a request needs.

mod loader;
mod pool;

pub use loader::{load_sessions, parse_sessions, SessionFileError};
pub use pool::{
    Credentials, Health, Outcome, PoolError, SessionLease, SessionPool, SessionRecord,
    SessionStatus,
};

#[cfg(test)]
pub(crate) use pool::record as test_record;

use std::path::Path;
use std::time::Duration;

impl SessionPool {
    /// Loads the session file and builds a pool from it
    pub fn from_file(path: &Path, default_backoff: Duration) -> Result<Self, SessionFileError> {
        Ok(Self::new(load_sessions(path)?, default_backoff))
    }
}
