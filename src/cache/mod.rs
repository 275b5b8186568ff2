//! Cache module for upstream responses
//!
//! [`CacheStore`] deduplicates concurrent identical requests and keeps results
//! for a per-class TTL, falling back to stale values when the upstream fails.
//! [`CacheManager`] persists entries to disk so they outlive the process.

mod key;
mod manager;
mod store;

pub use key::{CacheKey, ABSENT, NAMESPACE};
pub use manager::{CacheEntry, CacheManager};
pub use store::{CacheError, CachePolicy, CacheStore, FlightError};
