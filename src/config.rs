//! Client configuration
//!
//! Defaults are tuned for a handful of sessions serving modest traffic.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{CacheManager, CachePolicy};
use crate::client::Endpoints;

/// Slack on top of two request timeouts for parsing and the cache write
const WAIT_MARGIN: Duration = Duration::from_secs(5);

/// Wait bound for joining an in-flight computation: the first attempt, one
/// retry, and some margin
fn wait_bound(request_timeout: Duration) -> Duration {
    request_timeout.saturating_mul(2).saturating_add(WAIT_MARGIN)
}

/// Cache lifetimes per class of request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicies {
    pub users: CachePolicy,
    pub timelines: CachePolicy,
    pub tweets: CachePolicy,
    pub searches: CachePolicy,
}

impl Default for CachePolicies {
    fn default() -> Self {
        Self {
            users: CachePolicy::new(Duration::from_secs(3600), true),
            timelines: CachePolicy::new(Duration::from_secs(300), true),
            tweets: CachePolicy::new(Duration::from_secs(3600), true),
            searches: CachePolicy::new(Duration::from_secs(120), false),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Session file, one JSON credential record per line
    pub sessions_path: PathBuf,
    /// Directory for the durable cache; the platform cache directory when unset
    pub cache_dir: Option<PathBuf>,
    /// Keep the cache in memory only
    pub disable_disk_cache: bool,
    /// Bound on every network call
    pub request_timeout: Duration,
    /// Bound on waiting for another caller's in-flight computation
    pub wait_timeout: Duration,
    /// Cool-down for a rate-limited session when the upstream gives no reset time
    pub default_backoff: Duration,
    pub policies: CachePolicies,
    /// How long expired stale-tolerable entries are kept for fallback
    pub stale_retention: Duration,
    pub endpoints: Endpoints,
    /// Tweets requested per timeline page
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let request_timeout = Duration::from_secs(30);
        Self {
            sessions_path: PathBuf::from("sessions.jsonl"),
            cache_dir: None,
            disable_disk_cache: false,
            request_timeout,
            wait_timeout: wait_bound(request_timeout),
            default_backoff: Duration::from_secs(15 * 60),
            policies: CachePolicies::default(),
            stale_retention: Duration::from_secs(7 * 24 * 3600),
            endpoints: Endpoints::default(),
            page_size: 20,
        }
    }
}

impl ClientConfig {
    /// Sets the request timeout and keeps the wait bound in step with it
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self.wait_timeout = wait_bound(timeout);
        self
    }

    /// The disk cache to use, if any
    pub fn disk_cache(&self) -> Option<CacheManager> {
        if self.disable_disk_cache {
            return None;
        }
        match &self.cache_dir {
            Some(dir) => Some(CacheManager::with_dir(dir.clone())),
            None => CacheManager::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.default_backoff, Duration::from_secs(900));
        assert_eq!(config.policies.users.ttl, Duration::from_secs(3600));
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn test_request_timeout_moves_wait_timeout() {
        let config = ClientConfig::default().with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.wait_timeout, Duration::from_secs(15));
        assert!(ClientConfig::default().wait_timeout > Duration::from_secs(60));
    }

    #[test]
    fn test_huge_request_timeout_saturates() {
        let config = ClientConfig::default().with_request_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(config.wait_timeout, Duration::MAX);
    }

    #[test]
    fn test_disk_cache_selection() {
        let config = ClientConfig {
            cache_dir: Some(PathBuf::from("/tmp/tweetpool-test")),
            ..ClientConfig::default()
        };
        let disk = config.disk_cache().unwrap();
        assert_eq!(disk.dir(), PathBuf::from("/tmp/tweetpool-test").as_path());

        let config = ClientConfig {
            disable_disk_cache: true,
            ..config
        };
        assert!(config.disk_cache().is_none());
    }
}
