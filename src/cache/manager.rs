//! Durable backing for the cache store
//!
//! Each entry is one JSON file named by the SHA-256 of its key, so cursors and
//! search queries never have to be made file-system safe by hand. The key is
//! stored inside the file and checked on read.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// A cached value together with its freshness metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Full cache key this entry was stored under
    pub key: String,
    pub value: Value,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Whether the entry may be served after expiry when the upstream fails
    pub stale_tolerable: bool,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: Value, ttl: Duration, stale_tolerable: bool) -> Self {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        Self {
            key: key.into(),
            value,
            cached_at: now,
            expires_at: now + ttl,
            stale_tolerable,
        }
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Whether the entry is still worth keeping at `now`: fresh, or expired
    /// but stale-tolerable and within the retention window
    pub fn is_retained_at(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        self.is_fresh_at(now) || (self.stale_tolerable && now < self.expires_at + retention)
    }
}

/// Reads and writes cache entries as JSON files in one directory
#[derive(Debug, Clone)]
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a CacheManager in the platform cache directory
    ///
    /// Uses `~/.cache/tweetpool/` on Linux. Returns `None` if no home
    /// directory can be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "tweetpool")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.cache_dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Writes an entry, replacing any previous one for the same key
    ///
    /// The file is written under a temporary name and renamed into place so a
    /// concurrent reader never sees a half-written entry.
    pub fn write(&self, entry: &CacheEntry) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)?;

        let json = serde_json::to_vec_pretty(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let path = self.cache_path(&entry.key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)
    }

    /// Reads the entry for `key`, expired or not
    ///
    /// Returns `None` if the file is missing, unreadable, or belongs to a
    /// different key.
    pub fn read(&self, key: &str) -> Option<CacheEntry> {
        let content = fs::read(self.cache_path(key)).ok()?;
        let entry: CacheEntry = serde_json::from_slice(&content).ok()?;
        (entry.key == key).then_some(entry)
    }

    /// Removes the entry for `key`; a missing file is not an error
    pub fn delete(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.cache_path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Every readable entry in the cache directory
    ///
    /// Files that fail to parse are skipped.
    pub fn entries(&self) -> Vec<CacheEntry> {
        let Ok(dir) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        dir.filter_map(Result::ok)
            .map(|item| item.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                let entry = fs::read(&path)
                    .ok()
                    .and_then(|content| serde_json::from_slice::<CacheEntry>(&content).ok());
                if entry.is_none() {
                    debug!(path = %path.display(), "ignoring unreadable cache file");
                }
                entry
            })
            .collect()
    }
}
