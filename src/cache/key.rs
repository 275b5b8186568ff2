//! Deterministic cache keys
//!
//! Keys have the shape `{namespace}.{operation}.{param1}.{param2}...`. An
//! absent optional parameter is written as [`ABSENT`] rather than omitted, and
//! parameter values are escaped so that no value can contain a separator or
//! pass for the sentinel.

use std::borrow::Cow;
use std::fmt;

/// Namespace shared by every key the graph client produces
pub const NAMESPACE: &str = "twitter_client";

/// Placeholder for an omitted optional parameter
pub const ABSENT: &str = "~";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(namespace: &str, operation: &str) -> Self {
        Self(format!("{}.{}", escape(namespace), escape(operation)))
    }

    /// Key in the graph client namespace
    pub fn operation(operation: &str) -> Self {
        Self::new(NAMESPACE, operation)
    }

    pub fn param(mut self, value: impl AsRef<str>) -> Self {
        self.0.push('.');
        self.0.push_str(&escape(value.as_ref()));
        self
    }

    pub fn optional(self, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.param(value),
            None => {
                let mut key = self;
                key.0.push('.');
                key.0.push_str(ABSENT);
                key
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

fn escape(raw: &str) -> Cow<'_, str> {
    if !raw.contains(|c| matches!(c, '%' | '.' | '~')) {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '.' => out.push_str("%2E"),
            '~' => out.push_str("%7E"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
