//! Response parser for upstream GraphQL payloads
//!
//! Pure functions that turn decoded JSON documents into the models in
//! [`crate::data`]. This module is the only place that knows the upstream field
//! names. Every field access goes through [`Node`], which remembers the path it
//! was reached by, so a failure always names the offending field.
//!
//! Field policy: identifiers and handles are required (a missing one fails the
//! enclosing entity), everything else falls back to a declared default.

mod timeline;
mod tweet;
mod user;

pub use timeline::{parse_search_timeline, parse_user_timeline};
pub use tweet::parse_tweet_result;
pub use user::parse_user_result;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Format used by the upstream for legacy timestamps, e.g. `Wed Oct 10 20:19:24 +0000 2018`
const LEGACY_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// A response did not match any tolerated shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A required field was absent or null
    #[error("missing field `{path}`")]
    Missing { path: String },

    /// A field was present with the wrong JSON type
    #[error("unexpected value at `{path}`: expected {expected}")]
    UnexpectedType { path: String, expected: &'static str },

    /// The body was not JSON at all
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),
}

impl ParseError {
    /// Path of the offending field, `$` for the document root
    pub fn path(&self) -> &str {
        match self {
            ParseError::Missing { path } | ParseError::UnexpectedType { path, .. } => path,
            ParseError::InvalidJson(_) => "$",
        }
    }
}

/// Decodes a raw response body into a JSON document
pub fn decode_body(body: &str) -> Result<Value, ParseError> {
    serde_json::from_str(body).map_err(|e| ParseError::InvalidJson(e.to_string()))
}

/// A position in a JSON document plus the path used to reach it.
///
/// Absent keys, `null`, and indexing into non-containers all yield an empty
/// node rather than an error; the caller decides whether emptiness is fatal.
#[derive(Debug, Clone)]
pub(crate) struct Node<'a> {
    value: Option<&'a Value>,
    path: String,
}

impl<'a> Node<'a> {
    pub(crate) fn root(value: &'a Value) -> Self {
        Self {
            value: Some(value),
            path: "$".to_string(),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Node<'a> {
        Node {
            value: self.value.and_then(|v| v.get(key)).filter(|v| !v.is_null()),
            path: format!("{}.{}", self.path, key),
        }
    }

    /// First of several alternative keys that is present, for renamed fields
    pub(crate) fn get_any(&self, keys: &[&str]) -> Node<'a> {
        keys.iter()
            .map(|key| self.get(key))
            .find(Node::is_present)
            .unwrap_or_else(|| self.get(keys.first().copied().unwrap_or_default()))
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    /// Present, not null, and not an empty object
    pub(crate) fn is_present(&self) -> bool {
        match self.value {
            None => false,
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    pub(crate) fn typename(&self) -> Option<&'a str> {
        self.get("__typename").str()
    }

    pub(crate) fn str(&self) -> Option<&'a str> {
        self.value.and_then(Value::as_str)
    }

    /// Non-empty string, or `None`
    pub(crate) fn text(&self) -> Option<String> {
        self.str().filter(|s| !s.is_empty()).map(str::to_string)
    }

    pub(crate) fn string_or_default(&self) -> String {
        self.str().unwrap_or_default().to_string()
    }

    pub(crate) fn flag(&self) -> bool {
        self.value.and_then(Value::as_bool).unwrap_or(false)
    }

    /// Engagement counter. Negative, fractional-negative and malformed values
    /// saturate to zero; numeric strings (as used for view counts) are accepted.
    pub(crate) fn counter(&self) -> u64 {
        match self.value {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
            _ => 0,
        }
    }

    /// Identifier given either as a string or as a bare number
    pub(crate) fn id(&self) -> Option<String> {
        match self.value {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => n.as_u64().map(|n| n.to_string()),
            _ => None,
        }
    }

    pub(crate) fn require(&self) -> Result<&'a Value, ParseError> {
        if self.is_present() {
            self.value.ok_or_else(|| self.missing())
        } else {
            Err(self.missing())
        }
    }

    pub(crate) fn require_id(&self) -> Result<String, ParseError> {
        match self.value {
            None => Err(self.missing()),
            Some(_) => self.id().ok_or_else(|| self.unexpected("non-empty id")),
        }
    }

    pub(crate) fn require_text(&self) -> Result<String, ParseError> {
        match self.value {
            None => Err(self.missing()),
            Some(Value::String(s)) if s.is_empty() => Err(self.missing()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(self.unexpected("string")),
        }
    }

    /// Elements of a required array
    pub(crate) fn require_items(&self) -> Result<Vec<Node<'a>>, ParseError> {
        match self.value {
            None => Err(self.missing()),
            Some(Value::Array(_)) => Ok(self.items()),
            Some(_) => Err(self.unexpected("array")),
        }
    }

    /// Elements of an optional array; anything else is treated as empty
    pub(crate) fn items(&self) -> Vec<Node<'a>> {
        match self.value {
            Some(Value::Array(values)) => values
                .iter()
                .enumerate()
                .map(|(i, value)| Node {
                    value: Some(value).filter(|v| !v.is_null()),
                    path: format!("{}[{}]", self.path, i),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn date(&self) -> Option<DateTime<Utc>> {
        self.str().and_then(parse_upstream_date)
    }

    pub(crate) fn missing(&self) -> ParseError {
        ParseError::Missing {
            path: self.path.clone(),
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedType {
            path: self.path.clone(),
            expected,
        }
    }
}

/// Parses the upstream's legacy timestamp format, falling back to RFC 3339
pub(crate) fn parse_upstream_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, LEGACY_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Locates the `data` object every GraphQL response is wrapped in
fn data_root(doc: &Value) -> Result<Node<'_>, ParseError> {
    let data = Node::root(doc).get("data");
    match data.value {
        Some(Value::Object(_)) => Ok(data),
        Some(_) => Err(data.unexpected("object")),
        None => Err(data.missing()),
    }
}
