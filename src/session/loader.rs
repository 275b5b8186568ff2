//! Session file loading
//!
//! The session file holds one JSON object per line:
//!
//! ```text
//! {"oauth_token": "1234-abcd", "oauth_token_secret": "...", "username": "bot1"}
//! ```
//!
//! Malformed lines are skipped with a warning; only a file without a single
//! usable line is an error.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use super::pool::{Credentials, SessionRecord};

/// Keys that may carry the account identifier, in order of preference
const ACCOUNT_ID_KEYS: [&str; 4] = ["account_id", "id", "user_id", "username"];

#[derive(Debug, Error)]
pub enum SessionFileError {
    #[error("failed to read session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no valid sessions found in {0}")]
    Empty(PathBuf),
}

/// Reads every usable session from a session file
pub fn load_sessions(path: &Path) -> Result<Vec<SessionRecord>, SessionFileError> {
    let content = fs::read_to_string(path).map_err(|source| SessionFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records = parse_sessions(&content);
    if records.is_empty() {
        return Err(SessionFileError::Empty(path.to_path_buf()));
    }
    info!(count = records.len(), path = %path.display(), "loaded sessions");
    Ok(records)
}

/// Parses session lines, skipping blank and malformed ones
pub fn parse_sessions(content: &str) -> Vec<SessionRecord> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match parse_line(line.trim()) {
            Ok(record) => Some(record),
            Err(reason) => {
                warn!(line = index + 1, %reason, "skipping invalid session");
                None
            }
        })
        .collect()
}

fn parse_line(line: &str) -> Result<SessionRecord, String> {
    let object: Map<String, Value> = serde_json::from_str(line).map_err(|e| e.to_string())?;

    let oauth_token = ["oauth_token", "auth_token"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .filter(|token| !token.is_empty())
        .ok_or("missing oauth_token")?
        .to_string();

    let account_id = ACCOUNT_ID_KEYS
        .iter()
        .find_map(|key| match object.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .or_else(|| account_id_from_token(&oauth_token))
        .ok_or("missing account identifier")?;

    let created_at = object
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(SessionRecord {
        account_id,
        credentials: Credentials {
            oauth_token,
            oauth_token_secret: object
                .get("oauth_token_secret")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        created_at,
    })
}

/// OAuth tokens are issued as `<numeric user id>-<secret part>`
fn account_id_from_token(token: &str) -> Option<String> {
    let (prefix, _) = token.split_once('-')?;
    if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
        Some(prefix.to_string())
    } else {
        None
    }
}
