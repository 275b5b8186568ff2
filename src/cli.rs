//! Command-line interface parsing for the tweetpool operator tool
//!
//! Every subcommand maps onto one graph client operation, plus two
//! maintenance commands that never touch the network.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use thiserror::Error;

use crate::config::ClientConfig;

/// Longest handle the upstream accepts
const MAX_HANDLE_LEN: usize = 15;

/// Longest accepted network timeout, in seconds
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Longest accepted rate-limit cool-down, in minutes (one day)
const MAX_BACKOFF_MINUTES: u64 = 24 * 60;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid handle: '{0}'. Handles are 1-15 letters, digits or underscores")]
    InvalidHandle(String),

    #[error("Invalid id: '{0}'. Ids are numeric")]
    InvalidId(String),

    #[error("Invalid backoff: {0} minutes. Backoff must be between 1 and 1440 minutes")]
    BackoffOutOfRange(u64),
}

/// Query the social network's GraphQL API through a pool of sessions
#[derive(Parser, Debug)]
#[command(name = "tweetpool")]
#[command(about = "Pooled-session GraphQL client with caching")]
#[command(version)]
pub struct Cli {
    /// Session file with one JSON credential record per line
    #[arg(long, value_name = "FILE", default_value = "sessions.jsonl", global = true)]
    pub sessions: PathBuf,

    /// Directory for cached responses (defaults to the platform cache dir)
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Keep cached responses in memory only
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Network timeout per request, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS), global = true)]
    pub timeout: u64,

    /// Cool-down for a rate-limited session when the upstream gives no reset time
    #[arg(long, value_name = "MINUTES", default_value_t = 15, value_parser = parse_backoff_arg, global = true)]
    pub backoff_minutes: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    #[command(flatten)]
    Query(Query),
    /// Show every session in the session file
    Sessions,
    /// Remove cache entries that can no longer be served
    PurgeCache,
}

/// Subcommands answered by the graph client
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Look up an account by handle
    User {
        #[arg(value_parser = parse_handle_arg)]
        handle: String,
    },
    /// Look up an account by numeric id
    UserId {
        #[arg(value_parser = parse_id_arg)]
        user_id: String,
    },
    /// A page of an account's tweets
    Tweets {
        #[arg(value_parser = parse_id_arg)]
        user_id: String,
        #[arg(long)]
        cursor: Option<String>,
    },
    /// A page of an account's tweets and replies
    Replies {
        #[arg(value_parser = parse_id_arg)]
        user_id: String,
        #[arg(long)]
        cursor: Option<String>,
    },
    /// A single tweet by id
    Tweet {
        #[arg(value_parser = parse_id_arg)]
        tweet_id: String,
    },
    /// Latest tweets matching a query
    Search {
        query: String,
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Account, pinned tweet and first timeline page
    Profile {
        #[arg(value_parser = parse_handle_arg)]
        handle: String,
        #[arg(long)]
        cursor: Option<String>,
    },
}

/// Parses a handle argument, tolerating a leading `@`
pub fn parse_handle_arg(s: &str) -> Result<String, CliError> {
    let handle = s.trim().trim_start_matches('@');
    let valid = !handle.is_empty()
        && handle.len() <= MAX_HANDLE_LEN
        && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(handle.to_string())
    } else {
        Err(CliError::InvalidHandle(s.to_string()))
    }
}

pub fn parse_id_arg(s: &str) -> Result<String, CliError> {
    let id = s.trim();
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Ok(id.to_string())
    } else {
        Err(CliError::InvalidId(s.to_string()))
    }
}

fn parse_backoff_arg(s: &str) -> Result<u64, String> {
    let minutes: u64 = s.parse().map_err(|e| format!("{}", e))?;
    if minutes == 0 || minutes > MAX_BACKOFF_MINUTES {
        return Err(CliError::BackoffOutOfRange(minutes).to_string());
    }
    Ok(minutes)
}

impl Cli {
    /// Client configuration for the parsed arguments
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default()
            .with_request_timeout(Duration::from_secs(self.timeout.clamp(1, MAX_TIMEOUT_SECS)));
        config.sessions_path = self.sessions.clone();
        config.cache_dir = self.cache_dir.clone();
        config.disable_disk_cache = self.no_cache;
        config.default_backoff = Duration::from_secs(self.backoff_minutes.saturating_mul(60));
        config
    }

    /// Default log filter for the verbosity level, used when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
