//! tweetpool
//!
//! A client for the social network's internal GraphQL API that spreads
//! requests over a pool of authenticated sessions, normalizes responses into
//! stable models, and caches results with single-flight deduplication.

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod parser;
pub mod session;

pub use client::GraphClient;
pub use config::ClientConfig;
pub use error::{ClientError, ErrorKind};
