//! Errors surfaced by the graph client
//!
//! Every variant carries the [`RequestContext`] of the logical request that
//! failed, so a logged error is enough to reproduce the call.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::cache::{CacheError, FlightError};
use crate::parser::ParseError;

/// Operation name and key parameters of a logical request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub operation: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl RequestContext {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            params: Vec::new(),
        }
    }

    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    pub fn with_optional(self, name: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.operation)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={:?}", name, value)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The upstream throttled the request, including after one retry
    #[error("{context}: rate limited by upstream")]
    RateLimited {
        context: RequestContext,
        retry_at: Option<DateTime<Utc>>,
    },

    /// No session was usable when the request started
    #[error("{context}: no usable session among {total}")]
    ExhaustedPool {
        context: RequestContext,
        total: usize,
        next_available: Option<DateTime<Utc>>,
    },

    /// The upstream rejected a session's credentials
    #[error("{context}: credentials of session {account_id} rejected")]
    AuthInvalid {
        context: RequestContext,
        account_id: String,
    },

    #[error("{context}: not found")]
    NotFound { context: RequestContext },

    #[error("{context}: unexpected upstream response: {source}")]
    UpstreamParse {
        context: RequestContext,
        #[source]
        source: ParseError,
    },

    /// Network failure or timeout that persisted through the retry
    #[error("{context}: transient failure: {detail}")]
    Transient {
        context: RequestContext,
        detail: String,
    },
}

/// Coarse classification of a [`ClientError`] for callers mapping errors to
/// responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RateLimited,
    ExhaustedPool,
    AuthInvalid,
    NotFound,
    UpstreamParse,
    Transient,
}

impl ErrorKind {
    /// HTTP status a facade should answer with
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::RateLimited => 429,
            ErrorKind::ExhaustedPool | ErrorKind::Transient => 503,
            ErrorKind::NotFound => 404,
            ErrorKind::UpstreamParse | ErrorKind::AuthInvalid => 502,
        }
    }

    /// Whether trying again later may succeed
    pub fn is_temporary(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited | ErrorKind::ExhaustedPool | ErrorKind::Transient
        )
    }
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::RateLimited { .. } => ErrorKind::RateLimited,
            ClientError::ExhaustedPool { .. } => ErrorKind::ExhaustedPool,
            ClientError::AuthInvalid { .. } => ErrorKind::AuthInvalid,
            ClientError::NotFound { .. } => ErrorKind::NotFound,
            ClientError::UpstreamParse { .. } => ErrorKind::UpstreamParse,
            ClientError::Transient { .. } => ErrorKind::Transient,
        }
    }

    pub fn context(&self) -> &RequestContext {
        match self {
            ClientError::RateLimited { context, .. }
            | ClientError::ExhaustedPool { context, .. }
            | ClientError::AuthInvalid { context, .. }
            | ClientError::NotFound { context }
            | ClientError::UpstreamParse { context, .. }
            | ClientError::Transient { context, .. } => context,
        }
    }

    pub(crate) fn parse(context: &RequestContext, source: ParseError) -> Self {
        ClientError::UpstreamParse {
            context: context.clone(),
            source,
        }
    }

    pub(crate) fn not_found(context: &RequestContext) -> Self {
        ClientError::NotFound {
            context: context.clone(),
        }
    }
}

impl From<CacheError> for ClientError {
    fn from(err: CacheError) -> Self {
        let CacheError::WaitTimedOut { key, .. } = &err;
        ClientError::Transient {
            context: RequestContext::new("cache_wait").with("key", key.clone()),
            detail: err.to_string(),
        }
    }
}

impl FlightError for ClientError {
    /// A confirmed absence must not be masked by an old copy
    fn allows_stale(&self) -> bool {
        !matches!(self, ClientError::NotFound { .. })
    }
}
