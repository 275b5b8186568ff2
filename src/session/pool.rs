//! Round-robin pool of authenticated sessions with health tracking
//!
//! Selection and health mutation happen under one lock, so a caller can never
//! be handed a session another caller has just marked unhealthy.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Credentials attached to every upstream request made with a session
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub oauth_token: String,
    pub oauth_token_secret: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("oauth_token", &"<redacted>")
            .field("oauth_token_secret", &self.oauth_token_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A session as loaded from the session file; immutable
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub account_id: String,
    pub credentials: Credentials,
    pub created_at: Option<DateTime<Utc>>,
}

/// Health of a pooled session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Health {
    Healthy,
    /// Cooling down until the given instant
    RateLimited { until: DateTime<Utc> },
    /// Credentials were rejected; never selected again
    Invalid,
}

/// What happened when a session was used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The upstream throttled the session, optionally saying when it resets
    RateLimited { reset_at: Option<DateTime<Utc>> },
    AuthRejected,
    Transient,
    NotFound,
}

/// A session handed out for one upstream request
#[derive(Debug, Clone)]
pub struct SessionLease {
    slot: usize,
    account_id: String,
    credentials: Credentials,
}

impl SessionLease {
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// Operator-facing view of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub account_id: String,
    pub health: Health,
    pub created_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// No session is currently healthy
    #[error("no healthy session available ({total} in pool)")]
    Exhausted {
        total: usize,
        /// Earliest moment a rate-limited session becomes usable again
        next_available: Option<DateTime<Utc>>,
    },
}

#[derive(Debug)]
struct Session {
    record: SessionRecord,
    health: Health,
    last_used: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the session may be selected at `now`, clearing an elapsed cool-down
    fn ready(&mut self, now: DateTime<Utc>) -> bool {
        match self.health {
            Health::Healthy => true,
            Health::RateLimited { until } if until <= now => {
                debug!(account_id = %self.record.account_id, "rate-limit cool-down elapsed");
                self.health = Health::Healthy;
                true
            }
            Health::RateLimited { .. } | Health::Invalid => false,
        }
    }
}

#[derive(Debug)]
struct PoolState {
    sessions: Vec<Session>,
    /// Slot the next round-robin scan starts at
    next: usize,
}

/// Pool of sessions shared by every request
#[derive(Debug)]
pub struct SessionPool {
    state: Mutex<PoolState>,
    default_backoff: Duration,
}

impl SessionPool {
    /// Creates a pool; `default_backoff` applies when a rate-limit response
    /// carries no reset time
    pub fn new(records: Vec<SessionRecord>, default_backoff: std::time::Duration) -> Self {
        let sessions = records
            .into_iter()
            .map(|record| Session {
                record,
                health: Health::Healthy,
                last_used: None,
            })
            .collect();
        Self {
            state: Mutex::new(PoolState { sessions, next: 0 }),
            default_backoff: Duration::from_std(default_backoff)
                .unwrap_or_else(|_| Duration::minutes(15)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Selects the next usable session in round-robin order.
    ///
    /// Invalid sessions are skipped permanently and rate-limited ones until
    /// their cool-down elapses. Never blocks.
    pub fn acquire(&self) -> Result<SessionLease, PoolError> {
        let now = Utc::now();
        let mut state = self.lock();
        let total = state.sessions.len();

        for offset in 0..total {
            let slot = (state.next + offset) % total;
            let session = &mut state.sessions[slot];
            if session.ready(now) {
                session.last_used = Some(now);
                let lease = SessionLease {
                    slot,
                    account_id: session.record.account_id.clone(),
                    credentials: session.record.credentials.clone(),
                };
                state.next = (slot + 1) % total;
                return Ok(lease);
            }
        }

        let next_available = state
            .sessions
            .iter()
            .filter_map(|s| match s.health {
                Health::RateLimited { until } => Some(until),
                _ => None,
            })
            .min();
        Err(PoolError::Exhausted {
            total,
            next_available,
        })
    }

    /// Records the result of using a leased session.
    ///
    /// A success does not end a cool-down early.
    pub fn report_outcome(&self, lease: &SessionLease, outcome: Outcome) {
        let now = Utc::now();
        let mut state = self.lock();
        let Some(session) = state.sessions.get_mut(lease.slot) else {
            return;
        };

        match outcome {
            Outcome::RateLimited { reset_at } => {
                if session.health == Health::Invalid {
                    return;
                }
                let mut until = reset_at
                    .filter(|reset| *reset > now)
                    .unwrap_or(now + self.default_backoff);
                if let Health::RateLimited { until: current } = session.health {
                    until = until.max(current);
                }
                warn!(account_id = %lease.account_id, %until, "session rate limited");
                session.health = Health::RateLimited { until };
            }
            Outcome::AuthRejected => {
                if session.health != Health::Invalid {
                    error!(
                        account_id = %lease.account_id,
                        "session credentials rejected by upstream; removed from rotation"
                    );
                }
                session.health = Health::Invalid;
            }
            Outcome::Success | Outcome::Transient | Outcome::NotFound => {}
        }
    }

    /// Snapshot of every session's health, for operators
    pub fn statuses(&self) -> Vec<SessionStatus> {
        self.lock()
            .sessions
            .iter()
            .map(|s| SessionStatus {
                account_id: s.record.account_id.clone(),
                health: s.health,
                created_at: s.record.created_at,
                last_used: s.last_used,
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn record(account_id: &str) -> SessionRecord {
    SessionRecord {
        account_id: account_id.to_string(),
        credentials: Credentials {
            oauth_token: format!("{}-token", account_id),
            oauth_token_secret: None,
        },
        created_at: None,
    }
}
