//! Core data models for tweetpool
//!
//! Every model here is produced by the response parser from raw upstream JSON
//! and is an immutable value afterwards. Models round-trip through serde so the
//! cache store can persist them as JSON blobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verification badge shown next to an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerifiedType {
    #[default]
    None,
    Blue,
    Business,
    Government,
}

/// Normalized account identity and profile attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Immutable numeric account id (as a string, never empty)
    pub id: String,
    /// Screen name without the leading `@`
    pub handle: String,
    pub display_name: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    /// Avatar URL, upgraded to the 400x400 rendition
    pub avatar_url: String,
    pub banner_url: String,
    pub followers: u64,
    pub following: u64,
    pub tweets: u64,
    pub likes: u64,
    pub media: u64,
    pub verified: VerifiedType,
    pub protected: bool,
    /// Account creation date, when the upstream supplied a parseable one
    pub join_date: Option<DateTime<Utc>>,
    pub pinned_tweet_id: Option<String>,
}

/// Why an account cannot be shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    Suspended,
    Deactivated,
    Other(String),
}

/// Result of an account lookup, resolved once at parse time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Account {
    /// A public account
    Active(User),
    /// A protected account: the profile is visible, its tweets are not
    Protected(User),
    /// Sentinel for suspended or otherwise unavailable accounts
    Unavailable {
        /// Handle or id the lookup was made with
        lookup: String,
        reason: UnavailableReason,
    },
}

impl Account {
    /// The full user record, if the account is visible at all
    pub fn user(&self) -> Option<&User> {
        match self {
            Account::Active(user) | Account::Protected(user) => Some(user),
            Account::Unavailable { .. } => None,
        }
    }

    /// Handle of the account, or the lookup key for unavailable accounts
    pub fn handle(&self) -> &str {
        match self {
            Account::Active(user) | Account::Protected(user) => &user.handle,
            Account::Unavailable { lookup, .. } => lookup,
        }
    }
}

/// Engagement counters of a tweet. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TweetStats {
    pub replies: u64,
    pub retweets: u64,
    pub likes: u64,
    pub quotes: u64,
    pub views: u64,
}

/// One playable rendition of a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoVariant {
    pub content_type: String,
    pub url: String,
    pub bitrate: u64,
}

/// Media attached to a tweet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Media {
    Photo {
        url: String,
    },
    Video {
        thumb: String,
        duration_ms: u64,
        variants: Vec<VideoVariant>,
    },
    Gif {
        url: String,
        thumb: String,
    },
}

/// The tweet this one replies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub tweet_id: String,
    pub handle: Option<String>,
}

/// Position of a tweet inside an author's self-thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "position", rename_all = "snake_case")]
pub enum ThreadMarker {
    Root,
    Continuation { root_id: String },
}

/// A visible tweet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetBody {
    pub id: String,
    pub author_id: String,
    /// Author profile when the upstream embedded it
    pub author: Option<User>,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub conversation_id: Option<String>,
    pub reply_to: Option<ReplyTarget>,
    pub source: String,
    pub lang: Option<String>,
    pub stats: TweetStats,
    pub media: Vec<Media>,
    pub hashtags: Vec<String>,
    pub urls: Vec<String>,
    /// Id of the retweeted original; its content is not duplicated here
    pub retweet_of: Option<String>,
    /// Id of the quoted tweet
    pub quote_of: Option<String>,
    pub thread: Option<ThreadMarker>,
    pub pinned: bool,
}

/// A tweet as resolved by the parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Tweet {
    Available(Box<TweetBody>),
    /// Sentinel for deleted, withheld or otherwise unavailable tweets
    Tombstone { id: String, reason: String },
}

impl Tweet {
    pub fn id(&self) -> &str {
        match self {
            Tweet::Available(body) => &body.id,
            Tweet::Tombstone { id, .. } => id,
        }
    }

    pub fn body(&self) -> Option<&TweetBody> {
        match self {
            Tweet::Available(body) => Some(body),
            Tweet::Tombstone { .. } => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Tweet::Tombstone { .. })
    }
}

/// An ordered page of tweets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub tweets: Vec<Tweet>,
    /// Cursor for the next (older) page; `None` once the upstream is exhausted
    pub cursor: Option<String>,
    /// Cursor for newer entries
    pub top_cursor: Option<String>,
    pub pinned: Option<Tweet>,
}

impl Timeline {
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }
}

/// An account together with a page of its tweets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub account: Account,
    pub pinned: Option<Tweet>,
    /// Present only for active accounts
    pub timeline: Option<Timeline>,
}
