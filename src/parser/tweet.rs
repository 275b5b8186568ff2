//! Tweet results, shared by the single-tweet and timeline parsers
//!
//! A tweet result is one of:
//! - `Tweet`: a normal tweet with `rest_id`, `legacy` and `core`
//! - `TweetWithVisibilityResults`: the same, wrapped one level under `tweet`
//! - `TweetTombstone` / `TweetUnavailable`: deleted, withheld or hidden tweets

use serde_json::Value;
use tracing::debug;

use super::user::parse_user;
use super::{data_root, Node, ParseError};
use crate::data::{Media, ReplyTarget, ThreadMarker, Tweet, TweetBody, TweetStats, VideoVariant};

/// Parses a single-tweet response (`data.tweet_result.result`).
///
/// Returns `Ok(None)` when the upstream answered with an empty result. A
/// deleted tweet yields [`Tweet::Tombstone`], never an error.
pub fn parse_tweet_result(doc: &Value, id: &str) -> Result<Option<Tweet>, ParseError> {
    let result = data_root(doc)?
        .get_any(&["tweet_result", "tweetResult"])
        .get("result");
    if !result.is_present() {
        return Ok(None);
    }
    parse_tweet(&result, Some(id)).map(Some)
}

/// Parses a tweet result object. `fallback_id` names the tweet when the
/// payload itself does not (tombstones usually carry no id).
pub(crate) fn parse_tweet(node: &Node<'_>, fallback_id: Option<&str>) -> Result<Tweet, ParseError> {
    let node = unwrap_visibility(node);

    match node.typename() {
        Some("TweetTombstone") => {
            let reason = node
                .get("tombstone")
                .get("text")
                .get("text")
                .text()
                .unwrap_or_else(|| "This post is unavailable".to_string());
            return tombstone(&node, fallback_id, reason);
        }
        Some("TweetUnavailable") => {
            let reason = node
                .get("reason")
                .text()
                .unwrap_or_else(|| "unavailable".to_string());
            return tombstone(&node, fallback_id, reason);
        }
        _ => {}
    }

    let legacy = node.get("legacy");
    let id = match node.get("rest_id").id().or_else(|| legacy.get("id_str").id()) {
        Some(id) => id,
        None => node.get("rest_id").require_id()?,
    };

    let author_node = node
        .get("core")
        .get_any(&["user_results", "user_result"])
        .get("result");
    let author = if author_node.is_present() {
        match parse_user(&author_node) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(tweet_id = %id, error = %e, "author profile unusable, keeping id only");
                None
            }
        }
    } else {
        None
    };
    let author_id = match author.as_ref().map(|u| u.id.clone()) {
        Some(author_id) => author_id,
        None => legacy.get("user_id_str").require_id()?,
    };

    let text = node
        .get("note_tweet")
        .get("note_tweet_results")
        .get("result")
        .get("text")
        .text()
        .or_else(|| legacy.get("full_text").text())
        .or_else(|| legacy.get("text").text())
        .unwrap_or_default();

    let reply_to = legacy
        .get("in_reply_to_status_id_str")
        .id()
        .map(|tweet_id| ReplyTarget {
            tweet_id,
            handle: legacy.get("in_reply_to_screen_name").text(),
        });

    let retweet_of = linked_id(&legacy.get("retweeted_status_result").get("result"))
        .or_else(|| linked_id(&node.get("retweeted_status_result").get("result")))
        .filter(|linked| *linked != id);

    let quote_of = linked_id(&node.get("quoted_status_result").get("result"))
        .or_else(|| legacy.get("quoted_status_id_str").id())
        .filter(|linked| *linked != id);

    let thread = legacy
        .get("self_thread")
        .get("id_str")
        .id()
        .map(|root_id| {
            if root_id == id {
                ThreadMarker::Root
            } else {
                ThreadMarker::Continuation { root_id }
            }
        });

    let entities = legacy.get("entities");

    Ok(Tweet::Available(Box::new(TweetBody {
        author_id,
        author,
        text,
        created_at: legacy.get("created_at").date(),
        conversation_id: legacy.get("conversation_id_str").id(),
        reply_to,
        source: source_label(
            legacy
                .get("source")
                .str()
                .or_else(|| node.get("source").str())
                .unwrap_or_default(),
        ),
        lang: legacy.get("lang").text(),
        stats: TweetStats {
            replies: legacy.get("reply_count").counter(),
            retweets: legacy.get("retweet_count").counter(),
            likes: legacy.get("favorite_count").counter(),
            quotes: legacy.get("quote_count").counter(),
            views: node.get("views").get("count").counter(),
        },
        media: parse_media(&legacy),
        hashtags: entities
            .get("hashtags")
            .items()
            .iter()
            .filter_map(|tag| tag.get("text").text())
            .collect(),
        urls: entities
            .get("urls")
            .items()
            .iter()
            .filter_map(|url| url.get("expanded_url").text())
            .collect(),
        retweet_of,
        quote_of,
        thread,
        pinned: false,
        id,
    })))
}

/// Strips the `TweetWithVisibilityResults` wrapper (or a bare `tweet` wrapper)
fn unwrap_visibility<'a>(node: &Node<'a>) -> Node<'a> {
    let inner = node.get("tweet");
    let wrapped = node.typename() == Some("TweetWithVisibilityResults")
        || (node.typename().is_none() && !node.get("rest_id").is_present());
    if wrapped && inner.is_present() {
        inner
    } else {
        node.clone()
    }
}

fn tombstone(node: &Node<'_>, fallback_id: Option<&str>, reason: String) -> Result<Tweet, ParseError> {
    let id = node
        .get("rest_id")
        .id()
        .or_else(|| fallback_id.filter(|id| !id.is_empty()).map(str::to_string))
        .ok_or_else(|| node.get("rest_id").missing())?;
    Ok(Tweet::Tombstone { id, reason })
}

/// Id of an embedded retweet or quote, looked up one level deep only
fn linked_id(node: &Node<'_>) -> Option<String> {
    if !node.is_present() {
        return None;
    }
    let node = unwrap_visibility(node);
    node.get("rest_id")
        .id()
        .or_else(|| node.get("legacy").get("id_str").id())
}

/// `<a href="...">Twitter for iPhone</a>` becomes `Twitter for iPhone`
fn source_label(raw: &str) -> String {
    match (raw.find('>'), raw.rfind('<')) {
        (Some(start), Some(end)) if start < end => raw[start + 1..end].to_string(),
        _ => raw.to_string(),
    }
}

fn parse_media(legacy: &Node<'_>) -> Vec<Media> {
    let mut items = legacy.get("extended_entities").get("media").items();
    if items.is_empty() {
        items = legacy.get("entities").get("media").items();
    }

    items
        .iter()
        .filter_map(|media| {
            let thumb = media.get("media_url_https").string_or_default();
            let video_info = media.get("video_info");
            match media.get("type").str()? {
                "photo" => Some(Media::Photo { url: thumb }),
                "video" => Some(Media::Video {
                    thumb,
                    duration_ms: video_info.get("duration_millis").counter(),
                    variants: video_info
                        .get("variants")
                        .items()
                        .iter()
                        .filter_map(|variant| {
                            Some(VideoVariant {
                                url: variant.get("url").text()?,
                                content_type: variant
                                    .get("content_type")
                                    .text()
                                    .unwrap_or_else(|| "video/mp4".to_string()),
                                bitrate: variant.get("bitrate").counter(),
                            })
                        })
                        .collect(),
                }),
                "animated_gif" => {
                    let url = video_info
                        .get("variants")
                        .items()
                        .first()
                        .and_then(|variant| variant.get("url").text())?;
                    Some(Media::Gif { url, thumb })
                }
                _ => None,
            }
        })
        .collect()
}
