//! Timeline pages: user timelines and search results
//!
//! Both share the instruction list format:
//! `timeline.instructions[]` with `TimelineAddEntries`, `TimelinePinEntry` and
//! `TimelineReplaceEntry` instructions. The instruction kind is read from
//! `__typename` (mobile) or `type` (web).

use serde_json::Value;
use tracing::{debug, warn};

use super::tweet::parse_tweet;
use super::{data_root, Node, ParseError};
use crate::data::{Timeline, Tweet};

/// Parses a user-timeline response.
///
/// Returns `Ok(None)` when the upstream answered with an empty or unavailable
/// user result. A response without an instruction list is an error, never an
/// empty page.
pub fn parse_user_timeline(doc: &Value) -> Result<Option<Timeline>, ParseError> {
    let result = data_root(doc)?
        .get_any(&["user_result", "user"])
        .get("result");
    if !result.is_present() || result.typename() == Some("UserUnavailable") {
        return Ok(None);
    }
    let timeline = result
        .get_any(&["timeline_response", "timeline_v2", "timeline"])
        .get("timeline");
    parse_instructions(&timeline.get("instructions")).map(Some)
}

/// Parses a search response
pub fn parse_search_timeline(doc: &Value) -> Result<Timeline, ParseError> {
    let data = data_root(doc)?;
    let search = data.get("search_by_raw_query");
    let timeline = if search.is_present() {
        search.get("search_timeline").get("timeline")
    } else {
        data.get("search").get("timeline_response").get("timeline")
    };
    parse_instructions(&timeline.get("instructions"))
}

fn parse_instructions(instructions: &Node<'_>) -> Result<Timeline, ParseError> {
    let mut page = Timeline {
        tweets: Vec::new(),
        cursor: None,
        top_cursor: None,
        pinned: None,
    };

    // A page built from no known instruction would read as the last page
    let mut recognised = false;
    for instruction in instructions.require_items()? {
        let kind = instruction
            .typename()
            .or_else(|| instruction.get("type").str())
            .unwrap_or_default();
        match kind {
            "TimelineAddEntries" => {
                for entry in instruction.get("entries").require_items()? {
                    add_entry(&mut page, &entry);
                }
            }
            "TimelinePinEntry" => {
                let entry = instruction.get("entry");
                if let Some(tweet) = entry_tweet(&entry, &entry.get("content")) {
                    page.pinned = Some(mark_pinned(tweet));
                }
            }
            "TimelineReplaceEntry" => {
                let entry = instruction.get("entry");
                read_cursor(&mut page, &entry, &entry.get("content"));
            }
            other => {
                debug!(instruction = other, "ignoring timeline instruction");
                continue;
            }
        }
        recognised = true;
    }

    if !recognised {
        return Err(instructions.missing());
    }
    Ok(page)
}

fn add_entry(page: &mut Timeline, entry: &Node<'_>) {
    let content = entry.get("content");
    let kind = content
        .typename()
        .or_else(|| content.get("entryType").str())
        .unwrap_or_default();
    let entry_id = entry.get("entryId").str().unwrap_or_default();

    if kind == "TimelineTimelineCursor" || entry_id.starts_with("cursor-") {
        read_cursor(page, entry, &content);
        return;
    }

    match kind {
        "TimelineTimelineItem" => {
            if let Some(tweet) = entry_tweet(entry, &content) {
                page.tweets.push(tweet);
            }
        }
        "TimelineTimelineModule" => {
            for item in content.get("items").items() {
                let item_entry = item.get("item");
                let item_content = item_entry.get_any(&["itemContent", "content"]);
                if let Some(tweet) = item_tweet(&item, &item_content) {
                    page.tweets.push(tweet);
                }
            }
        }
        _ => {}
    }
}

/// Tweet of a single-item entry, accepting both entry shapes
fn entry_tweet(entry: &Node<'_>, content: &Node<'_>) -> Option<Tweet> {
    let item_content = content.get_any(&["content", "itemContent"]);
    item_tweet(entry, &item_content)
}

fn item_tweet(entry: &Node<'_>, item_content: &Node<'_>) -> Option<Tweet> {
    if let Some(kind) = item_content.typename() {
        if kind != "TimelineTweet" {
            return None;
        }
    }
    let result = item_content
        .get_any(&["tweetResult", "tweet_results"])
        .get("result");
    if !result.is_present() {
        return None;
    }

    let entry_id = entry.get("entryId").str().unwrap_or_default();
    let fallback_id = entry_id.rsplit('-').next().filter(|id| !id.is_empty());
    match parse_tweet(&result, fallback_id) {
        Ok(tweet) => Some(tweet),
        Err(error) => {
            warn!(entry = entry_id, path = error.path(), %error, "dropping malformed timeline entry");
            None
        }
    }
}

fn read_cursor(page: &mut Timeline, entry: &Node<'_>, content: &Node<'_>) {
    let value = content
        .get("value")
        .text()
        .or_else(|| content.get("content").get("value").text());
    let Some(value) = value else {
        return;
    };

    let cursor_type = content
        .get("cursorType")
        .str()
        .or_else(|| content.get("content").get("cursorType").str())
        .map(str::to_ascii_lowercase);
    let entry_id = entry.get("entryId").str().unwrap_or_default();

    let is_top = match cursor_type.as_deref() {
        Some(kind) => kind == "top",
        None => entry_id.contains("cursor-top"),
    };
    let is_bottom = match cursor_type.as_deref() {
        Some(kind) => kind == "bottom",
        None => entry_id.contains("cursor-bottom"),
    };

    if is_top {
        page.top_cursor = Some(value);
    } else if is_bottom {
        page.cursor = Some(value);
    }
}

fn mark_pinned(tweet: Tweet) -> Tweet {
    match tweet {
        Tweet::Available(mut body) => {
            body.pinned = true;
            Tweet::Available(body)
        }
        tombstone => tombstone,
    }
}
