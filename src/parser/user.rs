//! Account lookups: user-by-screen-name and user-by-id responses
//!
//! Expected fragment: `data.user_result.result` (mobile) or `data.user.result`
//! (web). Newer payloads moved `screen_name`, `name` and `created_at` from
//! `legacy` into `core`; both placements are accepted.

use serde_json::Value;

use super::{data_root, Node, ParseError};
use crate::data::{Account, UnavailableReason, User, VerifiedType};

/// Parses an account lookup response.
///
/// `lookup` is the handle or id the request was made with; it identifies the
/// sentinel when the account is unavailable. Returns `Ok(None)` when the
/// upstream answered with an empty result, meaning the account does not exist.
pub fn parse_user_result(doc: &Value, lookup: &str) -> Result<Option<Account>, ParseError> {
    let result = data_root(doc)?
        .get_any(&["user_result", "user"])
        .get("result");
    if !result.is_present() {
        return Ok(None);
    }
    parse_account(&result, lookup).map(Some)
}

pub(crate) fn parse_account(node: &Node<'_>, lookup: &str) -> Result<Account, ParseError> {
    if node.typename() == Some("UserUnavailable") {
        return Ok(Account::Unavailable {
            lookup: lookup.to_string(),
            reason: unavailable_reason(node.get("reason").str()),
        });
    }

    let user = parse_user(node)?;
    if user.protected {
        Ok(Account::Protected(user))
    } else {
        Ok(Account::Active(user))
    }
}

fn unavailable_reason(raw: Option<&str>) -> UnavailableReason {
    match raw {
        Some(r) if r.eq_ignore_ascii_case("suspended") => UnavailableReason::Suspended,
        Some(r) if r.eq_ignore_ascii_case("deactivated") => UnavailableReason::Deactivated,
        Some(r) if !r.is_empty() => UnavailableReason::Other(r.to_string()),
        _ => UnavailableReason::Other("unavailable".to_string()),
    }
}

/// Parses a `User` result object. Only the id and handle are required.
pub(crate) fn parse_user(node: &Node<'_>) -> Result<User, ParseError> {
    let legacy = node.get("legacy");
    let core = node.get("core");

    let id = node.get("rest_id").require_id()?;
    let handle = first_present(&legacy, &core, "screen_name").require_text()?;

    let avatar_url = legacy
        .get("profile_image_url_https")
        .text()
        .or_else(|| node.get("avatar").get("image_url").text())
        .unwrap_or_default()
        .replace("_normal", "_400x400");

    let website = legacy
        .get("entities")
        .get("url")
        .get("urls")
        .items()
        .first()
        .and_then(|url| url.get("expanded_url").text())
        .or_else(|| legacy.get("url").text())
        .unwrap_or_default();

    let location = legacy
        .get("location")
        .text()
        .or_else(|| node.get("location").get("location").text())
        .unwrap_or_default();

    let protected = legacy.get("protected").flag() || node.get("privacy").get("protected").flag();

    Ok(User {
        id,
        handle,
        display_name: first_present(&legacy, &core, "name").string_or_default(),
        bio: legacy.get("description").string_or_default(),
        location,
        website,
        avatar_url,
        banner_url: legacy.get("profile_banner_url").string_or_default(),
        followers: legacy.get("followers_count").counter(),
        following: legacy.get("friends_count").counter(),
        tweets: legacy.get("statuses_count").counter(),
        likes: legacy.get("favourites_count").counter(),
        media: legacy.get("media_count").counter(),
        verified: verified_type(node),
        protected,
        join_date: first_present(&legacy, &core, "created_at").date(),
        pinned_tweet_id: legacy
            .get("pinned_tweet_ids_str")
            .items()
            .first()
            .and_then(Node::id),
    })
}

/// Looks a field up in `legacy`, then in its newer home
fn first_present<'a>(legacy: &Node<'a>, newer: &Node<'a>, key: &str) -> Node<'a> {
    let node = legacy.get(key);
    if node.is_present() {
        node
    } else {
        let moved = newer.get(key);
        if moved.is_present() {
            moved
        } else {
            node
        }
    }
}

fn verified_type(node: &Node<'_>) -> VerifiedType {
    let legacy = node.get("legacy");
    let kind = legacy
        .get("verified_type")
        .str()
        .or_else(|| node.get("verification").get("verified_type").str());
    match kind {
        Some("Business") => VerifiedType::Business,
        Some("Government") => VerifiedType::Government,
        _ if legacy.get("verified").flag() || node.get("is_blue_verified").flag() => {
            VerifiedType::Blue
        }
        _ => VerifiedType::None,
    }
}
