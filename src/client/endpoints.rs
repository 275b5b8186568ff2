//! Upstream GraphQL endpoints and request variables

use std::sync::OnceLock;

use serde_json::{json, Map, Value};

/// Root of the upstream GraphQL API
pub const GRAPHQL_BASE: &str = "https://api.x.com/graphql";

/// The upstream operations this client issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    UserByScreenName,
    UserById,
    UserTweets,
    UserTweetsAndReplies,
    TweetResult,
    Search,
}

impl Operation {
    /// Name used in cache keys, logs and error contexts
    pub fn name(self) -> &'static str {
        match self {
            Operation::UserByScreenName => "get_user_by_screen_name",
            Operation::UserById => "get_user_by_id",
            Operation::UserTweets => "get_user_tweets",
            Operation::UserTweetsAndReplies => "get_user_tweets_and_replies",
            Operation::TweetResult => "get_tweet",
            Operation::Search => "search_tweets",
        }
    }
}

/// Query ids of the upstream operations, as `{query id}/{operation name}`
///
/// Query ids rotate whenever the upstream redeploys, so all of them can be
/// overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub base_url: String,
    pub user_by_screen_name: String,
    pub user_by_id: String,
    pub user_tweets: String,
    pub user_tweets_and_replies: String,
    pub tweet_result: String,
    pub search: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            base_url: GRAPHQL_BASE.to_string(),
            user_by_screen_name: "u7wQyGi6oExe8_TRWGMq4Q/UserResultByScreenNameQuery".to_string(),
            user_by_id: "oPppcargziU1uDQHAUmH-A/UserResultByIdQuery".to_string(),
            user_tweets: "JLApJKFY0MxGTzCoK6ps8Q/UserWithProfileTweetsQueryV2".to_string(),
            user_tweets_and_replies: "Y86LQY7KMvxn5tu3hFTyPg/UserWithProfileTweetsAndRepliesQueryV2"
                .to_string(),
            tweet_result: "sITyJdhRPpvpEjg4waUmTA/TweetResultByIdQuery".to_string(),
            search: "nK1dw4oV3k4w5TdtcAdSww/SearchTimeline".to_string(),
        }
    }
}

impl Endpoints {
    pub fn url(&self, operation: Operation) -> String {
        let path = match operation {
            Operation::UserByScreenName => &self.user_by_screen_name,
            Operation::UserById => &self.user_by_id,
            Operation::UserTweets => &self.user_tweets,
            Operation::UserTweetsAndReplies => &self.user_tweets_and_replies,
            Operation::TweetResult => &self.tweet_result,
            Operation::Search => &self.search,
        };
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Feature flags sent with every request, serialized once
pub fn features() -> &'static str {
    static FEATURES: OnceLock<String> = OnceLock::new();
    FEATURES.get_or_init(|| {
        const ENABLED: &[&str] = &[
            "creator_subscriptions_tweet_preview_api_enabled",
            "longform_notetweets_consumption_enabled",
            "longform_notetweets_richtext_consumption_enabled",
            "responsive_web_graphql_exclude_directive_enabled",
            "responsive_web_twitter_blue_verified_badge_is_enabled",
            "rweb_lists_timeline_redesign_enabled",
            "spaces_2022_h2_clipping",
            "spaces_2022_h2_spaces_communities",
            "subscriptions_verification_info_enabled",
            "subscriptions_verification_info_reason_enabled",
            "subscriptions_verification_info_verified_since_enabled",
        ];
        const DISABLED: &[&str] = &[
            "android_graphql_skip_api_media_color_palette",
            "articles_api_enabled",
            "articles_preview_enabled",
            "blue_business_profile_image_shape_enabled",
            "c9s_tweet_anatomy_moderator_badge_enabled",
            "communities_web_enable_tweet_community_results_fetch",
            "creator_subscriptions_quote_tweet_preview_enabled",
            "creator_subscriptions_subscription_count_enabled",
            "freedom_of_speech_not_reach_fetch_enabled",
            "graphql_is_translatable_rweb_tweet_is_translatable_enabled",
            "hidden_profile_likes_enabled",
            "highlights_tweets_tab_ui_enabled",
            "immersive_video_status_linkable_timestamps",
            "interactive_text_enabled",
            "longform_notetweets_inline_media_enabled",
            "longform_notetweets_rich_text_read_enabled",
            "premium_content_api_read_enabled",
            "profile_label_improvements_pcf_label_in_post_enabled",
            "responsive_web_edit_tweet_api_enabled",
            "responsive_web_enhance_cards_enabled",
            "responsive_web_graphql_skip_user_profile_image_extensions_enabled",
            "responsive_web_graphql_timeline_navigation_enabled",
            "responsive_web_grok_analysis_button_from_backend",
            "responsive_web_grok_analyze_button_fetch_trends_enabled",
            "responsive_web_grok_analyze_post_followups_enabled",
            "responsive_web_grok_image_annotation_enabled",
            "responsive_web_grok_share_attachment_enabled",
            "responsive_web_jetfuel_frame",
            "responsive_web_media_download_video_enabled",
            "responsive_web_text_conversations_enabled",
            "responsive_web_twitter_article_tweet_consumption_enabled",
            "rweb_tipjar_consumption_enabled",
            "rweb_video_timestamps_enabled",
            "standardized_nudges_misinfo",
            "super_follow_badge_privacy_enabled",
            "super_follow_exclusive_tweet_notifications_enabled",
            "super_follow_tweet_api_enabled",
            "super_follow_user_api_enabled",
            "tweet_awards_web_tipping_enabled",
            "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled",
            "tweetypie_unmention_optimization_enabled",
            "unified_cards_ad_metadata_container_dynamic_card_content_query_enabled",
            "verified_phone_label_enabled",
            "vibe_api_enabled",
            "view_counts_everywhere_api_enabled",
        ];

        let flags: Map<String, Value> = ENABLED
            .iter()
            .map(|name| (name.to_string(), Value::Bool(true)))
            .chain(DISABLED.iter().map(|name| (name.to_string(), Value::Bool(false))))
            .collect();
        Value::Object(flags).to_string()
    })
}

pub fn user_variables(handle: &str) -> Value {
    json!({ "screen_name": handle })
}

pub fn user_id_variables(user_id: &str) -> Value {
    json!({ "rest_id": user_id })
}

pub fn timeline_variables(user_id: &str, cursor: Option<&str>, count: u32) -> Value {
    let mut variables = json!({
        "userId": user_id,
        "count": count,
        "includePromotedContent": false,
        "withDownvotePerspective": false,
        "withReactionsMetadata": false,
        "withReactionsPerspective": false,
        "withVoice": false,
        "withV2Timeline": true,
    });
    with_cursor(&mut variables, cursor);
    variables
}

pub fn tweet_variables(tweet_id: &str) -> Value {
    json!({
        "rest_id": tweet_id,
        "includePromotedContent": false,
        "withCommunity": false,
        "withVoice": false,
    })
}

pub fn search_variables(query: &str, cursor: Option<&str>, count: u32) -> Value {
    let mut variables = json!({
        "rawQuery": query,
        "count": count,
        "querySource": "typed_query",
        "product": "Latest",
        "withDownvotePerspective": false,
        "withReactionsMetadata": false,
        "withReactionsPerspective": false,
    });
    with_cursor(&mut variables, cursor);
    variables
}

fn with_cursor(variables: &mut Value, cursor: Option<&str>) {
    if let (Some(cursor), Some(object)) = (cursor, variables.as_object_mut()) {
        object.insert("cursor".to_string(), Value::String(cursor.to_string()));
    }
}
