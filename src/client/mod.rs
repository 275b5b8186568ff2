//! Graph client
//!
//! One method per upstream capability. Each call goes through the cache
//! store; on a miss it leases a session, issues the request, reports the
//! outcome to the pool, and parses the body. Rate limits and transient
//! failures are retried once with a freshly acquired session.

mod classify;
mod endpoints;
mod transport;

pub use endpoints::{Endpoints, Operation, GRAPHQL_BASE};
pub use transport::{GraphRequest, HttpTransport, RawResponse, Transport, TransportError};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CachePolicy, CacheStore};
use crate::config::{CachePolicies, ClientConfig};
use crate::data::{Account, Profile, Timeline, Tweet};
use crate::error::{ClientError, RequestContext};
use crate::parser::{
    parse_search_timeline, parse_tweet_result, parse_user_result, parse_user_timeline, ParseError,
};
use crate::session::{PoolError, SessionFileError, SessionPool};
use classify::{classify, Classified};

/// Errors building a client from configuration
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Sessions(#[from] SessionFileError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Why one attempt at an upstream call failed
enum Failure {
    /// No session could be leased
    Exhausted(PoolError),
    /// Worth one more try with another session
    Retryable(ClientError),
    Final(ClientError),
}

struct ClientInner {
    pool: Arc<SessionPool>,
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    policies: CachePolicies,
    page_size: u32,
}

impl ClientInner {
    /// Runs one logical request: an attempt plus at most one retry
    async fn fetch(
        &self,
        context: &RequestContext,
        operation: Operation,
        variables: &Value,
    ) -> Result<Value, ClientError> {
        let first = match self.attempt(context, operation, variables).await {
            Ok(doc) => return Ok(doc),
            Err(Failure::Final(err)) => return Err(err),
            Err(Failure::Exhausted(PoolError::Exhausted {
                total,
                next_available,
            })) => {
                return Err(ClientError::ExhaustedPool {
                    context: context.clone(),
                    total,
                    next_available,
                })
            }
            Err(Failure::Retryable(err)) => err,
        };

        debug!(%context, error = %first, "retrying with another session");
        match self.attempt(context, operation, variables).await {
            Ok(doc) => Ok(doc),
            Err(Failure::Retryable(err)) | Err(Failure::Final(err)) => Err(err),
            // Nothing left to retry with; the original failure is the answer
            Err(Failure::Exhausted(_)) => Err(first),
        }
    }

    async fn attempt(
        &self,
        context: &RequestContext,
        operation: Operation,
        variables: &Value,
    ) -> Result<Value, Failure> {
        let lease = self.pool.acquire().map_err(Failure::Exhausted)?;
        let request = GraphRequest {
            operation,
            url: self.endpoints.url(operation),
            variables: variables.clone(),
            credentials: lease.credentials().clone(),
        };

        let classified = classify(self.transport.send(&request).await);
        self.pool.report_outcome(&lease, classified.outcome());

        match classified {
            Classified::Success(doc) => Ok(doc),
            Classified::RateLimited { reset_at } => Err(Failure::Retryable(ClientError::RateLimited {
                context: context.clone(),
                retry_at: reset_at,
            })),
            Classified::Transient { detail } => {
                debug!(%context, account_id = lease.account_id(), %detail, "transient upstream failure");
                Err(Failure::Retryable(ClientError::Transient {
                    context: context.clone(),
                    detail,
                }))
            }
            Classified::AuthInvalid { detail } => {
                warn!(%context, account_id = lease.account_id(), %detail, "upstream rejected session");
                Err(Failure::Final(ClientError::AuthInvalid {
                    context: context.clone(),
                    account_id: lease.account_id().to_string(),
                }))
            }
            Classified::NotFound => Err(Failure::Final(ClientError::not_found(context))),
            Classified::Unparseable(err) => {
                warn!(%context, path = err.path(), error = %err, "upstream body is not JSON");
                Err(Failure::Final(ClientError::parse(context, err)))
            }
        }
    }
}

/// Client for the upstream GraphQL API; cheap to clone
#[derive(Clone)]
pub struct GraphClient {
    inner: Arc<ClientInner>,
    cache: CacheStore<ClientError>,
}

impl GraphClient {
    pub fn new(
        pool: Arc<SessionPool>,
        cache: CacheStore<ClientError>,
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                pool,
                transport,
                endpoints: config.endpoints.clone(),
                policies: config.policies,
                page_size: config.page_size,
            }),
            cache,
        }
    }

    /// Builds a client talking HTTPS to the upstream, with sessions and
    /// cache location taken from `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self, SetupError> {
        let pool = SessionPool::from_file(&config.sessions_path, config.default_backoff)?;
        let cache = CacheStore::new(
            config.disk_cache(),
            config.wait_timeout,
            config.stale_retention,
        );
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::new(Arc::new(pool), cache, Arc::new(transport), config))
    }

    pub fn pool(&self) -> &SessionPool {
        &self.inner.pool
    }

    pub fn cache(&self) -> &CacheStore<ClientError> {
        &self.cache
    }

    /// Looks up an account by handle; a leading `@` is ignored
    pub async fn get_user_by_screen_name(&self, handle: &str) -> Result<Account, ClientError> {
        let handle = handle.trim().trim_start_matches('@');
        let operation = Operation::UserByScreenName;
        let lookup = handle.to_string();
        self.cached(
            CacheKey::operation(operation.name()).param(handle.to_ascii_lowercase()),
            self.inner.policies.users,
            RequestContext::new(operation.name()).with("handle", handle),
            operation,
            endpoints::user_variables(handle),
            move |doc| parse_user_result(doc, &lookup),
        )
        .await
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Result<Account, ClientError> {
        let operation = Operation::UserById;
        let lookup = user_id.to_string();
        self.cached(
            CacheKey::operation(operation.name()).param(user_id),
            self.inner.policies.users,
            RequestContext::new(operation.name()).with("user_id", user_id),
            operation,
            endpoints::user_id_variables(user_id),
            move |doc| parse_user_result(doc, &lookup),
        )
        .await
    }

    /// A page of the user's tweets, without replies
    pub async fn get_user_tweets(
        &self,
        user_id: &str,
        cursor: Option<&str>,
    ) -> Result<Timeline, ClientError> {
        self.user_timeline(Operation::UserTweets, user_id, cursor).await
    }

    pub async fn get_user_tweets_and_replies(
        &self,
        user_id: &str,
        cursor: Option<&str>,
    ) -> Result<Timeline, ClientError> {
        self.user_timeline(Operation::UserTweetsAndReplies, user_id, cursor)
            .await
    }

    async fn user_timeline(
        &self,
        operation: Operation,
        user_id: &str,
        cursor: Option<&str>,
    ) -> Result<Timeline, ClientError> {
        self.cached(
            CacheKey::operation(operation.name())
                .param(user_id)
                .optional(cursor),
            self.inner.policies.timelines,
            RequestContext::new(operation.name())
                .with("user_id", user_id)
                .with_optional("cursor", cursor),
            operation,
            endpoints::timeline_variables(user_id, cursor, self.inner.page_size),
            parse_user_timeline,
        )
        .await
    }

    /// A single tweet; deleted tweets come back as [`Tweet::Tombstone`]
    pub async fn get_tweet(&self, tweet_id: &str) -> Result<Tweet, ClientError> {
        let operation = Operation::TweetResult;
        let id = tweet_id.to_string();
        self.cached(
            CacheKey::operation(operation.name()).param(tweet_id),
            self.inner.policies.tweets,
            RequestContext::new(operation.name()).with("tweet_id", tweet_id),
            operation,
            endpoints::tweet_variables(tweet_id),
            move |doc| parse_tweet_result(doc, &id),
        )
        .await
    }

    /// Latest tweets matching a search query
    pub async fn search_tweets(
        &self,
        query: &str,
        cursor: Option<&str>,
    ) -> Result<Timeline, ClientError> {
        let operation = Operation::Search;
        self.cached(
            CacheKey::operation(operation.name())
                .param(query)
                .optional(cursor),
            self.inner.policies.searches,
            RequestContext::new(operation.name())
                .with("query", query)
                .with_optional("cursor", cursor),
            operation,
            endpoints::search_variables(query, cursor, self.inner.page_size),
            |doc| parse_search_timeline(doc).map(Some),
        )
        .await
    }

    /// Account plus, for active accounts, the first timeline page and the
    /// pinned tweet
    pub async fn get_profile(
        &self,
        handle: &str,
        cursor: Option<&str>,
    ) -> Result<Profile, ClientError> {
        let account = self.get_user_by_screen_name(handle).await?;
        let timeline = match &account {
            Account::Active(user) => Some(self.get_user_tweets(&user.id, cursor).await?),
            Account::Protected(_) | Account::Unavailable { .. } => None,
        };
        let pinned = timeline.as_ref().and_then(|page| page.pinned.clone());
        Ok(Profile {
            account,
            pinned,
            timeline,
        })
    }

    /// Serves `key` from the cache, computing it with one upstream request
    /// on a miss. `parse` returning `None` means the entity does not exist.
    async fn cached<T, P>(
        &self,
        key: CacheKey,
        policy: CachePolicy,
        context: RequestContext,
        operation: Operation,
        variables: Value,
        parse: P,
    ) -> Result<T, ClientError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        P: Fn(&Value) -> Result<Option<T>, ParseError> + Clone + Send + Sync + 'static,
    {
        let compute = {
            let inner = Arc::clone(&self.inner);
            let context = context.clone();
            move || async move {
                let doc = inner.fetch(&context, operation, &variables).await?;
                let model = match parse(&doc) {
                    Ok(Some(model)) => model,
                    Ok(None) => return Err(ClientError::not_found(&context)),
                    Err(err) => {
                        warn!(%context, path = err.path(), error = %err, "upstream response did not parse");
                        return Err(ClientError::parse(&context, err));
                    }
                };
                serde_json::to_value(&model)
                    .map_err(|e| ClientError::parse(&context, ParseError::InvalidJson(e.to_string())))
            }
        };

        let value = self
            .cache
            .get_or_compute(key.as_str(), policy, compute.clone())
            .await?;
        match serde_json::from_value(value) {
            Ok(model) => Ok(model),
            Err(e) => {
                // Entry written by an incompatible build; replace it
                warn!(%key, error = %e, "discarding undecodable cache entry");
                self.cache.invalidate(key.as_str());
                let value = self
                    .cache
                    .get_or_compute(key.as_str(), policy, compute)
                    .await?;
                serde_json::from_value(value).map_err(|e| {
                    ClientError::parse(&context, ParseError::InvalidJson(e.to_string()))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UnavailableReason;
    use crate::error::ErrorKind;
    use crate::session::{test_record, Health};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use futures::future::join_all;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Plays back canned responses in order and records every request
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
        requests: Mutex<Vec<GraphRequest>>,
        delay: Duration,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<RawResponse, TransportError>>) -> Arc<Self> {
            Self::with_delay(responses, Duration::ZERO)
        }

        fn with_delay(
            responses: Vec<Result<RawResponse, TransportError>>,
            delay: Duration,
        ) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        /// Account ids of the sessions used, in order
        fn accounts(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.credentials.oauth_token.trim_end_matches("-token").to_string())
                .collect()
        }

        fn request(&self, index: usize) -> GraphRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &GraphRequest) -> Result<RawResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| {
                Err(TransportError {
                    timed_out: false,
                    detail: "no scripted response left".to_string(),
                })
            })
        }
    }

    fn ok(body: Value) -> Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status: 200,
            rate_limit_reset: None,
            body: body.to_string(),
        })
    }

    fn status(code: u16) -> Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status: code,
            rate_limit_reset: None,
            body: String::new(),
        })
    }

    fn timeout() -> Result<RawResponse, TransportError> {
        Err(TransportError {
            timed_out: true,
            detail: "operation timed out".to_string(),
        })
    }

    fn user_body(id: &str, handle: &str) -> Value {
        json!({
            "data": {"user_result": {"result": {
                "__typename": "User",
                "rest_id": id,
                "legacy": {"screen_name": handle, "name": handle, "followers_count": 10}
            }}}
        })
    }

    fn tweet_json(id: &str) -> Value {
        json!({
            "__typename": "Tweet",
            "rest_id": id,
            "legacy": {"user_id_str": "42", "full_text": format!("tweet {}", id)}
        })
    }

    fn tweet_body(id: &str) -> Value {
        json!({"data": {"tweet_result": {"result": tweet_json(id)}}})
    }

    fn timeline_body(ids: &[&str], cursor: Option<&str>, pinned: Option<&str>) -> Value {
        let mut entries: Vec<Value> = ids
            .iter()
            .map(|id| {
                json!({
                    "entryId": format!("tweet-{}", id),
                    "content": {
                        "__typename": "TimelineTimelineItem",
                        "content": {"__typename": "TimelineTweet", "tweetResult": {"result": tweet_json(id)}}
                    }
                })
            })
            .collect();
        if let Some(cursor) = cursor {
            entries.push(json!({
                "entryId": "cursor-bottom-1",
                "content": {"__typename": "TimelineTimelineCursor", "cursorType": "Bottom", "value": cursor}
            }));
        }
        let mut instructions = vec![json!({"__typename": "TimelineAddEntries", "entries": entries})];
        if let Some(id) = pinned {
            instructions.push(json!({
                "__typename": "TimelinePinEntry",
                "entry": {
                    "entryId": format!("tweet-{}", id),
                    "content": {
                        "__typename": "TimelineTimelineItem",
                        "content": {"__typename": "TimelineTweet", "tweetResult": {"result": tweet_json(id)}}
                    }
                }
            }));
        }
        json!({
            "data": {"user_result": {"result": {
                "__typename": "User",
                "timeline_response": {"timeline": {"instructions": instructions}}
            }}}
        })
    }

    fn client_with(
        accounts: &[&str],
        transport: Arc<ScriptedTransport>,
        config: &ClientConfig,
    ) -> (GraphClient, Arc<SessionPool>) {
        let pool = Arc::new(SessionPool::new(
            accounts.iter().map(|id| test_record(id)).collect(),
            config.default_backoff,
        ));
        let cache = CacheStore::in_memory(config.wait_timeout, Duration::from_secs(3600));
        let client = GraphClient::new(Arc::clone(&pool), cache, transport, config);
        (client, pool)
    }

    fn client(accounts: &[&str], transport: Arc<ScriptedTransport>) -> (GraphClient, Arc<SessionPool>) {
        client_with(accounts, transport, &ClientConfig::default())
    }

    #[tokio::test]
    async fn test_user_lookup_is_cached() {
        let transport = ScriptedTransport::new(vec![ok(user_body("1", "Alice"))]);
        let (client, _pool) = client(&["a"], Arc::clone(&transport));

        let account = client.get_user_by_screen_name("@Alice").await.unwrap();
        assert_eq!(account.user().unwrap().handle, "Alice");

        let again = client.get_user_by_screen_name("alice").await.unwrap();
        assert_eq!(again, account);
        assert_eq!(transport.calls(), 1);
        assert!(client
            .cache()
            .entry("twitter_client.get_user_by_screen_name.alice")
            .is_some());
        assert_eq!(transport.request(0).variables["screen_name"], "Alice");
    }

    #[tokio::test]
    async fn test_rate_limited_session_is_rotated_out() {
        let transport = ScriptedTransport::new(vec![
            status(429),
            ok(tweet_body("1")),
            ok(tweet_body("2")),
            ok(tweet_body("3")),
        ]);
        let (client, pool) = client(&["a", "b", "c"], Arc::clone(&transport));

        client.get_tweet("1").await.unwrap();
        assert!(matches!(
            pool.statuses()[0].health,
            Health::RateLimited { .. }
        ));

        client.get_tweet("2").await.unwrap();
        client.get_tweet("3").await.unwrap();
        assert_eq!(transport.accounts(), vec!["a", "b", "c", "b"]);
    }

    #[tokio::test]
    async fn test_transient_twice_surfaces_and_caches_nothing() {
        let transport = ScriptedTransport::new(vec![timeout(), status(503)]);
        let (client, pool) = client(&["a", "b"], Arc::clone(&transport));

        let err = client.get_user_by_screen_name("alice").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(err.context().operation, "get_user_by_screen_name");
        assert_eq!(transport.calls(), 2);
        assert!(client
            .cache()
            .entry("twitter_client.get_user_by_screen_name.alice")
            .is_none());
        // Transient failures do not quarantine sessions
        assert!(pool.statuses().iter().all(|s| s.health == Health::Healthy));
    }

    #[tokio::test]
    async fn test_two_full_length_timeouts_report_the_operation() {
        let config = ClientConfig::default().with_request_timeout(Duration::from_millis(100));
        let transport =
            ScriptedTransport::with_delay(vec![timeout(), timeout()], Duration::from_millis(100));
        let (client, _pool) = client_with(&["a", "b"], Arc::clone(&transport), &config);

        let err = client.get_user_by_screen_name("alice").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(err.context().operation, "get_user_by_screen_name");
        assert_eq!(err.context().params, vec![("handle", "alice".to_string())]);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_slow_retry_result_reaches_every_caller() {
        let config = ClientConfig::default().with_request_timeout(Duration::from_millis(100));
        let transport = ScriptedTransport::with_delay(
            vec![timeout(), ok(user_body("1", "alice"))],
            Duration::from_millis(100),
        );
        let (client, _pool) = client_with(&["a", "b"], Arc::clone(&transport), &config);

        let late = async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            client.get_user_by_screen_name("alice").await
        };
        let (first, late) = tokio::join!(client.get_user_by_screen_name("alice"), late);

        assert_eq!(first.unwrap().user().unwrap().id, "1");
        assert_eq!(late.unwrap().user().unwrap().id, "1");
        assert_eq!(transport.calls(), 2);
        assert!(client
            .cache()
            .entry("twitter_client.get_user_by_screen_name.alice")
            .is_some());
    }

    #[tokio::test]
    async fn test_rate_limited_twice_then_exhausted() {
        let transport = ScriptedTransport::new(vec![status(429), status(429)]);
        let (client, _pool) = client(&["a", "b"], Arc::clone(&transport));

        let err = client.get_tweet("1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);

        let err = client.get_tweet("1").await.unwrap_err();
        match err {
            ClientError::ExhaustedPool {
                total,
                next_available,
                ..
            } => {
                assert_eq!(total, 2);
                assert!(next_available.unwrap() > Utc::now());
            }
            other => panic!("expected exhausted pool, got {:?}", other),
        }
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_without_spare_session_reports_original_failure() {
        let reset = Utc::now() + ChronoDuration::minutes(5);
        let transport = ScriptedTransport::new(vec![Ok(RawResponse {
            status: 429,
            rate_limit_reset: Some(reset),
            body: String::new(),
        })]);
        let (client, _pool) = client(&["a"], Arc::clone(&transport));

        match client.get_tweet("1").await.unwrap_err() {
            ClientError::RateLimited { retry_at, .. } => assert_eq!(retry_at, Some(reset)),
            other => panic!("expected rate limited, got {:?}", other),
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_invalidates_session_without_retry() {
        let transport = ScriptedTransport::new(vec![status(401), ok(tweet_body("1"))]);
        let (client, pool) = client(&["a", "b"], Arc::clone(&transport));

        match client.get_tweet("1").await.unwrap_err() {
            ClientError::AuthInvalid { account_id, .. } => assert_eq!(account_id, "a"),
            other => panic!("expected auth invalid, got {:?}", other),
        }
        assert_eq!(transport.calls(), 1);
        assert_eq!(pool.statuses()[0].health, Health::Invalid);

        client.get_tweet("1").await.unwrap();
        assert_eq!(transport.accounts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_not_found_is_distinct_and_not_retried() {
        let transport = ScriptedTransport::new(vec![ok(json!({"data": {}})), status(404)]);
        let (client, _pool) = client(&["a", "b"], Arc::clone(&transport));

        let err = client.get_user_by_screen_name("nobody").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = client.get_tweet("404").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_pool_makes_no_request() {
        let transport = ScriptedTransport::new(vec![]);
        let (client, _pool) = client(&[], Arc::clone(&transport));

        let err = client.get_tweet("1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExhaustedPool);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_share_one_call() {
        let transport =
            ScriptedTransport::with_delay(vec![ok(tweet_body("7"))], Duration::from_millis(50));
        let (client, _pool) = client(&["a", "b"], Arc::clone(&transport));

        let results = join_all((0..8).map(|_| client.get_tweet("7"))).await;
        assert_eq!(transport.calls(), 1);
        for result in results {
            assert_eq!(result.unwrap().id(), "7");
        }
    }

    #[tokio::test]
    async fn test_stale_tweet_served_when_upstream_fails() {
        let mut config = ClientConfig::default();
        config.policies.tweets = CachePolicy::new(Duration::ZERO, true);
        let transport =
            ScriptedTransport::new(vec![ok(tweet_body("9")), timeout(), timeout()]);
        let (client, _pool) = client_with(&["a", "b"], Arc::clone(&transport), &config);

        let fresh = client.get_tweet("9").await.unwrap();
        let stale = client.get_tweet("9").await.unwrap();
        assert_eq!(stale, fresh);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_unparseable_response_names_field_path() {
        let transport = ScriptedTransport::new(vec![ok(json!({
            "data": {"tweet_result": {"result": {"__typename": "Tweet", "rest_id": "1"}}}
        }))]);
        let (client, pool) = client(&["a"], Arc::clone(&transport));

        match client.get_tweet("1").await.unwrap_err() {
            ClientError::UpstreamParse { source, .. } => {
                assert_eq!(source.path(), "$.data.tweet_result.result.legacy.user_id_str");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
        assert_eq!(transport.calls(), 1);
        assert_eq!(pool.statuses()[0].health, Health::Healthy);
    }

    #[tokio::test]
    async fn test_deleted_tweet_is_tombstone() {
        let transport = ScriptedTransport::new(vec![ok(json!({
            "data": {"tweet_result": {"result": {
                "__typename": "TweetTombstone",
                "tombstone": {"text": {"text": "This Post was deleted by the Post author."}}
            }}}
        }))]);
        let (client, _pool) = client(&["a"], transport);

        let tweet = client.get_tweet("55").await.unwrap();
        assert!(tweet.is_tombstone());
        assert_eq!(tweet.id(), "55");
    }

    #[tokio::test]
    async fn test_timeline_pages_are_keyed_by_cursor() {
        let transport = ScriptedTransport::new(vec![
            ok(timeline_body(&["3", "2"], Some("NEXT"), None)),
            ok(timeline_body(&["1"], None, None)),
        ]);
        let (client, _pool) = client(&["a"], Arc::clone(&transport));

        let first = client.get_user_tweets("42", None).await.unwrap();
        assert_eq!(first.cursor.as_deref(), Some("NEXT"));

        let second = client.get_user_tweets("42", first.cursor.as_deref()).await.unwrap();
        assert!(second.is_exhausted());

        assert_eq!(transport.calls(), 2);
        assert!(transport.request(0).variables.get("cursor").is_none());
        assert_eq!(transport.request(1).variables["cursor"], "NEXT");
        assert!(client
            .cache()
            .entry("twitter_client.get_user_tweets.42.~")
            .is_some());
    }

    #[tokio::test]
    async fn test_profile_combines_account_and_timeline() {
        let transport = ScriptedTransport::new(vec![
            ok(user_body("42", "bob")),
            ok(timeline_body(&["3"], Some("NEXT"), Some("1"))),
        ]);
        let (client, _pool) = client(&["a"], Arc::clone(&transport));

        let profile = client.get_profile("bob", None).await.unwrap();
        assert_eq!(profile.account.handle(), "bob");
        let pinned = profile.pinned.unwrap();
        assert_eq!(pinned.id(), "1");
        assert!(pinned.body().unwrap().pinned);
        assert_eq!(profile.timeline.unwrap().tweets.len(), 1);
        assert_eq!(transport.request(1).operation, Operation::UserTweets);
        assert_eq!(transport.request(1).variables["userId"], "42");
    }

    #[tokio::test]
    async fn test_profile_of_suspended_account_skips_timeline() {
        let transport = ScriptedTransport::new(vec![ok(json!({
            "data": {"user_result": {"result": {"__typename": "UserUnavailable", "reason": "Suspended"}}}
        }))]);
        let (client, _pool) = client(&["a"], Arc::clone(&transport));

        let profile = client.get_profile("spammer", None).await.unwrap();
        assert_eq!(
            profile.account,
            Account::Unavailable {
                lookup: "spammer".to_string(),
                reason: UnavailableReason::Suspended,
            }
        );
        assert!(profile.timeline.is_none());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_search_uses_search_endpoint() {
        let transport = ScriptedTransport::new(vec![ok(json!({
            "data": {"search_by_raw_query": {"search_timeline": {"timeline": {"instructions": [
                {"type": "TimelineAddEntries", "entries": [{
                    "entryId": "tweet-5",
                    "content": {
                        "entryType": "TimelineTimelineItem",
                        "itemContent": {"__typename": "TimelineTweet", "tweet_results": {"result": tweet_json("5")}}
                    }
                }]}
            ]}}}}
        }))]);
        let (client, _pool) = client(&["a"], Arc::clone(&transport));

        let page = client.search_tweets("rust lang", None).await.unwrap();
        assert_eq!(page.tweets.len(), 1);
        let request = transport.request(0);
        assert_eq!(request.operation, Operation::Search);
        assert!(request.url.ends_with("/SearchTimeline"));
        assert_eq!(request.variables["rawQuery"], "rust lang");
    }
}
