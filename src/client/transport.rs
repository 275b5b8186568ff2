//! Network seam between the graph client and the upstream

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use super::endpoints::{features, Operation};
use crate::session::Credentials;

/// One upstream GraphQL call
#[derive(Debug, Clone)]
pub struct GraphRequest {
    pub operation: Operation,
    pub url: String,
    pub variables: Value,
    pub credentials: Credentials,
}

/// Status, rate-limit signal and body of an upstream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// From the `x-rate-limit-reset` header
    pub rate_limit_reset: Option<DateTime<Utc>>,
    pub body: String,
}

/// The request never produced a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct TransportError {
    pub timed_out: bool,
    pub detail: String,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            timed_out: err.is_timeout(),
            detail: err.to_string(),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &GraphRequest) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] over HTTPS
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: Client,
}

impl HttpTransport {
    /// Every request made through the transport is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &GraphRequest) -> Result<RawResponse, TransportError> {
        let variables = request.variables.to_string();
        let response = self
            .http_client
            .get(&request.url)
            .query(&[("variables", variables.as_str()), ("features", features())])
            .header(
                AUTHORIZATION,
                format!("Bearer {}", request.credentials.oauth_token),
            )
            .header("x-twitter-active-user", "yes")
            .header("x-twitter-client-language", "en")
            .header(ACCEPT, "*/*")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header("DNT", "1")
            .send()
            .await?;

        let status = response.status().as_u16();
        let rate_limit_reset = response
            .headers()
            .get("x-rate-limit-reset")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_reset);
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            rate_limit_reset,
            body,
        })
    }
}

/// Parses a rate-limit reset given in epoch seconds
pub(crate) fn parse_reset(raw: &str) -> Option<DateTime<Utc>> {
    let seconds = raw.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(seconds, 0)
}
