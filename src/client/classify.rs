//! Classification of upstream responses
//!
//! Decides, from status code, headers and body alone, whether a call
//! succeeded and what it means for the session that made it.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::transport::{RawResponse, TransportError};
use crate::parser::{decode_body, ParseError};
use crate::session::Outcome;

/// GraphQL error code for an exhausted rate-limit window
const CODE_RATE_LIMITED: i64 = 88;

/// GraphQL error codes meaning the session's credentials are unusable
const AUTH_CODES: [i64; 5] = [32, 64, 89, 239, 326];

/// GraphQL error codes meaning the requested entity does not exist
const NOT_FOUND_CODES: [i64; 4] = [34, 50, 63, 144];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Classified {
    /// A decoded document with usable data
    Success(Value),
    RateLimited { reset_at: Option<DateTime<Utc>> },
    AuthInvalid { detail: String },
    NotFound,
    Transient { detail: String },
    /// The body could not be decoded at all
    Unparseable(ParseError),
}

impl Classified {
    /// What the call tells the pool about the session that made it
    pub(crate) fn outcome(&self) -> Outcome {
        match self {
            Classified::Success(_) | Classified::Unparseable(_) => Outcome::Success,
            Classified::RateLimited { reset_at } => Outcome::RateLimited {
                reset_at: *reset_at,
            },
            Classified::AuthInvalid { .. } => Outcome::AuthRejected,
            Classified::NotFound => Outcome::NotFound,
            Classified::Transient { .. } => Outcome::Transient,
        }
    }
}

pub(crate) fn classify(response: Result<RawResponse, TransportError>) -> Classified {
    let response = match response {
        Ok(response) => response,
        Err(err) if err.timed_out => {
            return Classified::Transient {
                detail: format!("request timed out: {}", err.detail),
            }
        }
        Err(err) => return Classified::Transient { detail: err.detail },
    };

    match response.status {
        429 => {
            return Classified::RateLimited {
                reset_at: response.rate_limit_reset,
            }
        }
        401 | 403 => {
            return Classified::AuthInvalid {
                detail: format!("HTTP {}", response.status),
            }
        }
        404 => return Classified::NotFound,
        status if !(200..300).contains(&status) => {
            return Classified::Transient {
                detail: format!("HTTP {}", status),
            }
        }
        _ => {}
    }

    let doc = match decode_body(&response.body) {
        Ok(doc) => doc,
        Err(err) => return Classified::Unparseable(err),
    };

    let errors = doc
        .get("errors")
        .and_then(Value::as_array)
        .filter(|errors| !errors.is_empty());
    let Some(errors) = errors else {
        return Classified::Success(doc);
    };

    let has_data = doc
        .get("data")
        .and_then(Value::as_object)
        .is_some_and(|data| !data.is_empty());
    if has_data {
        debug!(errors = errors.len(), "upstream returned partial errors alongside data");
        return Classified::Success(doc);
    }

    classify_errors(errors, response.rate_limit_reset)
}

fn classify_errors(errors: &[Value], reset_at: Option<DateTime<Utc>>) -> Classified {
    let codes: Vec<i64> = errors
        .iter()
        .filter_map(|e| e.get("code").and_then(Value::as_i64))
        .collect();
    let detail = errors
        .iter()
        .map(|e| {
            e.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string())
        })
        .collect::<Vec<_>>()
        .join(", ");

    if codes.contains(&CODE_RATE_LIMITED) {
        Classified::RateLimited { reset_at }
    } else if codes.iter().any(|code| AUTH_CODES.contains(code)) {
        Classified::AuthInvalid { detail }
    } else if codes.iter().any(|code| NOT_FOUND_CODES.contains(code)) {
        Classified::NotFound
    } else {
        Classified::Transient {
            detail: format!("upstream error: {}", detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str) -> Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status,
            rate_limit_reset: None,
            body: body.to_string(),
        })
    }

    #[test]
    fn test_success_with_data() {
        let classified = classify(response(200, r#"{"data": {"user": {}}}"#));
        assert_eq!(classified, Classified::Success(json!({"data": {"user": {}}})));
        assert_eq!(classified.outcome(), Outcome::Success);
    }

    #[test]
    fn test_rate_limit_status_carries_reset() {
        let reset = Utc::now();
        let classified = classify(Ok(RawResponse {
            status: 429,
            rate_limit_reset: Some(reset),
            body: String::new(),
        }));
        assert_eq!(
            classified.outcome(),
            Outcome::RateLimited {
                reset_at: Some(reset)
            }
        );
    }

    #[test]
    fn test_status_codes() {
        assert!(matches!(
            classify(response(401, "")),
            Classified::AuthInvalid { .. }
        ));
        assert!(matches!(
            classify(response(403, "")),
            Classified::AuthInvalid { .. }
        ));
        assert_eq!(classify(response(404, "")), Classified::NotFound);
        assert!(matches!(
            classify(response(503, "")),
            Classified::Transient { .. }
        ));
        assert!(matches!(
            classify(response(418, "")),
            Classified::Transient { .. }
        ));
    }

    #[test]
    fn test_transport_failures_are_transient() {
        let timed_out = classify(Err(TransportError {
            timed_out: true,
            detail: "deadline".to_string(),
        }));
        match timed_out {
            Classified::Transient { detail } => assert!(detail.contains("timed out")),
            other => panic!("expected transient, got {:?}", other),
        }
        assert_eq!(
            classify(Err(TransportError {
                timed_out: false,
                detail: "connection refused".to_string(),
            }))
            .outcome(),
            Outcome::Transient
        );
    }

    #[test]
    fn test_graphql_error_codes() {
        let body = |code: i64| format!(r#"{{"errors": [{{"code": {}, "message": "m"}}]}}"#, code);

        assert!(matches!(
            classify(response(200, &body(88))),
            Classified::RateLimited { .. }
        ));
        assert!(matches!(
            classify(response(200, &body(326))),
            Classified::AuthInvalid { .. }
        ));
        assert_eq!(classify(response(200, &body(144))), Classified::NotFound);
        assert!(matches!(
            classify(response(200, &body(131))),
            Classified::Transient { .. }
        ));
    }

    #[test]
    fn test_errors_alongside_data_are_tolerated() {
        let body = r#"{"errors": [{"code": 37, "message": "partial"}], "data": {"user": {"result": {}}}}"#;
        assert!(matches!(
            classify(response(200, body)),
            Classified::Success(_)
        ));
    }

    #[test]
    fn test_non_json_body_is_parse_failure_at_root() {
        match classify(response(200, "<html>oops</html>")) {
            Classified::Unparseable(err) => assert_eq!(err.path(), "$"),
            other => panic!("expected parse failure, got {:?}", other),
        }
    }
}
