//! Single-attempt request execution.
//!
//! [`execute`] performs exactly one network exchange through a
//! [`Transport`], bounded by a deadline and abandonable through a
//! cancellation token, and turns the outcome into either a decoded success
//! payload or a classified [`SummaryError`]:
//!
//! | Outcome                                  | Result                       |
//! |------------------------------------------|------------------------------|
//! | token cancelled first                    | `Cancelled`                  |
//! | deadline elapsed first                   | `Timeout`                    |
//! | transport error                          | `Network`                    |
//! | 400 with a non-empty `errors` list       | `Validation`                 |
//! | any other non-2xx                        | `Http { status, body }`      |
//! | 2xx, body decodes                        | `Ok(T)`                      |
//! | 2xx, body does not decode                | `Decode`                     |
//!
//! When the deadline or the token wins, the in-flight exchange future is
//! dropped; whatever the transport was doing is discarded.

use crate::backend::{ApiRequest, RawResponse, Transport};
use crate::error::{ErrorBody, Result, SummaryError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Perform one attempt and decode the response as `T`.
pub async fn execute<T: DeserializeOwned>(
    transport: &dyn Transport,
    request: &ApiRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T> {
    let attempt = tokio::time::timeout(timeout, transport.send(request));

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(SummaryError::Cancelled),
        outcome = attempt => outcome,
    };

    let response = match outcome {
        Err(_elapsed) => {
            return Err(SummaryError::Timeout {
                timeout_ms: duration_ms(timeout),
            })
        }
        Ok(Err(transport_err)) => return Err(SummaryError::Network(format!("{:#}", transport_err))),
        Ok(Ok(response)) => response,
    };

    if !response.is_success() {
        return Err(classify_failure(&response));
    }

    Ok(serde_json::from_str(&response.body)?)
}

/// Classify a non-2xx response.
pub fn classify_failure(response: &RawResponse) -> SummaryError {
    let body = decode_error_body(&response.body)
        .unwrap_or_else(|| ErrorBody::synthesized(response.status, response.reason.as_deref()));

    match body.errors.as_deref() {
        Some(errors) if response.status == 400 && !errors.is_empty() => SummaryError::Validation {
            message: body.message.clone(),
            errors: errors.to_vec(),
            http_status: Some(400),
            correlation_id: body.correlation_id.clone(),
        },
        _ => SummaryError::Http {
            status: response.status,
            body,
        },
    }
}

/// Decode an error body, accepting it either bare or wrapped in `{"detail": ...}`.
fn decode_error_body(raw: &str) -> Option<ErrorBody> {
    if let Ok(body) = serde_json::from_str::<ErrorBody>(raw) {
        return Some(body);
    }
    let value: Value = serde_json::from_str(raw).ok()?;
    let detail = value.get("detail")?.clone();
    serde_json::from_value(detail).ok()
}

pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
