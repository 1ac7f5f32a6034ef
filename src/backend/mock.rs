//! Mock transport for testing without a live service.
//!
//! [`MockTransport`] returns scripted replies in order and records every
//! request it receives, so callers can assert on attempt counts and bodies.
//!
//! # Example
//!
//! ```
//! use pr_summary_client::backend::{MockReply, MockTransport};
//! use serde_json::json;
//!
//! let mock = MockTransport::new(vec![
//!     MockReply::status(500, json!({"error": "boom", "message": "try again"})),
//!     MockReply::ok(json!({"status": "healthy"})),
//! ]);
//! assert_eq!(mock.calls(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{ApiRequest, RawResponse, Transport};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond with this status and raw body text.
    Response { status: u16, body: String },
    /// Fail the exchange as if the connection could not be made.
    NetworkFailure(String),
    /// Wait before producing the inner reply. Under a paused tokio clock the
    /// wait is virtual.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn ok(body: Value) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: Value) -> Self {
        MockReply::Response {
            status,
            body: body.to_string(),
        }
    }

    /// Non-JSON body, for exercising the synthesized error path.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        MockReply::Response {
            status,
            body: body.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        MockReply::NetworkFailure(message.into())
    }

    pub fn after(self, delay: Duration) -> Self {
        MockReply::Delayed(delay, Box::new(self))
    }
}

/// A transport that returns scripted replies in order.
///
/// Repeats the last reply once the script is exhausted.
#[derive(Debug)]
pub struct MockTransport {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// Create a mock with the given script.
    pub fn new(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockTransport requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always gives the same reply.
    pub fn fixed(reply: MockReply) -> Self {
        Self::new(vec![reply])
    }

    /// Number of exchanges attempted so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::SeqCst);
        self.replies[idx.min(self.replies.len() - 1)].clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> anyhow::Result<RawResponse> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        let mut reply = self.next_reply();
        loop {
            match reply {
                MockReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
                MockReply::NetworkFailure(message) => anyhow::bail!(message),
                MockReply::Response { status, body } => {
                    return Ok(RawResponse {
                        status,
                        reason: reqwest::StatusCode::from_u16(status)
                            .ok()
                            .and_then(|s| s.canonical_reason())
                            .map(str::to_string),
                        body,
                    })
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_replies_in_order_then_repeats_last() {
        let mock = MockTransport::new(vec![
            MockReply::status(503, json!({})),
            MockReply::ok(json!({"n": 1})),
        ]);
        let req = ApiRequest::get("http://unused/health");

        let r1 = mock.send(&req).await.unwrap();
        let r2 = mock.send(&req).await.unwrap();
        let r3 = mock.send(&req).await.unwrap();
        assert_eq!(r1.status, 503);
        assert_eq!(r1.reason.as_deref(), Some("Service Unavailable"));
        assert_eq!(r2.status, 200);
        assert_eq!(r3.status, 200);
        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_network_failure() {
        let mock = MockTransport::fixed(MockReply::network("connection refused"));
        let err = mock
            .send(&ApiRequest::get("http://unused"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_delay_is_virtual() {
        let mock = MockTransport::fixed(
            MockReply::ok(json!({})).after(Duration::from_secs(10)),
        );
        let start = tokio::time::Instant::now();
        mock.send(&ApiRequest::get("http://unused")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
