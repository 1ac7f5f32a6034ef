//! Transport trait and normalized request/response types.
//!
//! The [`Transport`] trait is the seam between the request layer and the
//! network. It performs one raw HTTP exchange and knows nothing about
//! deadlines, error bodies or retries; the
//! [executor](crate::executor) layers those on top. Built-in
//! implementations: [`HttpTransport`] (reqwest) and [`MockTransport`].
//!
//! ## Architecture
//!
//! ```text
//! SummaryClient ──► retry::with_retry ──► executor::execute ──► Transport::send
//!                          │                     │                    │
//!                    BackoffPolicy        timeout race +       ┌──────┴───────┐
//!                                         classification  HttpTransport  MockTransport
//! ```

pub mod backoff;
pub mod http;
pub mod mock;

pub use backoff::BackoffPolicy;
pub use http::HttpTransport;
pub use mock::{MockReply, MockTransport};

use async_trait::async_trait;
use serde_json::Value;

/// HTTP methods used by the summary service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A normalized HTTP request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// JSON body, sent with `Content-Type: application/json`.
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// A raw HTTP response: whatever status came back, body not yet interpreted.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Canonical reason phrase for the status, if known.
    pub reason: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// One network exchange.
///
/// An `Err` means the exchange itself failed (DNS, refused connection, TLS,
/// broken body stream). Non-2xx statuses are `Ok` and classified upstream.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Transport>`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> anyhow::Result<RawResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}
