//! Transport over reqwest.
//!
//! [`HttpTransport`] sends [`ApiRequest`]s with a shared `reqwest::Client`
//! and hands back the status and body text untouched. Deadlines are enforced
//! by the executor, not by the client, so a configuration update applies to
//! the next attempt without rebuilding the client.

use super::{ApiRequest, Method, RawResponse, Transport};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;

/// Transport backed by `reqwest`.
///
/// The client is cheap to clone (it uses `Arc` internally).
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxy, TLS roots, default headers).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> anyhow::Result<RawResponse> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let resp = builder
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to connect to {}", request.url))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", request.url))?;

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            body,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let transport = HttpTransport::new();
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let result = transport
            .send(&ApiRequest::get("http://127.0.0.1:9/health"))
            .await;
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to connect to http://127.0.0.1:9/health"));
    }

    #[test]
    fn test_name() {
        assert_eq!(HttpTransport::new().name(), "http");
    }
}
