//! Orchestration facade.
//!
//! [`SummaryClient`] exposes the semantic operations of the summary service
//! (generate, health, liveness, metrics) on top of the retry loop and the
//! single-slot [`CancellationManager`]. It is an ordinary value: build as
//! many as you like with [`SummaryClient::builder`]. For callers that want
//! process-wide ergonomics, [`global`] lazily builds one instance from the
//! environment and [`reset_global`] discards it.

use crate::backend::{ApiRequest, HttpTransport, Method, Transport};
use crate::cancellation::CancellationManager;
use crate::config::{ClientConfig, ConfigUpdate};
use crate::error::Result;
use crate::events::EventHandler;
use crate::request::SummaryRequest;
use crate::retry::{with_retry, RetryOptions};
use crate::types::{LivenessStatus, PrSummary, ServiceHealth, ServiceMetrics, SummaryTaskAccepted};
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

pub const GENERATE_PATH: &str = "/api/v1/summary/generate";
pub const GENERATE_ASYNC_PATH: &str = "/api/v1/summary/generate-async";
pub const HEALTH_PATH: &str = "/api/v1/summary/health";
pub const METRICS_PATH: &str = "/api/v1/summary/metrics";
pub const LIVENESS_PATH: &str = "/health";

/// Client for the PR summary service.
///
/// # Example
///
/// ```no_run
/// use pr_summary_client::{SummaryClient, SummaryRequest};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = SummaryClient::builder()
///         .base_address("http://localhost:8000")
///         .build()?;
///     let request = SummaryRequest::new("https://github.com/acme/widgets/pull/42", Some("PROJ-7"))?;
///     let summary = client.generate_summary(&request).await?;
///     println!("{}", summary.reviewer_guidance());
///     Ok(())
/// }
/// ```
pub struct SummaryClient {
    transport: Arc<dyn Transport>,
    config: RwLock<ClientConfig>,
    cancellation: Arc<CancellationManager>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl SummaryClient {
    pub fn builder() -> SummaryClientBuilder {
        SummaryClientBuilder::default()
    }

    /// Build a client over HTTP with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Build a client over HTTP configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ClientConfig {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Merge `update` into the configuration.
    ///
    /// Takes effect for calls started afterwards; calls already in flight keep
    /// the configuration they started with. An update that would produce an
    /// invalid configuration is rejected and nothing changes.
    pub fn update_configuration(&self, update: ConfigUpdate) -> Result<ClientConfig> {
        let mut guard = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let merged = guard.clone().merge(update);
        merged.validate()?;
        *guard = merged.clone();
        Ok(merged)
    }

    /// Generate a summary, retrying transient failures.
    ///
    /// The call becomes the one [`cancel_requests`](Self::cancel_requests)
    /// targets, replacing any earlier call in that role.
    pub async fn generate_summary(&self, request: &SummaryRequest) -> Result<PrSummary> {
        request.revalidate()?;
        let handle = self.cancellation.begin();
        let summary: PrSummary = self
            .call(
                "generate_summary",
                Method::Post,
                GENERATE_PATH,
                Some(request.to_wire()?),
                handle.token(),
            )
            .await?;

        if self.config().logging_enabled {
            tracing::info!(
                summary_id = summary.id(),
                pr = summary.source_reference(),
                processing_time_ms = summary.processing_time_ms(),
                "summary generated"
            );
        }
        Ok(summary)
    }

    /// Start background generation on the service and return its task ID.
    pub async fn generate_summary_async(
        &self,
        request: &SummaryRequest,
    ) -> Result<SummaryTaskAccepted> {
        request.revalidate()?;
        let handle = self.cancellation.begin();
        self.call(
            "generate_summary_async",
            Method::Post,
            GENERATE_ASYNC_PATH,
            Some(request.to_wire()?),
            handle.token(),
        )
        .await
    }

    /// Service health including dependencies.
    ///
    /// Health calls are not tracked by the cancellation manager: they cannot
    /// be cancelled by, nor displace, a summary generation.
    pub async fn get_health(&self) -> Result<ServiceHealth> {
        self.call("get_health", Method::Get, HEALTH_PATH, None, &CancellationToken::new())
            .await
    }

    /// Minimal liveness probe. Untracked, like [`get_health`](Self::get_health).
    pub async fn ping(&self) -> Result<LivenessStatus> {
        self.call("ping", Method::Get, LIVENESS_PATH, None, &CancellationToken::new())
            .await
    }

    /// Service performance metrics. Untracked.
    pub async fn get_metrics(&self) -> Result<ServiceMetrics> {
        self.call("get_metrics", Method::Get, METRICS_PATH, None, &CancellationToken::new())
            .await
    }

    /// Cancel the most recently started tracked call. No-op when nothing is tracked.
    pub fn cancel_requests(&self) -> bool {
        let cancelled = self.cancellation.cancel_current();
        if cancelled && self.config().logging_enabled {
            tracing::info!("cancelled in-flight request");
        }
        cancelled
    }

    /// The cancellation manager, for callers that start tracked work themselves.
    pub fn cancellation(&self) -> &Arc<CancellationManager> {
        &self.cancellation
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let config = self.config();
        let request = ApiRequest {
            method,
            url: config.url(path),
            body,
        };
        with_retry(
            self.transport.as_ref(),
            &request,
            RetryOptions {
                operation,
                policy: config.backoff(),
                timeout: config.timeout,
                cancel,
                events: &self.event_handler,
                logging: config.logging_enabled,
            },
        )
        .await
    }
}

impl std::fmt::Debug for SummaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryClient")
            .field("transport", &self.transport.name())
            .field("config", &self.config())
            .field("has_active_request", &self.cancellation.has_active())
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Builder for [`SummaryClient`].
#[derive(Default)]
pub struct SummaryClientBuilder {
    config: Option<ClientConfig>,
    update: ConfigUpdate,
    transport: Option<Arc<dyn Transport>>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl SummaryClientBuilder {
    /// Start from this configuration instead of the defaults.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the base address.
    pub fn base_address(mut self, base: impl Into<String>) -> Self {
        self.update.base_address = Some(base.into());
        self
    }

    /// Apply a partial override on top of the starting configuration.
    pub fn with_update(mut self, update: ConfigUpdate) -> Self {
        self.update = update;
        self
    }

    /// Set the transport. Default: [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<SummaryClient> {
        let config = self.config.unwrap_or_default().merge(self.update);
        config.validate()?;
        Ok(SummaryClient {
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(HttpTransport::new())),
            config: RwLock::new(config),
            cancellation: Arc::new(CancellationManager::new()),
            event_handler: self.event_handler,
        })
    }
}

static GLOBAL: RwLock<Option<Arc<SummaryClient>>> = RwLock::new(None);

/// Process-wide client, built from the environment on first access.
pub fn global() -> Result<Arc<SummaryClient>> {
    if let Some(client) = GLOBAL
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .as_ref()
    {
        return Ok(client.clone());
    }
    let mut slot = GLOBAL
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(client) = slot.as_ref() {
        return Ok(client.clone());
    }
    let client = Arc::new(SummaryClient::from_env()?);
    *slot = Some(client.clone());
    Ok(client)
}

/// Install `client` as the process-wide instance.
pub fn set_global(client: SummaryClient) -> Arc<SummaryClient> {
    let client = Arc::new(client);
    *GLOBAL
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(client.clone());
    client
}

/// Discard the process-wide instance; the next [`global`] call rebuilds it.
pub fn reset_global() {
    *GLOBAL
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockReply, MockTransport};
    use crate::error::SummaryError;
    use crate::events::RecordingHandler;
    use serde_json::{json, Value};
    use serial_test::serial;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const URL: &str = "https://github.com/acme/widgets/pull/42";

    fn summary_body(url: &str) -> Value {
        json!({
            "id": "summary-1",
            "github_pr_url": url,
            "jira_ticket_id": "PROJ-7",
            "business_context": "ctx",
            "code_change_summary": "changes",
            "business_code_impact": "impact",
            "suggested_test_cases": ["t1"],
            "risk_complexity": "low",
            "reviewer_guidance": "look here",
            "status": "completed",
            "created_at": "2024-01-15T10:30:00Z"
        })
    }

    fn client_with(mock: Arc<MockTransport>, update: ConfigUpdate) -> SummaryClient {
        SummaryClient::builder()
            .transport(mock)
            .with_update(update.with_logging(false))
            .build()
            .unwrap()
    }

    fn fast() -> ConfigUpdate {
        ConfigUpdate::default()
            .with_retry_delay(Duration::from_millis(100))
            .with_max_retries(3)
            .with_exponential_backoff(true)
    }

    #[tokio::test]
    async fn test_generate_summary_round_trip() {
        let mock = Arc::new(MockTransport::fixed(MockReply::ok(summary_body(URL))));
        let client = client_with(mock.clone(), fast());
        let request = SummaryRequest::new(URL, Some("PROJ-7")).unwrap();

        let summary = assert_ok!(client.generate_summary(&request).await);

        assert_eq!(summary.source_reference(), URL);
        assert_eq!(summary.status(), crate::ProcessingStatus::Completed);

        let sent = mock.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "http://localhost:8000/api/v1/summary/generate");
        assert_eq!(
            sent[0].body,
            Some(json!({"github_pr_url": URL, "jira_ticket_id": "PROJ-7"}))
        );
        assert!(!client.cancellation().has_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_500_500_200_takes_three_attempts() {
        let err_body = json!({"error": "Internal Server Error", "message": "boom", "timestamp": ""});
        let mock = Arc::new(MockTransport::new(vec![
            MockReply::status(500, err_body.clone()),
            MockReply::status(500, err_body),
            MockReply::ok(summary_body(URL)),
        ]));
        let rec = Arc::new(RecordingHandler::new());
        let client = SummaryClient::builder()
            .transport(mock.clone())
            .event_handler(rec.clone())
            .with_update(fast().with_logging(false))
            .build()
            .unwrap();
        let request = SummaryRequest::new(URL, None).unwrap();

        let start = tokio::time::Instant::now();
        assert_ok!(client.generate_summary(&request).await);

        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(mock.calls(), 3);
        assert_eq!(rec.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_404_single_attempt() {
        let mock = Arc::new(MockTransport::fixed(MockReply::status(
            404,
            json!({"error": "Not Found", "message": "no such PR", "timestamp": ""}),
        )));
        let client = client_with(mock.clone(), fast());
        let request = SummaryRequest::new(URL, None).unwrap();

        let err = assert_err!(client.generate_summary(&request).await);
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_requests_stops_generation() {
        let mock = Arc::new(MockTransport::fixed(
            MockReply::ok(summary_body(URL)).after(Duration::from_secs(5)),
        ));
        let client = Arc::new(client_with(mock.clone(), fast()));
        let request = SummaryRequest::new(URL, None).unwrap();

        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.generate_summary(&request).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(client.cancel_requests());

        let result = task.await.unwrap();
        assert!(matches!(result, Err(SummaryError::Cancelled)));
        assert_eq!(mock.calls(), 1);

        // The next call gets a fresh token.
        let request = SummaryRequest::new(URL, None).unwrap();
        assert_ok!(client.generate_summary(&request).await);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_targets_only_newest_call() {
        let mock = Arc::new(MockTransport::fixed(
            MockReply::ok(summary_body(URL)).after(Duration::from_secs(1)),
        ));
        let client = Arc::new(client_with(mock.clone(), fast()));
        let request = SummaryRequest::new(URL, None).unwrap();

        let first = {
            let (client, request) = (client.clone(), request.clone());
            tokio::spawn(async move { client.generate_summary(&request).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = {
            let (client, request) = (client.clone(), request.clone());
            tokio::spawn(async move { client.generate_summary(&request).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(client.cancel_requests());

        assert!(matches!(second.await.unwrap(), Err(SummaryError::Cancelled)));
        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_cancel_with_nothing_in_flight_is_noop() {
        let mock = Arc::new(MockTransport::fixed(MockReply::ok(summary_body(URL))));
        let client = client_with(mock, fast());
        assert!(!client.cancel_requests());
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_is_not_cancellable_by_cancel_requests() {
        let mock = Arc::new(MockTransport::fixed(
            MockReply::ok(json!({"status": "healthy", "timestamp": ""}))
                .after(Duration::from_millis(100)),
        ));
        let client = Arc::new(client_with(mock, fast()));
        let probe = {
            let client = client.clone();
            tokio::spawn(async move { client.get_health().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!client.cancel_requests());
        assert!(probe.await.unwrap().unwrap().is_healthy());
    }

    #[tokio::test]
    async fn test_update_configuration_applies_to_next_call() {
        let mock = Arc::new(MockTransport::fixed(MockReply::ok(
            json!({"status": "healthy", "service": "pr-summarizer", "timestamp": ""}),
        )));
        let client = client_with(mock.clone(), fast());

        let updated = client
            .update_configuration(ConfigUpdate::default().with_base_address("http://summary:9000/"))
            .unwrap();
        assert_eq!(updated.base_address, "http://summary:9000");
        assert_eq!(updated.max_retries, 3);

        client.ping().await.unwrap();
        assert_eq!(mock.requests()[0].url, "http://summary:9000/health");
    }

    #[tokio::test]
    async fn test_invalid_update_is_rejected() {
        let mock = Arc::new(MockTransport::fixed(MockReply::ok(json!({}))));
        let client = client_with(mock, fast());
        let before = client.config();
        let result = client.update_configuration(ConfigUpdate::default().with_timeout(Duration::ZERO));
        assert!(matches!(result, Err(SummaryError::InvalidConfig(_))));
        assert_eq!(client.config(), before);
    }

    #[tokio::test]
    async fn test_async_generation_and_metrics() {
        let mock = Arc::new(MockTransport::new(vec![
            MockReply::status(
                202,
                json!({"task_id": "summary_1", "status": "processing", "message": "started"}),
            ),
            MockReply::ok(json!({"timestamp": "", "metrics": {"total_requests": 4}, "status": "active"})),
        ]));
        let client = client_with(mock.clone(), fast());
        let request = SummaryRequest::new(URL, None).unwrap();

        let accepted = client.generate_summary_async(&request).await.unwrap();
        assert_eq!(accepted.task_id, "summary_1");

        let metrics = client.get_metrics().await.unwrap();
        assert_eq!(metrics.metrics["total_requests"], 4);

        let urls: Vec<_> = mock.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:8000/api/v1/summary/generate-async",
                "http://localhost:8000/api/v1/summary/metrics"
            ]
        );
    }

    #[test]
    #[serial]
    fn test_global_is_lazy_and_resettable() {
        reset_global();
        let a = global().unwrap();
        let b = global().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        reset_global();
        let c = global().unwrap();
        assert!(!Arc::ptr_eq(&a, &c));

        let mock = Arc::new(MockTransport::fixed(MockReply::ok(json!({}))));
        let installed = set_global(client_with(mock, fast()));
        assert!(Arc::ptr_eq(&installed, &global().unwrap()));
        reset_global();
    }
}
