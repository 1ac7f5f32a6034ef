//! # PR Summary Client
//!
//! Resilient client for a pull-request summary service, plus the view-level
//! state needed to drive a submission form against it.
//!
//! The service aggregates a pull request, its ticket and related documents
//! into a structured multi-section summary. This crate does not know how;
//! it issues the calls and makes them robust: per-attempt deadlines,
//! classified errors, retry with backoff, and single-slot cancellation.
//!
//! ## Layers
//!
//! - **[`executor`]**: one network attempt through a [`Transport`], bounded by
//!   a deadline and a cancellation token, classified into [`SummaryError`].
//! - **[`retry`]**: wraps the executor in a backoff loop driven by a
//!   [`BackoffPolicy`]. Validation and 4xx failures (except 429) are terminal.
//! - **[`cancellation`]**: tracks the token of the most recently started call
//!   so it can be cancelled from elsewhere.
//! - **[`SummaryClient`]**: semantic operations (generate, health, metrics)
//!   built on the layers above.
//! - **[`ui`]**: [`SummaryForm`] state machine and a background
//!   [`HealthMonitor`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use pr_summary_client::{ClientConfig, SummaryClient, SummaryRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SummaryClient::new(ClientConfig::from_env()?)?;
//!
//!     let request = SummaryRequest::new(
//!         "https://github.com/acme/widgets/pull/42",
//!         Some("PROJ-7"),
//!     )?;
//!     let summary = client.generate_summary(&request).await?;
//!
//!     println!("{}", summary.code_change_summary());
//!     for case in summary.suggested_test_cases() {
//!         println!("- {}", case);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without a server
//!
//! [`MockTransport`] replays scripted responses, failures and delays, and
//! records what was sent:
//!
//! ```
//! use pr_summary_client::{MockReply, MockTransport, SummaryClient};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let mock = Arc::new(MockTransport::fixed(MockReply::ok(json!({
//!     "status": "healthy", "service": "pr-summarizer", "timestamp": "2024-01-15T10:30:00Z"
//! }))));
//! let client = SummaryClient::builder().transport(mock.clone()).build().unwrap();
//!
//! let live = client.ping().await.unwrap();
//! assert_eq!(live.status, "healthy");
//! assert_eq!(mock.calls(), 1);
//! # });
//! ```

pub mod backend;
pub mod cancellation;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod request;
pub mod retry;
pub mod types;
pub mod ui;

pub use backend::{BackoffPolicy, HttpTransport, MockReply, MockTransport, Transport};
pub use cancellation::{CancellationManager, InFlightHandle};
pub use client::{global, reset_global, set_global, SummaryClient, SummaryClientBuilder};
pub use config::{ClientConfig, ConfigUpdate};
pub use error::{ErrorBody, ErrorKind, FieldError, Result, SummaryError};
pub use events::{Event, EventHandler, FnEventHandler};
pub use request::SummaryRequest;
pub use types::{LivenessStatus, PrSummary, ProcessingStatus, ServiceHealth, ServiceMetrics, SummaryTaskAccepted};
pub use ui::{HealthIndicator, HealthMonitor, SubmitOutcome, SummaryForm};
