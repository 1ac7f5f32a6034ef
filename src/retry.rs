//! Transport-level retry with backoff.
//!
//! [`with_retry`] wraps [`executor::execute`] in a loop: on a retryable
//! failure it waits for the [`BackoffPolicy`] delay and tries again, up to
//! `max_retries` times. Attempts of one call are strictly sequential.
//!
//! A failure is terminal when any of these hold:
//! - the call was cancelled (cancellation always beats retry);
//! - the classified error is not retryable (validation, 4xx other than 429);
//! - the retry budget is spent.
//!
//! Only the last attempt's error is returned.

use crate::backend::{ApiRequest, BackoffPolicy, Transport};
use crate::error::{Result, SummaryError};
use crate::events::{emit, Event, EventHandler};
use crate::executor::{self, duration_ms};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-call parameters for [`with_retry`].
pub struct RetryOptions<'a> {
    /// Operation name used in events and log records.
    pub operation: &'static str,
    pub policy: BackoffPolicy,
    /// Deadline for each attempt.
    pub timeout: Duration,
    pub cancel: &'a CancellationToken,
    pub events: &'a Option<Arc<dyn EventHandler>>,
    /// Emit `tracing` records.
    pub logging: bool,
}

/// Execute a request with retry and backoff.
///
/// Returns the first successful response, or the last error once the call
/// becomes terminal.
pub async fn with_retry<T: DeserializeOwned>(
    transport: &dyn Transport,
    request: &ApiRequest,
    opts: RetryOptions<'_>,
) -> Result<T> {
    let RetryOptions {
        operation,
        policy,
        timeout,
        cancel,
        events,
        logging,
    } = opts;
    let mut attempt: u32 = 0;
    let mut backoff_total = Duration::ZERO;

    loop {
        emit(events, Event::AttemptStart { operation, attempt });
        if logging {
            tracing::debug!(
                operation,
                attempt,
                method = request.method.as_str(),
                url = %request.url,
                transport = transport.name(),
                "sending request"
            );
        }

        let err = match executor::execute::<T>(transport, request, timeout, cancel).await {
            Ok(value) => {
                emit(
                    events,
                    Event::CallFinished {
                        operation,
                        attempts: attempt + 1,
                        ok: true,
                    },
                );
                if logging && attempt > 0 {
                    tracing::info!(
                        operation,
                        attempts = attempt + 1,
                        backoff_total_ms = duration_ms(backoff_total),
                        "request succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let retryable = err.is_retryable();
        emit(
            events,
            Event::AttemptFailed {
                operation,
                attempt,
                kind: err.kind(),
                retryable,
            },
        );

        let cancelled = matches!(err, SummaryError::Cancelled) || cancel.is_cancelled();
        if cancelled || !retryable || attempt >= policy.max_retries {
            emit(
                events,
                Event::CallFinished {
                    operation,
                    attempts: attempt + 1,
                    ok: false,
                },
            );
            if logging {
                tracing::warn!(
                    operation,
                    attempts = attempt + 1,
                    error = %err,
                    "request failed"
                );
            }
            return Err(if cancelled { SummaryError::Cancelled } else { err });
        }

        let delay = policy.delay_for_attempt(attempt);
        let reason = err.to_string();
        emit(
            events,
            Event::RetryScheduled {
                operation,
                next_attempt: attempt + 1,
                delay,
                reason: reason.clone(),
            },
        );
        if logging {
            tracing::warn!(
                operation,
                attempt,
                delay_ms = duration_ms(delay),
                reason = %reason,
                "retrying request"
            );
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                emit(
                    events,
                    Event::CallFinished {
                        operation,
                        attempts: attempt + 1,
                        ok: false,
                    },
                );
                return Err(SummaryError::Cancelled);
            }
            _ = tokio::time::sleep(delay) => {}
        }

        backoff_total = backoff_total.saturating_add(delay);
        attempt += 1;
    }
}
