//! Form state machine for the summary submission flow.
//!
//! ```text
//!   Idle ──Submit──▶ Validating ──ValidationPassed──▶ Generating ──Succeeded──▶ Completing
//!    ▲                   │                                 │                        │
//!    │           ValidationFailed                        Failed                  Settled
//!    ├───────────────────┘                                 ▼                        │
//!    ├──────────Dismiss / Reset────────────────────────  Error ◀──Failed── (any active)
//!    │                                                     │
//!    │                                            Retry / Submit ──▶ Validating
//!    └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`FormState::next`] is the transition table. [`SummaryForm`] drives it
//! against a [`SummaryClient`] and publishes a [`FormSnapshot`] after every
//! change; views subscribe to the snapshot channel and render it.

use super::health::HealthIndicator;
use super::messages::user_message;
use crate::client::SummaryClient;
use crate::error::{FieldError, SummaryError};
use crate::request::{validate_secondary, validate_source, SummaryRequest, SECONDARY_FIELD, SOURCE_FIELD};
use crate::types::PrSummary;
use std::sync::Mutex;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormState {
    #[default]
    Idle,
    Validating,
    Generating,
    Completing,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    Submit,
    ValidationPassed,
    ValidationFailed,
    Succeeded,
    /// The completion feedback has been shown.
    Settled,
    Failed,
    Retry,
    Reset,
    Dismiss,
}

impl FormState {
    /// Target state for `event`, or `None` when the transition is not allowed.
    pub fn next(self, event: FormEvent) -> Option<FormState> {
        use FormEvent as E;
        use FormState as S;
        match (self, event) {
            (S::Idle | S::Error, E::Submit) => Some(S::Validating),
            (S::Validating, E::ValidationPassed) => Some(S::Generating),
            (S::Validating, E::ValidationFailed) => Some(S::Idle),
            (S::Generating, E::Succeeded) => Some(S::Completing),
            (S::Completing, E::Settled) => Some(S::Idle),
            (S::Validating | S::Generating | S::Completing, E::Failed) => Some(S::Error),
            (S::Error, E::Retry) => Some(S::Validating),
            (S::Error, E::Dismiss) => Some(S::Idle),
            (_, E::Reset) => Some(S::Idle),
            _ => None,
        }
    }

    /// A submission cycle is underway.
    pub fn is_busy(self) -> bool {
        matches!(self, FormState::Validating | FormState::Generating | FormState::Completing)
    }
}

/// A form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Pull request URL.
    Source,
    /// Ticket ID.
    Secondary,
}

impl Field {
    pub fn wire_name(self) -> &'static str {
        match self {
            Field::Source => SOURCE_FIELD,
            Field::Secondary => SECONDARY_FIELD,
        }
    }
}

/// What a view renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSnapshot {
    pub state: FormState,
    pub source: String,
    pub secondary: String,
    pub field_errors: Vec<FieldError>,
    pub summary: Option<PrSummary>,
    /// Dismissible message for the last failure.
    pub error_message: Option<String>,
    /// A failed request is available for [`SummaryForm::retry`].
    pub can_retry: bool,
    pub health: HealthIndicator,
}

impl FormSnapshot {
    pub fn field_error(&self, field: Field) -> Option<&FieldError> {
        self.field_errors.iter().find(|e| e.field == field.wire_name())
    }
}

/// Result of [`SummaryForm::submit`] or [`SummaryForm::retry`].
#[derive(Debug)]
pub enum SubmitOutcome {
    Completed(PrSummary),
    /// Client-side validation rejected the input; nothing was sent.
    Invalid(Vec<FieldError>),
    Failed(SummaryError),
    /// Not started: a cycle is already running, the backend is reported
    /// unhealthy, or there is nothing to retry.
    Suppressed,
    /// The form was reset while the call was in flight; its result was dropped.
    Discarded,
}

#[derive(Debug, Default)]
struct Inner {
    snapshot: FormSnapshot,
    last_request: Option<SummaryRequest>,
    cycle: u64,
}

impl Inner {
    fn apply(&mut self, event: FormEvent) -> bool {
        match self.snapshot.state.next(event) {
            Some(next) => {
                self.snapshot.state = next;
                true
            }
            None => false,
        }
    }

    /// Start a new cycle: the previous result and error are discarded.
    fn begin_cycle(&mut self) -> u64 {
        self.cycle += 1;
        self.snapshot.summary = None;
        self.snapshot.error_message = None;
        self.snapshot.can_retry = false;
        self.cycle
    }

    /// The cycle is still the latest one and sits in `state`.
    fn is_current(&self, cycle: u64, state: FormState) -> bool {
        self.cycle == cycle && self.snapshot.state == state
    }

    fn set_field_error(&mut self, field: Field, error: Option<FieldError>) {
        self.snapshot.field_errors.retain(|e| e.field != field.wire_name());
        if let Some(error) = error {
            self.snapshot.field_errors.push(error);
        }
    }
}

/// Submission form driven by an explicit state machine.
///
/// All methods take `&self`; the form can be shared between the task
/// running a submission and the view that renders or resets it.
#[derive(Debug)]
pub struct SummaryForm {
    inner: Mutex<Inner>,
    tx: watch::Sender<FormSnapshot>,
    health: Option<watch::Receiver<HealthIndicator>>,
}

impl Default for SummaryForm {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryForm {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(FormSnapshot::default());
        Self {
            inner: Mutex::new(Inner::default()),
            tx,
            health: None,
        }
    }

    /// Gate submissions on a health indicator, typically
    /// [`HealthMonitor::subscribe`](super::HealthMonitor::subscribe).
    pub fn with_health(mut self, health: watch::Receiver<HealthIndicator>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<FormSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let mut snapshot = self.tx.borrow().clone();
        snapshot.health = self.health_indicator();
        snapshot
    }

    pub fn state(&self) -> FormState {
        self.tx.borrow().state
    }

    pub fn set_source(&self, value: impl Into<String>) {
        self.update(|inner| inner.snapshot.source = value.into());
    }

    pub fn set_secondary(&self, value: impl Into<String>) {
        self.update(|inner| inner.snapshot.secondary = value.into());
    }

    /// Validate a single field, as when focus leaves it.
    pub fn blur(&self, field: Field) -> Option<FieldError> {
        self.update(|inner| {
            let error = match field {
                Field::Source => validate_source(inner.snapshot.source.trim()).err(),
                Field::Secondary => {
                    let value = inner.snapshot.secondary.trim();
                    if value.is_empty() {
                        None
                    } else {
                        validate_secondary(value).err()
                    }
                }
            };
            inner.set_field_error(field, error.clone());
            error
        })
    }

    /// Validate the whole form and, if it passes, generate a summary.
    ///
    /// Each state of the cycle is published before moving on, so subscribers
    /// see `Validating`, `Generating`, `Completing` and finally `Idle`.
    pub async fn submit(&self, client: &SummaryClient) -> SubmitOutcome {
        if self.health_indicator() == HealthIndicator::Unhealthy {
            return SubmitOutcome::Suppressed;
        }

        let cycle = self.update(|inner| {
            if inner.snapshot.state.is_busy() || !inner.apply(FormEvent::Submit) {
                return None;
            }
            Some(inner.begin_cycle())
        });
        let Some(cycle) = cycle else {
            return SubmitOutcome::Suppressed;
        };
        tokio::task::yield_now().await;

        let validated = self.update(|inner| {
            if !inner.is_current(cycle, FormState::Validating) {
                return None;
            }
            let source = inner.snapshot.source.clone();
            let secondary = inner.snapshot.secondary.clone();
            match SummaryRequest::new(&source, Some(secondary.as_str())) {
                Ok(request) => {
                    inner.snapshot.field_errors.clear();
                    inner.apply(FormEvent::ValidationPassed);
                    inner.last_request = Some(request.clone());
                    Some(Ok(request))
                }
                Err(err) => {
                    let errors = err.field_errors().to_vec();
                    inner.snapshot.field_errors = errors.clone();
                    inner.apply(FormEvent::ValidationFailed);
                    Some(Err(errors))
                }
            }
        });

        match validated {
            None => SubmitOutcome::Discarded,
            Some(Err(errors)) => SubmitOutcome::Invalid(errors),
            Some(Ok(request)) => self.generate(client, cycle, request).await,
        }
    }

    /// Replay the last submitted request verbatim after a failure.
    pub async fn retry(&self, client: &SummaryClient) -> SubmitOutcome {
        if self.health_indicator() == HealthIndicator::Unhealthy {
            return SubmitOutcome::Suppressed;
        }

        let started = self.update(|inner| {
            let request = inner.last_request.clone()?;
            if !inner.apply(FormEvent::Retry) {
                return None;
            }
            Some((inner.begin_cycle(), request))
        });
        let Some((cycle, request)) = started else {
            return SubmitOutcome::Suppressed;
        };
        tokio::task::yield_now().await;

        let passed = self.update(|inner| {
            inner.is_current(cycle, FormState::Validating) && inner.apply(FormEvent::ValidationPassed)
        });
        if !passed {
            return SubmitOutcome::Discarded;
        }
        self.generate(client, cycle, request).await
    }

    /// Start fresh: back to idle with the result, errors and last request cleared.
    ///
    /// A call still in flight keeps running, but its result is discarded.
    pub fn reset(&self) {
        self.update(|inner| {
            inner.apply(FormEvent::Reset);
            inner.cycle += 1;
            inner.last_request = None;
            inner.snapshot.summary = None;
            inner.snapshot.error_message = None;
            inner.snapshot.field_errors.clear();
            inner.snapshot.can_retry = false;
        });
    }

    /// Close the error message and return to idle, keeping the input.
    pub fn dismiss(&self) {
        self.update(|inner| {
            if inner.apply(FormEvent::Dismiss) {
                inner.snapshot.error_message = None;
                inner.snapshot.can_retry = false;
            }
        });
    }

    async fn generate(&self, client: &SummaryClient, cycle: u64, request: SummaryRequest) -> SubmitOutcome {
        let result = client.generate_summary(&request).await;

        let outcome = self.update(|inner| {
            if !inner.is_current(cycle, FormState::Generating) {
                return SubmitOutcome::Discarded;
            }
            match result {
                Ok(summary) => {
                    inner.apply(FormEvent::Succeeded);
                    inner.snapshot.summary = Some(summary.clone());
                    SubmitOutcome::Completed(summary)
                }
                Err(err) => {
                    inner.apply(FormEvent::Failed);
                    inner.snapshot.field_errors = err.field_errors().to_vec();
                    inner.snapshot.error_message = Some(user_message(&err));
                    inner.snapshot.can_retry = true;
                    SubmitOutcome::Failed(err)
                }
            }
        });

        if matches!(outcome, SubmitOutcome::Completed(_)) {
            tokio::task::yield_now().await;
            self.update(|inner| {
                if inner.is_current(cycle, FormState::Completing) {
                    inner.apply(FormEvent::Settled);
                }
            });
        }
        outcome
    }

    fn health_indicator(&self) -> HealthIndicator {
        self.health
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or_default()
    }

    /// Mutate under the lock and publish the resulting snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let out = f(&mut inner);
        let mut snapshot = inner.snapshot.clone();
        snapshot.health = self.health_indicator();
        self.tx.send_replace(snapshot);
        out
    }
}
