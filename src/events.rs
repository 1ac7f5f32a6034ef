//! Event system for request lifecycle hooks.
//!
//! Provides an optional, non-intrusive way to observe what the request layer
//! does: every attempt, every classified failure, every scheduled retry, and
//! the final outcome of a call. Implement [`EventHandler`] to feed progress
//! indicators, metrics, or tests.

use crate::error::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

/// Events emitted while executing a call.
#[derive(Debug, Clone)]
pub enum Event {
    /// An attempt is about to hit the network.
    AttemptStart {
        /// Operation name (e.g. `"generate_summary"`).
        operation: &'static str,
        /// Attempt number (0-indexed).
        attempt: u32,
    },
    /// An attempt failed and was classified.
    AttemptFailed {
        operation: &'static str,
        attempt: u32,
        kind: ErrorKind,
        /// Whether the classification alone would allow another attempt.
        retryable: bool,
    },
    /// The retry loop is about to wait before the next attempt.
    RetryScheduled {
        operation: &'static str,
        /// The attempt that will run after the delay (1-indexed retry count).
        next_attempt: u32,
        delay: Duration,
        /// Description of the failure that triggered the retry.
        reason: String,
    },
    /// The call finished, successfully or not.
    CallFinished {
        operation: &'static str,
        attempts: u32,
        ok: bool,
    },
}

/// Handler for request lifecycle events.
///
/// This is entirely optional -- the client works without an event handler.
///
/// # Example
///
/// ```
/// use pr_summary_client::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         if let Event::RetryScheduled { next_attempt, delay, .. } = event {
///             println!("retry #{} in {:?}", next_attempt, delay);
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}

/// An [`EventHandler`] that keeps every event, for inspection in tests.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: std::sync::Mutex<Vec<Event>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of `AttemptStart` events seen.
    pub fn attempts(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::AttemptStart { .. }))
            .count()
    }

    /// Delays of every `RetryScheduled` event, in order.
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::RetryScheduled { delay, .. } => Some(delay),
                _ => None,
            })
            .collect()
    }
}

impl EventHandler for RecordingHandler {
    fn on_event(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Install a thread-local subscriber counting every log record emitted.
#[cfg(test)]
pub(crate) fn count_log_records() -> (
    Arc<std::sync::atomic::AtomicUsize>,
    tracing::subscriber::DefaultGuard,
) {
    use tracing_subscriber::layer::SubscriberExt;

    struct Count(Arc<std::sync::atomic::AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Count {
        fn on_event(
            &self,
            _event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(Count(count.clone()));
    (count, tracing::subscriber::set_default(subscriber))
}
