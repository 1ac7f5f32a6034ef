//! View-level state for a summary submission screen.
//!
//! Nothing here renders. [`SummaryForm`] is a state machine that a view
//! drives and observes through a `watch` channel; [`HealthMonitor`] keeps a
//! tri-state backend health indicator fresh in the background.

pub mod health;
pub mod machine;
pub mod messages;

pub use health::{probe_once, HealthIndicator, HealthMonitor, DEFAULT_PROBE_INTERVAL};
pub use machine::{Field, FormEvent, FormSnapshot, FormState, SubmitOutcome, SummaryForm};
pub use messages::user_message;
