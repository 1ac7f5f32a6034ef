//! Validated summary requests.
//!
//! A [`SummaryRequest`] can only be built through [`SummaryRequest::new`],
//! which trims both references and checks their format, so an invalid
//! request never reaches the network.

use crate::error::{FieldError, Result, SummaryError};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Wire name of the source reference field.
pub const SOURCE_FIELD: &str = "github_pr_url";
/// Wire name of the secondary reference field.
pub const SECONDARY_FIELD: &str = "jira_ticket_id";

pub const SOURCE_MAX_LEN: usize = 500;
pub const SECONDARY_MAX_LEN: usize = 50;

fn pull_request_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://github\.com/([^/\s]+)/([^/\s]+)/pull/([0-9]+)$")
            .expect("pull request pattern is valid")
    })
}

fn ticket_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9]*-[0-9]+$").expect("ticket pattern is valid"))
}

/// Check a source reference (pull request URL). Input should already be trimmed.
pub fn validate_source(value: &str) -> std::result::Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::new(SOURCE_FIELD, "GitHub PR URL is required").with_code("required"));
    }
    if value.chars().count() > SOURCE_MAX_LEN {
        return Err(FieldError::new(
            SOURCE_FIELD,
            format!("GitHub PR URL must be at most {} characters", SOURCE_MAX_LEN),
        )
        .with_code("too_long"));
    }
    if !pull_request_pattern().is_match(value) {
        return Err(FieldError::new(
            SOURCE_FIELD,
            "Expected https://github.com/<owner>/<repo>/pull/<number>",
        )
        .with_code("invalid_format"));
    }
    Ok(())
}

/// Check a secondary reference (ticket id). Input should already be trimmed
/// and non-empty; empty means "absent" and is handled by the caller.
pub fn validate_secondary(value: &str) -> std::result::Result<(), FieldError> {
    if value.chars().count() > SECONDARY_MAX_LEN {
        return Err(FieldError::new(
            SECONDARY_FIELD,
            format!("Jira ticket ID must be at most {} characters", SECONDARY_MAX_LEN),
        )
        .with_code("too_long"));
    }
    if !ticket_pattern().is_match(value) {
        return Err(
            FieldError::new(SECONDARY_FIELD, "Expected a ticket ID like PROJ-123")
                .with_code("invalid_format"),
        );
    }
    Ok(())
}

/// A validated request for a PR summary. Immutable once built.
///
/// # Example
///
/// ```
/// use pr_summary_client::SummaryRequest;
///
/// let req = SummaryRequest::new(" https://github.com/acme/widgets/pull/42 ", Some("PROJ-7")).unwrap();
/// assert_eq!(req.source_reference(), "https://github.com/acme/widgets/pull/42");
/// assert_eq!(req.pull_request_parts(), Some(("acme", "widgets", 42)));
///
/// assert!(SummaryRequest::new("https://github.com/acme/widgets/pull/42", Some("invalid ticket!")).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRequest {
    #[serde(rename = "github_pr_url")]
    source_reference: String,
    #[serde(rename = "jira_ticket_id", skip_serializing_if = "Option::is_none")]
    secondary_reference: Option<String>,
}

impl SummaryRequest {
    /// Trim and validate both references. All field errors are reported at once.
    pub fn new(source: &str, secondary: Option<&str>) -> Result<Self> {
        let source = source.trim();
        let secondary = secondary.map(str::trim).filter(|s| !s.is_empty());

        let mut errors = Vec::new();
        if let Err(e) = validate_source(source) {
            errors.push(e);
        }
        if let Some(Err(e)) = secondary.map(validate_secondary) {
            errors.push(e);
        }
        if !errors.is_empty() {
            return Err(SummaryError::validation(errors));
        }

        Ok(Self {
            source_reference: source.to_string(),
            secondary_reference: secondary.map(str::to_string),
        })
    }

    pub fn source_reference(&self) -> &str {
        &self.source_reference
    }

    pub fn secondary_reference(&self) -> Option<&str> {
        self.secondary_reference.as_deref()
    }

    /// Re-check invariants. Always `Ok` for a request built via [`new`](Self::new).
    pub fn revalidate(&self) -> Result<()> {
        Self::new(&self.source_reference, self.secondary_reference.as_deref()).map(|_| ())
    }

    /// `(owner, repo, number)` extracted from the pull request URL.
    ///
    /// The number is ASCII digits only; `None` only if it overflows `u64`.
    pub fn pull_request_parts(&self) -> Option<(&str, &str, u64)> {
        let caps = pull_request_pattern().captures(&self.source_reference)?;
        let owner = caps.get(1)?.as_str();
        let repo = caps.get(2)?.as_str();
        let number = caps.get(3)?.as_str().parse().ok()?;
        Some((owner, repo, number))
    }

    /// JSON body expected by the generate endpoints.
    pub fn to_wire(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
