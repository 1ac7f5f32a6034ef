use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Processing status of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

/// A generated PR summary.
///
/// Only ever produced by decoding a successful generate response; fields are
/// read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrSummary {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(rename = "github_pr_url")]
    source_reference: String,
    #[serde(rename = "jira_ticket_id", default)]
    secondary_reference: Option<String>,
    business_context: String,
    code_change_summary: String,
    business_code_impact: String,
    #[serde(default)]
    suggested_test_cases: Vec<String>,
    risk_complexity: String,
    reviewer_guidance: String,
    #[serde(default)]
    status: ProcessingStatus,
    #[serde(deserialize_with = "lenient_utc")]
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    processing_time_ms: Option<u64>,
}

impl PrSummary {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// The pull request URL the summary was generated for.
    pub fn source_reference(&self) -> &str {
        &self.source_reference
    }

    /// The ticket ID supplied with the request, if any.
    pub fn secondary_reference(&self) -> Option<&str> {
        self.secondary_reference.as_deref()
    }

    pub fn business_context(&self) -> &str {
        &self.business_context
    }

    pub fn code_change_summary(&self) -> &str {
        &self.code_change_summary
    }

    pub fn business_code_impact(&self) -> &str {
        &self.business_code_impact
    }

    pub fn suggested_test_cases(&self) -> &[String] {
        &self.suggested_test_cases
    }

    pub fn risk_complexity(&self) -> &str {
        &self.risk_complexity
    }

    pub fn reviewer_guidance(&self) -> &str {
        &self.reviewer_guidance
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn processing_time_ms(&self) -> Option<u64> {
        self.processing_time_ms
    }
}

/// Health of the summary service: `GET /api/v1/summary/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    /// Per-dependency status (e.g. `github`, `jira`, `gemini`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Minimal liveness payload: `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessStatus {
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Acknowledgement of a background generation: `POST /api/v1/summary/generate-async`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTaskAccepted {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Service performance metrics: `GET /api/v1/summary/metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub metrics: HashMap<String, Value>,
    #[serde(default)]
    pub status: String,
}

/// Accept RFC 3339 timestamps and naive ISO-8601 ones (assumed UTC).
fn lenient_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary_json() -> Value {
        json!({
            "id": "summary-123",
            "request_id": "req-456",
            "github_pr_url": "https://github.com/acme/widgets/pull/42",
            "jira_ticket_id": "PROJ-7",
            "business_context": "User authentication feature",
            "code_change_summary": "Added JWT authentication",
            "business_code_impact": "Enables role-based access",
            "suggested_test_cases": ["Test successful login", "Test failed login"],
            "risk_complexity": "Medium",
            "reviewer_guidance": "Focus on token validation",
            "status": "completed",
            "created_at": "2024-01-15T10:30:00Z",
            "processing_time_ms": 15000
        })
    }

    #[test]
    fn test_summary_decodes() {
        let s: PrSummary = serde_json::from_value(summary_json()).unwrap();
        assert_eq!(s.id(), "summary-123");
        assert_eq!(s.request_id(), Some("req-456"));
        assert_eq!(s.source_reference(), "https://github.com/acme/widgets/pull/42");
        assert_eq!(s.secondary_reference(), Some("PROJ-7"));
        assert_eq!(s.suggested_test_cases().len(), 2);
        assert_eq!(s.status(), ProcessingStatus::Completed);
        assert_eq!(s.processing_time_ms(), Some(15000));
        assert_eq!(s.created_at().to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_summary_accepts_naive_timestamp() {
        let mut v = summary_json();
        v["created_at"] = json!("2024-01-15T10:30:00.123456");
        let s: PrSummary = serde_json::from_value(v).unwrap();
        assert_eq!(s.created_at().timestamp(), 1705314600);
    }

    #[test]
    fn test_summary_optional_fields() {
        let mut v = summary_json();
        let obj = v.as_object_mut().unwrap();
        obj.remove("jira_ticket_id");
        obj.remove("processing_time_ms");
        obj.remove("request_id");
        obj.remove("suggested_test_cases");
        let s: PrSummary = serde_json::from_value(v).unwrap();
        assert_eq!(s.secondary_reference(), None);
        assert_eq!(s.processing_time_ms(), None);
        assert!(s.suggested_test_cases().is_empty());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(ProcessingStatus::InProgress).unwrap(), "in_progress");
        let s: ProcessingStatus = serde_json::from_value(json!("cancelled")).unwrap();
        assert_eq!(s, ProcessingStatus::Cancelled);
    }

    #[test]
    fn test_health_decodes() {
        let h: ServiceHealth = serde_json::from_value(json!({
            "status": "healthy",
            "timestamp": "2024-01-15T10:30:00",
            "services": {"github": "up", "jira": "down"},
            "version": "1.0.0"
        }))
        .unwrap();
        assert!(h.is_healthy());
        assert_eq!(h.services.unwrap()["jira"], "down");

        let h: ServiceHealth =
            serde_json::from_value(json!({"status": "unhealthy", "timestamp": "", "error": "x"}))
                .unwrap();
        assert!(!h.is_healthy());
    }
}
