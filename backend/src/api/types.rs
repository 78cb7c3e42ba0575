//! REST API types for the form front end.
//!
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ValidationIssue;
use crate::models::DisplayRow;
use crate::transform::normalizer::NormalizeOutcome;
use crate::transform::pipeline::WizardReport;

/// Response to a question sheet preview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready", "warning"
    pub status: String,

    /// Uploaded file name
    pub file_name: Option<String>,

    /// Table information
    pub table: TableInfo,

    /// Review view, one row per option for choice questions
    pub display: Vec<DisplayRow>,

    /// Everything the operator has to fix
    pub issues: Vec<ValidationIssue>,

    /// Entry names of the images that will be packed
    pub images: Vec<String>,
}

/// Decoded table metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
    pub row_count: usize,
    pub columns: Vec<String>,
}

fn status_for(issues: &[ValidationIssue]) -> String {
    if issues.is_empty() { "ready" } else { "warning" }.to_string()
}

impl PreviewResponse {
    pub fn new(file_name: Option<String>, table: TableInfo, outcome: NormalizeOutcome) -> Self {
        PreviewResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status_for(&outcome.issues),
            file_name,
            table,
            display: outcome.display,
            images: outcome.images.iter().map(|i| i.archive_name()).collect(),
            issues: outcome.issues,
        }
    }

    /// Preview stopped before normalization, e.g. by an incomplete role map.
    pub fn rejected(file_name: Option<String>, table: TableInfo, issues: Vec<ValidationIssue>) -> Self {
        PreviewResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status_for(&issues),
            file_name,
            table,
            display: Vec::new(),
            images: Vec::new(),
            issues,
        }
    }
}

/// Body of a bundle request that found problems.
pub fn issues_response(report: &WizardReport) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "warning",
        "issues": report.issues,
        "display": report.display,
    })
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "issues": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageReference;

    fn outcome(issues: Vec<ValidationIssue>) -> NormalizeOutcome {
        NormalizeOutcome {
            records: None,
            display: vec![],
            images: vec![ImageReference::new("/tmp/pics/q1.png")],
            issues,
        }
    }

    #[test]
    fn test_preview_status() {
        let ready = PreviewResponse::new(None, TableInfo::default(), outcome(vec![]));
        assert_eq!(ready.status, "ready");
        assert_eq!(ready.images, vec!["q1.png"]);

        let warning = PreviewResponse::new(
            Some("q.csv".into()),
            TableInfo::default(),
            outcome(vec![ValidationIssue::UnexpectedOptions { row: 3 }]),
        );
        assert_eq!(warning.status, "warning");
    }

    #[test]
    fn test_preview_serializes_camel_case() {
        let response = PreviewResponse::rejected(
            Some("q.csv".into()),
            TableInfo {
                encoding: Some("utf-8".into()),
                delimiter: Some(",".into()),
                row_count: 2,
                columns: vec!["Topic".into()],
            },
            vec![ValidationIssue::InsufficientOptions { row: 2, found: 1 }],
        );
        let value = serde_json::to_value(&response).unwrap();

        assert!(value["jobId"].is_string());
        assert_eq!(value["fileName"], "q.csv");
        assert_eq!(value["table"]["rowCount"], 2);
        assert_eq!(value["issues"][0]["kind"], "insufficientOptions");
        assert_eq!(value["issues"][0]["row"], 2);
    }

    #[test]
    fn test_error_response_shape() {
        let value = error_response("boom");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
    }
}
