//! Error types for the exam bundle pipeline.
//!
//! Two families live here:
//!
//! - [`ValidationIssue`] - operator-facing problems found in the inputs.
//!   These are collected, never thrown, so the operator sees every
//!   problem of a pass at once.
//! - [`ParseError`], [`NormalizeError`], [`BundleError`], [`PipelineError`],
//!   [`ServerError`] - failures that stop the current operation.
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use serde::Serialize;
use thiserror::Error;

use crate::models::Role;

// =============================================================================
// Validation Issues (collected)
// =============================================================================

/// Which bound of a range a [`ValidationIssue::TimeRange`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RangeKind {
    Date,
    Time,
}

impl std::fmt::Display for RangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeKind::Date => f.write_str("Date"),
            RangeKind::Time => f.write_str("Time"),
        }
    }
}

/// A problem in operator-supplied input.
///
/// The `Display` text is the message shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationIssue {
    /// One or more bound columns are absent from the dataset.
    #[error("Columns {columns:?} are missing in the dataset.")]
    MissingColumn { columns: Vec<String> },

    /// The login column holds repeated (or missing) values.
    #[error("Multiple similar logins are found in the selected login column '{column}'.")]
    DuplicateKey { column: String, duplicates: Vec<String> },

    /// A choice-type row has fewer than two options.
    #[error("Row {row}: For 'multiple choice' or 'single choice', 'Options' must have at least 2 options separated by new lines.")]
    InsufficientOptions { row: usize, found: usize },

    /// A number/text row carries options.
    #[error("Row {row}: For 'number' or 'text' type, 'Options' should be blank. Please check and correct it.")]
    UnexpectedOptions { row: usize },

    /// A date or time field has its minimum after its maximum.
    #[error("Min {range} for {field} should be less than or equal to Max {range}")]
    TimeRange { field: String, range: RangeKind },

    /// A required role has no column.
    #[error("Select a column for {role}.")]
    UnboundRole { role: Role },

    /// The same column (or output name) was chosen more than once.
    #[error("Column '{column}' is selected for more than one of: {}", .usages.join(", "))]
    DuplicateBinding { column: String, usages: Vec<String> },

    /// A field definition is incomplete or holds an unparsable value.
    #[error("Field '{field}': {message}")]
    InvalidField { field: String, message: String },

    /// A required wizard input was not supplied or is unusable.
    #[error("{input}: {message}")]
    MissingInput { input: String, message: String },
}

impl ValidationIssue {
    /// 1-based dataset row this issue points at, if any.
    pub fn row(&self) -> Option<usize> {
        match self {
            ValidationIssue::InsufficientOptions { row, .. }
            | ValidationIssue::UnexpectedOptions { row } => Some(*row),
            _ => None,
        }
    }
}

// =============================================================================
// Table Parsing Errors
// =============================================================================

/// Errors while decoding a tabular input file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the text encoding.
    #[error("Failed to decode text: {0}")]
    Encoding(String),

    /// Malformed delimited text.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook could not be opened or read.
    #[error("Invalid spreadsheet: {0}")]
    Spreadsheet(String),

    /// The file extension maps to no known format.
    #[error("Unsupported file type: '{0}' (expected csv, xlsx, xls or ods)")]
    UnsupportedFormat(String),

    /// Empty file.
    #[error("File is empty")]
    EmptyFile,

    /// No header row found.
    #[error("No headers found")]
    NoHeaders,
}

impl From<calamine::Error> for ParseError {
    fn from(err: calamine::Error) -> Self {
        ParseError::Spreadsheet(err.to_string())
    }
}

// =============================================================================
// Normalization Errors
// =============================================================================

/// Errors that stop a normalization pass before any row is read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// A role's bound column is absent from the row set.
    #[error("Columns {0:?} are missing in the dataset.")]
    MissingColumn(Vec<String>),
}

impl From<NormalizeError> for ValidationIssue {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::MissingColumn(columns) => ValidationIssue::MissingColumn { columns },
        }
    }
}

// =============================================================================
// Bundle Errors
// =============================================================================

/// Errors while assembling the output archive.
#[derive(Debug, Error)]
pub enum BundleError {
    /// Failed to read a file that goes into the archive.
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Zip writer failure.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Generic I/O while writing the archive.
    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The metadata descriptor does not match its schema.
    #[error("Invalid metadata descriptor: {}", .0.join("; "))]
    InvalidMetadata(Vec<String>),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level wizard errors.
///
/// Returned by [`crate::transform::pipeline::run_wizard`]. Operator input
/// problems are not errors; they come back inside the report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Table decoding error.
    #[error("Parse error in '{file}': {source}")]
    Parse {
        file: String,
        #[source]
        source: ParseError,
    },

    /// Bundle assembly error.
    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// Malformed wizard manifest.
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Table decoding error.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for table parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for bundle assembly.
pub type BundleResult<T> = Result<T, BundleError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let parse_err = ParseError::EmptyFile;
        let server_err: ServerError = parse_err.into();
        assert!(server_err.to_string().contains("empty"));

        let bundle_err = BundleError::InvalidMetadata(vec!["exam_name".into()]);
        let pipeline_err: PipelineError = bundle_err.into();
        assert!(pipeline_err.to_string().contains("exam_name"));
    }

    #[test]
    fn test_issue_messages_name_the_row() {
        let err = ValidationIssue::InsufficientOptions { row: 3, found: 1 };
        assert!(err.to_string().starts_with("Row 3:"));
        assert_eq!(err.row(), Some(3));

        let err = ValidationIssue::UnexpectedOptions { row: 7 };
        assert!(err.to_string().contains("should be blank"));
        assert_eq!(err.row(), Some(7));
    }

    #[test]
    fn test_time_range_message() {
        let err = ValidationIssue::TimeRange {
            field: "Birth".into(),
            range: RangeKind::Date,
        };
        assert_eq!(
            err.to_string(),
            "Min Date for Birth should be less than or equal to Max Date"
        );
        assert_eq!(err.row(), None);
    }

    #[test]
    fn test_issue_serializes_with_kind_tag() {
        let err = ValidationIssue::UnexpectedOptions { row: 2 };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "unexpectedOptions");
        assert_eq!(json["row"], 2);
    }

    #[test]
    fn test_normalize_error_becomes_issue() {
        let issue: ValidationIssue = NormalizeError::MissingColumn(vec!["Group".into()]).into();
        assert_eq!(
            issue,
            ValidationIssue::MissingColumn {
                columns: vec!["Group".into()]
            }
        );
    }
}
