//! # Exambundle - exam bundle wizard
//!
//! Exambundle turns operator spreadsheets into an exam bundle: a zip archive
//! holding a metadata descriptor, the login data, the normalized question
//! sheet and every image the questions point at.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ CSV / XLSX  │────▶│   Parser    │────▶│  Normalizer  │────▶│ Bundle .zip │
//! │ (any enc.)  │     │ (auto-enc)  │     │ + login data │     │ (validated) │
//! └─────────────┘     └─────────────┘     └──────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use exambundle::{normalize_table, parse_table_file, ColumnRoleMap};
//!
//! let parsed = parse_table_file("questions.xlsx")?;
//! let roles = ColumnRoleMap::new("Topic", "Question", "Type", "Group", "Options");
//! let outcome = normalize_table(&parsed.table, &roles)?;
//! for issue in &outcome.issues {
//!     eprintln!("{}", issue);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types and operator-facing issues
//! - [`models`] - Domain models (Table, ColumnRoleMap, DisplayRow, fields)
//! - [`parser`] - Delimited text and spreadsheet decoding with auto-detection
//! - [`transform`] - Role checks, normalizer, login modes and the wizard
//! - [`validation`] - Metadata schema validation
//! - [`bundle`] - Zip archive assembly
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Packaging
pub mod bundle;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BundleError, BundleResult, NormalizeError, ParseError, ParseResult, PipelineError,
    PipelineResult, RangeKind, ServerError, ServerResult, ValidationIssue,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    AnswerType, ColumnRoleMap, DisplayCell, DisplayRow, FieldDefinition, FieldDraft, FieldKind,
    ImageReference, NormalizedRecord, RawRow, Role, Table, TextType, TimeFormat, CANONICAL_COLUMNS,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_delimited, parse_delimited_auto,
    parse_spreadsheet, parse_table_bytes, parse_table_file, ParsedTable, SourceFormat,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    collect_field_definitions, normalize, normalize_table, render_html, run_wizard,
    select_credentials, split_options, validate_role_map, CredentialSelection, CredentialsTable,
    FieldCollection, LoginSection, NormalizeOutcome, QuestionsSection, RenameDraft,
    WizardManifest, WizardReport,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid, is_valid_exam_metadata, validate, validate_exam_metadata};

// =============================================================================
// Re-exports - Bundle
// =============================================================================

pub use bundle::{build_bundle, random_filename, Bundle, BundleInput, LoginArtifacts, LoginType};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, PreviewResponse, TableInfo};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
