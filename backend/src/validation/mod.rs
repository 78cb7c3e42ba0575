//! JSON Schema validation for the bundle metadata descriptor.
//!
//! The descriptor is the JSON file at the root of every bundle. It is checked
//! against an embedded Draft 7 schema (`schemas/exam-metadata.json`) before
//! the archive is written:
//!
//! - `exam_name`, `login_type`, `login_page_image` are required
//! - `"Login + Password"` requires `login + Password_csv_filename`
//! - `"User Input Model"` requires `user_inputs`
//! - generated file names are 8 alphanumerics + `.csv`
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use exambundle::validation::validate_exam_metadata;
//!
//! let metadata = json!({
//!     "exam_name": "Physics",
//!     "login_type": "User Input Model",
//!     "login_page_image": "cover.jpg",
//!     "user_inputs": []
//! });
//! assert!(validate_exam_metadata(&metadata).is_ok());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static METADATA_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/exam-metadata.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with one message per violation
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a bundle metadata descriptor.
pub fn validate_exam_metadata(data: &Value) -> Result<(), Vec<String>> {
    validate(&METADATA_SCHEMA, data)
}

/// Quick check against the metadata schema.
pub fn is_valid_exam_metadata(data: &Value) -> bool {
    is_valid(&METADATA_SCHEMA, data)
}
