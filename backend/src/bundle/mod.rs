//! Exam bundle assembly.
//!
//! A bundle is one zip archive:
//!
//! ```text
//! <exam>_exam_details.zip
//! ├── <exam>.json          metadata descriptor
//! ├── Ab12Cd34.csv         credentials table    (Login + Password only)
//! ├── Ef56Gh78.csv         questions table      (when questions were supplied)
//! ├── cover.jpg            cover image, original name
//! └── q1.png ...           every image referenced by a question or option
//! ```
//!
//! Entry names are unique: a later entry with the same name replaces the
//! earlier one.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::api::logs::{log_info, log_success};
use crate::error::{BundleError, BundleResult};
use crate::models::{FieldDefinition, ImageReference, NormalizedRecord, CANONICAL_COLUMNS};
use crate::transform::credentials::CredentialsTable;
use crate::validation::validate_exam_metadata;

/// Length of the random stem of generated file names.
const RANDOM_STEM_LEN: usize = 8;

/// Login mode of the exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginType {
    #[serde(rename = "Login + Password")]
    Credentials,
    #[serde(rename = "User Input Model")]
    UserInputs,
}

impl LoginType {
    pub const fn label(self) -> &'static str {
        match self {
            LoginType::Credentials => "Login + Password",
            LoginType::UserInputs => "User Input Model",
        }
    }
}

/// What the chosen login mode contributes to the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginArtifacts {
    Credentials(CredentialsTable),
    UserInputs(Vec<FieldDefinition>),
}

impl LoginArtifacts {
    pub fn login_type(&self) -> LoginType {
        match self {
            LoginArtifacts::Credentials(_) => LoginType::Credentials,
            LoginArtifacts::UserInputs(_) => LoginType::UserInputs,
        }
    }
}

/// The login page image, stored under its original name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Validated questions and the images they reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    pub records: Vec<NormalizedRecord>,
    pub images: Vec<ImageReference>,
}

/// Everything a bundle is built from.
#[derive(Debug, Clone)]
pub struct BundleInput {
    pub exam_name: String,
    pub cover: CoverImage,
    pub login: LoginArtifacts,
    pub questions: Option<QuestionSet>,
}

/// A finished bundle.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Download name, `<exam>_exam_details.zip`.
    pub file_name: String,
    /// The metadata descriptor as written.
    pub metadata: Value,
    /// Entry names in archive order.
    pub entries: Vec<String>,
    /// Zip bytes.
    pub bytes: Vec<u8>,
}

/// Random `XXXXXXXX.<ext>` name from ASCII letters and digits.
pub fn random_filename<R: Rng + ?Sized>(rng: &mut R, extension: &str) -> String {
    let stem: String = rng
        .sample_iter(&Alphanumeric)
        .take(RANDOM_STEM_LEN)
        .map(char::from)
        .collect();
    format!("{}.{}", stem, extension)
}

/// Serialize questions with the five canonical columns, in record order.
pub fn questions_to_csv(records: &[NormalizedRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CANONICAL_COLUMNS)?;
    for record in records {
        writer.write_record([
            &record.topic,
            &record.question,
            &record.answer_type,
            &record.group,
            &record.options,
        ])?;
    }
    writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}

/// Build the metadata descriptor.
pub fn build_metadata(
    exam_name: &str,
    cover_name: &str,
    login: &LoginArtifacts,
    credentials_csv: Option<&str>,
    questions_csv: Option<&str>,
) -> BundleResult<Value> {
    let mut metadata = Map::new();
    metadata.insert("exam_name".into(), json!(exam_name));
    metadata.insert("login_type".into(), json!(login.login_type().label()));
    metadata.insert("login_page_image".into(), json!(cover_name));

    match login {
        LoginArtifacts::Credentials(_) => {
            metadata.insert("login + Password_csv_filename".into(), json!(credentials_csv));
        }
        LoginArtifacts::UserInputs(fields) => {
            metadata.insert("user_inputs".into(), serde_json::to_value(fields)?);
        }
    }
    if let Some(name) = questions_csv {
        metadata.insert("exam_questions_csv_filename".into(), json!(name));
    }

    let metadata = Value::Object(metadata);
    validate_exam_metadata(&metadata).map_err(BundleError::InvalidMetadata)?;
    Ok(metadata)
}

/// Ordered archive entries with replace-on-same-name.
#[derive(Default)]
struct ArchivePlan {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArchivePlan {
    fn put(&mut self, name: String, bytes: Vec<u8>) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = bytes,
            None => self.entries.push((name, bytes)),
        }
    }

    fn write_zip(&self) -> BundleResult<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, bytes) in &self.entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

/// Build a bundle with the thread-local RNG for generated names.
pub fn build_bundle(input: &BundleInput) -> BundleResult<Bundle> {
    build_bundle_with_rng(input, &mut rand::thread_rng())
}

/// Build a bundle, drawing generated file names from `rng`.
pub fn build_bundle_with_rng<R: Rng + ?Sized>(input: &BundleInput, rng: &mut R) -> BundleResult<Bundle> {
    log_info(format!("📦 Building bundle for '{}'...", input.exam_name));

    let credentials = match &input.login {
        LoginArtifacts::Credentials(table) => Some((random_filename(rng, "csv"), table.to_csv()?)),
        LoginArtifacts::UserInputs(_) => None,
    };
    let questions = match &input.questions {
        Some(set) => Some((random_filename(rng, "csv"), questions_to_csv(&set.records)?)),
        None => None,
    };

    let metadata = build_metadata(
        &input.exam_name,
        &input.cover.file_name,
        &input.login,
        credentials.as_ref().map(|(name, _)| name.as_str()),
        questions.as_ref().map(|(name, _)| name.as_str()),
    )?;

    let mut plan = ArchivePlan::default();
    plan.put(format!("{}.json", input.exam_name), serde_json::to_vec(&metadata)?);
    if let Some((name, bytes)) = credentials {
        plan.put(name, bytes);
    }
    if let Some((name, bytes)) = questions {
        plan.put(name, bytes);
    }
    plan.put(input.cover.file_name.clone(), input.cover.bytes.clone());

    if let Some(set) = &input.questions {
        for image in &set.images {
            let bytes = std::fs::read(image.path()).map_err(|source| BundleError::Read {
                path: image.path().display().to_string(),
                source,
            })?;
            plan.put(image.archive_name(), bytes);
        }
    }

    let bytes = plan.write_zip()?;
    let entries: Vec<String> = plan.entries.into_iter().map(|(name, _)| name).collect();
    log_success(format!("Bundle ready: {} entries, {} bytes", entries.len(), bytes.len()));

    Ok(Bundle {
        file_name: format!("{}_exam_details.zip", input.exam_name),
        metadata,
        entries,
        bytes,
    })
}
