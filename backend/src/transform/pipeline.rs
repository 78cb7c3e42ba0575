//! The exam wizard: every check in one pass, then the bundle.
//!
//! Steps run in order and each one adds its problems to a shared list:
//!
//! 1. exam name and cover image
//! 2. login section (credentials table or user-input fields)
//! 3. questions section, when present (role map, then normalization)
//!
//! The bundle is built only when the list is empty. Otherwise the report
//! carries the issues and whatever review view could be produced.
//!
//! # Example
//!
//! ```rust,ignore
//! use exambundle::transform::pipeline::{run_wizard, WizardManifest};
//! use std::path::Path;
//!
//! let manifest = WizardManifest::from_path(Path::new("exam.json"))?;
//! let report = run_wizard(&manifest)?;
//! match report.bundle {
//!     Some(bundle) => std::fs::write(&bundle.file_name, &bundle.bytes)?,
//!     None => report.issues.iter().for_each(|i| eprintln!("{}", i)),
//! }
//! ```

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::credentials::{select_credentials, CredentialSelection};
use super::fields::collect_field_definitions;
use super::normalizer::{normalize_table, NormalizeOutcome};
use super::roles::validate_role_map;
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::bundle::{build_bundle, Bundle, BundleInput, CoverImage, LoginArtifacts, QuestionSet};
use crate::error::{PipelineError, PipelineResult, ValidationIssue};
use crate::models::{ColumnRoleMap, DisplayRow, FieldDefinition, FieldDraft, ImageReference, Table};
use crate::parser::parse_table_file;

/// Login section of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoginSection {
    /// Login + password dataset.
    Credentials {
        file: PathBuf,
        selection: CredentialSelection,
    },
    /// Fields the candidate fills in at login.
    UserInputs {
        #[serde(default)]
        fields: Vec<FieldDraft>,
    },
}

/// Questions section of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionsSection {
    pub file: PathBuf,
    pub roles: ColumnRoleMap,
}

/// Everything the operator supplies to the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardManifest {
    #[serde(default)]
    pub exam_name: String,
    #[serde(default)]
    pub cover_image: Option<PathBuf>,
    pub login: LoginSection,
    #[serde(default)]
    pub questions: Option<QuestionsSection>,
}

impl WizardManifest {
    pub fn from_json(content: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a manifest file; relative paths are taken from its directory.
    pub fn from_path(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut manifest = Self::from_json(&content)?;
        if let Some(base) = path.parent() {
            manifest.resolve_paths(base);
        }
        Ok(manifest)
    }

    /// Rebase every relative file path onto `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() && !p.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        if let Some(cover) = self.cover_image.as_mut() {
            rebase(cover);
        }
        if let LoginSection::Credentials { file, .. } = &mut self.login {
            rebase(file);
        }
        if let Some(questions) = self.questions.as_mut() {
            rebase(&mut questions.file);
        }
    }
}

/// What a wizard run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardReport {
    pub issues: Vec<ValidationIssue>,
    /// Question review view; empty without a questions section.
    pub display: Vec<DisplayRow>,
    pub images: Vec<ImageReference>,
    /// Present only when no issue was found.
    #[serde(skip)]
    pub bundle: Option<Bundle>,
}

impl WizardReport {
    pub fn is_ready(&self) -> bool {
        self.issues.is_empty() && self.bundle.is_some()
    }
}

fn warn_all(found: Vec<ValidationIssue>, issues: &mut Vec<ValidationIssue>) {
    for issue in found {
        log_warning(issue.to_string());
        issues.push(issue);
    }
}

fn missing_input(input: &str, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue::MissingInput {
        input: input.to_string(),
        message: message.into(),
    }
}

/// The exam name doubles as a file name inside and outside the bundle.
fn check_exam_name(name: &str) -> Result<(), ValidationIssue> {
    if name.is_empty() {
        return Err(missing_input("Exam name", "enter an exam name"));
    }
    if name.contains(['/', '\\']) {
        return Err(missing_input("Exam name", "must not contain '/' or '\\'"));
    }
    Ok(())
}

/// The cover must be a `.jpg`/`.jpeg` file that decodes as JPEG.
pub fn load_cover(path: Option<&Path>) -> Result<CoverImage, ValidationIssue> {
    const INPUT: &str = "Login page image";

    let path = path
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| missing_input(INPUT, "upload a JPEG image"))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    if !matches!(ext.as_deref(), Some("jpg" | "jpeg")) {
        return Err(missing_input(INPUT, format!("'{}' is not a .jpg or .jpeg file", path.display())));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| missing_input(INPUT, format!("cannot read '{}': {}", path.display(), e)))?;
    let is_jpeg = image::guess_format(&bytes).ok() == Some(ImageFormat::Jpeg)
        && image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).is_ok();
    if !is_jpeg {
        return Err(missing_input(INPUT, format!("'{}' does not decode as JPEG", path.display())));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cover.jpg".to_string());
    Ok(CoverImage { file_name, bytes })
}

fn load_table(path: &Path) -> PipelineResult<Table> {
    log_info(format!("📖 Reading {}...", path.display()));
    let parsed = parse_table_file(path).map_err(|source| PipelineError::Parse {
        file: path.display().to_string(),
        source,
    })?;

    if let Some(encoding) = &parsed.encoding {
        log_info_indent(format!("Detected encoding: {}", encoding), 1);
    }
    if let Some(delimiter) = parsed.delimiter {
        log_info_indent(format!("Detected separator: '{}'", format_delimiter(delimiter)), 1);
    }
    log_success(format!(
        "Read {} rows, {} columns",
        parsed.table.len(),
        parsed.table.headers.len()
    ));
    Ok(parsed.table)
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        other => other.to_string(),
    }
}

fn login_step(section: &LoginSection, issues: &mut Vec<ValidationIssue>) -> PipelineResult<Option<LoginArtifacts>> {
    match section {
        LoginSection::Credentials { file, selection } => {
            log_info("🔑 Login + Password dataset");
            let table = load_table(file)?;
            match select_credentials(&table, selection) {
                Ok(credentials) => {
                    log_success(format!("{} credential rows", credentials.rows.len()));
                    Ok(Some(LoginArtifacts::Credentials(credentials)))
                }
                Err(found) => {
                    warn_all(found, issues);
                    Ok(None)
                }
            }
        }
        LoginSection::UserInputs { fields } => {
            log_info("🧩 User Input Model");
            let collected = collect_field_definitions(fields);
            if collected.consumed < fields.len() {
                log_info_indent(
                    format!(
                        "{} draft(s) after the first blank one ignored",
                        fields.len() - collected.consumed
                    ),
                    1,
                );
            }
            let valid = collected.is_valid();
            issues.extend(collected.issues);
            if !valid {
                return Ok(None);
            }
            log_success(format!("{} user input field(s)", collected.fields.len()));
            for field in &collected.fields {
                log_info_indent(format!("{} ({})", field.field_name, field.kind.type_name()), 1);
            }
            Ok(Some(LoginArtifacts::UserInputs(collected.fields)))
        }
    }
}

fn questions_step(
    section: &QuestionsSection,
    issues: &mut Vec<ValidationIssue>,
) -> PipelineResult<Option<NormalizeOutcome>> {
    log_info("📝 Exam questions");
    let table = load_table(&section.file)?;

    if let Err(found) = validate_role_map(&section.roles, &table.headers) {
        warn_all(found, issues);
        return Ok(None);
    }

    match normalize_table(&table, &section.roles) {
        Ok(outcome) => {
            issues.extend(outcome.issues.iter().cloned());
            Ok(Some(outcome))
        }
        Err(e) => {
            warn_all(vec![e.into()], issues);
            Ok(None)
        }
    }
}

/// Run every wizard check and build the bundle when nothing is wrong.
///
/// Operator mistakes come back in [`WizardReport::issues`]. `Err` means an
/// input file could not be decoded or the bundle could not be written.
pub fn run_wizard(manifest: &WizardManifest) -> PipelineResult<WizardReport> {
    let exam_name = manifest.exam_name.trim();
    log_info(format!("🗂️  Preparing exam '{}'", exam_name));

    let mut issues = Vec::new();

    if let Err(issue) = check_exam_name(exam_name) {
        warn_all(vec![issue], &mut issues);
    }
    let cover = match load_cover(manifest.cover_image.as_deref()) {
        Ok(cover) => Some(cover),
        Err(issue) => {
            warn_all(vec![issue], &mut issues);
            None
        }
    };

    let login = login_step(&manifest.login, &mut issues)?;

    let outcome = match &manifest.questions {
        Some(section) => questions_step(section, &mut issues)?,
        None => None,
    };
    let (display, images, records) = match outcome {
        Some(o) => (o.display, o.images, o.records),
        None => (Vec::new(), Vec::new(), None),
    };

    let mut report = WizardReport {
        issues,
        display,
        images,
        bundle: None,
    };

    if !report.issues.is_empty() {
        log_warning(format!("{} issue(s) found, bundle not created", report.issues.len()));
        return Ok(report);
    }

    let (Some(cover), Some(login)) = (cover, login) else {
        return Ok(report);
    };
    let questions = match (&manifest.questions, records) {
        (Some(_), Some(records)) => Some(QuestionSet {
            records,
            images: report.images.clone(),
        }),
        (Some(_), None) => return Ok(report),
        (None, _) => None,
    };

    let bundle = build_bundle(&BundleInput {
        exam_name: exam_name.to_string(),
        cover,
        login,
        questions,
    })?;
    report.bundle = Some(bundle);
    Ok(report)
}

/// Field definitions only, failing with the collected issues.
pub fn fields_from_drafts(drafts: &[FieldDraft]) -> Result<Vec<FieldDefinition>, Vec<ValidationIssue>> {
    let collected = collect_field_definitions(drafts);
    if collected.is_valid() {
        Ok(collected.fields)
    } else {
        Err(collected.issues)
    }
}
