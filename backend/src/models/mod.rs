//! Domain models for the exam bundle pipeline.
//!
//! - [`Table`] / [`RawRow`] - decoded operator data, cells may be *not available*
//! - [`Role`] / [`ColumnRoleMap`] - the five question roles and their columns
//! - [`AnswerType`] - answer type vocabulary
//! - [`NormalizedRecord`] - one question, ready for serialization
//! - [`DisplayRow`] / [`DisplayCell`] - the expanded operator review view
//! - [`ImageReference`] - a cell that points at a readable image
//! - [`fields`] - user-input field definitions

pub mod fields;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub use fields::{FieldDefinition, FieldDraft, FieldKind, TextType, TimeFormat};

// =============================================================================
// Tabular Input
// =============================================================================

/// One row of operator data: ordered `(column, value)` pairs.
///
/// `None` is *not available* and is distinct from an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawRow {
    cells: Vec<(String, Option<String>)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell; a repeated column name overwrites the earlier value.
    pub fn push(&mut self, column: impl Into<String>, value: Option<String>) {
        let column = column.into();
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    /// `None` if the column does not exist, `Some(None)` if the cell is NA.
    pub fn get(&self, column: &str) -> Option<Option<&str>> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_deref())
    }

    /// Cell text with NA and absent columns read as empty.
    pub fn text(&self, column: &str) -> &str {
        self.get(column).flatten().unwrap_or("")
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.cells.iter().any(|(c, _)| c == column)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Option<V>)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (k, v) in iter {
            row.push(k, v.map(Into::into));
        }
        row
    }
}

/// A decoded dataset: header row plus data rows in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// =============================================================================
// Question Roles
// =============================================================================

/// The five semantic roles a question sheet column can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Topic,
    Questions,
    AnswerType,
    Group,
    Options,
}

impl Role {
    /// All roles in canonical column order.
    pub const ALL: [Role; 5] = [
        Role::Topic,
        Role::Questions,
        Role::AnswerType,
        Role::Group,
        Role::Options,
    ];

    /// Canonical column name used in the serialized questions table.
    pub const fn column_name(self) -> &'static str {
        match self {
            Role::Topic => "Topic/Subject",
            Role::Questions => "Questions",
            Role::AnswerType => "Answer Type",
            Role::Group => "Group",
            Role::Options => "Options",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Canonical column names of the questions table, in order.
pub const CANONICAL_COLUMNS: [&str; 5] = [
    Role::Topic.column_name(),
    Role::Questions.column_name(),
    Role::AnswerType.column_name(),
    Role::Group.column_name(),
    Role::Options.column_name(),
];

/// Which input column is bound to each role. A blank string is unbound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoleMap {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub questions: String,
    #[serde(default)]
    pub answer_type: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub options: String,
}

impl ColumnRoleMap {
    pub fn new(
        topic: impl Into<String>,
        questions: impl Into<String>,
        answer_type: impl Into<String>,
        group: impl Into<String>,
        options: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            questions: questions.into(),
            answer_type: answer_type.into(),
            group: group.into(),
            options: options.into(),
        }
    }

    pub fn column(&self, role: Role) -> &str {
        match role {
            Role::Topic => &self.topic,
            Role::Questions => &self.questions,
            Role::AnswerType => &self.answer_type,
            Role::Group => &self.group,
            Role::Options => &self.options,
        }
    }

    /// `(role, column)` pairs in canonical order.
    pub fn bindings(&self) -> impl Iterator<Item = (Role, &str)> {
        Role::ALL.into_iter().map(move |r| (r, self.column(r)))
    }
}

// =============================================================================
// Answer Type
// =============================================================================

/// Answer type of a question, compared case-insensitively after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerType {
    MultipleChoice,
    SingleChoice,
    Number,
    Text,
    /// Anything else; passed through without option checks.
    Other(String),
}

impl AnswerType {
    pub fn parse(raw: &str) -> Self {
        let folded = raw.trim().to_lowercase();
        match folded.as_str() {
            "multiple choice" => AnswerType::MultipleChoice,
            "single choice" => AnswerType::SingleChoice,
            "number" => AnswerType::Number,
            "text" => AnswerType::Text,
            _ => AnswerType::Other(folded),
        }
    }

    /// Choice types need at least two options.
    pub fn is_choice(&self) -> bool {
        matches!(self, AnswerType::MultipleChoice | AnswerType::SingleChoice)
    }

    /// Number and text types must leave options blank.
    pub fn forbids_options(&self) -> bool {
        matches!(self, AnswerType::Number | AnswerType::Text)
    }
}

// =============================================================================
// Normalizer Output
// =============================================================================

/// One logical question projected onto the canonical columns.
///
/// Field values are the original cell text; NA reads as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(rename = "Topic/Subject")]
    pub topic: String,
    #[serde(rename = "Questions")]
    pub question: String,
    #[serde(rename = "Answer Type")]
    pub answer_type: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Options")]
    pub options: String,
}

/// A file path found in a question or option cell that decodes as an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageReference {
    pub path: PathBuf,
}

impl ImageReference {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base file name, used as the entry name inside the bundle.
    pub fn archive_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// How a question or option cell is shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DisplayCell {
    /// Shown verbatim.
    Text { value: String },
    /// Shown as an inline base64 thumbnail.
    Image {
        path: String,
        mime: String,
        base64: String,
    },
}

impl DisplayCell {
    pub fn text(value: impl Into<String>) -> Self {
        DisplayCell::Text { value: value.into() }
    }

    pub fn blank() -> Self {
        DisplayCell::text("")
    }

    pub fn is_image(&self) -> bool {
        matches!(self, DisplayCell::Image { .. })
    }

    /// `data:` URI for image cells.
    pub fn data_uri(&self) -> Option<String> {
        match self {
            DisplayCell::Image { mime, base64, .. } => Some(format!("data:{};base64,{}", mime, base64)),
            DisplayCell::Text { .. } => None,
        }
    }
}

/// One presentation row of the review view.
///
/// Choice questions expand to one row per option; only the first carries
/// topic, question, type and group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRow {
    pub topic: String,
    pub question: DisplayCell,
    pub answer_type: String,
    pub group: String,
    /// 1-based option index, choice rows only.
    pub option_no: Option<usize>,
    pub option: DisplayCell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_row_distinguishes_na_from_absent() {
        let row: RawRow = [("a", Some("1")), ("b", None)].into_iter().collect();
        assert_eq!(row.get("a"), Some(Some("1")));
        assert_eq!(row.get("b"), Some(None));
        assert_eq!(row.get("c"), None);
        assert_eq!(row.text("b"), "");
        assert_eq!(row.text("c"), "");
    }

    #[test]
    fn test_raw_row_repeated_column_overwrites() {
        let mut row = RawRow::new();
        row.push("a", Some("1".into()));
        row.push("a", Some("2".into()));
        assert_eq!(row.len(), 1);
        assert_eq!(row.text("a"), "2");
    }

    #[test]
    fn test_answer_type_parse() {
        assert_eq!(AnswerType::parse("  Single Choice "), AnswerType::SingleChoice);
        assert_eq!(AnswerType::parse("MULTIPLE CHOICE"), AnswerType::MultipleChoice);
        assert_eq!(AnswerType::parse("Number"), AnswerType::Number);
        assert_eq!(AnswerType::parse("text"), AnswerType::Text);
        // internal whitespace is not folded
        assert_eq!(
            AnswerType::parse("single  choice"),
            AnswerType::Other("single  choice".into())
        );
        assert!(AnswerType::parse("Single Choice").is_choice());
        assert!(AnswerType::parse("Text").forbids_options());
        assert!(!AnswerType::parse("essay").forbids_options());
    }

    #[test]
    fn test_canonical_columns_order() {
        assert_eq!(
            CANONICAL_COLUMNS,
            ["Topic/Subject", "Questions", "Answer Type", "Group", "Options"]
        );
    }

    #[test]
    fn test_image_reference_archive_name() {
        let img = ImageReference::new("/tmp/pics/cat.png");
        assert_eq!(img.archive_name(), "cat.png");
    }

    #[test]
    fn test_data_uri() {
        let cell = DisplayCell::Image {
            path: "a.png".into(),
            mime: "image/png".into(),
            base64: "AAAA".into(),
        };
        assert_eq!(cell.data_uri().as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(DisplayCell::blank().data_uri(), None);
    }
}
