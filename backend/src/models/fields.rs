//! User-input field definitions for the "User Input Model" login type.
//!
//! A [`FieldDraft`] is what the operator typed into one row of the form;
//! [`crate::transform::fields::collect_field_definitions`] turns the draft
//! sequence into [`FieldDefinition`]s.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Character class accepted by a text field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextType {
    #[default]
    #[serde(rename = "All Characters")]
    AllCharacters,
    #[serde(rename = "Only Letters")]
    OnlyLetters,
}

/// Clock convention of a time field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "24-hour")]
    TwentyFourHour,
    #[serde(rename = "12-hour")]
    TwelveHour,
}

impl TimeFormat {
    /// chrono format string for bounds of this convention.
    pub const fn pattern(self) -> &'static str {
        match self {
            TimeFormat::TwentyFourHour => "%H:%M",
            TimeFormat::TwelveHour => "%I:%M %p",
        }
    }
}

fn default_max_value() -> i64 {
    100
}

/// Type-specific attributes of a field, tagged by `field_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field_type")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        text_type: TextType,
    },
    Number {
        #[serde(default)]
        min_value: i64,
        #[serde(default = "default_max_value")]
        max_value: i64,
    },
    Date {
        #[serde(default)]
        min_date: Option<NaiveDate>,
        #[serde(default)]
        max_date: Option<NaiveDate>,
    },
    Time {
        #[serde(default)]
        time_format: Option<TimeFormat>,
        #[serde(default)]
        min_time: Option<String>,
        #[serde(default)]
        max_time: Option<String>,
    },
    List {
        #[serde(default)]
        items: Vec<String>,
    },
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "Text",
            FieldKind::Number { .. } => "Number",
            FieldKind::Date { .. } => "Date",
            FieldKind::Time { .. } => "Time",
            FieldKind::List { .. } => "List",
        }
    }
}

/// One row of the field definition form, possibly incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDraft {
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub kind: Option<FieldKind>,
}

impl FieldDraft {
    pub fn new(field_name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            field_name: field_name.into(),
            kind: Some(kind),
        }
    }

    /// A draft with no name or no type ends the sequence.
    pub fn is_terminator(&self) -> bool {
        self.field_name.trim().is_empty() || self.kind.is_none()
    }
}

/// A validated field definition, serialized flat into the metadata descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub field_name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}
