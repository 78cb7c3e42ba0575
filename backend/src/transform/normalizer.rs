//! Question sheet normalization.
//!
//! Takes operator rows plus a [`ColumnRoleMap`] and produces:
//!
//! - the [`NormalizedRecord`] projection for serialization (only when every
//!   row is valid),
//! - the expanded [`DisplayRow`] review view, one row per option for choice
//!   questions,
//! - the set of [`ImageReference`]s found in question and option cells,
//! - every [`ValidationIssue`] found, in row order.
//!
//! Validation is batch, not fail-fast: a bad row is reported and the pass
//! moves on to the next one.
//!
//! ```text
//! Topic | Question | Type          | Group | Options        Topic | Question | Type | Group | # | Option
//! ------+----------+---------------+-------+-------------  → ------+----------+------+-------+---+-------
//! Geo   | Capital? | Single Choice | A     | Paris\nLondon  Geo   | Capital? | ...  | A     | 1 | Paris
//!                                                                 |          |      |       | 2 | London
//! ```

use serde::Serialize;
use std::collections::BTreeSet;

use super::images::classify_cell;
use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{NormalizeError, ValidationIssue};
use crate::models::{
    AnswerType, ColumnRoleMap, DisplayCell, DisplayRow, ImageReference, NormalizedRecord, RawRow,
    Role, Table,
};

/// Result of one normalization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeOutcome {
    /// Canonical records in original row order; `None` while any row is invalid.
    pub records: Option<Vec<NormalizedRecord>>,
    /// Review view, possibly partial when rows were rejected.
    pub display: Vec<DisplayRow>,
    /// Image references in first-seen order, without duplicates.
    pub images: Vec<ImageReference>,
    /// Problems found, in row order.
    pub issues: Vec<ValidationIssue>,
}

impl NormalizeOutcome {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Normalize a decoded table, checking bound columns against its header.
pub fn normalize_table(table: &Table, roles: &ColumnRoleMap) -> Result<NormalizeOutcome, NormalizeError> {
    let missing: Vec<String> = roles
        .bindings()
        .filter(|(_, column)| !table.has_column(column))
        .map(|(_, column)| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(NormalizeError::MissingColumn(missing));
    }

    normalize(&table.rows, roles)
}

/// Normalize question rows under a role map.
///
/// Fails only when a bound column is absent from the row set; row-level
/// problems are collected in [`NormalizeOutcome::issues`].
pub fn normalize(rows: &[RawRow], roles: &ColumnRoleMap) -> Result<NormalizeOutcome, NormalizeError> {
    check_columns(rows, roles)?;

    log_info(format!("📋 Normalizing {} question rows...", rows.len()));

    let mut records = Vec::with_capacity(rows.len());
    let mut display = Vec::new();
    let mut images: Vec<ImageReference> = Vec::new();
    let mut issues = Vec::new();

    let mut remember = |reference: Option<ImageReference>| {
        if let Some(reference) = reference {
            if !images.contains(&reference) {
                images.push(reference);
            }
        }
    };

    for (index, row) in rows.iter().enumerate() {
        let row_no = index + 1;
        let record = rebind(row, roles);

        let answer_type = AnswerType::parse(&record.answer_type);
        let options = record.options.trim();
        let question = record.question.trim();

        let (question_cell, question_image) = classify_cell(question);
        remember(question_image);

        if answer_type.is_choice() {
            let option_list: Vec<&str> = split_options(options);

            if option_list.len() < 2 {
                let issue = ValidationIssue::InsufficientOptions {
                    row: row_no,
                    found: option_list.len(),
                };
                log_warning(issue.to_string());
                issues.push(issue);
            } else {
                for (i, option) in option_list.iter().enumerate() {
                    let option_no = i + 1;
                    let (option_cell, option_image) = classify_cell(option);
                    remember(option_image);

                    let first = option_no == 1;
                    display.push(DisplayRow {
                        topic: if first { record.topic.clone() } else { String::new() },
                        question: if first { question_cell.clone() } else { DisplayCell::blank() },
                        answer_type: if first { record.answer_type.clone() } else { String::new() },
                        group: if first { record.group.clone() } else { String::new() },
                        option_no: Some(option_no),
                        option: option_cell,
                    });
                }
            }
        } else {
            if answer_type.forbids_options() && !options.is_empty() {
                let issue = ValidationIssue::UnexpectedOptions { row: row_no };
                log_warning(issue.to_string());
                issues.push(issue);
            }

            display.push(DisplayRow {
                topic: record.topic.clone(),
                question: question_cell,
                answer_type: record.answer_type.clone(),
                group: record.group.clone(),
                option_no: None,
                option: DisplayCell::text(options),
            });
        }

        records.push(record);
    }

    if issues.is_empty() {
        log_success(format!(
            "{} questions valid ({} display rows, {} images)",
            records.len(),
            display.len(),
            images.len()
        ));
    } else {
        let flagged: BTreeSet<usize> = issues.iter().filter_map(ValidationIssue::row).collect();
        log_warning(format!("{} of {} rows need attention", flagged.len(), rows.len()));
    }

    Ok(NormalizeOutcome {
        records: issues.is_empty().then_some(records),
        display,
        images,
        issues,
    })
}

/// Split an options cell on newlines, dropping blank entries.
pub fn split_options(options: &str) -> Vec<&str> {
    options
        .split('\n')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect()
}

fn check_columns(rows: &[RawRow], roles: &ColumnRoleMap) -> Result<(), NormalizeError> {
    let missing: Vec<String> = roles
        .bindings()
        .filter(|(_, column)| rows.iter().any(|row| !row.has_column(column)))
        .map(|(_, column)| column.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(NormalizeError::MissingColumn(missing))
    }
}

/// Project a row onto the canonical roles. NA reads as empty.
fn rebind(row: &RawRow, roles: &ColumnRoleMap) -> NormalizedRecord {
    let value = |role: Role| row.text(roles.column(role)).to_string();
    NormalizedRecord {
        topic: value(Role::Topic),
        question: value(Role::Questions),
        answer_type: value(Role::AnswerType),
        group: value(Role::Group),
        options: value(Role::Options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> ColumnRoleMap {
        ColumnRoleMap::new("Subject", "Question", "Type", "Set", "Choices")
    }

    fn row(subject: &str, question: &str, kind: &str, set: &str, choices: Option<&str>) -> RawRow {
        [
            ("Subject", Some(subject)),
            ("Question", Some(question)),
            ("Type", Some(kind)),
            ("Set", Some(set)),
            ("Choices", choices),
            ("Notes", Some("ignored")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_single_choice_expands_per_option() {
        let rows = vec![row("Geo", "Capital of France?", "Single Choice", "A", Some("Paris\nLondon"))];
        let outcome = normalize(&rows, &roles()).unwrap();

        assert!(outcome.is_valid());
        assert_eq!(outcome.display.len(), 2);

        let first = &outcome.display[0];
        assert_eq!(first.topic, "Geo");
        assert_eq!(first.question, DisplayCell::text("Capital of France?"));
        assert_eq!(first.answer_type, "Single Choice");
        assert_eq!(first.group, "A");
        assert_eq!(first.option_no, Some(1));
        assert_eq!(first.option, DisplayCell::text("Paris"));

        let second = &outcome.display[1];
        assert_eq!(second.topic, "");
        assert_eq!(second.question, DisplayCell::blank());
        assert_eq!(second.answer_type, "");
        assert_eq!(second.group, "");
        assert_eq!(second.option_no, Some(2));
        assert_eq!(second.option, DisplayCell::text("London"));
    }

    #[test]
    fn test_records_are_not_expanded() {
        let rows = vec![
            row("Geo", "Capital?", "Multiple Choice", "A", Some("Paris\nLondon\nRome")),
            row("Math", "2+2?", "Number", "B", None),
        ];
        let outcome = normalize(&rows, &roles()).unwrap();

        let records = outcome.records.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].options, "Paris\nLondon\nRome");
        assert_eq!(records[1].question, "2+2?");
        assert_eq!(records[1].options, "");
        assert_eq!(outcome.display.len(), 4);
        assert_eq!(outcome.display[3].option_no, None);
    }

    #[test]
    fn test_empty_options_for_choice_is_insufficient() {
        let rows = vec![row("Geo", "Capital?", "Multiple Choice", "A", Some(""))];
        let outcome = normalize(&rows, &roles()).unwrap();

        assert_eq!(
            outcome.issues,
            vec![ValidationIssue::InsufficientOptions { row: 1, found: 0 }]
        );
        assert!(outcome.display.is_empty());
        assert!(outcome.records.is_none());
    }

    #[test]
    fn test_blank_lines_do_not_count_as_options() {
        let rows = vec![row("Geo", "Capital?", "single choice", "A", Some("Paris\n \n"))];
        let outcome = normalize(&rows, &roles()).unwrap();

        assert_eq!(
            outcome.issues,
            vec![ValidationIssue::InsufficientOptions { row: 1, found: 1 }]
        );
    }

    #[test]
    fn test_number_with_options_is_flagged() {
        let rows = vec![row("Math", "2+2?", "Number", "B", Some("5"))];
        let outcome = normalize(&rows, &roles()).unwrap();

        assert_eq!(outcome.issues, vec![ValidationIssue::UnexpectedOptions { row: 1 }]);
        assert!(outcome.records.is_none());
        // the row is still shown for review
        assert_eq!(outcome.display.len(), 1);
        assert_eq!(outcome.display[0].option, DisplayCell::text("5"));
    }

    #[test]
    fn test_unknown_answer_type_passes_through() {
        let rows = vec![row("Lit", "Discuss.", "Essay", "C", Some("anything goes"))];
        let outcome = normalize(&rows, &roles()).unwrap();

        assert!(outcome.is_valid());
        assert_eq!(outcome.display[0].option, DisplayCell::text("anything goes"));
        assert_eq!(outcome.display[0].option_no, None);
    }

    #[test]
    fn test_all_rows_checked_not_fail_fast() {
        let rows = vec![
            row("Geo", "Capital?", "Single Choice", "A", Some("Paris")),
            row("Geo", "River?", "Single Choice", "A", Some("Seine\nThames")),
            row("Math", "2+2?", "Text", "B", Some("4")),
        ];
        let outcome = normalize(&rows, &roles()).unwrap();

        assert_eq!(
            outcome.issues,
            vec![
                ValidationIssue::InsufficientOptions { row: 1, found: 1 },
                ValidationIssue::UnexpectedOptions { row: 3 },
            ]
        );
        // valid row 2 (two options) and flagged row 3 are in the partial view
        assert_eq!(outcome.display.len(), 3);
    }

    #[test]
    fn test_blank_row_keeps_later_row_numbers() {
        let parsed = crate::parser::parse_delimited_auto(
            b"Topic,Question,Type,Group,Options\n,,,,\nGeo,Capital?,Single Choice,A,Paris\n",
        )
        .unwrap();
        let roles = ColumnRoleMap::new("Topic", "Question", "Type", "Group", "Options");
        let outcome = normalize_table(&parsed.table, &roles).unwrap();

        assert_eq!(parsed.table.len(), 2);
        assert_eq!(
            outcome.issues,
            vec![ValidationIssue::InsufficientOptions { row: 2, found: 1 }]
        );
        // the all-NA row passes through as an unrecognized answer type
        assert_eq!(outcome.display.len(), 1);
        assert_eq!(outcome.display[0].question, DisplayCell::blank());
    }

    #[test]
    fn test_missing_column_fails() {
        let rows = vec![row("Geo", "Capital?", "Text", "A", None)];
        let roles = ColumnRoleMap::new("Subject", "Question", "Type", "Group", "Choices");

        let err = normalize(&rows, &roles).unwrap_err();
        assert_eq!(err, NormalizeError::MissingColumn(vec!["Group".into()]));
    }

    #[test]
    fn test_normalize_table_checks_headers() {
        let table = Table::new(vec!["Subject".into(), "Question".into()]);
        let err = normalize_table(&table, &roles()).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::MissingColumn(vec!["Type".into(), "Set".into(), "Choices".into()])
        );
    }

    #[test]
    fn test_na_question_reads_as_empty() {
        let rows: Vec<RawRow> = vec![[
            ("Subject", Some("Geo")),
            ("Question", None),
            ("Type", Some("Text")),
            ("Set", None),
            ("Choices", None),
        ]
        .into_iter()
        .collect()];
        let outcome = normalize(&rows, &roles()).unwrap();

        let records = outcome.records.unwrap();
        assert_eq!(records[0].question, "");
        assert_eq!(records[0].group, "");
    }

    #[test]
    fn test_image_question_and_options_detected() {
        let dir = tempfile::tempdir().unwrap();
        let q = dir.path().join("q.png");
        let a = dir.path().join("a.png");
        image::RgbImage::new(1, 1).save(&q).unwrap();
        image::RgbImage::new(1, 1).save(&a).unwrap();
        let q = q.to_string_lossy().into_owned();
        let a = a.to_string_lossy().into_owned();

        let options = format!("{}\nplain", a);
        let rows = vec![
            row("Art", &q, "Single Choice", "A", Some(options.as_str())),
            row("Art", &q, "Text", "A", None),
        ];
        let outcome = normalize(&rows, &roles()).unwrap();

        assert!(outcome.is_valid());
        assert!(outcome.display[0].question.is_image());
        assert!(outcome.display[0].option.is_image());
        assert!(!outcome.display[1].option.is_image());
        assert_eq!(
            outcome.images,
            vec![ImageReference::new(&q), ImageReference::new(&a)]
        );
    }

    #[test]
    fn test_idempotent() {
        let rows = vec![
            row("Geo", "Capital?", "Single Choice", "A", Some("Paris\nLondon")),
            row("Math", "2+2?", "Number", "B", Some("4")),
        ];
        let first = normalize(&rows, &roles()).unwrap();
        let second = normalize(&rows, &roles()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_split_options() {
        assert!(split_options("").is_empty());
        assert_eq!(split_options("a\r\nb"), vec!["a", "b"]);
        assert_eq!(split_options(" a \n\n b "), vec!["a", "b"]);
    }
}
