//! Collection of user-input field definitions.
//!
//! Drafts are read in order until the first one with no name or no type.
//! Everything after that terminator is ignored, even well-formed drafts.

use chrono::NaiveTime;

use crate::api::logs::log_warning;
use crate::error::{RangeKind, ValidationIssue};
use crate::models::{FieldDefinition, FieldDraft, FieldKind, TimeFormat};

/// Outcome of a collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCollection {
    pub fields: Vec<FieldDefinition>,
    pub issues: Vec<ValidationIssue>,
    /// Drafts read before the terminator.
    pub consumed: usize,
}

impl FieldCollection {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Turn form drafts into field definitions.
///
/// A complete draft that fails its checks is reported and left out;
/// collection continues with the next draft.
pub fn collect_field_definitions<'a, I>(drafts: I) -> FieldCollection
where
    I: IntoIterator<Item = &'a FieldDraft>,
{
    let mut out = FieldCollection::default();

    for draft in drafts {
        let Some(kind) = draft.kind.as_ref().filter(|_| !draft.is_terminator()) else {
            break;
        };
        out.consumed += 1;
        let name = draft.field_name.trim();

        match check_kind(name, kind) {
            Ok(kind) => out.fields.push(FieldDefinition {
                field_name: name.to_string(),
                kind,
            }),
            Err(issue) => {
                log_warning(issue.to_string());
                out.issues.push(issue);
            }
        }
    }

    out
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue::InvalidField {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate one kind and return it in canonical form.
fn check_kind(name: &str, kind: &FieldKind) -> Result<FieldKind, ValidationIssue> {
    match kind {
        FieldKind::Text { .. } | FieldKind::Number { .. } => Ok(kind.clone()),

        FieldKind::Date { min_date, max_date } => match (min_date, max_date) {
            (Some(min), Some(max)) if min > max => Err(ValidationIssue::TimeRange {
                field: name.to_string(),
                range: RangeKind::Date,
            }),
            _ => Ok(kind.clone()),
        },

        FieldKind::Time {
            time_format,
            min_time,
            max_time,
        } => {
            let format = (*time_format).ok_or_else(|| invalid(name, "select a time format"))?;
            let min = parse_bound(name, format, min_time.as_deref(), "Min Time")?;
            let max = parse_bound(name, format, max_time.as_deref(), "Max Time")?;

            if format == TimeFormat::TwelveHour && (min.is_none() || max.is_none()) {
                return Err(invalid(name, "12-hour fields need both Min Time and Max Time"));
            }
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(ValidationIssue::TimeRange {
                        field: name.to_string(),
                        range: RangeKind::Time,
                    });
                }
            }

            let render = |t: Option<NaiveTime>| t.map(|t| t.format(format.pattern()).to_string());
            Ok(FieldKind::Time {
                time_format: Some(format),
                min_time: render(min),
                max_time: render(max),
            })
        }

        FieldKind::List { items } => {
            if items.iter().all(|item| item.trim().is_empty()) {
                return Err(invalid(name, "enter at least one list item"));
            }
            Ok(kind.clone())
        }
    }
}

fn parse_bound(
    name: &str,
    format: TimeFormat,
    raw: Option<&str>,
    label: &str,
) -> Result<Option<NaiveTime>, ValidationIssue> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveTime::parse_from_str(&raw.to_uppercase(), format.pattern())
            .map(Some)
            .map_err(|_| {
                invalid(
                    name,
                    format!("{} '{}' does not match {}", label, raw, format.pattern()),
                )
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextType;
    use chrono::NaiveDate;

    fn time(format: TimeFormat, min: &str, max: &str) -> FieldKind {
        FieldKind::Time {
            time_format: Some(format),
            min_time: Some(min.into()),
            max_time: Some(max.into()),
        }
    }

    #[test]
    fn test_collects_until_terminator() {
        let drafts = vec![
            FieldDraft::new("Name", FieldKind::Text { text_type: TextType::OnlyLetters }),
            FieldDraft::new("Age", FieldKind::Number { min_value: 0, max_value: 120 }),
            FieldDraft::default(),
            FieldDraft::new("Dropped", FieldKind::Text { text_type: TextType::AllCharacters }),
        ];
        let out = collect_field_definitions(&drafts);

        assert!(out.is_valid());
        assert_eq!(out.consumed, 2);
        let names: Vec<&str> = out.fields.iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Age"]);
    }

    #[test]
    fn test_name_without_type_terminates() {
        let drafts = vec![
            FieldDraft {
                field_name: "Half".into(),
                kind: None,
            },
            FieldDraft::new("Later", FieldKind::List { items: vec!["a".into()] }),
        ];
        let out = collect_field_definitions(&drafts);
        assert!(out.fields.is_empty());
        assert_eq!(out.consumed, 0);
    }

    #[test]
    fn test_inverted_date_range_is_reported_and_skipped() {
        let drafts = vec![
            FieldDraft::new(
                "Birth",
                FieldKind::Date {
                    min_date: NaiveDate::from_ymd_opt(2024, 5, 1),
                    max_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                },
            ),
            FieldDraft::new("Class", FieldKind::List { items: vec!["A".into(), "B".into()] }),
        ];
        let out = collect_field_definitions(&drafts);

        assert_eq!(
            out.issues,
            vec![ValidationIssue::TimeRange {
                field: "Birth".into(),
                range: RangeKind::Date
            }]
        );
        assert_eq!(out.fields.len(), 1);
        assert_eq!(out.fields[0].field_name, "Class");
    }

    #[test]
    fn test_twenty_four_hour_range() {
        let drafts = vec![
            FieldDraft::new("Slot", time(TimeFormat::TwentyFourHour, "09:00", "17:30")),
            FieldDraft::new("Night", time(TimeFormat::TwentyFourHour, "22:00", "06:00")),
        ];
        let out = collect_field_definitions(&drafts);

        assert_eq!(out.fields.len(), 1);
        assert_eq!(out.fields[0].kind, time(TimeFormat::TwentyFourHour, "09:00", "17:30"));
        assert!(matches!(
            out.issues[0],
            ValidationIssue::TimeRange { range: RangeKind::Time, .. }
        ));
    }

    #[test]
    fn test_twelve_hour_range_compares_clock_time() {
        let drafts = vec![
            FieldDraft::new("Morning", time(TimeFormat::TwelveHour, "11:00 am", "01:00 PM")),
            FieldDraft::new("Wrong", time(TimeFormat::TwelveHour, "01:00 PM", "11:00 AM")),
        ];
        let out = collect_field_definitions(&drafts);

        assert_eq!(out.fields.len(), 1);
        assert_eq!(out.fields[0].kind, time(TimeFormat::TwelveHour, "11:00 AM", "01:00 PM"));
        assert_eq!(out.issues.len(), 1);
    }

    #[test]
    fn test_time_without_format_is_invalid() {
        let drafts = vec![FieldDraft::new(
            "Start",
            FieldKind::Time {
                time_format: None,
                min_time: None,
                max_time: None,
            },
        )];
        let out = collect_field_definitions(&drafts);
        assert!(out.fields.is_empty());
        assert!(matches!(out.issues[0], ValidationIssue::InvalidField { .. }));
    }

    #[test]
    fn test_unparsable_time_is_invalid() {
        let drafts = vec![FieldDraft::new("Start", time(TimeFormat::TwentyFourHour, "9am", "10:00"))];
        let out = collect_field_definitions(&drafts);
        assert!(matches!(
            &out.issues[0],
            ValidationIssue::InvalidField { field, .. } if field == "Start"
        ));
    }

    #[test]
    fn test_empty_list_is_invalid() {
        let drafts = vec![FieldDraft::new("Class", FieldKind::List { items: vec!["".into()] })];
        let out = collect_field_definitions(&drafts);
        assert!(out.fields.is_empty());
        assert_eq!(out.issues.len(), 1);
    }
}
