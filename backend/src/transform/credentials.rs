//! Login + password dataset selection.
//!
//! The operator picks a login column, a password column and any number of
//! extra columns to carry along under a new name. The result is the
//! credentials table packed into the bundle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationIssue;
use crate::models::Table;

/// One "rename this column" row of the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameDraft {
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub new_name: String,
}

impl RenameDraft {
    pub fn new(column: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            new_name: new_name.into(),
        }
    }

    fn is_terminator(&self) -> bool {
        self.column.trim().is_empty() || self.new_name.trim().is_empty()
    }
}

/// Operator selections for the credentials dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSelection {
    pub login_column: String,
    pub password_column: String,
    #[serde(default)]
    pub renames: Vec<RenameDraft>,
}

/// The credentials table: `[login, password, renamed...]` in row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialsTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CredentialsTable {
    /// Serialize as comma-separated UTF-8 with a header row.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))
    }
}

/// Renames in effect: drafts up to the first incomplete one.
pub fn collect_renames(drafts: &[RenameDraft]) -> Vec<(String, String)> {
    drafts
        .iter()
        .take_while(|d| !d.is_terminator())
        .map(|d| (d.column.clone(), d.new_name.trim().to_string()))
        .collect()
}

/// Values of `column` that appear more than once, or `"<blank>"` for NA cells.
fn duplicate_logins(table: &Table, column: &str) -> Vec<String> {
    let mut counts: BTreeMap<Option<&str>, usize> = BTreeMap::new();
    for row in &table.rows {
        *counts.entry(row.get(column).flatten()).or_default() += 1;
    }

    counts
        .into_iter()
        .filter(|(value, count)| value.is_none() || *count > 1)
        .map(|(value, _)| value.unwrap_or("<blank>").to_string())
        .collect()
}

/// Build the credentials table, collecting every problem.
pub fn select_credentials(
    table: &Table,
    selection: &CredentialSelection,
) -> Result<CredentialsTable, Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let login = selection.login_column.as_str();
    let password = selection.password_column.as_str();

    if login.trim().is_empty() {
        issues.push(ValidationIssue::MissingInput {
            input: "Login column".into(),
            message: "select a column for Login".into(),
        });
    }
    if password.trim().is_empty() {
        issues.push(ValidationIssue::MissingInput {
            input: "Password column".into(),
            message: "select a column for Password".into(),
        });
    }
    if !login.trim().is_empty() && login == password {
        issues.push(ValidationIssue::DuplicateBinding {
            column: login.to_string(),
            usages: vec!["Login".into(), "Password".into()],
        });
    }

    let renames = collect_renames(&selection.renames);

    let mut missing: Vec<String> = Vec::new();
    let wanted = [login, password]
        .into_iter()
        .filter(|c| !c.trim().is_empty())
        .chain(renames.iter().map(|(c, _)| c.as_str()));
    for column in wanted {
        if !table.has_column(column) && !missing.iter().any(|m| m == column) {
            missing.push(column.to_string());
        }
    }
    if !missing.is_empty() {
        issues.push(ValidationIssue::MissingColumn { columns: missing });
    }

    if !login.trim().is_empty() && table.has_column(login) {
        let duplicates = duplicate_logins(table, login);
        if !duplicates.is_empty() {
            issues.push(ValidationIssue::DuplicateKey {
                column: login.to_string(),
                duplicates,
            });
        }
    }

    // Each source once, no output name used twice
    let mut usages: BTreeMap<String, Vec<String>> = BTreeMap::new();
    usages.entry(login.to_string()).or_default().push("Login".into());
    usages.entry(password.to_string()).or_default().push("Password".into());
    for (column, new_name) in &renames {
        if column == login || column == password {
            issues.push(ValidationIssue::DuplicateBinding {
                column: column.clone(),
                usages: vec!["Login/Password".into(), format!("rename to '{}'", new_name)],
            });
        }
        usages
            .entry(new_name.clone())
            .or_default()
            .push(format!("rename of '{}'", column));
    }
    let mut sources: BTreeMap<&str, usize> = BTreeMap::new();
    for (column, _) in &renames {
        *sources.entry(column.as_str()).or_default() += 1;
    }
    for (column, count) in sources {
        if count > 1 {
            issues.push(ValidationIssue::DuplicateBinding {
                column: column.to_string(),
                usages: vec![format!("renamed {} times", count)],
            });
        }
    }
    for (name, used_by) in usages {
        if used_by.len() > 1 && login != password {
            issues.push(ValidationIssue::DuplicateBinding { column: name, usages: used_by });
        }
    }

    if !issues.is_empty() {
        return Err(issues);
    }

    let mut headers = vec![login.to_string(), password.to_string()];
    headers.extend(renames.iter().map(|(_, new_name)| new_name.clone()));

    let source_columns: Vec<&str> = [login, password]
        .into_iter()
        .chain(renames.iter().map(|(c, _)| c.as_str()))
        .collect();
    let rows = table
        .rows
        .iter()
        .map(|row| source_columns.iter().map(|c| row.text(c).to_string()).collect())
        .collect();

    Ok(CredentialsTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_delimited;

    fn table() -> Table {
        parse_delimited(
            "Email,Pass,Full Name,Class\nann@x.io,pw1,Ann,A\nbob@x.io,pw2,Bob,B\n",
            ',',
        )
        .unwrap()
    }

    fn selection(renames: Vec<RenameDraft>) -> CredentialSelection {
        CredentialSelection {
            login_column: "Email".into(),
            password_column: "Pass".into(),
            renames,
        }
    }

    #[test]
    fn test_select_with_renames() {
        let creds = select_credentials(&table(), &selection(vec![RenameDraft::new("Full Name", "name")])).unwrap();

        assert_eq!(creds.headers, vec!["Email", "Pass", "name"]);
        assert_eq!(creds.rows[1], vec!["bob@x.io", "pw2", "Bob"]);

        let csv = String::from_utf8(creds.to_csv().unwrap()).unwrap();
        assert_eq!(csv, "Email,Pass,name\nann@x.io,pw1,Ann\nbob@x.io,pw2,Bob\n");
    }

    #[test]
    fn test_rename_loop_stops_at_first_incomplete_draft() {
        let drafts = vec![
            RenameDraft::new("Full Name", "name"),
            RenameDraft::new("Class", ""),
            RenameDraft::new("Class", "group"),
        ];
        assert_eq!(
            collect_renames(&drafts),
            vec![("Full Name".to_string(), "name".to_string())]
        );
    }

    #[test]
    fn test_duplicate_logins_rejected() {
        let table = parse_delimited("Email,Pass\nann,1\nann,2\n,3\n", ',').unwrap();
        let issues = select_credentials(&table, &selection(vec![])).unwrap_err();

        assert_eq!(
            issues,
            vec![ValidationIssue::DuplicateKey {
                column: "Email".into(),
                duplicates: vec!["<blank>".into(), "ann".into()],
            }]
        );
    }

    #[test]
    fn test_login_and_password_must_differ() {
        let sel = CredentialSelection {
            login_column: "Email".into(),
            password_column: "Email".into(),
            renames: vec![],
        };
        let issues = select_credentials(&table(), &sel).unwrap_err();
        assert_eq!(
            issues,
            vec![ValidationIssue::DuplicateBinding {
                column: "Email".into(),
                usages: vec!["Login".into(), "Password".into()],
            }]
        );
    }

    #[test]
    fn test_rename_clashing_with_password_header() {
        let issues =
            select_credentials(&table(), &selection(vec![RenameDraft::new("Class", "Pass")])).unwrap_err();
        assert_eq!(
            issues,
            vec![ValidationIssue::DuplicateBinding {
                column: "Pass".into(),
                usages: vec!["Password".into(), "rename of 'Class'".into()],
            }]
        );
    }

    #[test]
    fn test_missing_columns_reported() {
        let sel = CredentialSelection {
            login_column: "Login".into(),
            password_column: "Pass".into(),
            renames: vec![RenameDraft::new("Age", "age")],
        };
        let issues = select_credentials(&table(), &sel).unwrap_err();
        assert_eq!(
            issues,
            vec![ValidationIssue::MissingColumn {
                columns: vec!["Login".into(), "Age".into()]
            }]
        );
    }

    #[test]
    fn test_unselected_columns_reported() {
        let issues = select_credentials(&table(), &CredentialSelection::default()).unwrap_err();
        assert!(issues
            .iter()
            .all(|i| matches!(i, ValidationIssue::MissingInput { .. })));
        assert_eq!(issues.len(), 2);
    }
}
