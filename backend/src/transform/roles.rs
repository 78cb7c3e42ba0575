//! Role map checks, run before any row is normalized.

use std::collections::BTreeMap;

use crate::error::ValidationIssue;
use crate::models::{ColumnRoleMap, Role};

/// Check that every role is bound, no column serves two roles, and every
/// bound column exists in `headers`.
///
/// All problems are returned together.
pub fn validate_role_map(roles: &ColumnRoleMap, headers: &[String]) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let mut by_column: BTreeMap<&str, Vec<Role>> = BTreeMap::new();

    for (role, column) in roles.bindings() {
        if column.trim().is_empty() {
            issues.push(ValidationIssue::UnboundRole { role });
        } else {
            by_column.entry(column).or_default().push(role);
        }
    }

    for (column, bound) in &by_column {
        if bound.len() > 1 {
            issues.push(ValidationIssue::DuplicateBinding {
                column: column.to_string(),
                usages: bound.iter().map(|r| r.to_string()).collect(),
            });
        }
    }

    // Report missing columns in canonical role order
    let mut missing: Vec<String> = Vec::new();
    for (_, column) in roles.bindings() {
        if !column.trim().is_empty()
            && !headers.iter().any(|h| h == column)
            && !missing.iter().any(|m| m == column)
        {
            missing.push(column.to_string());
        }
    }
    if !missing.is_empty() {
        issues.push(ValidationIssue::MissingColumn { columns: missing });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        ["Subject", "Q", "Kind", "Set", "Choices"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_complete_map_passes() {
        let roles = ColumnRoleMap::new("Subject", "Q", "Kind", "Set", "Choices");
        assert!(validate_role_map(&roles, &headers()).is_ok());
    }

    #[test]
    fn test_unbound_roles_reported() {
        let roles = ColumnRoleMap::new("Subject", "", "Kind", " ", "Choices");
        let issues = validate_role_map(&roles, &headers()).unwrap_err();
        assert_eq!(
            issues,
            vec![
                ValidationIssue::UnboundRole { role: Role::Questions },
                ValidationIssue::UnboundRole { role: Role::Group },
            ]
        );
    }

    #[test]
    fn test_column_bound_twice() {
        let roles = ColumnRoleMap::new("Subject", "Q", "Kind", "Subject", "Choices");
        let issues = validate_role_map(&roles, &headers()).unwrap_err();
        assert_eq!(
            issues,
            vec![ValidationIssue::DuplicateBinding {
                column: "Subject".into(),
                usages: vec!["Topic/Subject".into(), "Group".into()],
            }]
        );
    }

    #[test]
    fn test_missing_columns_and_duplicates_together() {
        let roles = ColumnRoleMap::new("Subject", "Nope", "Nope", "Set", "Gone");
        let issues = validate_role_map(&roles, &headers()).unwrap_err();
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], ValidationIssue::DuplicateBinding { .. }));
        assert_eq!(
            issues[1],
            ValidationIssue::MissingColumn {
                columns: vec!["Nope".into(), "Gone".into()]
            }
        );
    }
}
