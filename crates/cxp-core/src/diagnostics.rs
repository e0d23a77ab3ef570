//! Diagnostics collected while validating model inputs.
//!
//! Fatal problems abort model construction through [`crate::CxpError`].
//! Everything else is reported here so the operator can review it without
//! blocking the build:
//!
//! - Severity levels (Info, Warning)
//! - Categories for grouping issues (`validation`, `numerical`, ...)
//! - Optional entity references (e.g., "line A-B", "zone Z")
//! - Optional input row numbers
//! - Serialization for JSON output
//!
//! # Example
//!
//! ```
//! use cxp_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("validation", "terrain multiplier 4 outside [0.5, 3]", "line A-B");
//! diag.add_info("numerical", "floored 3 demand values below epsilon to zero");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.count(Severity::Info), 1);
//! ```

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// An explicit policy was applied to the data (e.g., epsilon flooring)
    Info,
    /// Unusual but accepted value (e.g., advisory range exceeded)
    Warning,
}

/// A single diagnostic issue encountered during validation
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    /// Severity of the issue
    pub severity: Severity,
    /// Category for grouping (e.g., "validation", "numerical")
    pub category: String,
    /// Human-readable description of the issue
    pub message: String,
    /// Optional 1-based row number in the originating table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// Optional entity reference (e.g., "line A-B")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    /// Create a new diagnostic issue
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            row: None,
            entity: None,
        }
    }

    /// Add row number to the issue
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Add entity reference to the issue
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        if let Some(row) = self.row {
            write!(f, " at row {}", row)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for one validation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    /// All collected issues
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    /// Create new empty diagnostics
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw issue directly
    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    /// Add an informational note
    pub fn add_info(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Info, category, message));
    }

    /// Add a warning with category and message
    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    /// Add a warning with entity reference
    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    /// Add a validation warning tied to an input row
    pub fn add_validation_warning(&mut self, entity: &str, message: &str, row: usize) {
        self.issues.push(
            DiagnosticIssue::new(Severity::Warning, "validation", message)
                .with_entity(entity)
                .with_row(row),
        );
    }

    /// Count issues of one severity
    pub fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .count()
    }

    /// Count warning issues
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Check if there are any issues
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    /// Get issues filtered by category
    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// Get only warning issues
    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    /// Merge another diagnostics into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    /// Get summary string
    pub fn summary(&self) -> String {
        let warnings = self.warning_count();
        let notes = self.count(Severity::Info);

        match (warnings, notes) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (0, n) => format!("{} note{}", n, if n == 1 { "" } else { "s" }),
            (w, n) => format!(
                "{} warning{}, {} note{}",
                w,
                if w == 1 { "" } else { "s" },
                n,
                if n == 1 { "" } else { "s" }
            ),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        diag.add_warning("validation", "test warning");
        diag.add_info("numerical", "floored");
        diag.add_validation_warning("line A-B", "derating above 1", 3);

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.count(Severity::Info), 1);
        assert!(diag.has_issues());
        assert!(diag.has_warnings());
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = Diagnostics::new();
        diag.add_validation_warning("line A-B", "terrain multiplier 4 outside [0.5, 3]", 7);

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"warning\""));
        assert!(json.contains("\"row\": 7"));
        assert!(json.contains("\"entity\": \"line A-B\""));
    }

    #[test]
    fn test_diagnostic_issue_display() {
        let issue = DiagnosticIssue::new(Severity::Warning, "validation", "Derating out of range")
            .with_entity("line A-B")
            .with_row(2);

        let display = format!("{}", issue);
        assert!(display.contains("warning"));
        assert!(display.contains("validation"));
        assert!(display.contains("line A-B"));
        assert!(display.contains("row 2"));
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");

        diag.add_warning("validation", "warning");
        assert_eq!(diag.summary(), "1 warning");

        diag.add_info("numerical", "note");
        assert_eq!(diag.summary(), "1 warning, 1 note");

        diag.add_warning("validation", "another warning");
        assert_eq!(diag.summary(), "2 warnings, 1 note");
    }

    #[test]
    fn test_issues_by_category_and_merge() {
        let mut diag1 = Diagnostics::new();
        diag1.add_warning("validation", "warning 1");

        let mut diag2 = Diagnostics::new();
        diag2.add_info("numerical", "note 1");

        diag1.merge(diag2);
        assert_eq!(diag1.issues_by_category("numerical").count(), 1);
        assert_eq!(diag1.warnings().count(), 1);
    }
}
