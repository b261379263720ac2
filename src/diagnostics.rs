//! Structured diagnostics produced by every suite of the meta-test run.
//!
//! Each diagnostic carries a stable code, a severity, and optionally the
//! file, line, and analyzer rule it refers to. Suites collect diagnostics
//! into a [`crate::report::SuiteResult`]; errors in a gating suite fail the
//! run.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A violation that fails the run when its suite is gating.
    Error,
    /// A problem reported in the log that never fails the run.
    Warning,
    /// Informational note (skipped checks, advisory suites).
    Info,
}

/// A structured diagnostic message from one of the checks.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: Severity,
    /// Stable code (e.g., `"F001"`, `"R002"`, `"T001"`).
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// File the diagnostic refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// 1-based line within `file`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Analyzer rule identifier, for rule diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Suggested fix (actionable text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with the given severity, code, and message.
    #[must_use]
    pub fn new(severity: Severity, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            file: None,
            line: None,
            rule: None,
            suggestion: None,
        }
    }

    /// Set the file this diagnostic refers to.
    #[must_use]
    pub fn with_file(mut self, file: impl AsRef<Path>) -> Self {
        self.file = Some(file.as_ref().to_path_buf());
        self
    }

    /// Set the line this diagnostic refers to.
    #[must_use]
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the analyzer rule this diagnostic refers to.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Set a suggested fix for this diagnostic.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Returns `true` if this diagnostic is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Returns `true` if this diagnostic is a warning.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Returns `true` if this diagnostic is informational.
    #[must_use]
    pub fn is_info(&self) -> bool {
        self.severity == Severity::Info
    }

    /// Downgrade an error to a warning, leaving other severities untouched.
    #[must_use]
    pub fn downgraded(mut self) -> Self {
        if self.severity == Severity::Error {
            self.severity = Severity::Warning;
        }
        self
    }
}

/// Display format:
/// - Errors: `"[file:line: ]message"` (no prefix)
/// - Warnings: `"warning: [file:line: ]message"`
/// - Info: `"info: [file:line: ]message"`
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => {}
            Severity::Warning => write!(f, "warning: ")?,
            Severity::Info => write!(f, "info: ")?,
        }
        if let Some(file) = &self.file {
            write!(f, "{}", file.display())?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
            }
            write!(f, ": ")?;
        }
        write!(f, "{}", self.message)
    }
}

// ── Code constants ──────────────────────────────────────────────────────

// Infrastructure (E000)

/// Infrastructure error (unreadable file, bad root).
pub const E000: &str = "E000";

// Text file checks (F001–F004)

/// File is Unicode encoded (BOM, NUL bytes, or invalid UTF-8).
pub const F001: &str = "F001";
/// File contains tab characters.
pub const F002: &str = "F002";
/// File is empty.
pub const F003: &str = "F003";
/// File does not end with a newline.
pub const F004: &str = "F004";

// Module manifest checks (M001–M005)

/// Manifest missing, unreadable, or unparsable.
pub const M001: &str = "M001";
/// Manifest does not declare `PowerShellVersion`.
pub const M002: &str = "M002";
/// Declared `PowerShellVersion` below the computed minimum.
pub const M003: &str = "M003";
/// Class resource not listed in `DscResourcesToExport`.
pub const M004: &str = "M004";
/// Class resource not listed in `NestedModules`.
pub const M005: &str = "M005";

// Resource schema checks (S001–S006)

/// Schema document missing for a script resource.
pub const S001: &str = "S001";
/// Required `*-TargetResource` function missing.
pub const S002: &str = "S002";
/// Key/Required property is not a mandatory parameter.
pub const S003: &str = "S003";
/// Write property is not a parameter of Set/Test.
pub const S004: &str = "S004";
/// Parameter has no matching schema property.
pub const S005: &str = "S005";
/// Read property declared as a Set/Test parameter.
pub const S006: &str = "S006";

// Analyzer rule checks (R001–R006)

/// Required rule violated.
pub const R001: &str = "R001";
/// Required rule suppressed.
pub const R002: &str = "R002";
/// Flagged rule violated.
pub const R003: &str = "R003";
/// Ignored rule violated.
pub const R004: &str = "R004";
/// Rule outside every tier violated (recently added, pending triage).
pub const R005: &str = "R005";
/// Required rule violated, but advisory (recently added or non-error severity).
pub const R006: &str = "R006";

// External tool degradation (T001–T003)

/// Tool not installed.
pub const T001: &str = "T001";
/// Tool failed for reasons unrelated to findings.
pub const T002: &str = "T002";
/// Tool timed out.
pub const T003: &str = "T003";

// Example and markdown checks

/// Example configuration failed to compile.
pub const X001: &str = "X001";
/// Markdown lint issue.
pub const D001: &str = "D001";

// Opt-in gating

/// Suite is not opted in; its failures are reported as warnings.
pub const G001: &str = "G001";
