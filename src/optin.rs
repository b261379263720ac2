//! Opt-in engine: per-repository list of suites that gate the build.
//!
//! The manifest is a JSON array of suite names at the repository root.
//! A gated suite always runs; when it is not opted in, its errors are
//! downgraded to warnings so regressions stay visible in the log without
//! failing the build.

use std::path::Path;

use serde::Serialize;

use crate::diagnostics::{Diagnostic, Severity, G001};
use crate::errors::{MetaError, Result};
use crate::fs_util::read_text;
use crate::report::SuiteResult;

/// Text file encoding and formatting checks.
pub const SUITE_TEXT_FILES: &str = "Common Tests - Validate Text Files";
/// Module manifest checks.
pub const SUITE_MODULE_FILES: &str = "Common Tests - Validate Module Files";
/// Resource schema checks.
pub const SUITE_SCHEMA_FILES: &str = "Common Tests - Validate Schema Files";
/// Script analyzer rule checks.
pub const SUITE_SCRIPT_ANALYZER: &str = "Common Tests - PS Script Analyzer on Resource Files";
/// Example compilation.
pub const SUITE_EXAMPLES: &str = "Common Tests - Validate Example Files";
/// Markdown lint.
pub const SUITE_MARKDOWN: &str = "Common Tests - Validate Markdown Files";
/// Makes flagged-rule findings fatal.
pub const SUITE_FLAGGED_RULES: &str = "Common Tests - Flagged Script Analyzer Rules";
/// Makes error-severity findings of untiered rules fatal.
pub const SUITE_NEW_RULES: &str = "Common Tests - New Error-Level Script Analyzer Rules";

/// Suites a repository can opt in to, with a short description.
pub const OPT_IN_SUITES: &[(&str, &str)] = &[
    (SUITE_EXAMPLES, "example configurations must compile"),
    (SUITE_MARKDOWN, "markdown lint issues fail the run"),
    (SUITE_FLAGGED_RULES, "flagged analyzer rules fail the run"),
    (SUITE_NEW_RULES, "error-level findings of untiered rules fail the run"),
];

/// Ordered list of opted-in suite names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptInManifest {
    suites: Vec<String>,
}

impl OptInManifest {
    #[must_use]
    pub fn new(suites: Vec<String>) -> Self {
        Self { suites }
    }

    /// Load the manifest at `path`. A missing file means no opt-ins.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::Config`] if the file exists but is not a JSON
    /// array of strings.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no opt-in manifest; nothing opted in");
            return Ok(Self::default());
        }
        let content = read_text(path)?;
        let suites: Vec<String> =
            serde_json::from_str(&content).map_err(|e| MetaError::Config {
                message: format!(
                    "{} must be a JSON array of suite names: {e}",
                    path.display()
                ),
            })?;
        Ok(Self { suites })
    }

    /// Opted-in suite names in file order.
    #[must_use]
    pub fn suites(&self) -> &[String] {
        &self.suites
    }

    /// Case-sensitive exact membership test.
    #[must_use]
    pub fn is_opted_in(&self, suite: &str) -> bool {
        is_opted_in(suite, &self.suites)
    }
}

/// Returns `true` if `suite` appears verbatim in `opted_in`.
#[must_use]
pub fn is_opted_in(suite: &str, opted_in: &[String]) -> bool {
    opted_in.iter().any(|s| s == suite)
}

/// Apply the two-level gate to a finished suite.
///
/// Opted in: the suite gates the build unchanged. Not opted in: errors are
/// downgraded to warnings and a G001 note is added when anything was
/// downgraded.
#[must_use]
pub fn gate(mut result: SuiteResult, opted_in: bool) -> SuiteResult {
    if opted_in {
        result.gating = true;
        return result;
    }
    let downgraded = result.diagnostics.iter().filter(|d| d.is_error()).count();
    result.gating = false;
    result.diagnostics = result
        .diagnostics
        .into_iter()
        .map(Diagnostic::downgraded)
        .collect();
    if downgraded > 0 {
        result.diagnostics.push(Diagnostic::new(
            Severity::Info,
            G001,
            format!(
                "{downgraded} failure(s) reported as warnings: '{}' is not opted in",
                result.name
            ),
        ));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::D001;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn empty_manifest_opts_in_nothing() {
        assert!(!is_opted_in("X", &[]));
        assert!(!is_opted_in(SUITE_MARKDOWN, &[]));
    }

    #[test]
    fn exact_name_is_opted_in() {
        assert!(is_opted_in("X", &["X".to_string()]));
    }

    #[test]
    fn membership_is_case_sensitive() {
        let manifest = OptInManifest::new(vec![SUITE_MARKDOWN.to_string()]);
        assert!(manifest.is_opted_in(SUITE_MARKDOWN));
        assert!(!manifest.is_opted_in(&SUITE_MARKDOWN.to_lowercase()));
    }

    #[test]
    fn missing_file_is_empty_manifest() {
        let dir = tempdir().unwrap();
        let m = OptInManifest::load(&dir.path().join(".MetaTestOptIn.json")).unwrap();
        assert!(m.suites().is_empty());
    }

    #[test]
    fn load_preserves_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".MetaTestOptIn.json");
        fs::write(
            &path,
            r#"["Common Tests - Validate Markdown Files", "Common Tests - Validate Example Files"]"#,
        )
        .unwrap();
        let m = OptInManifest::load(&path).unwrap();
        assert_eq!(m.suites(), &[SUITE_MARKDOWN.to_string(), SUITE_EXAMPLES.to_string()]);
    }

    #[test]
    fn load_accepts_byte_order_mark() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".MetaTestOptIn.json");
        fs::write(&path, b"\xEF\xBB\xBF[\"Common Tests - Validate Markdown Files\"]\r\n").unwrap();
        let m = OptInManifest::load(&path).unwrap();
        assert!(m.is_opted_in(SUITE_MARKDOWN));
    }

    #[test]
    fn non_array_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".MetaTestOptIn.json");
        fs::write(&path, r#"{"suites": []}"#).unwrap();
        assert!(matches!(
            OptInManifest::load(&path),
            Err(MetaError::Config { .. })
        ));
    }

    fn failing_suite() -> SuiteResult {
        let mut r = SuiteResult::new(SUITE_MARKDOWN, true);
        r.push(Diagnostic::new(Severity::Error, D001, "first"));
        r.push(Diagnostic::new(Severity::Error, D001, "second"));
        r
    }

    #[test]
    fn gate_keeps_failures_when_opted_in() {
        let r = gate(failing_suite(), true);
        assert!(r.gating);
        assert_eq!(r.failure_count(), 2);
    }

    #[test]
    fn gate_downgrades_when_not_opted_in() {
        let r = gate(failing_suite(), false);
        assert!(!r.gating);
        assert_eq!(r.failure_count(), 0);
        assert_eq!(r.diagnostics.iter().filter(|d| d.is_warning()).count(), 2);
        assert!(r.diagnostics.iter().any(|d| d.code == G001));
    }

    #[test]
    fn gate_adds_no_note_for_clean_suite() {
        let r = gate(SuiteResult::new(SUITE_MARKDOWN, true), false);
        assert!(r.diagnostics.is_empty());
    }
}
