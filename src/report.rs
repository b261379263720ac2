//! Run report: the single collector every suite records into.
//!
//! Suites never print. They return a [`SuiteResult`], the harness appends
//! it to the [`Report`], and the report is rendered once at the end.

use serde::Serialize;

use crate::diagnostics::Diagnostic;

/// Outcome of a single suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Warned,
    Failed,
}

/// Diagnostics of one suite plus whether its errors fail the run.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResult {
    pub name: String,
    pub gating: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl SuiteResult {
    #[must_use]
    pub fn new(name: impl Into<String>, gating: bool) -> Self {
        Self {
            name: name.into(),
            gating,
            diagnostics: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Number of error diagnostics.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Number of warning diagnostics.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if self.gating && self.failure_count() > 0 {
            Outcome::Failed
        } else if self.failure_count() > 0 || self.warning_count() > 0 {
            Outcome::Warned
        } else {
            Outcome::Passed
        }
    }
}

/// Ordered collection of suite results for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub suites: Vec<SuiteResult>,
}

impl Report {
    pub fn record(&mut self, suite: SuiteResult) {
        tracing::debug!(
            suite = %suite.name,
            failures = suite.failure_count(),
            warnings = suite.warning_count(),
            "suite finished"
        );
        self.suites.push(suite);
    }

    /// Returns `true` if any gating suite failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.suites.iter().any(|s| s.outcome() == Outcome::Failed)
    }

    #[must_use]
    pub fn suite(&self, name: &str) -> Option<&SuiteResult> {
        self.suites.iter().find(|s| s.name == name)
    }

    /// Render the report as human-readable text.
    #[must_use]
    pub fn format_text(&self) -> String {
        let mut out = String::new();
        for suite in &self.suites {
            let status = match suite.outcome() {
                Outcome::Passed => "PASS",
                Outcome::Warned => "WARN",
                Outcome::Failed => "FAIL",
            };
            out.push_str(&format!("[{status}] {}\n", suite.name));
            for d in &suite.diagnostics {
                out.push_str(&format!("  {d}\n"));
                if let Some(s) = &d.suggestion {
                    out.push_str(&format!("      → {s}\n"));
                }
            }
        }
        let failed = self
            .suites
            .iter()
            .filter(|s| s.outcome() == Outcome::Failed)
            .count();
        let warned = self
            .suites
            .iter()
            .filter(|s| s.outcome() == Outcome::Warned)
            .count();
        let passed = self.suites.len() - failed - warned;
        out.push_str(&format!(
            "\n{total} suites: {passed} passed, {warned} warned, {failed} failed\n",
            total = self.suites.len(),
        ));
        out
    }

    /// Render the report as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let suites: Vec<serde_json::Value> = self
            .suites
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "gating": s.gating,
                    "outcome": s.outcome(),
                    "failures": s.failure_count(),
                    "warnings": s.warning_count(),
                    "diagnostics": s.diagnostics,
                })
            })
            .collect();
        serde_json::json!({
            "suites": suites,
            "failed": self.has_failures(),
        })
    }
}
