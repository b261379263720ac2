//! Markdown linter adapter and the markdown suite.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::config::HarnessConfig;
use crate::diagnostics::{Diagnostic, Severity, D001};
use crate::errors::{MetaError, Result};
use crate::fs_util::{collect_files, extension_lower};
use crate::optin::{gate, SUITE_MARKDOWN};
use crate::report::SuiteResult;

use super::{degraded, invocation, Placeholders, ToolRunner};

/// One issue from `markdownlint --json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownIssue {
    pub file_name: PathBuf,
    pub line_number: usize,
    #[serde(default)]
    pub rule_names: Vec<String>,
    #[serde(default)]
    pub rule_description: String,
    #[serde(default)]
    pub error_detail: Option<String>,
}

impl MarkdownIssue {
    /// `MD013/line-length` style identifier.
    #[must_use]
    pub fn rule(&self) -> String {
        self.rule_names.join("/")
    }

    fn to_diagnostic(&self, root: &Path) -> Diagnostic {
        let file = self.file_name.strip_prefix(root).unwrap_or(&self.file_name);
        let message = match self.error_detail.as_deref().filter(|d| !d.is_empty()) {
            Some(detail) => format!("{} [{detail}]", self.rule_description),
            None => self.rule_description.clone(),
        };
        Diagnostic::new(Severity::Error, D001, message)
            .with_file(file)
            .with_line(self.line_number)
            .with_rule(self.rule())
    }
}

fn parse_array(text: &str) -> Option<Result<Vec<MarkdownIssue>>> {
    let trimmed = text.trim();
    trimmed
        .starts_with('[')
        .then(|| serde_json::from_str(trimmed).map_err(MetaError::from))
}

/// Extract issues from linter output. The linter writes its JSON to stderr;
/// stdout is consulted when stderr holds none.
///
/// Returns `None` when neither stream holds a JSON array.
///
/// # Errors
///
/// Returns [`MetaError::Json`] when an array is present but malformed.
pub fn parse_issues(stdout: &str, stderr: &str) -> Option<Result<Vec<MarkdownIssue>>> {
    parse_array(stderr).or_else(|| parse_array(stdout))
}

/// Lint all markdown under `root`.
///
/// # Errors
///
/// Invoker errors pass through; a non-zero exit without issues is
/// [`MetaError::ToolFailed`].
pub fn run_markdown_lint(
    runner: &dyn ToolRunner,
    root: &Path,
    config: &HarnessConfig,
) -> Result<Vec<MarkdownIssue>> {
    let inv = invocation(
        &config.tools.markdown,
        &Placeholders {
            path: Some(root),
            root: Some(root),
            ..Placeholders::default()
        },
        root,
        Duration::from_secs(config.tool_timeout_secs),
    );
    let output = runner.run(&inv)?;
    match parse_issues(&output.stdout, &output.stderr) {
        Some(issues) => issues,
        None if output.success() => Ok(Vec::new()),
        None => Err(MetaError::ToolFailed {
            program: inv.program,
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        }),
    }
}

/// Run the markdown suite. One D001 per issue, gated by opt-in.
#[must_use]
pub fn check_markdown_files(
    runner: &dyn ToolRunner,
    root: &Path,
    config: &HarnessConfig,
    opted_in: bool,
) -> SuiteResult {
    let mut suite = SuiteResult::new(SUITE_MARKDOWN, true);
    let files = collect_files(root, &config.exclude_dirs, |p| {
        extension_lower(p).as_deref() == Some("md")
    });
    if files.is_empty() {
        tracing::debug!("no markdown files");
        return gate(suite, opted_in);
    }
    match run_markdown_lint(runner, root, config) {
        Ok(issues) => suite.extend(issues.iter().map(|i| i.to_diagnostic(root))),
        Err(e) => suite.push(degraded("markdown lint", &e)),
    }
    gate(suite, opted_in)
}
