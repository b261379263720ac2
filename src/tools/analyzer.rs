//! Script analyzer adapter and the script analyzer suite.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::catalog::RuleCatalog;
use crate::classifier::{classify_all, scan_suppressions, Strictness};
use crate::config::HarnessConfig;
use crate::errors::{MetaError, Result};
use crate::fs_util::find_child_dir;
use crate::models::{FindingSeverity, LintFinding};
use crate::optin::SUITE_SCRIPT_ANALYZER;
use crate::report::SuiteResult;

use super::{degraded, invocation, Placeholders, ToolRunner};

/// One record of `Invoke-ScriptAnalyzer | ConvertTo-Json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawFinding {
    rule_name: String,
    severity: FindingSeverity,
    #[serde(default)]
    script_path: Option<String>,
    #[serde(default)]
    line: Option<usize>,
    #[serde(default)]
    message: Option<String>,
}

/// Parse analyzer JSON output into findings.
///
/// Accepts a single object or an array; blank output means no findings.
/// Absolute script paths under `root` are made relative to it.
///
/// # Errors
///
/// Returns [`MetaError::Json`] when the output is not analyzer JSON.
pub fn parse_findings(output: &str, root: &Path) -> Result<Vec<LintFinding>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<RawFinding> = match serde_json::from_str::<Value>(trimmed)? {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<_, _>>()?,
        Value::Null => Vec::new(),
        other => vec![serde_json::from_value(other)?],
    };
    Ok(raw
        .into_iter()
        .map(|r| {
            let file = r.script_path.map(PathBuf::from).unwrap_or_default();
            LintFinding {
                severity: r.severity,
                file: file.strip_prefix(root).map(Path::to_path_buf).unwrap_or(file),
                line: r.line.unwrap_or(0),
                rule: r.rule_name,
                message: r.message.unwrap_or_default().trim().to_string(),
            }
        })
        .collect())
}

/// Directory handed to the analyzer: `DSCResources` when present, else the
/// module root.
#[must_use]
pub fn analysis_target(root: &Path) -> PathBuf {
    find_child_dir(root, "DSCResources").unwrap_or_else(|| root.to_path_buf())
}

/// Run the analyzer over the module and collect its findings.
///
/// # Errors
///
/// Invoker errors pass through. A non-zero exit without parsable output is
/// [`MetaError::ToolFailed`].
pub fn run_analysis(
    runner: &dyn ToolRunner,
    root: &Path,
    config: &HarnessConfig,
) -> Result<Vec<LintFinding>> {
    let target = analysis_target(root);
    let inv = invocation(
        &config.tools.analyzer,
        &Placeholders {
            path: Some(&target),
            root: Some(root),
            ..Placeholders::default()
        },
        root,
        Duration::from_secs(config.tool_timeout_secs),
    );
    let output = runner.run(&inv)?;
    let failed = || MetaError::ToolFailed {
        program: inv.program.clone(),
        status: output.status,
        stderr: output.stderr.trim().to_string(),
    };
    if !output.success() && output.stdout.trim().is_empty() {
        return Err(failed());
    }
    match parse_findings(&output.stdout, root) {
        Ok(findings) => {
            tracing::debug!(findings = findings.len(), "script analysis finished");
            Ok(findings)
        }
        Err(_) if !output.success() => Err(failed()),
        Err(e) => Err(e),
    }
}

/// Run the script analyzer suite.
///
/// Suppression annotations are scanned even when the analyzer cannot run.
#[must_use]
pub fn check_script_analyzer(
    runner: &dyn ToolRunner,
    root: &Path,
    config: &HarnessConfig,
    catalog: &RuleCatalog,
    strictness: Strictness,
) -> SuiteResult {
    let mut suite = SuiteResult::new(SUITE_SCRIPT_ANALYZER, true);
    let suppressions = scan_suppressions(root, config);
    let findings = run_analysis(runner, root, config).unwrap_or_else(|e| {
        suite.push(degraded("script analysis", &e));
        Vec::new()
    });
    for file in classify_all(catalog, &findings, &suppressions, strictness) {
        suite.extend(file.diagnostics);
    }
    suite
}
