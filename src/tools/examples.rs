//! Example configuration compilation suite.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::HarnessConfig;
use crate::diagnostics::{Diagnostic, Severity, X001};
use crate::errors::MetaError;
use crate::fs_util::{collect_files, extension_lower, find_child_dir};
use crate::optin::{gate, SUITE_EXAMPLES};
use crate::report::SuiteResult;

use super::{degraded, invocation, Placeholders, ToolRunner};

/// Every `.ps1` under the module's `Examples` directory.
#[must_use]
pub fn example_files(root: &Path, config: &HarnessConfig) -> Vec<PathBuf> {
    let Some(dir) = find_child_dir(root, "Examples") else {
        return Vec::new();
    };
    collect_files(&dir, &config.exclude_dirs, |p| {
        extension_lower(p).as_deref() == Some("ps1")
    })
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Compile each example into a scratch directory; a non-zero exit is X001.
/// Gated by opt-in.
#[must_use]
pub fn check_example_files(
    runner: &dyn ToolRunner,
    root: &Path,
    config: &HarnessConfig,
    opted_in: bool,
) -> SuiteResult {
    let mut suite = SuiteResult::new(SUITE_EXAMPLES, true);
    let timeout = Duration::from_secs(config.tool_timeout_secs);
    for file in example_files(root, config) {
        let rel = file.strip_prefix(root).unwrap_or(&file).to_path_buf();
        let scratch = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => {
                suite.push(degraded("example compilation", &MetaError::from(e)));
                break;
            }
        };
        let inv = invocation(
            &config.tools.example_compiler,
            &Placeholders {
                path: Some(&file),
                root: Some(root),
                file: Some(&file),
                output: Some(scratch.path()),
            },
            root,
            timeout,
        );
        match runner.run(&inv) {
            Ok(out) if out.success() => {
                tracing::debug!(example = %rel.display(), "example compiled");
            }
            Ok(out) => {
                let detail = last_line(&out.stderr)
                    .or_else(|| last_line(&out.stdout))
                    .unwrap_or("no output");
                suite.push(
                    Diagnostic::new(
                        Severity::Error,
                        X001,
                        format!(
                            "example failed to compile (exit status {:?}): {detail}",
                            out.status
                        ),
                    )
                    .with_file(&rel),
                );
            }
            Err(e @ MetaError::ToolUnavailable { .. }) => {
                suite.push(degraded("example compilation", &e));
                break;
            }
            Err(e) => suite.push(degraded("example compilation", &e).with_file(&rel)),
        }
    }
    gate(suite, opted_in)
}
