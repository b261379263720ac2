//! Text file scanner: encoding, tabs, empty files, trailing newlines.
//!
//! Every check runs on every file and all violations are collected, so a
//! single run reports each offending file.

use std::path::{Path, PathBuf};

use crate::config::HarnessConfig;
use crate::diagnostics::{Diagnostic, Severity, E000, F001, F002, F003, F004};
use crate::fs_util::{collect_files, extension_lower, UTF16_BE_BOM, UTF16_LE_BOM, UTF8_BOM};
use crate::models::{Encoding, ScanResult};
use crate::optin::SUITE_TEXT_FILES;
use crate::report::SuiteResult;

/// Classify the encoding of raw file content.
///
/// `Unicode` when the content starts with a byte-order mark, contains a NUL
/// byte, or is not valid UTF-8. Otherwise `Utf8` if any byte is outside
/// 7-bit ASCII, else `Ascii`.
#[must_use]
pub fn classify_encoding(bytes: &[u8]) -> Encoding {
    if bytes.starts_with(UTF8_BOM)
        || bytes.starts_with(UTF16_LE_BOM)
        || bytes.starts_with(UTF16_BE_BOM)
    {
        return Encoding::Unicode;
    }
    if bytes.contains(&0) || std::str::from_utf8(bytes).is_err() {
        return Encoding::Unicode;
    }
    if bytes.is_ascii() {
        Encoding::Ascii
    } else {
        Encoding::Utf8
    }
}

/// Scan raw content of a single file.
#[must_use]
pub fn scan_bytes(path: &Path, bytes: &[u8]) -> ScanResult {
    ScanResult {
        path: path.to_path_buf(),
        encoding: classify_encoding(bytes),
        has_tabs: bytes.contains(&b'\t'),
        is_empty: bytes.is_empty(),
        missing_trailing_newline: bytes.last().is_some_and(|b| *b != b'\n'),
    }
}

/// Returns `true` if `path` is a text file under the configured extensions.
///
/// Dot-files such as `.gitignore` match by their full name.
#[must_use]
pub fn is_text_file(path: &Path, extensions: &[String]) -> bool {
    let ext = extension_lower(path).or_else(|| {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix('.'))
            .map(|n| n.to_ascii_lowercase())
    });
    ext.is_some_and(|e| {
        extensions
            .iter()
            .any(|x| x.trim_start_matches('.').eq_ignore_ascii_case(&e))
    })
}

/// List the text files under `root`.
#[must_use]
pub fn text_files(root: &Path, config: &HarnessConfig) -> Vec<PathBuf> {
    collect_files(root, &config.exclude_dirs, |p| {
        is_text_file(p, &config.text_extensions)
    })
}

/// Scan every text file under `root`.
///
/// Unreadable files are returned in the error list rather than aborting the
/// scan.
#[must_use]
pub fn scan(
    root: &Path,
    config: &HarnessConfig,
) -> (Vec<ScanResult>, Vec<(PathBuf, std::io::Error)>) {
    let mut results = Vec::new();
    let mut errors = Vec::new();
    for path in text_files(root, config) {
        match std::fs::read(&path) {
            Ok(bytes) => results.push(scan_bytes(&path, &bytes)),
            Err(e) => errors.push((path, e)),
        }
    }
    tracing::debug!(files = results.len(), root = %root.display(), "text files scanned");
    (results, errors)
}

fn relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// Turn scan results into diagnostics.
#[must_use]
pub fn diagnose(root: &Path, results: &[ScanResult]) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for r in results {
        let file = relative(root, &r.path);
        if r.encoding == Encoding::Unicode {
            diags.push(
                Diagnostic::new(Severity::Error, F001, "file is Unicode encoded")
                    .with_file(&file)
                    .with_suggestion("Save the file as UTF-8 without a byte-order mark"),
            );
        }
        if r.has_tabs {
            diags.push(
                Diagnostic::new(Severity::Error, F002, "file contains tab characters")
                    .with_file(&file)
                    .with_suggestion("Indent with spaces"),
            );
        }
        if r.is_empty {
            diags.push(
                Diagnostic::new(Severity::Error, F003, "file is empty")
                    .with_file(&file)
                    .with_suggestion("Remove the file or add content"),
            );
        }
        if r.missing_trailing_newline {
            diags.push(
                Diagnostic::new(Severity::Error, F004, "file does not end with a newline")
                    .with_file(&file)
                    .with_suggestion("Add a newline at the end of the file"),
            );
        }
    }
    diags
}

/// Run the text file suite.
#[must_use]
pub fn check_text_files(root: &Path, config: &HarnessConfig) -> SuiteResult {
    let mut suite = SuiteResult::new(SUITE_TEXT_FILES, true);
    let (results, errors) = scan(root, config);
    for (path, e) in errors {
        suite.push(
            Diagnostic::new(Severity::Error, E000, format!("cannot read file: {e}"))
                .with_file(relative(root, &path)),
        );
    }
    suite.extend(diagnose(root, &results));
    suite
}
