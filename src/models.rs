use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Encoding classification of a scanned text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// 7-bit clean.
    Ascii,
    /// Valid UTF-8 without a byte-order mark, containing non-ASCII bytes.
    Utf8,
    /// Byte-order mark, NUL bytes, or bytes that are not valid UTF-8.
    Unicode,
}

/// Per-file result of the text file scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub path: PathBuf,
    pub encoding: Encoding,
    pub has_tabs: bool,
    pub is_empty: bool,
    pub missing_trailing_newline: bool,
}

impl ScanResult {
    /// Returns `true` if no check flagged this file.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.encoding != Encoding::Unicode
            && !self.has_tabs
            && !self.is_empty
            && !self.missing_trailing_newline
    }
}

/// Severity reported by the script analyzer for a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSeverity")]
pub enum FindingSeverity {
    Information,
    Warning,
    Error,
    ParseError,
}

impl FindingSeverity {
    /// `Error` and `ParseError` findings count as error-severity.
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, FindingSeverity::Error | FindingSeverity::ParseError)
    }
}

impl fmt::Display for FindingSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FindingSeverity::Information => "Information",
            FindingSeverity::Warning => "Warning",
            FindingSeverity::Error => "Error",
            FindingSeverity::ParseError => "ParseError",
        };
        f.write_str(name)
    }
}

/// Severity as emitted by `ConvertTo-Json`: either the enum name or its
/// underlying integer value.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSeverity {
    Number(u8),
    Name(String),
}

impl TryFrom<RawSeverity> for FindingSeverity {
    type Error = String;

    fn try_from(raw: RawSeverity) -> Result<Self, String> {
        match raw {
            RawSeverity::Number(0) => Ok(FindingSeverity::Information),
            RawSeverity::Number(1) => Ok(FindingSeverity::Warning),
            RawSeverity::Number(2) => Ok(FindingSeverity::Error),
            RawSeverity::Number(3) => Ok(FindingSeverity::ParseError),
            RawSeverity::Number(n) => Err(format!("unknown severity value: {n}")),
            RawSeverity::Name(name) => match name.to_ascii_lowercase().as_str() {
                "information" | "info" => Ok(FindingSeverity::Information),
                "warning" => Ok(FindingSeverity::Warning),
                "error" => Ok(FindingSeverity::Error),
                "parseerror" => Ok(FindingSeverity::ParseError),
                _ => Err(format!("unknown severity name: {name}")),
            },
        }
    }
}

/// A single finding reported by the script analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintFinding {
    pub severity: FindingSeverity,
    pub file: PathBuf,
    pub line: usize,
    pub rule: String,
    pub message: String,
}

/// A rule named inside a suppression annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuppressionRecord {
    pub rule: String,
    pub file: PathBuf,
    pub line: usize,
}
