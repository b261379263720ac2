//! Rule classifier: turns analyzer findings and suppression annotations
//! into fatal, advisory, or passing decisions per file.
//!
//! | Finding / annotation                              | Decision  |
//! |---------------------------------------------------|-----------|
//! | required rule, error severity, not recently added | hard fail |
//! | required rule, otherwise                          | warn      |
//! | flagged rule                                      | warn (hard fail when the flagged suite is opted in) |
//! | ignored rule                                      | warn      |
//! | rule in no tier                                   | warn (hard fail for error severity when the new-rules suite is opted in) |
//! | suppression naming a required rule                | hard fail |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::catalog::{RuleCatalog, Tier};
use crate::config::HarnessConfig;
use crate::diagnostics::{Diagnostic, Severity, R001, R002, R003, R004, R005, R006};
use crate::fs_util::{collect_files, extension_lower, read_text};
use crate::models::{LintFinding, SuppressionRecord};
use crate::optin::{OptInManifest, SUITE_FLAGGED_RULES, SUITE_NEW_RULES};

/// `[Diagnostics.CodeAnalysis.SuppressMessageAttribute('Rule', '')]` and
/// its shorter spellings.
static SUPPRESS_ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\[\s*(?:System\.)?(?:Diagnostics\.CodeAnalysis\.)?SuppressMessage(?:Attribute)?\s*\(\s*['"]([^'"]+)['"]"#,
    )
    .expect("suppress attribute regex must compile")
});

/// `# PSSA Suppress('Rule')`.
static SUPPRESS_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)#\s*PSSA\s+Suppress\s*\(\s*['"]([^'"]+)['"]"#)
        .expect("suppress comment regex must compile")
});

/// Outcome for one finding or one file; ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Pass,
    Warn,
    HardFail,
}

impl Decision {
    fn severity(self) -> Severity {
        match self {
            Decision::HardFail => Severity::Error,
            Decision::Warn => Severity::Warning,
            Decision::Pass => Severity::Info,
        }
    }
}

/// Opt-in driven strictness on top of the default tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Strictness {
    /// Flagged-rule findings fail the run.
    pub flagged_fatal: bool,
    /// Error-severity findings of untiered rules fail the run.
    pub new_rules_fatal: bool,
}

impl Strictness {
    #[must_use]
    pub fn from_opt_in(opt_in: &OptInManifest) -> Self {
        Self {
            flagged_fatal: opt_in.is_opted_in(SUITE_FLAGGED_RULES),
            new_rules_fatal: opt_in.is_opted_in(SUITE_NEW_RULES),
        }
    }
}

/// Decision and diagnostics for one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileClassification {
    pub file: PathBuf,
    pub decision: Decision,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extract suppression annotations from a script file's content.
#[must_use]
pub fn find_suppressions(file: &Path, content: &str) -> Vec<SuppressionRecord> {
    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        for re in [&*SUPPRESS_ATTRIBUTE_RE, &*SUPPRESS_COMMENT_RE] {
            for cap in re.captures_iter(line) {
                records.push(SuppressionRecord {
                    rule: cap[1].trim().to_string(),
                    file: file.to_path_buf(),
                    line: i + 1,
                });
            }
        }
    }
    records
}

/// Scan every `.ps1` / `.psm1` under `root` for suppression annotations.
///
/// Paths in the records are relative to `root`.
#[must_use]
pub fn scan_suppressions(root: &Path, config: &HarnessConfig) -> Vec<SuppressionRecord> {
    let files = collect_files(root, &config.exclude_dirs, |p| {
        matches!(extension_lower(p).as_deref(), Some("ps1") | Some("psm1"))
    });
    let mut records = Vec::new();
    for file in files {
        let Ok(content) = read_text(&file) else {
            continue;
        };
        let rel = file.strip_prefix(root).unwrap_or(&file);
        records.extend(find_suppressions(rel, &content));
    }
    records
}

/// Classify a single analyzer finding.
#[must_use]
pub fn classify_finding(
    catalog: &RuleCatalog,
    finding: &LintFinding,
    strictness: Strictness,
) -> (Decision, Diagnostic) {
    let (decision, code, what) = match catalog.tier(&finding.rule) {
        Tier::Required
            if finding.severity.is_error() && !catalog.is_recently_added(&finding.rule) =>
        {
            (Decision::HardFail, R001, "required rule")
        }
        Tier::Required if catalog.is_recently_added(&finding.rule) => {
            (Decision::Warn, R006, "recently added required rule")
        }
        Tier::Required => (Decision::Warn, R006, "required rule (non-error severity)"),
        Tier::Flagged if strictness.flagged_fatal => (Decision::HardFail, R003, "flagged rule"),
        Tier::Flagged => (Decision::Warn, R003, "flagged rule"),
        Tier::Ignored => (Decision::Warn, R004, "ignored rule"),
        Tier::Unknown if strictness.new_rules_fatal && finding.severity.is_error() => {
            (Decision::HardFail, R005, "untiered rule")
        }
        // Temporary leniency: untiered rules only warn until triaged into a tier.
        Tier::Unknown => (Decision::Warn, R005, "untiered rule, pending triage"),
    };
    let diag = Diagnostic::new(
        decision.severity(),
        code,
        format!("{what} {} ({}): {}", finding.rule, finding.severity, finding.message),
    )
    .with_file(&finding.file)
    .with_line(finding.line)
    .with_rule(&finding.rule);
    (decision, diag)
}

/// Classify a suppression annotation. Only suppressions of required rules
/// produce a diagnostic; they always fail.
#[must_use]
pub fn classify_suppression(
    catalog: &RuleCatalog,
    record: &SuppressionRecord,
) -> Option<Diagnostic> {
    (catalog.tier(&record.rule) == Tier::Required).then(|| {
        Diagnostic::new(
            Severity::Error,
            R002,
            format!("required rule {} must not be suppressed", record.rule),
        )
        .with_file(&record.file)
        .with_line(record.line)
        .with_rule(&record.rule)
        .with_suggestion("Fix the violation instead of suppressing the rule")
    })
}

/// Classify all findings and suppressions belonging to one file.
#[must_use]
pub fn classify_file(
    catalog: &RuleCatalog,
    file: &Path,
    findings: &[LintFinding],
    suppressions: &[SuppressionRecord],
    strictness: Strictness,
) -> FileClassification {
    let mut decision = Decision::Pass;
    let mut diagnostics = Vec::new();
    for record in suppressions {
        if let Some(d) = classify_suppression(catalog, record) {
            decision = decision.max(Decision::HardFail);
            diagnostics.push(d);
        }
    }
    for finding in findings {
        let (d, diag) = classify_finding(catalog, finding, strictness);
        decision = decision.max(d);
        diagnostics.push(diag);
    }
    FileClassification {
        file: file.to_path_buf(),
        decision,
        diagnostics,
    }
}

/// Group findings and suppressions by file and classify each file.
///
/// Files are returned in path order.
#[must_use]
pub fn classify_all(
    catalog: &RuleCatalog,
    findings: &[LintFinding],
    suppressions: &[SuppressionRecord],
    strictness: Strictness,
) -> Vec<FileClassification> {
    let mut by_file: BTreeMap<&Path, (Vec<LintFinding>, Vec<SuppressionRecord>)> = BTreeMap::new();
    for f in findings {
        by_file.entry(&f.file).or_default().0.push(f.clone());
    }
    for s in suppressions {
        by_file.entry(&s.file).or_default().1.push(s.clone());
    }
    by_file
        .into_iter()
        .map(|(file, (f, s))| classify_file(catalog, file, &f, &s, strictness))
        .collect()
}
