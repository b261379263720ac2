//! Module manifest validation.
//!
//! Computes the minimum platform version the module needs (`5.0` when it
//! ships class-based resources, `4.0` otherwise), compares it against the
//! manifest's `PowerShellVersion`, and checks that every class resource is
//! exported and registered as a nested module.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::config::HarnessConfig;
use crate::diagnostics::{Diagnostic, Severity, M001, M002, M003, M004, M005};
use crate::errors::{MetaError, Result};
use crate::fs_util::{collect_files, extension_lower, is_regular_file, read_text};
use crate::optin::SUITE_MODULE_FILES;
use crate::psd1::{get_ci, parse_data_file};
use crate::report::SuiteResult;

/// Minimum version for modules with class-based resources.
pub const CLASS_RESOURCE_MIN_VERSION: &str = "5.0";
/// Minimum version for modules with script resources only.
pub const SCRIPT_RESOURCE_MIN_VERSION: &str = "4.0";

/// `[DscResource()]` attribute followed by a class declaration.
static CLASS_RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[DscResource\([^)]*\)\]\s*class\s+([A-Za-z_][A-Za-z0-9_]*)")
        .expect("class resource regex must compile")
});

/// The manifest fields the checks read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleManifest {
    pub power_shell_version: Option<String>,
    pub exported_dsc_resources: Vec<String>,
    /// Names of the nested modules (file stems or `ModuleName` values).
    pub nested_modules: Vec<String>,
}

impl ModuleManifest {
    /// Extract the manifest fields from a parsed data file.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::Manifest`] if the document is not a hashtable.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| MetaError::Manifest {
            message: "manifest is not a hashtable".into(),
        })?;
        let power_shell_version = get_ci(map, "PowerShellVersion").and_then(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        });
        let exported_dsc_resources = get_ci(map, "DscResourcesToExport")
            .or_else(|| get_ci(map, "ExportedDscResources"))
            .map(string_list)
            .unwrap_or_default();
        let nested_modules = get_ci(map, "NestedModules")
            .map(nested_module_names)
            .unwrap_or_default();
        Ok(Self {
            power_shell_version,
            exported_dsc_resources,
            nested_modules,
        })
    }

    /// Read and parse a `.psd1` manifest.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or
    /// [`MetaError::Manifest`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_text(path)?;
        Self::from_value(&parse_data_file(&content)?)
    }

    /// Whether `name` is listed in `DscResourcesToExport`.
    #[must_use]
    pub fn exports(&self, name: &str) -> bool {
        self.exported_dsc_resources
            .iter()
            .any(|r| r.eq_ignore_ascii_case(name))
    }

    /// Whether `name` is registered in `NestedModules`.
    #[must_use]
    pub fn nests(&self, name: &str) -> bool {
        self.nested_modules.iter().any(|m| m.eq_ignore_ascii_case(name))
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// File stem of a `\`- or `/`-separated path.
fn path_stem(path: &str) -> String {
    let last = path.rsplit(['\\', '/']).next().unwrap_or(path);
    match last.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => last.to_string(),
    }
}

fn nested_module_names(value: &Value) -> Vec<String> {
    let entries: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(path_stem(s)),
            Value::Object(map) => get_ci(map, "ModuleName")
                .and_then(Value::as_str)
                .map(path_stem),
            _ => None,
        })
        .collect()
}

/// Locate the module manifest: `<root>/<root-name>.psd1`, else the only
/// `.psd1` directly under the root.
#[must_use]
pub fn find_manifest(root: &Path) -> Option<PathBuf> {
    if let Some(name) = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_owned()))
    {
        let mut file = name;
        file.push(".psd1");
        let candidate = root.join(file);
        if is_regular_file(&candidate) {
            return Some(candidate);
        }
    }
    let psd1: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| is_regular_file(p) && extension_lower(p).as_deref() == Some("psd1"))
        .collect();
    match psd1.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}

/// A class-based resource found in a module file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassResource {
    pub name: String,
    pub file: PathBuf,
}

/// Class resource names declared in `content`.
#[must_use]
pub fn class_resource_names(content: &str) -> Vec<String> {
    CLASS_RESOURCE_RE
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect()
}

/// Find every class-based resource in `.psm1` files under `root`.
#[must_use]
pub fn find_class_resources(root: &Path, config: &HarnessConfig) -> Vec<ClassResource> {
    let files = collect_files(root, &config.exclude_dirs, |p| {
        extension_lower(p).as_deref() == Some("psm1")
    });
    let mut found = Vec::new();
    for file in files {
        let Ok(content) = read_text(&file) else {
            continue;
        };
        for name in class_resource_names(&content) {
            found.push(ClassResource {
                name,
                file: file.clone(),
            });
        }
    }
    found
}

/// Minimum `PowerShellVersion` for a module.
#[must_use]
pub fn minimum_version(has_class_resources: bool) -> &'static str {
    if has_class_resources {
        CLASS_RESOURCE_MIN_VERSION
    } else {
        SCRIPT_RESOURCE_MIN_VERSION
    }
}

fn parse_version(v: &str) -> Option<Vec<u64>> {
    v.trim()
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

/// Compare dotted versions numerically; missing components count as 0.
///
/// Returns `None` if either side is not a dotted numeric version.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let mut a = parse_version(a)?;
    let mut b = parse_version(b)?;
    let len = a.len().max(b.len());
    a.resize(len, 0);
    b.resize(len, 0);
    Some(a.cmp(&b))
}

/// Validate a parsed manifest against the class resources of the module.
#[must_use]
pub fn validate_manifest(manifest: &ModuleManifest, classes: &[ClassResource]) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let required = minimum_version(!classes.is_empty());

    match &manifest.power_shell_version {
        None => diags.push(
            Diagnostic::new(Severity::Error, M002, "manifest does not declare PowerShellVersion")
                .with_suggestion(format!("Add PowerShellVersion = '{required}'")),
        ),
        Some(declared) => match compare_versions(declared, required) {
            Some(Ordering::Less) => diags.push(
                Diagnostic::new(
                    Severity::Error,
                    M003,
                    format!(
                        "PowerShellVersion '{declared}' is below the required minimum '{required}'"
                    ),
                )
                .with_suggestion(format!("Set PowerShellVersion = '{required}'")),
            ),
            Some(_) => {}
            None => diags.push(Diagnostic::new(
                Severity::Error,
                M003,
                format!("PowerShellVersion '{declared}' is not a valid version"),
            )),
        },
    }

    for class in classes {
        if !manifest.exports(&class.name) {
            diags.push(
                Diagnostic::new(
                    Severity::Error,
                    M004,
                    format!("class resource '{}' is not in DscResourcesToExport", class.name),
                )
                .with_file(&class.file)
                .with_suggestion(format!("Add '{}' to DscResourcesToExport", class.name)),
            );
        }
        if !manifest.nests(&class.name) {
            diags.push(
                Diagnostic::new(
                    Severity::Error,
                    M005,
                    format!("class resource '{}' is not in NestedModules", class.name),
                )
                .with_file(&class.file)
                .with_suggestion(format!(
                    "Add the module defining '{}' to NestedModules",
                    class.name
                )),
            );
        }
    }
    diags
}

/// Run the module files suite.
#[must_use]
pub fn check_module_files(root: &Path, config: &HarnessConfig) -> SuiteResult {
    let mut suite = SuiteResult::new(SUITE_MODULE_FILES, true);
    let Some(path) = find_manifest(root) else {
        suite.push(
            Diagnostic::new(Severity::Error, M001, "module manifest (.psd1) not found")
                .with_file(root)
                .with_suggestion("Add <ModuleName>.psd1 at the module root"),
        );
        return suite;
    };
    let manifest = match ModuleManifest::load(&path) {
        Ok(m) => m,
        Err(e) => {
            suite.push(
                Diagnostic::new(Severity::Error, M001, format!("cannot load manifest: {e}"))
                    .with_file(path.strip_prefix(root).unwrap_or(&path)),
            );
            return suite;
        }
    };
    let classes: Vec<ClassResource> = find_class_resources(root, config)
        .into_iter()
        .map(|c| ClassResource {
            file: c.file.strip_prefix(root).map(Path::to_path_buf).unwrap_or(c.file),
            name: c.name,
        })
        .collect();
    tracing::debug!(
        manifest = %path.display(),
        class_resources = classes.len(),
        "validating module manifest"
    );
    suite.extend(validate_manifest(&manifest, &classes));
    suite
}
