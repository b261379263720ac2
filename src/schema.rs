//! Resource schema validation for script-style resources.
//!
//! For every `DSCResources/<Name>/<Name>.psm1` the matching
//! `<Name>.schema.mof` is parsed and compared against the parameters of
//! `Get-`, `Set-` and `Test-TargetResource`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::diagnostics::{Diagnostic, Severity, E000, S001, S002, S003, S004, S005, S006};
use crate::fs_util::{find_child_dir, is_regular_dir, is_regular_file, read_text};
use crate::optin::SUITE_SCHEMA_FILES;
use crate::report::SuiteResult;

/// `[qualifiers] Type Name[];` inside a MOF class body.
static MOF_PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[(?P<quals>(?:[^\]"]|"[^"]*")*)\]\s*(?P<type>\w+)\s+(?P<name>\w+)\s*(?:\[\s*\])?\s*;"#)
        .expect("mof property regex must compile")
});

/// Header of the class implementing the resource.
static RESOURCE_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bclass\s+\w+\s*:\s*OMI_BaseResource\b")
        .expect("resource class regex must compile")
});

static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*""#).expect("quoted regex must compile"));

static ACCESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(Key|Required|Write|Read)\b").expect("access regex must compile")
});

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\w+)").expect("variable regex must compile"));

static MANDATORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bMandatory\b(\s*=\s*\$(\w+))?").expect("mandatory regex must compile")
});

/// The three functions every script resource must define.
pub const TARGET_FUNCTIONS: [&str; 3] = [
    "Get-TargetResource",
    "Set-TargetResource",
    "Test-TargetResource",
];

/// Access qualifier of a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Key,
    Required,
    Write,
    Read,
}

/// A property declared in a `.schema.mof` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaProperty {
    pub name: String,
    pub mof_type: String,
    pub access: Access,
}

/// A parameter declared in a function's `param()` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub mandatory: bool,
}

/// Body of the class deriving from `OMI_BaseResource`, or the whole
/// document if there is no such class.
fn resource_class_body(content: &str) -> &str {
    let Some(header) = RESOURCE_CLASS_RE.find(content) else {
        return content;
    };
    let Some(open) = content[header.end()..].find('{').map(|i| header.end() + i) else {
        return content;
    };
    let mut depth = 0usize;
    let mut in_string = false;
    for (i, c) in content[open..].char_indices() {
        match c {
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return &content[open + 1..open + i];
                }
            }
            _ => {}
        }
    }
    &content[open + 1..]
}

/// Parse the properties of the resource class in a MOF schema document.
///
/// Embedded helper classes are skipped. Properties without a
/// Key/Required/Write/Read qualifier default to Write, as the DSC engine
/// treats them.
#[must_use]
pub fn parse_mof(content: &str) -> Vec<SchemaProperty> {
    MOF_PROPERTY_RE
        .captures_iter(resource_class_body(content))
        .map(|c| {
            let quals = QUOTED_RE.replace_all(&c["quals"], "");
            let access = ACCESS_RE
                .captures(&quals)
                .map(|a| match a[1].to_ascii_lowercase().as_str() {
                    "key" => Access::Key,
                    "required" => Access::Required,
                    "read" => Access::Read,
                    _ => Access::Write,
                })
                .unwrap_or(Access::Write);
            SchemaProperty {
                name: c["name"].to_string(),
                mof_type: c["type"].to_string(),
                access,
            }
        })
        .collect()
}

/// Return the contents between the parenthesis at `open` and its match,
/// with `#` line comments and `<# #>` block comments removed. Quote
/// characters inside comments are ignored.
fn balanced_parens(chars: &[char], open: usize) -> Option<String> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut inner = String::new();
    let mut i = open;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            inner.push(c);
            i += 1;
            continue;
        }
        match c {
            '<' if chars.get(i + 1) == Some(&'#') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '#' && chars.get(i + 1) == Some(&'>')) {
                    i += 1;
                }
                i += 2;
                continue;
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '\'' | '"' => quote = Some(c),
            '(' => {
                depth += 1;
                if depth == 1 {
                    i += 1;
                    continue;
                }
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(inner);
                }
            }
            _ => {}
        }
        inner.push(c);
        i += 1;
    }
    None
}

/// Split `text` on `sep` at bracket depth zero, outside quotes.
fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if c == sep && depth == 0 {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

fn parse_parameter(segment: &str) -> Option<Parameter> {
    // the name is the last variable before a top-level default value
    let head = split_top_level(segment, '=').into_iter().next()?;
    let name = VARIABLE_RE
        .captures_iter(&head)
        .last()
        .map(|c| c[1].to_string())?;
    let mandatory = MANDATORY_RE.captures_iter(&head).any(|c| {
        c.get(2)
            .map_or(true, |v| !v.as_str().eq_ignore_ascii_case("false"))
    });
    Some(Parameter { name, mandatory })
}

/// Parameters of `function_name` in a script module, or `None` if the
/// function is not defined. A function without a `param()` block has no
/// parameters.
#[must_use]
pub fn function_parameters(script: &str, function_name: &str) -> Option<Vec<Parameter>> {
    let pattern = format!(r"(?i)\bfunction\s+{}\b", regex::escape(function_name));
    let re = Regex::new(&pattern).ok()?;
    let start = re.find(script)?.end();
    let chars: Vec<char> = script[start..].chars().collect();
    let body_open = chars.iter().position(|c| *c == '{')?;
    let rest: String = chars[body_open..].iter().collect();
    let param_re = Regex::new(r"(?i)\bparam\s*\(").ok()?;
    let Some(m) = param_re.find(&rest) else {
        return Some(Vec::new());
    };
    // the param block must come before the next function definition
    if let Some(next_fn) = Regex::new(r"(?i)\bfunction\s+").ok()?.find(&rest) {
        if next_fn.start() < m.start() {
            return Some(Vec::new());
        }
    }
    let rest_chars: Vec<char> = rest.chars().collect();
    let open = rest[..m.end()].chars().count() - 1;
    let block = balanced_parens(&rest_chars, open)?;
    Some(
        split_top_level(&block, ',')
            .iter()
            .filter_map(|s| parse_parameter(s))
            .collect(),
    )
}

/// A script resource directory under `DSCResources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptResource {
    pub name: String,
    pub module: PathBuf,
    pub schema: PathBuf,
}

/// Find script resources: `DSCResources/<Name>/<Name>.psm1`.
#[must_use]
pub fn find_script_resources(root: &Path) -> Vec<ScriptResource> {
    let Some(dir) = find_child_dir(root, "DSCResources") else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut resources: Vec<ScriptResource> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| is_regular_dir(p))
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            let module = p.join(format!("{name}.psm1"));
            is_regular_file(&module).then(|| ScriptResource {
                schema: p.join(format!("{name}.schema.mof")),
                module,
                name,
            })
        })
        .collect();
    resources.sort_by(|a, b| a.name.cmp(&b.name));
    resources
}

fn has_param(params: &[Parameter], name: &str) -> bool {
    params.iter().any(|p| p.name.eq_ignore_ascii_case(name))
}

fn has_mandatory_param(params: &[Parameter], name: &str) -> bool {
    params
        .iter()
        .any(|p| p.mandatory && p.name.eq_ignore_ascii_case(name))
}

/// Compare schema properties with the target-resource functions of `script`.
#[must_use]
pub fn validate_resource(
    resource: &str,
    properties: &[SchemaProperty],
    script: &str,
    file: &Path,
) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let mut functions: Vec<(&str, Vec<Parameter>)> = Vec::new();
    for name in TARGET_FUNCTIONS {
        match function_parameters(script, name) {
            Some(params) => functions.push((name, params)),
            None => diags.push(
                Diagnostic::new(
                    Severity::Error,
                    S002,
                    format!("resource '{resource}' does not define {name}"),
                )
                .with_file(file),
            ),
        }
    }

    for prop in properties {
        for (function, params) in &functions {
            let writable_fn = *function != "Get-TargetResource";
            match prop.access {
                Access::Key | Access::Required => {
                    if !has_mandatory_param(params, &prop.name) {
                        diags.push(
                            Diagnostic::new(
                                Severity::Error,
                                S003,
                                format!(
                                    "{:?} property '{}' of '{resource}' is not a mandatory parameter of {function}",
                                    prop.access, prop.name
                                ),
                            )
                            .with_file(file)
                            .with_suggestion("Declare it with [Parameter(Mandatory = $true)]"),
                        );
                    }
                }
                Access::Write if writable_fn => {
                    if !has_param(params, &prop.name) {
                        diags.push(
                            Diagnostic::new(
                                Severity::Error,
                                S004,
                                format!(
                                    "Write property '{}' of '{resource}' is not a parameter of {function}",
                                    prop.name
                                ),
                            )
                            .with_file(file),
                        );
                    }
                }
                Access::Read if writable_fn => {
                    if has_param(params, &prop.name) {
                        diags.push(
                            Diagnostic::new(
                                Severity::Error,
                                S006,
                                format!(
                                    "Read property '{}' of '{resource}' must not be a parameter of {function}",
                                    prop.name
                                ),
                            )
                            .with_file(file),
                        );
                    }
                }
                _ => {}
            }
        }
    }

    for (function, params) in &functions {
        if *function == "Get-TargetResource" {
            continue;
        }
        for param in params {
            if !properties.iter().any(|p| p.name.eq_ignore_ascii_case(&param.name)) {
                diags.push(
                    Diagnostic::new(
                        Severity::Error,
                        S005,
                        format!(
                            "parameter '{}' of {function} has no property in the schema of '{resource}'",
                            param.name
                        ),
                    )
                    .with_file(file),
                );
            }
        }
    }
    diags
}

/// Run the schema files suite.
#[must_use]
pub fn check_schema_files(root: &Path) -> SuiteResult {
    let mut suite = SuiteResult::new(SUITE_SCHEMA_FILES, true);
    let rel = |p: &Path| p.strip_prefix(root).unwrap_or(p).to_path_buf();
    for resource in find_script_resources(root) {
        if !is_regular_file(&resource.schema) {
            suite.push(
                Diagnostic::new(
                    Severity::Error,
                    S001,
                    format!("resource '{}' has no schema document", resource.name),
                )
                .with_file(rel(&resource.module))
                .with_suggestion(format!(
                    "Add {}.schema.mof next to the module",
                    resource.name
                )),
            );
            continue;
        }
        let (schema, script) = match (
            read_text(&resource.schema),
            read_text(&resource.module),
        ) {
            (Ok(s), Ok(m)) => (s, m),
            (Err(e), _) | (_, Err(e)) => {
                suite.push(
                    Diagnostic::new(Severity::Error, E000, format!("cannot read resource: {e}"))
                        .with_file(rel(&resource.module)),
                );
                continue;
            }
        };
        tracing::debug!(resource = %resource.name, "validating resource schema");
        suite.extend(validate_resource(
            &resource.name,
            &parse_mof(&schema),
            &script,
            &rel(&resource.module),
        ));
    }
    suite
}
