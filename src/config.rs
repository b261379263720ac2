//! Harness configuration loaded from `.dscmeta.yml`.
//!
//! Every field has a built-in default, so a module repository without a
//! configuration file runs the stock suite. Precedence at runtime is
//! CLI flags > configuration file > defaults; the CLI applies its own
//! overrides on top of the value returned by [`load_config`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{MetaError, Result};

/// Configuration file looked up at the module root.
pub const CONFIG_FILE: &str = ".dscmeta.yml";

/// Default opt-in manifest file name.
pub const DEFAULT_OPT_IN_FILE: &str = ".MetaTestOptIn.json";

/// Default wait for any single external tool invocation.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 300;

const ANALYZER_SCRIPT: &str = "Invoke-ScriptAnalyzer -Path '{path}' -Recurse \
| Select-Object RuleName, Severity, ScriptPath, Line, Message \
| ConvertTo-Json -Depth 3";

const EXAMPLE_SCRIPT: &str = "$ErrorActionPreference = 'Stop'; . '{file}'; \
$configuration = Get-Command -CommandType Configuration | Select-Object -Last 1; \
& $configuration.Name -OutputPath '{output}' | Out-Null";

/// Top-level harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Opt-in manifest path, relative to the module root.
    pub opt_in_file: String,
    /// Directory names never entered by any scan.
    pub exclude_dirs: Vec<String>,
    /// Extensions (without dot) treated as text files.
    pub text_extensions: Vec<String>,
    /// Bounded wait for each external tool invocation.
    pub tool_timeout_secs: u64,
    /// Replacements for the built-in rule tiers.
    pub rules: RuleOverrides,
    /// External tool command lines.
    pub tools: ToolsConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            opt_in_file: DEFAULT_OPT_IN_FILE.to_string(),
            exclude_dirs: [".git", "node_modules", "DscResource.Tests"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            text_extensions: [
                "ps1",
                "psm1",
                "psd1",
                "md",
                "mof",
                "txt",
                "json",
                "xml",
                "yml",
                "yaml",
                "cmd",
                "gitignore",
                "gitattributes",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            rules: RuleOverrides::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Optional replacement lists for each rule tier.
///
/// A present list replaces the built-in tier entirely; an absent one keeps it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleOverrides {
    pub required: Option<Vec<String>>,
    pub flagged: Option<Vec<String>>,
    pub ignored: Option<Vec<String>>,
    pub recently_added: Option<Vec<String>>,
}

/// A program and its argument template.
///
/// Arguments may contain the placeholders `{path}`, `{root}`, `{file}`, and
/// `{output}`, substituted per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Command lines for the external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub analyzer: ToolCommand,
    pub markdown: ToolCommand,
    pub example_compiler: ToolCommand,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        let pwsh = ["-NoLogo", "-NoProfile", "-NonInteractive", "-Command"];
        let mut analyzer_args = pwsh.to_vec();
        analyzer_args.push(ANALYZER_SCRIPT);
        let mut example_args = pwsh.to_vec();
        example_args.push(EXAMPLE_SCRIPT);
        Self {
            analyzer: ToolCommand::new("pwsh", &analyzer_args),
            markdown: ToolCommand::new(
                "npx",
                &[
                    "--yes",
                    "markdownlint-cli",
                    "--json",
                    "--ignore",
                    "node_modules",
                    "{root}",
                ],
            ),
            example_compiler: ToolCommand::new("pwsh", &example_args),
        }
    }
}

/// Load the harness configuration for a module root.
///
/// With `explicit = Some(path)` the file must exist. Otherwise
/// `<root>/.dscmeta.yml` is used when present and defaults apply when it is
/// not.
///
/// # Errors
///
/// Returns [`MetaError::Config`] when an explicit file is missing and
/// [`MetaError::Yaml`] when the file does not parse.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<HarnessConfig> {
    let path: PathBuf = match explicit {
        Some(p) => {
            if !p.is_file() {
                return Err(MetaError::Config {
                    message: format!("config file not found: {}", p.display()),
                });
            }
            p.to_path_buf()
        }
        None => {
            let p = root.join(CONFIG_FILE);
            if !p.is_file() {
                return Ok(HarnessConfig::default());
            }
            p
        }
    };
    let content = std::fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok(HarnessConfig::default());
    }
    let config: HarnessConfig = serde_yaml_ng::from_str(&content)?;
    if config.tool_timeout_secs == 0 {
        return Err(MetaError::Config {
            message: "tool_timeout_secs must be greater than zero".into(),
        });
    }
    Ok(config)
}
