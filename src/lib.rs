pub mod catalog;
pub mod classifier;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub(crate) mod fs_util;
pub mod harness;
pub mod manifest;
pub mod models;
pub mod optin;
pub mod psd1;
pub mod report;
pub mod scanner;
pub mod schema;
pub mod tools;

// Re-export key types at crate root for convenience.
pub use catalog::{RuleCatalog, Tier};
pub use classifier::{classify_file, find_suppressions, Decision, Strictness};
pub use config::{load_config, HarnessConfig};
pub use diagnostics::{Diagnostic, Severity};
pub use errors::{MetaError, Result};
pub use harness::Harness;
pub use manifest::check_module_files;
pub use models::{Encoding, FindingSeverity, LintFinding, ScanResult, SuppressionRecord};
pub use optin::{gate, is_opted_in, OptInManifest};
pub use report::{Outcome, Report, SuiteResult};
pub use scanner::check_text_files;
pub use schema::check_schema_files;
pub use tools::{ProcessRunner, ToolInvocation, ToolOutput, ToolRunner};
