//! The harness: loads configuration, catalog and opt-ins once, then runs
//! every suite in a fixed order into one [`Report`].

use std::path::{Path, PathBuf};

use crate::catalog::RuleCatalog;
use crate::classifier::Strictness;
use crate::config::{load_config, HarnessConfig};
use crate::errors::{MetaError, Result};
use crate::manifest::check_module_files;
use crate::optin::{OptInManifest, SUITE_EXAMPLES, SUITE_MARKDOWN};
use crate::report::Report;
use crate::scanner::check_text_files;
use crate::schema::check_schema_files;
use crate::tools::analyzer::check_script_analyzer;
use crate::tools::examples::check_example_files;
use crate::tools::markdown::check_markdown_files;
use crate::tools::ToolRunner;

/// Everything one run needs, read-only after construction.
pub struct Harness<'r> {
    root: PathBuf,
    config: HarnessConfig,
    catalog: RuleCatalog,
    opt_in: OptInManifest,
    runner: &'r dyn ToolRunner,
}

impl<'r> Harness<'r> {
    /// Assemble a harness from already-loaded parts.
    ///
    /// # Errors
    ///
    /// [`MetaError::RootNotFound`] if `root` is not a directory,
    /// [`MetaError::Config`] for invalid rule tiers or opt-in file.
    pub fn new(
        root: impl Into<PathBuf>,
        config: HarnessConfig,
        runner: &'r dyn ToolRunner,
    ) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(MetaError::RootNotFound { path: root });
        }
        let catalog = RuleCatalog::from_overrides(&config.rules)?;
        let opt_in = OptInManifest::load(&root.join(&config.opt_in_file))?;
        tracing::debug!(
            root = %root.display(),
            opted_in = opt_in.suites().len(),
            "harness ready"
        );
        Ok(Self {
            root,
            config,
            catalog,
            opt_in,
            runner,
        })
    }

    /// Load configuration from `<root>/.dscmeta.yml` or `config_path`, then
    /// assemble the harness.
    ///
    /// # Errors
    ///
    /// Configuration errors from [`load_config`] and [`Harness::new`].
    pub fn load(
        root: &Path,
        config_path: Option<&Path>,
        runner: &'r dyn ToolRunner,
    ) -> Result<Self> {
        if !root.is_dir() {
            return Err(MetaError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        let config = load_config(root, config_path)?;
        Self::new(root, config, runner)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn opt_in(&self) -> &OptInManifest {
        &self.opt_in
    }

    #[must_use]
    pub fn strictness(&self) -> Strictness {
        Strictness::from_opt_in(&self.opt_in)
    }

    /// Run all suites: text files, module files, schema files, script
    /// analyzer, examples, markdown.
    #[must_use]
    pub fn run(&self) -> Report {
        let mut report = Report::default();
        report.record(check_text_files(&self.root, &self.config));
        report.record(check_module_files(&self.root, &self.config));
        report.record(check_schema_files(&self.root));
        report.record(check_script_analyzer(
            self.runner,
            &self.root,
            &self.config,
            &self.catalog,
            self.strictness(),
        ));
        report.record(check_example_files(
            self.runner,
            &self.root,
            &self.config,
            self.opt_in.is_opted_in(SUITE_EXAMPLES),
        ));
        report.record(check_markdown_files(
            self.runner,
            &self.root,
            &self.config,
            self.opt_in.is_opted_in(SUITE_MARKDOWN),
        ));
        report
    }
}
