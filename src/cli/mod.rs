use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use dscmeta::{load_config, HarnessConfig, Report};

mod manifest;
mod opt_in;
mod rules;
mod run;
mod scan;
mod schema;
mod suppressions;

/// Exit status for a run with hard failures.
const EXIT_FAILED: i32 = 1;
/// Exit status for unusable configuration or input.
const EXIT_CONFIG: i32 = 2;

#[derive(Parser)]
#[command(
    name = "dscmeta",
    version,
    about = "Shared meta-test suite for DSC resource modules"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show project information
    #[arg(long)]
    about: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub(crate) verbose: bool,
}

/// Output format for reports and listings.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum Format {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// JSON document on stdout
    Json,
}

/// Arguments shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Module root directory [default: .]
    #[arg(default_value = ".")]
    root: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Harness configuration file [default: <root>/.dscmeta.yml]
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
#[command(next_display_order = None)]
enum Commands {
    /// Run every suite against a module
    Run {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Check text files: encoding, tabs, empty files, trailing newlines
    Scan {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Check the module manifest against its class resources
    Manifest {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Check resource schemas against their script functions
    Schema {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// List suppression annotations and flag suppressed required rules
    Suppressions {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Print the effective rule catalog
    Rules {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// List opt-in suites and whether each is opted in
    #[command(name = "opt-in")]
    OptIn {
        #[command(flatten)]
        common: CommonArgs,
    },
}

pub fn run(cli: Cli) {
    if cli.about {
        print_about();
        return;
    }

    match cli.command {
        Some(Commands::Run { common }) => run::run(common),
        Some(Commands::Scan { common }) => scan::run(common),
        Some(Commands::Manifest { common }) => manifest::run(common),
        Some(Commands::Schema { common }) => schema::run(common),
        Some(Commands::Suppressions { common }) => suppressions::run(common),
        Some(Commands::Rules { common }) => rules::run(common),
        Some(Commands::OptIn { common }) => opt_in::run(common),
        None => {
            eprintln!("Usage: dscmeta <command> [args]");
            eprintln!("Run `dscmeta --help` for details.");
            std::process::exit(EXIT_FAILED);
        }
    }
}

fn print_about() {
    println!(
        "dscmeta: DSC Resource Meta-Test Harness\n\
         ├─ version:    {}\n\
         ├─ author:     {}\n\
         └─ licence:    {} https://www.apache.org/licenses/LICENSE-2.0",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_AUTHORS"),
        env!("CARGO_PKG_LICENSE"),
    );
}

/// Exit with the configuration status after printing `err`.
fn fail_config(err: impl std::fmt::Display) -> ! {
    eprintln!("error: {err}");
    std::process::exit(EXIT_CONFIG);
}

/// Resolve the module root or exit.
fn resolve_root(root: &Path) -> PathBuf {
    if !root.is_dir() {
        fail_config(dscmeta::MetaError::RootNotFound {
            path: root.to_path_buf(),
        });
    }
    root.to_path_buf()
}

/// Load configuration for the command or exit.
fn load(common: &CommonArgs) -> HarnessConfig {
    let root = resolve_root(&common.root);
    load_config(&root, common.config.as_deref()).unwrap_or_else(|e| fail_config(e))
}

/// Render `report` and exit non-zero if a gating suite failed.
fn finish(report: &Report, format: Format) {
    match format {
        Format::Text => eprint!("{}", report.format_text()),
        Format::Json => print_json(&report.to_json()),
    }
    if report.has_failures() {
        std::process::exit(EXIT_FAILED);
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(EXIT_FAILED);
        }
    }
}
