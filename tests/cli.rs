use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

/// Return a `Command` for the `dscmeta` binary built by Cargo.
fn dscmeta() -> Command {
    cargo_bin_cmd!("dscmeta")
}

/// Tool programs that cannot exist, so every external check degrades.
const MISSING_TOOLS: &str = "tools:
  analyzer: { program: dscmeta-missing-analyzer, args: ['{path}'] }
  markdown: { program: dscmeta-missing-mdlint, args: ['{root}'] }
  example_compiler: { program: dscmeta-missing-compiler, args: ['{file}', '{output}'] }
";

/// Create `<tmp>/Demo` holding a minimal clean module.
fn make_module() -> (tempfile::TempDir, PathBuf) {
    let parent = tempdir().unwrap();
    let root = parent.path().join("Demo");
    fs::create_dir(&root).unwrap();
    fs::write(
        root.join("Demo.psd1"),
        "@{\n    ModuleVersion = '1.0.0'\n    PowerShellVersion = '4.0'\n}\n",
    )
    .unwrap();
    fs::write(root.join("README.md"), "# Demo\n").unwrap();
    fs::write(root.join(".dscmeta.yml"), MISSING_TOOLS).unwrap();
    (parent, root)
}

// ── Global flags ────────────────────────────────────────────────────

#[test]
fn help_flag() {
    dscmeta()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("meta-test suite"));
}

#[test]
fn version_flag() {
    dscmeta()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn about_flag() {
    dscmeta()
        .arg("--about")
        .assert()
        .success()
        .stdout(predicate::str::contains("dscmeta:"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")))
        .stdout(predicate::str::contains("licence:"));
}

#[test]
fn no_args_shows_usage() {
    dscmeta()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage: dscmeta"));
}

// ── run ─────────────────────────────────────────────────────────────

#[test]
fn run_clean_module_passes_with_tool_warnings() {
    let (_tmp, root) = make_module();
    dscmeta()
        .arg("run")
        .arg(&root)
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "[PASS] Common Tests - Validate Text Files",
        ))
        .stderr(predicate::str::contains(
            "[WARN] Common Tests - PS Script Analyzer on Resource Files",
        ))
        .stderr(predicate::str::contains("dscmeta-missing-analyzer"))
        .stderr(predicate::str::contains("0 failed"));
}

#[test]
fn run_fails_on_tab_character() {
    let (_tmp, root) = make_module();
    fs::write(root.join("README.md"), "# Demo\n\tx\n").unwrap();
    dscmeta()
        .arg("run")
        .arg(&root)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "[FAIL] Common Tests - Validate Text Files",
        ))
        .stderr(predicate::str::contains("README.md: file contains tab characters"));
}

#[test]
fn run_json_output() {
    let (_tmp, root) = make_module();
    let output = dscmeta()
        .args(["run", "--format", "json"])
        .arg(&root)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["failed"], false);
    assert_eq!(json["suites"].as_array().unwrap().len(), 6);
    assert_eq!(json["suites"][3]["diagnostics"][0]["code"], "T001");
}

#[test]
fn run_missing_root_is_config_error() {
    let tmp = tempdir().unwrap();
    dscmeta()
        .arg("run")
        .arg(tmp.path().join("nope"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("module root not found"));
}

#[test]
fn run_rejects_unknown_config_field() {
    let (_tmp, root) = make_module();
    fs::write(root.join(".dscmeta.yml"), "colour: blue\n").unwrap();
    dscmeta()
        .arg("run")
        .arg(&root)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn explicit_config_must_exist() {
    let (_tmp, root) = make_module();
    dscmeta()
        .arg("run")
        .arg(&root)
        .arg("--config")
        .arg(root.join("missing.yml"))
        .assert()
        .code(2);
}

#[test]
fn run_with_markdown_opted_in_but_linter_missing_passes() {
    let (_tmp, root) = make_module();
    fs::write(
        root.join(".MetaTestOptIn.json"),
        "[\"Common Tests - Validate Markdown Files\"]\n",
    )
    .unwrap();
    dscmeta()
        .arg("run")
        .arg(&root)
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "[WARN] Common Tests - Validate Markdown Files",
        ));
}

#[test]
fn run_fails_on_required_rule_suppression() {
    let (_tmp, root) = make_module();
    fs::write(
        root.join("Helper.ps1"),
        "# PSSA Suppress('PSAvoidUsingWMICmdlet')\nGet-CimInstance -ClassName Win32_Service\n",
    )
    .unwrap();
    dscmeta()
        .arg("run")
        .arg(&root)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "[FAIL] Common Tests - PS Script Analyzer on Resource Files",
        ))
        .stderr(predicate::str::contains("must not be suppressed"));
}

// ── single suites ───────────────────────────────────────────────────

#[test]
fn scan_runs_only_text_suite() {
    let (_tmp, root) = make_module();
    dscmeta()
        .arg("scan")
        .arg(&root)
        .assert()
        .success()
        .stderr(predicate::str::contains("1 suites: 1 passed"));
}

#[test]
fn scan_reports_missing_newline() {
    let (_tmp, root) = make_module();
    fs::write(root.join("README.md"), "# Demo").unwrap();
    dscmeta()
        .arg("scan")
        .arg(&root)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not end with a newline"));
}

#[test]
fn manifest_missing_is_reported_in_json() {
    let (_tmp, root) = make_module();
    fs::remove_file(root.join("Demo.psd1")).unwrap();
    dscmeta()
        .args(["manifest", "--format", "json"])
        .arg(&root)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"M001\""));
}

#[test]
fn manifest_below_minimum_version() {
    let (_tmp, root) = make_module();
    fs::write(
        root.join("Demo.psd1"),
        "@{\n    ModuleVersion = '1.0.0'\n    PowerShellVersion = '3.0'\n}\n",
    )
    .unwrap();
    dscmeta()
        .arg("manifest")
        .arg(&root)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("below the required minimum '4.0'"));
}

#[test]
fn schema_missing_mof_fails() {
    let (_tmp, root) = make_module();
    let dir = root.join("DSCResources").join("MSFT_Thing");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("MSFT_Thing.psm1"), "function Get-TargetResource {}\n").unwrap();
    dscmeta()
        .arg("schema")
        .arg(&root)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[FAIL] Common Tests - Validate Schema Files"));
}

// ── suppressions / rules / opt-in ───────────────────────────────────

#[test]
fn suppressions_lists_records_with_tiers() {
    let (_tmp, root) = make_module();
    fs::write(
        root.join("Helper.ps1"),
        "[Diagnostics.CodeAnalysis.SuppressMessageAttribute('PSAvoidGlobalVars', '')]\nparam()\n",
    )
    .unwrap();
    dscmeta()
        .arg("suppressions")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Helper.ps1:1: PSAvoidGlobalVars [flagged]"));
}

#[test]
fn suppressions_of_required_rules_fail() {
    let (_tmp, root) = make_module();
    fs::write(
        root.join("Helper.ps1"),
        "# PSSA Suppress('PSAvoidUsingWMICmdlet')\n",
    )
    .unwrap();
    dscmeta()
        .arg("suppressions")
        .arg(&root)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("PSAvoidUsingWMICmdlet [required]"))
        .stderr(predicate::str::contains("must not be suppressed"));
}

#[test]
fn rules_prints_default_catalog() {
    let tmp = tempdir().unwrap();
    dscmeta()
        .arg("rules")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("required (26):"))
        .stdout(predicate::str::contains("  PSAvoidUsingWMICmdlet"))
        .stdout(predicate::str::contains("flagged (8):"));
}

#[test]
fn rules_json_honours_config() {
    let tmp = tempdir().unwrap();
    fs::write(
        tmp.path().join(".dscmeta.yml"),
        "rules:\n  required: [PSAvoidUsingWriteHost]\n  recently_added: [PSAvoidUsingWriteHost]\n",
    )
    .unwrap();
    let output = dscmeta()
        .args(["rules", "--format", "json"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["required"], serde_json::json!(["PSAvoidUsingWriteHost"]));
    assert_eq!(json["recently_added"], serde_json::json!(["PSAvoidUsingWriteHost"]));
}

#[test]
fn rules_reject_overlapping_tiers() {
    let tmp = tempdir().unwrap();
    fs::write(
        tmp.path().join(".dscmeta.yml"),
        "rules:\n  ignored: [PSAvoidUsingWMICmdlet]\n",
    )
    .unwrap();
    dscmeta()
        .arg("rules")
        .arg(tmp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("PSAvoidUsingWMICmdlet"));
}

#[test]
fn opt_in_lists_suites() {
    let (_tmp, root) = make_module();
    fs::write(
        root.join(".MetaTestOptIn.json"),
        "[\"Common Tests - Validate Markdown Files\", \"Common Tests - Something Else\"]\n",
    )
    .unwrap();
    dscmeta()
        .arg("opt-in")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[x] Common Tests - Validate Markdown Files",
        ))
        .stdout(predicate::str::contains(
            "[ ] Common Tests - Validate Example Files",
        ))
        .stderr(predicate::str::contains(
            "unknown suite 'Common Tests - Something Else'",
        ));
}

#[test]
fn opt_in_rejects_non_array_file() {
    let (_tmp, root) = make_module();
    fs::write(root.join(".MetaTestOptIn.json"), "{}\n").unwrap();
    dscmeta().arg("opt-in").arg(&root).assert().code(2);
}
