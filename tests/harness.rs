use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use dscmeta::diagnostics::{D001, F002, G001, M003, R001, R002, R005, T001, X001};
use dscmeta::optin::{
    SUITE_EXAMPLES, SUITE_MARKDOWN, SUITE_MODULE_FILES, SUITE_NEW_RULES, SUITE_SCHEMA_FILES,
    SUITE_SCRIPT_ANALYZER, SUITE_TEXT_FILES,
};
use dscmeta::{
    is_opted_in, Harness, HarnessConfig, MetaError, Outcome, Report, Result, ToolInvocation,
    ToolOutput, ToolRunner,
};
use tempfile::{tempdir, TempDir};

/// Answers by program name; anything unrecognized is "not installed".
#[derive(Default)]
struct FakeTools {
    analyzer_stdout: String,
    markdown_stderr: String,
    example_status: i32,
    calls: RefCell<Vec<String>>,
}

impl ToolRunner for FakeTools {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        self.calls.borrow_mut().push(invocation.program.clone());
        match invocation.program.as_str() {
            "fake-analyzer" => Ok(ToolOutput {
                status: Some(0),
                stdout: self.analyzer_stdout.clone(),
                stderr: String::new(),
            }),
            "fake-mdlint" => Ok(ToolOutput {
                status: Some(if self.markdown_stderr.is_empty() { 0 } else { 1 }),
                stdout: String::new(),
                stderr: self.markdown_stderr.clone(),
            }),
            "fake-compiler" => Ok(ToolOutput {
                status: Some(self.example_status),
                stdout: String::new(),
                stderr: "compilation error".into(),
            }),
            other => Err(MetaError::ToolUnavailable {
                program: other.to_string(),
            }),
        }
    }
}

fn config() -> HarnessConfig {
    let mut c = HarnessConfig::default();
    c.tools.analyzer.program = "fake-analyzer".into();
    c.tools.markdown.program = "fake-mdlint".into();
    c.tools.example_compiler.program = "fake-compiler".into();
    c
}

const MANIFEST: &str = "@{
    ModuleVersion = '1.0.0.0'
    GUID = 'b3239f27-d7d3-4ae6-a5d2-d9a1c97d6ae4'
    Author = 'DSC Community'
    PowerShellVersion = '4.0'
}
";

const SCHEMA: &str = "[ClassVersion(\"1.0.0.0\"), FriendlyName(\"Demo\")]
class MSFT_Demo : OMI_BaseResource
{
    [Key] String Name;
    [Write, ValueMap{\"Present\",\"Absent\"}, Values{\"Present\",\"Absent\"}] String Ensure;
};
";

const SCRIPT: &str = "function Get-TargetResource
{
    [CmdletBinding()]
    param
    (
        [Parameter(Mandatory = $true)]
        [System.String]
        $Name
    )

    return @{
        Name = $Name
    }
}

function Set-TargetResource
{
    [CmdletBinding()]
    param
    (
        [Parameter(Mandatory = $true)]
        [System.String]
        $Name,

        [Parameter()]
        [System.String]
        $Ensure = 'Present'
    )
}

function Test-TargetResource
{
    [CmdletBinding()]
    param
    (
        [Parameter(Mandatory = $true)]
        [System.String]
        $Name,

        [Parameter()]
        [System.String]
        $Ensure = 'Present'
    )

    return $true
}
";

/// A clean script-resource module under `<tmp>/Demo`.
fn demo_module() -> (TempDir, PathBuf) {
    let parent = tempdir().unwrap();
    let root = parent.path().join("Demo");
    let resource = root.join("DSCResources").join("MSFT_Demo");
    fs::create_dir_all(&resource).unwrap();
    fs::write(root.join("Demo.psd1"), MANIFEST).unwrap();
    fs::write(resource.join("MSFT_Demo.psm1"), SCRIPT).unwrap();
    fs::write(resource.join("MSFT_Demo.schema.mof"), SCHEMA).unwrap();
    fs::write(root.join("README.md"), "# Demo\n\nA demo module.\n").unwrap();
    (parent, root)
}

fn opt_in(root: &Path, suites: &[&str]) {
    let json = serde_json::to_string(suites).unwrap();
    fs::write(root.join(".MetaTestOptIn.json"), format!("{json}\n")).unwrap();
}

fn run(root: &Path, tools: &FakeTools) -> Report {
    Harness::new(root, config(), tools).unwrap().run()
}

fn codes(report: &Report, suite: &str) -> Vec<&'static str> {
    report
        .suite(suite)
        .unwrap()
        .diagnostics
        .iter()
        .map(|d| d.code)
        .collect()
}

const TWO_MARKDOWN_ISSUES: &str = r#"[
  {"fileName":"README.md","lineNumber":1,"ruleNames":["MD041","first-line-heading"],"ruleDescription":"First line should be a heading","errorDetail":null},
  {"fileName":"README.md","lineNumber":3,"ruleNames":["MD009","no-trailing-spaces"],"ruleDescription":"Trailing spaces","errorDetail":"Expected: 0; Actual: 2"}
]"#;

#[test]
fn clean_module_passes_every_suite() {
    let (_tmp, root) = demo_module();
    let tools = FakeTools::default();
    let report = run(&root, &tools);
    assert!(!report.has_failures(), "{}", report.format_text());
    for suite in &report.suites {
        assert_eq!(suite.failure_count(), 0, "{}", suite.name);
    }
    assert_eq!(
        tools.calls.borrow().as_slice(),
        &["fake-analyzer".to_string(), "fake-mdlint".to_string()]
    );
}

#[test]
fn markdown_issues_fail_when_opted_in() {
    let (_tmp, root) = demo_module();
    opt_in(&root, &[SUITE_MARKDOWN]);
    let tools = FakeTools {
        markdown_stderr: TWO_MARKDOWN_ISSUES.into(),
        ..FakeTools::default()
    };
    let report = run(&root, &tools);
    let md = report.suite(SUITE_MARKDOWN).unwrap();
    assert_eq!(md.failure_count(), 2);
    assert_eq!(md.outcome(), Outcome::Failed);
    assert!(md.diagnostics.iter().all(|d| d.code == D001));
    assert!(report.has_failures());
}

#[test]
fn markdown_issues_only_warn_when_not_opted_in() {
    let (_tmp, root) = demo_module();
    let tools = FakeTools {
        markdown_stderr: TWO_MARKDOWN_ISSUES.into(),
        ..FakeTools::default()
    };
    let report = run(&root, &tools);
    let md = report.suite(SUITE_MARKDOWN).unwrap();
    assert_eq!(md.failure_count(), 0);
    assert_eq!(md.warning_count(), 2);
    assert_eq!(md.outcome(), Outcome::Warned);
    assert!(codes(&report, SUITE_MARKDOWN).contains(&G001));
    assert!(!report.has_failures());
}

#[test]
fn required_rule_suppression_fails_without_analyzer() {
    let (_tmp, root) = demo_module();
    let script = format!("# PSSA Suppress('PSAvoidUsingWMICmdlet')\n{SCRIPT}");
    fs::write(root.join("DSCResources/MSFT_Demo/MSFT_Demo.psm1"), script).unwrap();
    let mut cfg = config();
    cfg.tools.analyzer.program = "not-installed-analyzer".into();
    let tools = FakeTools::default();
    let report = Harness::new(&root, cfg, &tools).unwrap().run();
    assert_eq!(codes(&report, SUITE_SCRIPT_ANALYZER), vec![T001, R002]);
    assert!(report.has_failures());
}

#[test]
fn required_error_finding_fails_and_flagged_warns() {
    let (_tmp, root) = demo_module();
    let tools = FakeTools {
        analyzer_stdout: r#"[
          {"RuleName":"PSAvoidUsingCmdletAliases","Severity":2,"ScriptPath":"DSCResources/MSFT_Demo/MSFT_Demo.psm1","Line":12,"Message":"'gci' is an alias"},
          {"RuleName":"PSAvoidGlobalVars","Severity":1,"ScriptPath":"DSCResources/MSFT_Demo/MSFT_Demo.psm1","Line":20,"Message":"global"}
        ]"#
        .into(),
        ..FakeTools::default()
    };
    let report = run(&root, &tools);
    let sa = report.suite(SUITE_SCRIPT_ANALYZER).unwrap();
    assert_eq!(sa.failure_count(), 1);
    assert_eq!(sa.warning_count(), 1);
    assert_eq!(sa.diagnostics[0].code, R001);
}

#[test]
fn untiered_rule_is_lenient_until_opted_in() {
    let finding = r#"{"RuleName":"PSSomeBrandNewRule","Severity":"Error","ScriptPath":"DSCResources/MSFT_Demo/MSFT_Demo.psm1","Line":3,"Message":"new"}"#;

    let (_tmp, root) = demo_module();
    let tools = FakeTools {
        analyzer_stdout: finding.into(),
        ..FakeTools::default()
    };
    let report = run(&root, &tools);
    assert_eq!(codes(&report, SUITE_SCRIPT_ANALYZER), vec![R005]);
    assert!(!report.has_failures());

    opt_in(&root, &[SUITE_NEW_RULES]);
    let report = run(&root, &tools);
    assert_eq!(report.suite(SUITE_SCRIPT_ANALYZER).unwrap().failure_count(), 1);
    assert!(report.has_failures());
}

#[test]
fn class_resources_require_powershell_five() {
    let (_tmp, root) = demo_module();
    fs::write(
        root.join("Demo.psd1"),
        "@{
    ModuleVersion = '1.0.0.0'
    PowerShellVersion = '4.0'
    DscResourcesToExport = @('DemoThing')
    NestedModules = @('DSCClassResources\\DemoThing\\DemoThing.psm1')
}
",
    )
    .unwrap();
    let class_dir = root.join("DSCClassResources").join("DemoThing");
    fs::create_dir_all(&class_dir).unwrap();
    fs::write(
        class_dir.join("DemoThing.psm1"),
        "[DscResource()]
class DemoThing
{
    [DscProperty(Key)]
    [string] $Name

    [DemoThing] Get() { return $this }
    [void] Set() {}
    [bool] Test() { return $true }
}
",
    )
    .unwrap();
    let report = run(&root, &FakeTools::default());
    assert_eq!(codes(&report, SUITE_MODULE_FILES), vec![M003]);
}

#[test]
fn tabs_fail_the_text_suite() {
    let (_tmp, root) = demo_module();
    fs::write(root.join("README.md"), "# Demo\n\tindented\n").unwrap();
    let report = run(&root, &FakeTools::default());
    assert_eq!(codes(&report, SUITE_TEXT_FILES), vec![F002]);
    assert!(report.has_failures());
}

#[test]
fn broken_example_is_advisory_unless_opted_in() {
    let (_tmp, root) = demo_module();
    let examples = root.join("Examples");
    fs::create_dir_all(&examples).unwrap();
    fs::write(examples.join("1-Demo.ps1"), "Configuration Demo {\n").unwrap();
    let tools = FakeTools {
        example_status: 1,
        ..FakeTools::default()
    };

    let report = run(&root, &tools);
    assert_eq!(report.suite(SUITE_EXAMPLES).unwrap().outcome(), Outcome::Warned);
    assert!(!report.has_failures());

    opt_in(&root, &[SUITE_EXAMPLES]);
    let report = run(&root, &tools);
    assert_eq!(codes(&report, SUITE_EXAMPLES), vec![X001]);
    assert!(report.has_failures());
}

#[test]
fn missing_schema_fails_schema_suite() {
    let (_tmp, root) = demo_module();
    fs::remove_file(root.join("DSCResources/MSFT_Demo/MSFT_Demo.schema.mof")).unwrap();
    let report = run(&root, &FakeTools::default());
    assert_eq!(report.suite(SUITE_SCHEMA_FILES).unwrap().outcome(), Outcome::Failed);
}

#[test]
fn config_file_overrides_rule_tiers() {
    let (_tmp, root) = demo_module();
    fs::write(
        root.join(".dscmeta.yml"),
        "rules:\n  required: [PSAvoidGlobalVars]\n  flagged: []\n",
    )
    .unwrap();
    let finding =
        r#"{"RuleName":"PSAvoidGlobalVars","Severity":2,"ScriptPath":"x.ps1","Line":1,"Message":"g"}"#;
    let tools = FakeTools {
        analyzer_stdout: finding.into(),
        ..FakeTools::default()
    };
    let mut harness_config = dscmeta::load_config(&root, None).unwrap();
    harness_config.tools = config().tools;
    let report = Harness::new(&root, harness_config, &tools).unwrap().run();
    assert_eq!(codes(&report, SUITE_SCRIPT_ANALYZER), vec![R001]);
}

#[test]
fn json_report_lists_suites_in_order() {
    let (_tmp, root) = demo_module();
    let json = run(&root, &FakeTools::default()).to_json();
    let names: Vec<&str> = json["suites"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.first(), Some(&SUITE_TEXT_FILES));
    assert_eq!(names.last(), Some(&SUITE_MARKDOWN));
    assert_eq!(json["failed"], false);
}

#[test]
fn opt_in_membership() {
    assert!(!is_opted_in("X", &[]));
    assert!(is_opted_in("X", &["X".to_string()]));
    assert!(!is_opted_in("x", &["X".to_string()]));
}
