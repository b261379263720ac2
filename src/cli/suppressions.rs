use dscmeta::classifier::{classify_suppression, scan_suppressions};
use dscmeta::RuleCatalog;

use super::{CommonArgs, Format};

pub(crate) fn run(common: CommonArgs) {
    let config = super::load(&common);
    let catalog =
        RuleCatalog::from_overrides(&config.rules).unwrap_or_else(|e| super::fail_config(e));
    let records = scan_suppressions(&common.root, &config);
    let diags: Vec<_> = records
        .iter()
        .filter_map(|r| classify_suppression(&catalog, r))
        .collect();

    match common.format {
        Format::Text => {
            for r in &records {
                println!(
                    "{}:{}: {} [{}]",
                    r.file.display(),
                    r.line,
                    r.rule,
                    catalog.tier(&r.rule)
                );
            }
            for d in &diags {
                eprintln!("{d}");
                if let Some(s) = &d.suggestion {
                    eprintln!("  → {s}");
                }
            }
            if records.is_empty() {
                eprintln!("No suppressions found.");
            }
        }
        Format::Json => {
            let entries: Vec<_> = records
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "rule": r.rule,
                        "file": r.file,
                        "line": r.line,
                        "tier": catalog.tier(&r.rule),
                    })
                })
                .collect();
            super::print_json(&serde_json::json!({
                "suppressions": entries,
                "diagnostics": diags,
                "failed": !diags.is_empty(),
            }));
        }
    }

    if !diags.is_empty() {
        std::process::exit(super::EXIT_FAILED);
    }
}
