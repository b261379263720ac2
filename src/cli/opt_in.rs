use dscmeta::optin::OPT_IN_SUITES;
use dscmeta::OptInManifest;

use super::{CommonArgs, Format};

pub(crate) fn run(common: CommonArgs) {
    let config = super::load(&common);
    let path = common.root.join(&config.opt_in_file);
    let manifest = OptInManifest::load(&path).unwrap_or_else(|e| super::fail_config(e));
    let unknown: Vec<&String> = manifest
        .suites()
        .iter()
        .filter(|s| !OPT_IN_SUITES.iter().any(|(name, _)| *name == s.as_str()))
        .collect();

    match common.format {
        Format::Text => {
            for (name, description) in OPT_IN_SUITES {
                let mark = if manifest.is_opted_in(name) { "x" } else { " " };
                println!("[{mark}] {name}: {description}");
            }
            for s in &unknown {
                eprintln!("warning: {}: unknown suite '{s}'", path.display());
            }
        }
        Format::Json => {
            let suites: Vec<_> = OPT_IN_SUITES
                .iter()
                .map(|(name, description)| {
                    serde_json::json!({
                        "name": name,
                        "description": description,
                        "opted_in": manifest.is_opted_in(name),
                    })
                })
                .collect();
            super::print_json(&serde_json::json!({
                "file": path,
                "suites": suites,
                "unknown": unknown,
            }));
        }
    }
}
