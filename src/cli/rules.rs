use dscmeta::RuleCatalog;

use super::{CommonArgs, Format};

pub(crate) fn run(common: CommonArgs) {
    let config = super::load(&common);
    let catalog =
        RuleCatalog::from_overrides(&config.rules).unwrap_or_else(|e| super::fail_config(e));

    match common.format {
        Format::Text => {
            let sections: [(&str, Vec<&str>); 3] = [
                ("required", catalog.required().collect()),
                ("flagged", catalog.flagged().collect()),
                ("ignored", catalog.ignored().collect()),
            ];
            for (i, (name, rules)) in sections.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("{name} ({}):", rules.len());
                for rule in rules {
                    if catalog.is_recently_added(rule) {
                        println!("  {rule} (recently added)");
                    } else {
                        println!("  {rule}");
                    }
                }
            }
        }
        Format::Json => {
            super::print_json(&serde_json::json!({
                "required": catalog.required().collect::<Vec<_>>(),
                "flagged": catalog.flagged().collect::<Vec<_>>(),
                "ignored": catalog.ignored().collect::<Vec<_>>(),
                "recently_added": catalog.recently_added().collect::<Vec<_>>(),
            }));
        }
    }
}
