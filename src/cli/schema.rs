use dscmeta::{check_schema_files, Report};

use super::CommonArgs;

pub(crate) fn run(common: CommonArgs) {
    // Schema checks take no settings, but a broken config still exits 2.
    super::load(&common);
    let mut report = Report::default();
    report.record(check_schema_files(&common.root));
    super::finish(&report, common.format);
}
