use dscmeta::{check_module_files, Report};

use super::CommonArgs;

pub(crate) fn run(common: CommonArgs) {
    let config = super::load(&common);
    let mut report = Report::default();
    report.record(check_module_files(&common.root, &config));
    super::finish(&report, common.format);
}
