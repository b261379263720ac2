use dscmeta::{check_text_files, Report};

use super::CommonArgs;

pub(crate) fn run(common: CommonArgs) {
    let config = super::load(&common);
    let mut report = Report::default();
    report.record(check_text_files(&common.root, &config));
    super::finish(&report, common.format);
}
