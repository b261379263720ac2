use dscmeta::{Harness, ProcessRunner};

use super::CommonArgs;

pub(crate) fn run(common: CommonArgs) {
    let config = super::load(&common);
    let runner = ProcessRunner;
    let harness =
        Harness::new(&common.root, config, &runner).unwrap_or_else(|e| super::fail_config(e));
    let report = harness.run();
    super::finish(&report, common.format);
}
