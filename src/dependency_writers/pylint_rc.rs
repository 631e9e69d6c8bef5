//! Writer of `.pylintrc`.

use std::path::Path;

use anyhow::Result;

use crate::dependency_writers::{DependencyFileWriter, WriterContext};

const PYLINTRC_TEMPLATE: &str = "\
# Pylint 2.x configuration file
#
# This file is generated by l2tdevtools update-dependencies, any dependency
# related changes should be made in dependencies.ini.
[MASTER]

# A comma-separated list of package or module names from where C extensions may
# be loaded. Extensions are loading into the active Python interpreter and may
# run arbitrary code.
extension-pkg-allow-list=$extension_pkg_allow_list

# Files or directories to be skipped. They should be base names, not paths.
ignore=CVS

# Use multiple processes to speed up Pylint. Specifying 0 will auto-detect the
# number of processors available to use.
jobs=0

[MESSAGES CONTROL]

disable=assignment-from-none,
        bad-inline-option,
        consider-using-f-string,
        duplicate-code,
        fixme,
        locally-disabled,
        too-few-public-methods,
        too-many-arguments,
        too-many-instance-attributes,
        too-many-public-methods,
        useless-object-inheritance

[FORMAT]

# String used as indentation unit.
indent-string='  '

# Maximum number of characters on a single line.
max-line-length=80
";

/// Writes `.pylintrc` with the C extension modules pylint may load.
#[derive(Debug)]
pub struct PylintRcWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> PylintRcWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        PylintRcWriter { context }
    }
}

impl DependencyFileWriter for PylintRcWriter<'_> {
    fn path(&self) -> &'static str {
        ".pylintrc"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let extension_packages = self
            .context
            .dependency_helper()
            .pylintrc_extension_packages()
            .join(",");

        self.context.generate_from_template(
            ".pylintrc",
            PYLINTRC_TEMPLATE,
            &[("extension_pkg_allow_list", &extension_packages)],
        )
    }
}
