//! Writers of `requirements.txt` and `test_requirements.txt`.

use std::path::Path;

use anyhow::Result;

use crate::dependency_writers::{DependencyFileWriter, WriterContext};

/// Writes `requirements.txt`.
#[derive(Debug)]
pub struct RequirementsWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> RequirementsWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        RequirementsWriter { context }
    }
}

impl DependencyFileWriter for RequirementsWriter<'_> {
    fn path(&self) -> &'static str {
        "requirements.txt"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let dependencies = self.context.pypi_python_dependencies(false);
        Ok(lines(&dependencies))
    }
}

/// Writes `test_requirements.txt` with the test dependencies that are not
/// already in `requirements.txt`.
#[derive(Debug)]
pub struct TestRequirementsWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> TestRequirementsWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        TestRequirementsWriter { context }
    }
}

impl DependencyFileWriter for TestRequirementsWriter<'_> {
    fn path(&self) -> &'static str {
        "test_requirements.txt"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let python_dependencies = self.context.pypi_python_dependencies(false);
        let dependencies = self
            .context
            .pypi_test_dependencies(&python_dependencies, false);
        Ok(lines(&dependencies))
    }
}

/// One dependency per line, with a trailing newline.
fn lines(dependencies: &[String]) -> String {
    dependencies
        .iter()
        .map(|dependency| format!("{}\n", dependency))
        .collect()
}
