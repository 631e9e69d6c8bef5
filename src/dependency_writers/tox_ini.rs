//! Writer of `tox.ini`.

use std::path::Path;

use anyhow::Result;

use crate::dependency_writers::{has_yaml_files, DependencyFileWriter, WriterContext};

const HEADER_TEMPLATE: &str = r#"[tox]
envlist = $envlist

[testenv]
allowlist_externals = ./run_tests.py
pip_pre = True
passenv =
  CFLAGS
  CPPFLAGS
  LDFLAGS
setenv =
  PYTHONPATH = {toxinidir}
deps =
  -rrequirements.txt
  -rtest_requirements.txt
  coverage: coverage
commands =
  py3{6,7,8,9,10}: ./run_tests.py
  coverage: coverage erase
  coverage: coverage run --source=$python_module_name --omit="*_test*,*__init__*,*test_lib*" run_tests.py
  coverage: coverage xml
"#;

const TESTENV_DOCS_TEMPLATE: &str = "
[testenv:docs]
usedevelop = True
deps =
  -rdocs/requirements.txt
commands =
  sphinx-build -b html -d build/doctrees docs dist/docs
  sphinx-build -b linkcheck docs dist/docs
";

const TESTENV_LINT_TEMPLATE: &str = "
[testenv:lint]
skipsdist = True
deps =
  -rrequirements.txt
  -rtest_requirements.txt
  pylint >= 2.17.0, < 2.18.0
commands =
  pylint --version
  pylint --rcfile=.pylintrc $paths_to_lint_python
";

const TESTENV_LINT_WITH_YAML_TEMPLATE: &str = "
[testenv:lint]
skipsdist = True
deps =
  -rrequirements.txt
  -rtest_requirements.txt
  pylint >= 2.17.0, < 2.18.0
  yamllint >= 1.26.0
commands =
  pylint --version
  yamllint -v
  pylint --rcfile=.pylintrc $paths_to_lint_python
  yamllint -c .yamllint.yaml $paths_to_lint_yaml
";

/// Writes `tox.ini` with test, coverage, docs and lint environments.
#[derive(Debug)]
pub struct ToxIniWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> ToxIniWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        ToxIniWriter { context }
    }
}

impl DependencyFileWriter for ToxIniWriter<'_> {
    fn path(&self) -> &'static str {
        "tox.ini"
    }

    fn generate(&self, project_path: &Path) -> Result<String> {
        let project = self.context.project();
        let python_module_name = project.python_module_name();

        let mut paths_to_lint_python = Vec::new();
        let mut paths_to_lint_yaml = Vec::new();

        if project_path.join(&python_module_name).is_dir() {
            paths_to_lint_python.push(python_module_name.clone());
        }
        for directory in ["scripts", "tests", "tools"] {
            if project_path.join(directory).is_dir() {
                paths_to_lint_python.push(directory.to_string());
            }
        }
        for directory in [python_module_name.as_str(), "data", "test_data", "tests"] {
            if has_yaml_files(&project_path.join(directory))? {
                paths_to_lint_yaml.push(directory.to_string());
            }
        }
        paths_to_lint_python.sort();
        paths_to_lint_yaml.sort();

        let has_docs = project_path.join("docs").is_dir();
        let envlist = if has_docs {
            "py3{6,7,8,9,10},coverage,docs,lint"
        } else {
            "py3{6,7,8,9,10},coverage,lint"
        };

        let paths_to_lint_python = paths_to_lint_python.join(" ");
        let paths_to_lint_yaml_joined = paths_to_lint_yaml.join(" ");
        let mappings = [
            ("envlist", envlist),
            ("paths_to_lint_python", paths_to_lint_python.as_str()),
            ("paths_to_lint_yaml", paths_to_lint_yaml_joined.as_str()),
            ("project_name", project.name.as_str()),
            ("python_module_name", python_module_name.as_str()),
        ];

        let mut content = self
            .context
            .generate_from_template("tox.ini/header", HEADER_TEMPLATE, &mappings)?;
        if has_docs {
            content.push_str(&self.context.generate_from_template(
                "tox.ini/testenv_docs",
                TESTENV_DOCS_TEMPLATE,
                &mappings,
            )?);
        }
        let lint = if paths_to_lint_yaml.is_empty() {
            self.context
                .generate_from_template("tox.ini/testenv_lint", TESTENV_LINT_TEMPLATE, &mappings)?
        } else {
            self.context.generate_from_template(
                "tox.ini/testenv_lint-with_yaml",
                TESTENV_LINT_WITH_YAML_TEMPLATE,
                &mappings,
            )?
        };
        content.push_str(&lint);

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency_writers::tests::{helper, project};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_tox_ini_writer() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("dfvfs")).unwrap();
        fs::create_dir(tmp.path().join("tests")).unwrap();
        let helper = helper();
        let project = project("dfvfs");

        let writer = ToxIniWriter::new(WriterContext::new(tmp.path().join("data"), &project, &helper));
        let content = writer.generate(tmp.path()).unwrap();

        assert!(content.starts_with("[tox]\nenvlist = py3{6,7,8,9,10},coverage,lint\n"));
        assert!(content.contains("coverage run --source=dfvfs --omit="));
        assert!(content.contains("  PYTHONPATH = {toxinidir}\n"));
        assert!(!content.contains("[testenv:docs]"));
        assert!(content.ends_with("  pylint --rcfile=.pylintrc dfvfs tests\n"));
    }

    #[test]
    fn test_tox_ini_writer_with_docs_and_yaml() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("docs")).unwrap();
        fs::create_dir_all(tmp.path().join("winregrc")).unwrap();
        fs::create_dir_all(tmp.path().join("data").join("nested")).unwrap();
        fs::write(tmp.path().join("data").join("nested").join("keys.yaml"), "").unwrap();
        fs::create_dir(tmp.path().join("scripts")).unwrap();
        let helper = helper();
        let project = project("winreg-kb");

        let writer = ToxIniWriter::new(WriterContext::new(tmp.path().join("data"), &project, &helper));
        writer.write(tmp.path()).unwrap();

        let content = fs::read_to_string(tmp.path().join("tox.ini")).unwrap();
        assert!(content.starts_with("[tox]\nenvlist = py3{6,7,8,9,10},coverage,docs,lint\n"));
        assert!(content.contains("\n[testenv:docs]\n"));
        assert!(content.contains("  pylint --rcfile=.pylintrc scripts winregrc\n"));
        assert!(content.ends_with("  yamllint -c .yamllint.yaml data\n"));
    }
}
