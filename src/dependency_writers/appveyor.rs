//! Writer of `appveyor.yml`.

use std::path::Path;

use anyhow::Result;

use crate::dependency_writers::{DependencyFileWriter, WriterContext};

/// Projects that are tested on AppVeyor but not built or published.
const PROJECTS_WITHOUT_BUILD: &[&str] = &[
    "dtformats",
    "esedbrc",
    "olecfrc",
    "vstools",
    "winevtrc",
    "winregrc",
];

const ENVIRONMENT_TEMPLATE: &str = "environment:\n";

const PYPI_TOKEN_TEMPLATE: &str = "\
  PYPI_TOKEN:
    secure: $pypi_token
";

const MATRIX_TEMPLATE: &str = r#"  matrix:
  - DESCRIPTION: "Windows with 32-bit Python 3.12"
    MACHINE_TYPE: "x86"
    APPVEYOR_BUILD_WORKER_IMAGE: Visual Studio 2022
    PYTHON: "C:\\Python312"
    PYTHON_VERSION: "3.12"
    L2TBINARIES_TRACK: "dev"
    TARGET: tests
  - DESCRIPTION: "Windows with 64-bit Python 3.12"
    MACHINE_TYPE: "amd64"
    APPVEYOR_BUILD_WORKER_IMAGE: Visual Studio 2022
    PYTHON: "C:\\Python312-x64"
    PYTHON_VERSION: "3.12"
    L2TBINARIES_TRACK: "dev"
    TARGET: tests
"#;

const INSTALL_TEMPLATE: &str = r#"
install:
- cmd: "%PYTHON%\\python.exe -m pip install -U build pip setuptools twine wheel"
"#;

const INSTALL_L2TDEVTOOLS_TEMPLATE: &str = r#"- cmd: git clone https://github.com/log2timeline/l2tdevtools.git ..\l2tdevtools
- cmd: if [%TARGET%]==[tests] (
    mkdir dependencies &&
    set PYTHONPATH=..\l2tdevtools &&
    "%PYTHON%\python.exe" ..\l2tdevtools\tools\update.py --download-directory dependencies --machine-type %MACHINE_TYPE% --track %L2TBINARIES_TRACK% %L2TBINARIES_DEPENDENCIES% %L2TBINARIES_TEST_DEPENDENCIES% )
"#;

const BUILD_TEMPLATE: &str = r#"
build_script:
- cmd: "%PYTHON%\\python.exe -m build"
"#;

const BUILD_OFF_TEMPLATE: &str = "\nbuild: off\n";

const TEST_SCRIPT_TEMPLATE: &str = r#"
test_script:
- cmd: "%PYTHON%\\python.exe run_tests.py"
"#;

const ARTIFACTS_TEMPLATE: &str = r#"
artifacts:
- path: dist\*.whl
"#;

const DEPLOY_SCRIPT_TEMPLATE: &str = r#"
deploy_script:
- ps: If ($$env:APPVEYOR_REPO_TAG -eq "true" -And $$isWindows -And $$env:MACHINE_TYPE -eq "x86") {
    Invoke-Expression "$${env:PYTHON}\python.exe -m twine upload dist/*.whl --username __token__ --password $${env:PYPI_TOKEN} --skip-existing" }
"#;

/// Writes `appveyor.yml`.
#[derive(Debug)]
pub struct AppveyorYmlWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> AppveyorYmlWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        AppveyorYmlWriter { context }
    }
}

impl DependencyFileWriter for AppveyorYmlWriter<'_> {
    fn path(&self) -> &'static str {
        "appveyor.yml"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let project = self.context.project();
        let has_build = !PROJECTS_WITHOUT_BUILD.contains(&project.name.as_str());
        let mappings = [("pypi_token", project.pypi_token.as_deref().unwrap_or_default())];

        let mut fragments = vec![("environment", ENVIRONMENT_TEMPLATE)];
        if has_build {
            fragments.push(("pypi_token", PYPI_TOKEN_TEMPLATE));
        }
        fragments.push(("matrix", MATRIX_TEMPLATE));
        fragments.push(("install", INSTALL_TEMPLATE));
        if project.name != "l2tdevtools" {
            fragments.push(("install_l2tdevtools", INSTALL_L2TDEVTOOLS_TEMPLATE));
        }
        if has_build {
            fragments.push(("build", BUILD_TEMPLATE));
        } else {
            fragments.push(("build_off", BUILD_OFF_TEMPLATE));
        }
        fragments.push(("test_script", TEST_SCRIPT_TEMPLATE));
        if has_build {
            fragments.push(("artifacts", ARTIFACTS_TEMPLATE));
            fragments.push(("deploy_script", DEPLOY_SCRIPT_TEMPLATE));
        }

        let mut content = String::new();
        for (name, template) in fragments {
            content.push_str(&self.context.generate_from_template(
                &format!("appveyor.yml/{}", name),
                template,
                &mappings,
            )?);
        }
        Ok(content)
    }
}
