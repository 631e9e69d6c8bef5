//! Writers of the Travis-CI configuration: `.travis.yml` and
//! `config/travis/install.sh`.

use std::path::Path;

use anyhow::Result;

use crate::dependency_writers::{DependencyFileWriter, WriterContext};

const PROJECTS_WITH_DOCKERFILE: &[&str] = &["plaso"];

const PROJECTS_WITH_JENKINS_SUPPORT: &[&str] = &["dfvfs", "plaso"];

const INSTALL_SH_TEMPLATE: &str = r#"#!/bin/bash
#
# Script to set up Travis-CI test VM.
#
# This file is generated by l2tdevtools update-dependencies, any dependency
# related changes should be made in dependencies.ini.

DPKG_PYTHON3_DEPENDENCIES="$dpkg_python3_dependencies";

DPKG_PYTHON3_TEST_DEPENDENCIES="$dpkg_python3_test_dependencies";

RPM_PYTHON3_DEPENDENCIES="$rpm_python3_dependencies";

RPM_PYTHON3_TEST_DEPENDENCIES="$rpm_python3_test_dependencies";

# Exit on error.
set -e;

if test -n "$${FEDORA_VERSION}";
then
    CONTAINER_NAME="fedora$${FEDORA_VERSION}";

    docker pull registry.fedoraproject.org/fedora:$${FEDORA_VERSION};

    docker run --name=$${CONTAINER_NAME} --detach -i registry.fedoraproject.org/fedora:$${FEDORA_VERSION};

    # Install dnf-plugins-core and langpacks-en.
    docker exec $${CONTAINER_NAME} dnf install -y dnf-plugins-core langpacks-en;

    # Add additional dnf repositories.
    docker exec $${CONTAINER_NAME} dnf copr -y enable @gift/dev;

    docker exec $${CONTAINER_NAME} dnf install -y git python3 $${RPM_PYTHON3_DEPENDENCIES} $${RPM_PYTHON3_TEST_DEPENDENCIES};

    docker cp ../$project_name $${CONTAINER_NAME}:/

elif test -n "$${UBUNTU_VERSION}";
then
    CONTAINER_NAME="ubuntu$${UBUNTU_VERSION}";

    docker pull ubuntu:$${UBUNTU_VERSION};

    docker run --name=$${CONTAINER_NAME} --detach -i ubuntu:$${UBUNTU_VERSION};

    # Install add-apt-repository and locale-gen.
    docker exec -e "DEBIAN_FRONTEND=noninteractive" $${CONTAINER_NAME} sh -c "apt-get update -q && apt-get install -y locales software-properties-common";

    # Add additional apt repositories.
    docker exec -e "DEBIAN_FRONTEND=noninteractive" $${CONTAINER_NAME} add-apt-repository universe -y;
    docker exec -e "DEBIAN_FRONTEND=noninteractive" $${CONTAINER_NAME} add-apt-repository ppa:gift/dev -y;

    docker exec -e "DEBIAN_FRONTEND=noninteractive" $${CONTAINER_NAME} sh -c "apt-get update -q";

    # Set locale to US English and UTF-8.
    docker exec $${CONTAINER_NAME} locale-gen en_US.UTF-8;

    DPKG_PACKAGES="$dpkg_build_dependencies git python3 $${DPKG_PYTHON3_DEPENDENCIES} $${DPKG_PYTHON3_TEST_DEPENDENCIES}";
    docker exec -e "DEBIAN_FRONTEND=noninteractive" $${CONTAINER_NAME} sh -c "apt-get install -y $${DPKG_PACKAGES}";

    docker cp ../$project_name $${CONTAINER_NAME}:/
fi
"#;

const YML_HEADER_TEMPLATE: &str = "\
language: python
cache: pip
";

const YML_JOBS_PYLINT3_TEMPLATE: &str = r#"jobs:
  include:
  - name: "Pylint on Ubuntu Focal (20.04) (Docker) with Python 3"
    env: [TARGET="pylint", UBUNTU_VERSION="20.04"]
    group: edge
    language: python
    python: 3.8
    services:
    - docker
"#;

const YML_JOBS_LINUX_TEMPLATE: &str = r#"  - name: "Ubuntu Focal (20.04) (Docker) with Python 3.8"
    env: [UBUNTU_VERSION="20.04"]
    group: edge
    language: python
    python: 3.8
    services:
    - docker
  - name: "Fedora 33 (Docker) with Python 3"
    env: [FEDORA_VERSION="33"]
    group: edge
    language: python
    python: 3.8
    services:
    - docker
"#;

const YML_JOBS_MACOS_TEMPLATE: &str = r#"  - name: "MacOS with Python 3.9"
    env: [PYTHONPATH="/Library/Python/3.9/site-packages/"]
    os: osx
    osx_image: xcode12.2
    language: shell
"#;

const YML_JOBS_DOCKERFILE_TEMPLATE: &str = r#"  - name: "Dockerfile"
    env: [TARGET="dockerfile"]
    group: edge
    language: shell
    services:
    - docker
"#;

const YML_JOBS_JENKINS_TEMPLATE: &str = r#"  - name: "Jenkins end-to-end tests"
    env: [TARGET="jenkins3", UBUNTU_VERSION="20.04"]
    group: edge
    language: python
    python: 3.8
    services:
    - docker
"#;

const YML_FOOTER_TEMPLATE: &str = r#"install:
- ./config/travis/install.sh
script:
- ./config/travis/runtests.sh
after_success:
- if test $${TARGET} = "coverage"; then curl -o codecov.sh -s https://codecov.io/bash && /bin/bash ./codecov.sh; fi
"#;

/// Writes `config/travis/install.sh`.
#[derive(Debug)]
pub struct TravisInstallScriptWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> TravisInstallScriptWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        TravisInstallScriptWriter { context }
    }
}

impl DependencyFileWriter for TravisInstallScriptWriter<'_> {
    fn path(&self) -> &'static str {
        "config/travis/install.sh"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let dpkg_python3_dependencies = self.context.dpkg_python_dependencies();
        let dpkg_python3_test_dependencies = self.context.dpkg_test_dependencies(&dpkg_python3_dependencies);
        let rpm_python3_dependencies = self.context.rpm_python_dependencies();
        let rpm_python3_test_dependencies = self.context.rpm_test_dependencies(&rpm_python3_dependencies);

        self.context.generate_from_template(
            "travis/install.sh",
            INSTALL_SH_TEMPLATE,
            &[
                ("dpkg_build_dependencies", "build-essential"),
                ("dpkg_python3_dependencies", &dpkg_python3_dependencies.join(" ")),
                ("dpkg_python3_test_dependencies", &dpkg_python3_test_dependencies.join(" ")),
                ("project_name", &self.context.project().name),
                ("rpm_python3_dependencies", &rpm_python3_dependencies.join(" ")),
                ("rpm_python3_test_dependencies", &rpm_python3_test_dependencies.join(" ")),
            ],
        )
    }
}

/// Writes `.travis.yml`.
#[derive(Debug)]
pub struct TravisYmlWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> TravisYmlWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        TravisYmlWriter { context }
    }
}

impl DependencyFileWriter for TravisYmlWriter<'_> {
    fn path(&self) -> &'static str {
        ".travis.yml"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let project_name = self.context.project().name.as_str();

        let mut fragments = vec![
            ("header", YML_HEADER_TEMPLATE),
            ("jobs_pylint3", YML_JOBS_PYLINT3_TEMPLATE),
            ("jobs_linux", YML_JOBS_LINUX_TEMPLATE),
            ("jobs_macos", YML_JOBS_MACOS_TEMPLATE),
        ];
        if PROJECTS_WITH_DOCKERFILE.contains(&project_name) {
            fragments.push(("jobs_dockerfile", YML_JOBS_DOCKERFILE_TEMPLATE));
        }
        if PROJECTS_WITH_JENKINS_SUPPORT.contains(&project_name) {
            fragments.push(("jobs_jenkins", YML_JOBS_JENKINS_TEMPLATE));
        }
        fragments.push(("footer", YML_FOOTER_TEMPLATE));

        let mut content = String::new();
        for (name, template) in fragments {
            content.push_str(&self.context.generate_from_template(
                &format!(".travis.yml/{}", name),
                template,
                &[],
            )?);
        }
        Ok(content)
    }
}
