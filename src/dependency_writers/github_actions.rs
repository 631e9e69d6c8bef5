//! Writers of the GitHub Actions workflows in `.github/workflows/`.

use std::path::Path;

use anyhow::Result;

use crate::dependency_writers::{join_unique, DependencyFileWriter, WriterContext};

const TEST_DOCKER_TEMPLATE: &str = "\
# Run tests on Fedora and Ubuntu Docker images using GIFT COPR and GIFT PPA.
name: test_docker
on:
  pull_request:
    branches:
    - main
  push:
    branches:
    - main
permissions: read-all
jobs:
  test_fedora:
    runs-on: ubuntu-latest
    strategy:
      matrix:
        version: ['39']
    container:
      image: registry.fedoraproject.org/fedora:$${{ matrix.version }}
    steps:
    - uses: actions/checkout@v4
    - name: Set up container
      run: |
        dnf install -y dnf-plugins-core langpacks-en
    - name: Install dependencies
      run: |
        dnf copr -y enable @gift/dev
        dnf install -y @development-tools $rpm_dependencies
    - name: Run tests
      env:
        LANG: C.utf8
      run: |
        python3 ./run_tests.py
  test_ubuntu:
    runs-on: ubuntu-latest
    strategy:
      matrix:
        version: ['22.04']
    container:
      image: ubuntu:$${{ matrix.version }}
    steps:
    - uses: actions/checkout@v4
    - name: Set up container
      env:
        DEBIAN_FRONTEND: noninteractive
      run: |
        apt-get update -q
        apt-get install -y libterm-readline-gnu-perl locales software-properties-common
        locale-gen en_US.UTF-8
        ln -f -s /usr/share/zoneinfo/UTC /etc/localtime
    - name: Install dependencies
      run: |
        add-apt-repository -y ppa:gift/dev
        apt-get update -q
        apt-get install -y build-essential $dpkg_dependencies
    - name: Run tests
      env:
        LANG: en_US.UTF-8
      run: |
        python3 ./run_tests.py
";

const TEST_DOCS_TEMPLATE: &str = "\
# Run docs tests on Ubuntu Docker image using GIFT PPA.
name: test_docs
on:
  pull_request:
    branches:
    - main
  push:
    branches:
    - main
permissions: read-all
jobs:
  build:
    runs-on: ubuntu-latest
    strategy:
      matrix:
        include:
        - python-version: '3.12'
          toxenv: 'docs'
    container:
      image: ubuntu:22.04
    steps:
    - uses: actions/checkout@v4
    - name: Set up container
      env:
        DEBIAN_FRONTEND: noninteractive
      run: |
        apt-get update -q
        apt-get install -y libterm-readline-gnu-perl locales software-properties-common
        locale-gen en_US.UTF-8
        ln -f -s /usr/share/zoneinfo/UTC /etc/localtime
    - name: Install dependencies
      env:
        DEBIAN_FRONTEND: noninteractive
      run: |
        add-apt-repository -y universe
        add-apt-repository -y ppa:deadsnakes/ppa
        add-apt-repository -y ppa:gift/dev
        apt-get update -q
        apt-get install -y build-essential git $dpkg_dev_dependencies $dpkg_dependencies
    - name: Install tox
      run: |
        python3 -m pip install tox
    - name: Run tests
      env:
        LANG: en_US.UTF-8
      run: |
        tox -e$${{ matrix.toxenv }}
";

const TEST_TOX_TEMPLATE: &str = "\
# Run tox tests on Ubuntu Docker images using GIFT PPA.
name: test_tox
on:
  pull_request:
    branches:
    - main
  push:
    branches:
    - main
permissions: read-all
jobs:
  build:
    runs-on: ubuntu-latest
    strategy:
      matrix:
        include:
        - python-version: '3.8'
          toxenv: 'py38,wheel'
        - python-version: '3.10'
          toxenv: 'py310,wheel'
        - python-version: '3.12'
          toxenv: 'py312,wheel'
    container:
      image: ubuntu:22.04
    steps:
    - uses: actions/checkout@v4
    - name: Set up container
      env:
        DEBIAN_FRONTEND: noninteractive
      run: |
        apt-get update -q
        apt-get install -y libterm-readline-gnu-perl locales software-properties-common
        locale-gen en_US.UTF-8
        ln -f -s /usr/share/zoneinfo/UTC /etc/localtime
    - name: Install dependencies
      env:
        DEBIAN_FRONTEND: noninteractive
      run: |
        add-apt-repository -y universe
        add-apt-repository -y ppa:deadsnakes/ppa
        add-apt-repository -y ppa:gift/dev
        apt-get update -q
        apt-get install -y build-essential git $dpkg_dev_dependencies $dpkg_dependencies python$${{ matrix.python-version }} python$${{ matrix.python-version }}-dev python$${{ matrix.python-version }}-venv
    - name: Install tox
      run: |
        python3 -m pip install tox
    - name: Run tests
      env:
        LANG: en_US.UTF-8
      run: |
        tox -e$${{ matrix.toxenv }}
";

/// Writes `.github/workflows/test_docker.yml`.
#[derive(Debug)]
pub struct GitHubActionsTestDockerYmlWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> GitHubActionsTestDockerYmlWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        GitHubActionsTestDockerYmlWriter { context }
    }
}

impl DependencyFileWriter for GitHubActionsTestDockerYmlWriter<'_> {
    fn path(&self) -> &'static str {
        ".github/workflows/test_docker.yml"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let mut dpkg_dependencies = self.context.dpkg_python_dependencies();
        let test_dependencies = self.context.dpkg_test_dependencies(&dpkg_dependencies);
        dpkg_dependencies.extend(test_dependencies);
        dpkg_dependencies.extend(
            ["python3", "python3-build", "python3-dev", "python3-pip", "python3-wheel"].map(String::from),
        );

        let mut rpm_dependencies = self.context.rpm_python_dependencies();
        let test_dependencies = self.context.rpm_test_dependencies(&rpm_dependencies);
        rpm_dependencies.extend(test_dependencies);
        rpm_dependencies.extend(["python3", "python3-build", "python3-devel", "python3-wheel"].map(String::from));

        let dpkg_dependencies = join_unique(dpkg_dependencies);
        let rpm_dependencies = join_unique(rpm_dependencies);
        self.context.generate_from_template(
            "github_actions/test_docker.yml",
            TEST_DOCKER_TEMPLATE,
            &[("dpkg_dependencies", &dpkg_dependencies), ("rpm_dependencies", &rpm_dependencies)],
        )
    }
}

/// Debian packages of the dependencies, the test dependencies and pip, and
/// the development packages, for the tox based workflows.
fn tox_mappings(context: &WriterContext<'_>) -> (String, String) {
    let mut dpkg_dependencies = context.dpkg_python_dependencies();
    let test_dependencies = context.dpkg_test_dependencies(&dpkg_dependencies);
    dpkg_dependencies.extend(test_dependencies);
    dpkg_dependencies.push("python3-pip".to_string());

    (join_unique(dpkg_dependencies), join_unique(context.dpkg_dev_dependencies()))
}

/// Writes `.github/workflows/test_docs.yml`.
#[derive(Debug)]
pub struct GitHubActionsTestDocsYmlWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> GitHubActionsTestDocsYmlWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        GitHubActionsTestDocsYmlWriter { context }
    }
}

impl DependencyFileWriter for GitHubActionsTestDocsYmlWriter<'_> {
    fn path(&self) -> &'static str {
        ".github/workflows/test_docs.yml"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let (dpkg_dependencies, dpkg_dev_dependencies) = tox_mappings(&self.context);
        self.context.generate_from_template(
            "github_actions/test_docs.yml",
            TEST_DOCS_TEMPLATE,
            &[
                ("dpkg_dependencies", &dpkg_dependencies),
                ("dpkg_dev_dependencies", &dpkg_dev_dependencies),
            ],
        )
    }
}

/// Writes `.github/workflows/test_tox.yml`.
#[derive(Debug)]
pub struct GitHubActionsTestToxYmlWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> GitHubActionsTestToxYmlWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        GitHubActionsTestToxYmlWriter { context }
    }
}

impl DependencyFileWriter for GitHubActionsTestToxYmlWriter<'_> {
    fn path(&self) -> &'static str {
        ".github/workflows/test_tox.yml"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let (dpkg_dependencies, dpkg_dev_dependencies) = tox_mappings(&self.context);
        self.context.generate_from_template(
            "github_actions/test_tox.yml",
            TEST_TOX_TEMPLATE,
            &[
                ("dpkg_dependencies", &dpkg_dependencies),
                ("dpkg_dev_dependencies", &dpkg_dev_dependencies),
            ],
        )
    }
}
