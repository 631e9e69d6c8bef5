//! Writers of the Sphinx documentation build files in `docs/`.

use std::path::Path;

use anyhow::Result;

use crate::dependency_writers::{DependencyFileWriter, WriterContext};

const CONF_PY_TEMPLATE: &str = r#"# -*- coding: utf-8 -*-
"""Sphinx build configuration file."""

import os
import sys

from sphinx.ext import apidoc

from docutils import nodes
from docutils import transforms

# Change PYTHONPATH to include $python_module_name module and dependencies.
sys.path.insert(0, os.path.abspath('..'))

import $python_module_name  # pylint: disable=wrong-import-position

import utils.dependencies  # pylint: disable=wrong-import-position


# -- General configuration ------------------------------------------------

# Sphinx extensions.
extensions = [
    'myst_parser',
    'sphinx.ext.autodoc',
    'sphinx.ext.coverage',
    'sphinx.ext.doctest',
    'sphinx.ext.napoleon',
    'sphinx.ext.viewcode',
    'sphinx_markdown_tables',
    'sphinx_rtd_theme',
]

# We cannot install architecture dependent Python modules on readthedocs,
# therefore we mock most imports.
pip_installed_modules = set(['six'])

dependency_helper = utils.dependencies.DependencyHelper(
    dependencies_file=os.path.join('..', 'dependencies.ini'),
    test_dependencies_file=os.path.join('..', 'test_dependencies.ini'))
modules_to_mock = set(dependency_helper.dependencies.keys())
modules_to_mock = modules_to_mock.difference(pip_installed_modules)

autodoc_mock_imports = sorted(modules_to_mock)

# General information about the project.
project = '$name_description'
copyright = 'The $name_description authors'
version = $python_module_name.__version__
release = $python_module_name.__version__

# Output file base name for HTML help builder.
htmlhelp_basename = '${htmlhelp_basename}doc'

# The suffix(es) of source filenames.
source_suffix = ['.rst', '.md']

# The master toctree document.
master_doc = 'index'

# The theme to use for HTML and HTML Help pages.
html_theme = 'sphinx_rtd_theme'


def RunSphinxAPIDoc(_):
  """Runs sphinx-apidoc to auto-generate documentation."""
  current_directory = os.path.abspath(os.path.dirname(__file__))
  module_path = os.path.join(current_directory, '..', '$python_module_name')
  api_directory = os.path.join(current_directory, 'sources', 'api')
  apidoc.main(['-o', api_directory, module_path, '--force'])


def setup(app):
  """Called at Sphinx initialization."""
  # Triggers sphinx-apidoc to generate API documentation.
  app.connect('builder-inited', RunSphinxAPIDoc)
"#;

const REQUIREMENTS_TXT_TEMPLATE: &str = "\
certifi >= 2023.11.17
docutils
Markdown
recommonmark
sphinx >= 4.1.0
sphinx-markdown-tables
sphinx-rtd-theme >= 0.5.1
";

/// Writes `docs/conf.py`.
#[derive(Debug)]
pub struct SphinxBuildConfigurationWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> SphinxBuildConfigurationWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        SphinxBuildConfigurationWriter { context }
    }
}

impl DependencyFileWriter for SphinxBuildConfigurationWriter<'_> {
    fn path(&self) -> &'static str {
        "docs/conf.py"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        let project = self.context.project();
        let htmlhelp_basename = project.name.replace('-', "");
        let python_module_name = project.python_module_name();

        self.context.generate_from_template(
            "docs/conf.py",
            CONF_PY_TEMPLATE,
            &[
                ("htmlhelp_basename", &htmlhelp_basename),
                ("name_description", &project.name_description),
                ("project_name", &project.name),
                ("python_module_name", &python_module_name),
            ],
        )
    }
}

/// Writes `docs/requirements.txt`.
#[derive(Debug)]
pub struct SphinxBuildRequirementsWriter<'a> {
    context: WriterContext<'a>,
}

impl<'a> SphinxBuildRequirementsWriter<'a> {
    pub fn new(context: WriterContext<'a>) -> Self {
        SphinxBuildRequirementsWriter { context }
    }
}

impl DependencyFileWriter for SphinxBuildRequirementsWriter<'_> {
    fn path(&self) -> &'static str {
        "docs/requirements.txt"
    }

    fn generate(&self, _project_path: &Path) -> Result<String> {
        self.context
            .generate_from_template("docs/requirements.txt", REQUIREMENTS_TXT_TEMPLATE, &[])
    }
}
