//! Python wheel packages.

use anyhow::Result;

use crate::builder::helper::{remove_unless, source_directory, BuildContext, BuildError, BuildHelper};
use crate::core::BuildSystem;
use crate::sources::SourceHelper;
use crate::util::fs::{glob_paths, move_file};
use crate::util::process::{find_python, ProcessBuilder};

/// Build dependencies that are not Python packages and therefore not
/// needed to build a wheel.
const NON_PYTHON_DEPENDENCIES: &[&str] = &["fuse", "libcrypto", "zlib"];

/// Frontend used to build the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelFlavor {
    /// configure/make projects with Python bindings, which need a setup.py
    ConfigureMake,
    SetupPy,
    Flit,
    Poetry,
}

impl WheelFlavor {
    pub fn for_build_system(build_system: &BuildSystem) -> Option<Self> {
        match build_system {
            BuildSystem::ConfigureMake => Some(WheelFlavor::ConfigureMake),
            BuildSystem::SetupPy | BuildSystem::Pyproject | BuildSystem::Setuptools => {
                Some(WheelFlavor::SetupPy)
            }
            BuildSystem::Flit => Some(WheelFlavor::Flit),
            BuildSystem::Poetry => Some(WheelFlavor::Poetry),
            BuildSystem::Unrecognized(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct WheelBuildHelper {
    context: BuildContext,
    flavor: WheelFlavor,
}

impl WheelBuildHelper {
    pub fn new(context: BuildContext, flavor: WheelFlavor) -> Self {
        WheelBuildHelper { context, flavor }
    }

    /// Project name as used in the wheel file name.
    fn wheel_name(&self, source: &dyn SourceHelper) -> String {
        let definition = &self.context.definition;
        definition
            .wheel_name
            .as_deref()
            .or(definition.setup_name.as_deref())
            .unwrap_or(source.project_name())
            .to_string()
    }

    fn build_command(&self) -> ProcessBuilder {
        let python = ProcessBuilder::new(find_python());
        match self.flavor {
            WheelFlavor::ConfigureMake | WheelFlavor::SetupPy => {
                python.args(["setup.py", "bdist_wheel"])
            }
            WheelFlavor::Flit => python.args(["-m", "flit", "build", "--format", "wheel"]),
            WheelFlavor::Poetry => python.args(["-m", "poetry", "build", "--format", "wheel"]),
        }
    }

    /// Move the single wheel built into `dist` to the build directory.
    fn move_wheel(&self, source: &dyn SourceHelper) -> Result<bool> {
        let source_directory = source_directory(source)?;
        let pattern = format!(
            "dist/{}-*-*-*.whl",
            glob::Pattern::escape(&self.wheel_name(source))
        );

        let paths = glob_paths(&source_directory, &pattern)?;
        let [path] = paths.as_slice() else {
            tracing::error!(
                "Unable to find wheel file: {}.",
                source_directory.join(&pattern).display()
            );
            return Ok(false);
        };

        let Some(file_name) = path.file_name() else {
            return Ok(false);
        };
        let destination = self.context.build_directory.join(file_name);
        if destination.exists() {
            tracing::warn!("Wheel file already exists.");
        } else {
            tracing::info!("Moving: {}", path.display());
            move_file(path, &destination)?;
        }
        Ok(true)
    }
}

impl BuildHelper for WheelBuildHelper {
    fn context(&self) -> &BuildContext {
        &self.context
    }

    fn check_build_dependencies(&self) -> Vec<String> {
        self.context
            .definition
            .build_dependencies
            .iter()
            .filter(|name| !NON_PYTHON_DEPENDENCIES.contains(&name.as_str()))
            .cloned()
            .collect()
    }

    fn check_build_required(&self, source: &mut dyn SourceHelper) -> bool {
        let Some(version) = source.project_version() else {
            return true;
        };
        let pattern = format!(
            "{}-{}-*-*-*.whl",
            glob::Pattern::escape(&self.wheel_name(source)),
            glob::Pattern::escape(&version)
        );
        glob_paths(&self.context.build_directory, &pattern)
            .map(|paths| paths.is_empty())
            .unwrap_or(true)
    }

    fn build(&self, source: &mut dyn SourceHelper) -> Result<bool> {
        let Some(source_package) = source.source_package_path()? else {
            tracing::info!("Missing source package of: {}", source.project_name());
            return Ok(false);
        };
        let source_directory = source_directory(source)?;

        tracing::info!(
            "Building wheel of: {}",
            source_package
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default()
        );

        if self.flavor == WheelFlavor::ConfigureMake && !source_directory.join("setup.py").exists() {
            return Err(BuildError::MissingSetupPy.into());
        }

        let built = self
            .build_command()
            .cwd(&source_directory)
            .log_to(self.context.log_path())
            .run();
        if !built {
            return Ok(false);
        }
        self.move_wheel(source)
    }

    fn clean(&self, source: &mut dyn SourceHelper) -> Result<()> {
        let Some(version) = source.project_version() else {
            return Ok(());
        };
        let name = self.wheel_name(source);

        remove_unless(
            &self.context.build_directory,
            &[format!("{}-*-*-*.whl", glob::Pattern::escape(&name))],
            &format!(
                "{}-{}-.*-.*-.*.whl",
                regex::escape(&name),
                regex::escape(&version)
            ),
        )
    }
}
