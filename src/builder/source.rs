//! Builds a project in place from its extracted source.

use anyhow::Result;

use crate::builder::helper::{source_directory, BuildContext, BuildHelper};
use crate::sources::SourceHelper;
use crate::util::process::{find_python, ProcessBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFlavor {
    /// `./configure` and `make`
    ConfigureMake,
    /// `setup.py build`
    SetupPy,
}

/// Builds the extracted source without producing a package, so a build is
/// always required.
#[derive(Debug)]
pub struct SourceBuildHelper {
    context: BuildContext,
    flavor: SourceFlavor,
}

impl SourceBuildHelper {
    pub fn new(context: BuildContext, flavor: SourceFlavor) -> Self {
        SourceBuildHelper { context, flavor }
    }
}

impl BuildHelper for SourceBuildHelper {
    fn context(&self) -> &BuildContext {
        &self.context
    }

    fn build(&self, source: &mut dyn SourceHelper) -> Result<bool> {
        let Some(source_package) = source.source_package_path()? else {
            tracing::info!("Missing source package of: {}", source.project_name());
            return Ok(false);
        };
        let source_directory = source_directory(source)?;
        let log_path = self.context.log_path();

        tracing::info!("Building source of: {}", source_package.display());

        match self.flavor {
            SourceFlavor::ConfigureMake => {
                let configured = ProcessBuilder::new("./configure")
                    .cwd(&source_directory)
                    .log_to(&log_path)
                    .run();
                if !configured {
                    return Ok(false);
                }
                Ok(ProcessBuilder::new("make")
                    .cwd(&source_directory)
                    .append_to_log(&log_path)
                    .run())
            }
            SourceFlavor::SetupPy => Ok(ProcessBuilder::new(find_python())
                .args(["setup.py", "build"])
                .cwd(&source_directory)
                .log_to(&log_path)
                .run()),
        }
    }

    fn clean(&self, _source: &mut dyn SourceHelper) -> Result<()> {
        Ok(())
    }
}
