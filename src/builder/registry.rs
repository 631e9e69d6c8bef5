//! Lookup of the build helper for a build system and build target.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Result};

use crate::builder::dpkg::{DpkgBuildHelper, DpkgFlavor, DpkgPackageKind};
use crate::builder::helper::{BuildContext, BuildHelper};
use crate::builder::msi::{MsiBuildHelper, MsiFlavor};
use crate::builder::osc::{OscBuildHelper, OscFlavor};
use crate::builder::pkg::{PkgBuildHelper, PkgFlavor};
use crate::builder::rpm::{RpmBuildHelper, RpmFlavor, RpmPackageKind};
use crate::builder::source::{SourceBuildHelper, SourceFlavor};
use crate::builder::wheel::{WheelBuildHelper, WheelFlavor};
use crate::core::BuildSystem;

/// Packaging format to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildTarget {
    Dpkg,
    DpkgSource,
    Msi,
    Osc,
    Pkg,
    Rpm,
    Source,
    Srpm,
    Wheel,
}

impl BuildTarget {
    pub const ALL: [BuildTarget; 9] = [
        BuildTarget::Dpkg,
        BuildTarget::DpkgSource,
        BuildTarget::Msi,
        BuildTarget::Osc,
        BuildTarget::Pkg,
        BuildTarget::Rpm,
        BuildTarget::Source,
        BuildTarget::Srpm,
        BuildTarget::Wheel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTarget::Dpkg => "dpkg",
            BuildTarget::DpkgSource => "dpkg-source",
            BuildTarget::Msi => "msi",
            BuildTarget::Osc => "osc",
            BuildTarget::Pkg => "pkg",
            BuildTarget::Rpm => "rpm",
            BuildTarget::Source => "source",
            BuildTarget::Srpm => "srpm",
            BuildTarget::Wheel => "wheel",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match BuildTarget::ALL.iter().find(|target| target.as_str() == s) {
            Some(target) => Ok(*target),
            None => bail!("unsupported build target: {}", s),
        }
    }
}

/// Create the build helper of a build system and target.
///
/// Returns `Ok(None)` when the combination is not supported. Fails only
/// when the helper cannot be set up on this host, such as an msi build of
/// a configure/make project without Visual Studio.
pub fn new_build_helper(
    context: BuildContext,
    build_system: &BuildSystem,
    target: BuildTarget,
) -> Result<Option<Box<dyn BuildHelper>>> {
    use BuildSystem as S;
    use BuildTarget as T;

    let helper: Box<dyn BuildHelper> = match (build_system, target) {
        (S::Unrecognized(_), _) => return Ok(None),

        (S::ConfigureMake | S::SetupPy | S::Pyproject | S::Poetry, T::Dpkg | T::DpkgSource) => {
            let Some(flavor) = DpkgFlavor::for_build_system(build_system) else {
                return Ok(None);
            };
            let kind = if target == T::Dpkg {
                DpkgPackageKind::Binary
            } else {
                DpkgPackageKind::Source
            };
            Box::new(DpkgBuildHelper::new(context, flavor, kind))
        }

        (_, T::Rpm | T::Srpm) => {
            let Some(flavor) = RpmFlavor::for_build_system(build_system) else {
                return Ok(None);
            };
            let kind = if target == T::Rpm {
                RpmPackageKind::Binary
            } else {
                RpmPackageKind::Source
            };
            Box::new(RpmBuildHelper::new(context, flavor, kind))
        }

        (_, T::Wheel) => {
            let Some(flavor) = WheelFlavor::for_build_system(build_system) else {
                return Ok(None);
            };
            Box::new(WheelBuildHelper::new(context, flavor))
        }

        (S::ConfigureMake, T::Msi) => Box::new(MsiBuildHelper::configure_make(context)?),
        (S::SetupPy, T::Msi) => Box::new(MsiBuildHelper::new(context, MsiFlavor::SetupPy)),

        (S::ConfigureMake, T::Osc) => Box::new(OscBuildHelper::new(context, OscFlavor::ConfigureMake)),
        (S::SetupPy, T::Osc) => Box::new(OscBuildHelper::new(context, OscFlavor::SetupPy)),

        (S::ConfigureMake, T::Pkg) => Box::new(PkgBuildHelper::new(context, PkgFlavor::ConfigureMake)),
        (S::SetupPy, T::Pkg) => Box::new(PkgBuildHelper::new(context, PkgFlavor::SetupPy)),

        (S::ConfigureMake, T::Source) => {
            Box::new(SourceBuildHelper::new(context, SourceFlavor::ConfigureMake))
        }
        (S::SetupPy, T::Source) => Box::new(SourceBuildHelper::new(context, SourceFlavor::SetupPy)),

        _ => return Ok(None),
    };
    Ok(Some(helper))
}

/// Build system of an extracted source directory without a configured one.
pub fn detect_build_system(source_directory: &Path) -> Option<BuildSystem> {
    if source_directory.join("configure").exists() {
        Some(BuildSystem::ConfigureMake)
    } else if source_directory.join("setup.py").exists() {
        Some(BuildSystem::SetupPy)
    } else {
        None
    }
}
