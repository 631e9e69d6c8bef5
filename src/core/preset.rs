//! Named sets of projects read from `presets.ini`.

use std::path::Path;

use anyhow::Result;

use crate::util::ini::Ini;

/// A named list of projects built together.
///
/// A preset can include the projects of other presets through `presets`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetDefinition {
    pub name: String,
    pub preset_names: Vec<String>,
    pub project_names: Vec<String>,
}

/// Reads preset definitions, one per INI section.
#[derive(Debug, Default)]
pub struct PresetDefinitionReader;

impl PresetDefinitionReader {
    pub fn read(&self, ini: &Ini) -> Vec<PresetDefinition> {
        ini.sections()
            .iter()
            .filter(|section| !section.name().is_empty())
            .map(|section| PresetDefinition {
                name: section.name().to_string(),
                preset_names: section.get_list("presets"),
                project_names: section.get_list("projects"),
            })
            .collect()
    }

    pub fn read_file(&self, path: &Path) -> Result<Vec<PresetDefinition>> {
        Ok(self.read(&Ini::load(path)?))
    }
}

/// Project names of a preset, including those of the presets it names.
///
/// Returns `None` if the preset is not defined. Only one level of nesting
/// is followed.
pub fn preset_project_names(presets: &[PresetDefinition], name: &str) -> Option<Vec<String>> {
    let find = |name: &str| presets.iter().find(|preset| preset.name == name);
    let preset = find(name)?;

    let mut project_names = preset.project_names.clone();
    for sub_preset_name in &preset.preset_names {
        let Some(sub_preset) = find(sub_preset_name) else {
            tracing::warn!("Undefined preset: {} in: {}", sub_preset_name, name);
            continue;
        };
        if !sub_preset.preset_names.is_empty() {
            tracing::warn!(
                "Multiple levels of presets not supported: {} -> {} -> {}",
                name,
                sub_preset_name,
                sub_preset.preset_names.join(", ")
            );
        }
        project_names.extend(sub_preset.project_names.iter().cloned());
    }

    Some(project_names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::PRESETS_INI;

    #[test]
    fn test_read_presets() {
        let presets = PresetDefinitionReader.read(&Ini::parse(PRESETS_INI).unwrap());

        assert_eq!(presets.len(), 3);
        assert_eq!(presets[0].name, "dfvfs");
        assert_eq!(presets[0].project_names, vec!["dfvfs", "libyal", "zlib"]);
        assert_eq!(presets[1].name, "empty");
        assert!(presets[1].project_names.is_empty());
        assert_eq!(presets[2].preset_names, vec!["dfvfs"]);
    }

    #[test]
    fn test_preset_project_names() {
        let presets = PresetDefinitionReader.read(&Ini::parse(PRESETS_INI).unwrap());

        assert_eq!(
            preset_project_names(&presets, "plaso").unwrap(),
            vec!["plaso", "dfvfs", "libyal", "zlib"]
        );
        assert_eq!(preset_project_names(&presets, "empty"), Some(Vec::new()));
        assert!(preset_project_names(&presets, "missing").is_none());
    }
}
