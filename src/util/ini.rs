//! INI file reader for project, dependency and preset definitions.
//!
//! The dialect matches the one the definition files are written in:
//! - `[section]` headers, kept in file order
//! - `key = value` or `key: value` pairs, keys are lowercased
//! - full line comments starting with `#` or `;`
//! - indented continuation lines extend the previous value with `\n`
//! - no interpolation

use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

/// Error while parsing INI data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IniError {
    #[error("line {line}: value outside of a section")]
    MissingSectionHeader { line: usize },

    #[error("line {line}: duplicate section `{name}`")]
    DuplicateSection { name: String, line: usize },

    #[error("line {line}: duplicate option `{key}` in section `{section}`")]
    DuplicateOption {
        section: String,
        key: String,
        line: usize,
    },

    #[error("line {line}: unable to parse `{content}`")]
    Parse { line: usize, content: String },

    #[error("section `{section}`: invalid boolean `{value}` for `{key}`")]
    InvalidBoolean {
        section: String,
        key: String,
        value: String,
    },
}

/// A single `[section]` with its values in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    name: String,
    values: Vec<(String, String)>,
}

impl Section {
    /// Section name as written in the header.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a value by (case-insensitive) key.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get a value as an owned string, treating empty values as missing.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Get a comma separated value as a list.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key).map(split_list).unwrap_or_default()
    }

    /// Get a boolean value, `None` if the key is absent.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, IniError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };

        match value.to_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Ok(Some(true)),
            "0" | "no" | "false" | "off" => Ok(Some(false)),
            _ => Err(IniError::InvalidBoolean {
                section: self.name.clone(),
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Iterate over key/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn contains_key(&self, key: &str) -> bool {
        self.values.iter().any(|(k, _)| k == key)
    }
}

/// Parsed INI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ini {
    sections: Vec<Section>,
}

impl Ini {
    /// Parse INI data from a string.
    pub fn parse(content: &str) -> Result<Self, IniError> {
        let mut ini = Ini::default();
        // Blank lines seen inside a value that may still be continued.
        let mut pending_blank_lines = 0usize;
        let mut in_value = false;

        for (index, raw_line) in content.lines().enumerate() {
            let line_number = index + 1;
            let trimmed = raw_line.trim();

            if trimmed.is_empty() {
                if in_value {
                    pending_blank_lines += 1;
                }
                continue;
            }

            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let is_continuation = raw_line.starts_with(|c: char| c.is_whitespace());

            if is_continuation && in_value {
                let section = ini
                    .sections
                    .last_mut()
                    .ok_or(IniError::MissingSectionHeader { line: line_number })?;
                if let Some((_, value)) = section.values.last_mut() {
                    for _ in 0..pending_blank_lines {
                        value.push('\n');
                    }
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(trimmed);
                }
                pending_blank_lines = 0;
                continue;
            }

            pending_blank_lines = 0;

            if let Some(header) = trimmed.strip_prefix('[') {
                let Some(name) = header.strip_suffix(']') else {
                    return Err(IniError::Parse {
                        line: line_number,
                        content: raw_line.to_string(),
                    });
                };
                let name = name.trim().to_string();
                if ini.section(&name).is_some() {
                    return Err(IniError::DuplicateSection {
                        name,
                        line: line_number,
                    });
                }
                ini.sections.push(Section {
                    name,
                    values: Vec::new(),
                });
                in_value = false;
                continue;
            }

            let Some(position) = trimmed.find(['=', ':']) else {
                return Err(IniError::Parse {
                    line: line_number,
                    content: raw_line.to_string(),
                });
            };

            let key = trimmed[..position].trim().to_lowercase();
            let value = trimmed[position + 1..].trim().to_string();

            if key.is_empty() {
                return Err(IniError::Parse {
                    line: line_number,
                    content: raw_line.to_string(),
                });
            }

            let section = ini
                .sections
                .last_mut()
                .ok_or(IniError::MissingSectionHeader { line: line_number })?;

            if section.contains_key(&key) {
                return Err(IniError::DuplicateOption {
                    section: section.name.clone(),
                    key,
                    line: line_number,
                });
            }

            section.values.push((key, value));
            in_value = true;
        }

        Ok(ini)
    }

    /// Load and parse an INI file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read file: {}", path.display()))?;

        Ini::parse(&content).with_context(|| format!("failed to parse: {}", path.display()))
    }

    /// Sections in file order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// Split a comma separated value, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections_in_order() {
        let ini = Ini::parse(
            "[zlib]\n\
             download_url: http://www.zlib.net\n\
             \n\
             [dfvfs]\n\
             build_system = setup_py\n",
        )
        .unwrap();

        let names: Vec<_> = ini.sections().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["zlib", "dfvfs"]);
        assert_eq!(
            ini.section("zlib").unwrap().get("download_url"),
            Some("http://www.zlib.net")
        );
        assert_eq!(
            ini.section("dfvfs").unwrap().get("BUILD_SYSTEM"),
            Some("setup_py")
        );
    }

    #[test]
    fn test_continuation_lines() {
        let ini = Ini::parse(
            "[plaso]\n\
             description_long: Plaso is a tool\n    \
             that extracts timestamps.\n\n    \
             Second paragraph.\n\
             maintainer: someone\n",
        )
        .unwrap();

        let section = ini.section("plaso").unwrap();
        assert_eq!(
            section.get("description_long"),
            Some("Plaso is a tool\nthat extracts timestamps.\n\nSecond paragraph.")
        );
        assert_eq!(section.get("maintainer"), Some("someone"));
    }

    #[test]
    fn test_comments_are_ignored() {
        let ini = Ini::parse("# header\n[a]\n; note\nkey = value\n").unwrap();
        assert_eq!(ini.section("a").unwrap().get("key"), Some("value"));
    }

    #[test]
    fn test_missing_section_header() {
        let err = Ini::parse("key = value\n").unwrap_err();
        assert_eq!(err, IniError::MissingSectionHeader { line: 1 });
    }

    #[test]
    fn test_duplicate_section() {
        let err = Ini::parse("[a]\n[a]\n").unwrap_err();
        assert!(matches!(err, IniError::DuplicateSection { .. }));
    }

    #[test]
    fn test_duplicate_option() {
        let err = Ini::parse("[a]\nkey = 1\nKEY = 2\n").unwrap_err();
        assert!(matches!(err, IniError::DuplicateOption { .. }));
    }

    #[test]
    fn test_get_list_and_bool() {
        let ini = Ini::parse("[a]\ndeps = zlib, bzip2,,fuse\nflag = Yes\nbad = maybe\n").unwrap();
        let section = ini.section("a").unwrap();

        assert_eq!(section.get_list("deps"), vec!["zlib", "bzip2", "fuse"]);
        assert!(section.get_list("missing").is_empty());
        assert_eq!(section.get_bool("flag").unwrap(), Some(true));
        assert_eq!(section.get_bool("missing").unwrap(), None);
        assert!(section.get_bool("bad").is_err());
    }
}
