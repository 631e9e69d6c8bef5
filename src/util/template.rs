//! Text template substitution.
//!
//! Two slot syntaxes are used by the packaging templates:
//! - [`format_slots`]: `{name}` slots, with `{{` and `}}` as literal braces.
//!   Used by the debian and RPM spec templates.
//! - [`substitute`]: `$name` and `${name}` slots, with `$$` as a literal
//!   dollar. Used by the dependency file writers.

use thiserror::Error;

/// Error while filling in a template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("missing template value: `{0}`")]
    MissingKey(String),

    #[error("invalid placeholder at offset {0}")]
    InvalidPlaceholder(usize),
}

fn lookup<'a>(values: &'a [(&str, &str)], key: &str) -> Result<&'a str, TemplateError> {
    values
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .ok_or_else(|| TemplateError::MissingKey(key.to_string()))
}

/// Fill in `{name}` slots.
pub fn format_slots(template: &str, values: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    output.push('{');
                    continue;
                }

                let mut key = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    key.push(c);
                }
                if !closed || key.is_empty() {
                    return Err(TemplateError::InvalidPlaceholder(offset));
                }
                output.push_str(lookup(values, &key)?);
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    output.push('}');
                } else {
                    return Err(TemplateError::InvalidPlaceholder(offset));
                }
            }
            _ => output.push(c),
        }
    }

    Ok(output)
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Fill in `$name` and `${name}` slots.
pub fn substitute(template: &str, values: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c != '$' {
            output.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some((_, '$')) => {
                chars.next();
                output.push('$');
            }
            Some((_, '{')) => {
                chars.next();
                let mut key = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    key.push(c);
                }
                if !closed || key.is_empty() || !key.chars().all(is_identifier_char) {
                    return Err(TemplateError::InvalidPlaceholder(offset));
                }
                output.push_str(lookup(values, &key)?);
            }
            Some((_, next)) if is_identifier_start(next) => {
                let mut key = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_identifier_char(c) {
                        break;
                    }
                    key.push(c);
                    chars.next();
                }
                output.push_str(lookup(values, &key)?);
            }
            _ => return Err(TemplateError::InvalidPlaceholder(offset)),
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_slots() {
        let output = format_slots(
            "Source: {source_package_name}\nBuild-Depends: {{ignored}}\n",
            &[("source_package_name", "dfvfs")],
        )
        .unwrap();

        assert_eq!(output, "Source: dfvfs\nBuild-Depends: {ignored}\n");
    }

    #[test]
    fn test_format_slots_missing_key() {
        let err = format_slots("{name}-{version}", &[("name", "zlib")]).unwrap_err();
        assert_eq!(err, TemplateError::MissingKey("version".to_string()));
    }

    #[test]
    fn test_format_slots_unbalanced() {
        assert!(format_slots("{name", &[("name", "x")]).is_err());
        assert!(format_slots("name}", &[]).is_err());
    }

    #[test]
    fn test_substitute() {
        let output = substitute(
            "pip install $dependencies # ${project}, costs $$0",
            &[("dependencies", "six"), ("project", "plaso")],
        )
        .unwrap();

        assert_eq!(output, "pip install six # plaso, costs $0");
    }

    #[test]
    fn test_substitute_missing_key() {
        let err = substitute("$missing", &[]).unwrap_err();
        assert_eq!(err, TemplateError::MissingKey("missing".to_string()));
    }

    #[test]
    fn test_substitute_invalid() {
        assert!(substitute("cost: $5", &[]).is_err());
    }
}
