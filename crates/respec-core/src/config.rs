use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::SpecError;

/// Options shared by every format parser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub strictness: Strictness,
    /// Media types tried in order when picking a body schema. When none of
    /// them is declared the first registered media type is used.
    pub preferred_media_types: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strictness: Strictness::Lenient,
            preferred_media_types: Vec::new(),
        }
    }
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self {
            strictness: Strictness::Strict,
            ..Self::default()
        }
    }
}

/// How constraint keywords on a type that cannot carry them are treated,
/// e.g. `pattern` on an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Ignore the keyword.
    #[default]
    Lenient,
    /// Reject the schema.
    Strict,
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".respec.yaml";

/// Load options from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<ParseOptions>, SpecError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let options: ParseOptions = serde_yaml_ng::from_str(&content)?;
    Ok(Some(options))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# respec configuration
strictness: lenient     # lenient | strict

# Media types tried in order when a body declares several.
preferred_media_types: []
  # - application/json
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert_eq!(options.strictness, Strictness::Lenient);
        assert!(options.preferred_media_types.is_empty());
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
strictness: strict
preferred_media_types:
  - application/json
  - application/xml
"#;
        let options: ParseOptions = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(options.strictness, Strictness::Strict);
        assert_eq!(
            options.preferred_media_types,
            vec!["application/json", "application/xml"]
        );
    }

    #[test]
    fn test_default_content_parses() {
        let options: ParseOptions = serde_yaml_ng::from_str(default_config_content()).unwrap();
        assert_eq!(options, ParseOptions::default());
    }

    #[test]
    fn test_missing_file_is_none() {
        let loaded = load_config(Path::new("/nonexistent/.respec.yaml")).unwrap();
        assert!(loaded.is_none());
    }
}
