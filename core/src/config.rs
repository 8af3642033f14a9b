use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::format::Flavor;
use crate::Result;

/// Tunables of the outline engine, read from `canopy.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Checkbox transitions closer together than this replace each other
    /// in the history instead of piling up.
    pub checkbox_debounce_ms: i64,
    /// Dialect of the markdown put on the clipboard and used by `export`.
    pub markdown_flavor: Flavor,
    /// Title of the node that wraps imports without a single root.
    pub import_root_title: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            checkbox_debounce_ms: 1000,
            markdown_flavor: Flavor::Logseq,
            import_root_title: "Imported".to_string(),
        }
    }
}

impl EngineConfig {
    /// Read the config, writing the defaults first if the file is missing.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, toml::to_string(&config)?)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_written_on_first_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("canopy.toml");

        let config = EngineConfig::load_or_create(&path).unwrap();
        assert_eq!(config, EngineConfig::default());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("checkbox_debounce_ms = 1000"));
        assert!(written.contains("markdown_flavor = \"logseq\""));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("canopy.toml");
        fs::write(&path, "markdown_flavor = \"obsidian\"\n").unwrap();

        let config = EngineConfig::load_or_create(&path).unwrap();
        assert_eq!(config.markdown_flavor, Flavor::Obsidian);
        assert_eq!(config.checkbox_debounce_ms, 1000);
        assert_eq!(config.import_root_title, "Imported");
    }

    #[test]
    fn test_bad_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("canopy.toml");
        fs::write(&path, "checkbox_debounce_ms = \"soon\"\n").unwrap();
        assert!(matches!(EngineConfig::load_or_create(&path), Err(Error::Config(_))));
    }
}
