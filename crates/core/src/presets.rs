//! Named style presets stored as one JSON file each.

use crate::error::{Error, Result};
use crate::types::StyleConfig;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default preset directory, relative to the working directory.
pub const DEFAULT_PRESET_DIR: &str = "templates";

const PRESET_EXTENSION: &str = "json";
const MAX_NAME_LEN: usize = 64;

/// Filesystem-backed preset store.
///
/// There is no locking: concurrent writers race and the last write wins.
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl Default for PresetStore {
    fn default() -> Self {
        Self::new(DEFAULT_PRESET_DIR)
    }
}

impl PresetStore {
    /// Create a store rooted at `dir`. The directory is created on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `config` under `name`, replacing any existing preset.
    pub fn save(&self, name: &str, config: &StyleConfig) -> Result<()> {
        let path = self.path_for(name)?;
        config.validate()?;
        self.ensure_dir()?;

        let json = serde_json::to_string_pretty(config)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize preset: {}", e)))?;
        fs::write(&path, json)?;

        log::debug!("Saved preset '{}' to {}", name, path.display());
        Ok(())
    }

    /// Read the preset called `name`, or `None` if there is none.
    pub fn load(&self, name: &str) -> Result<Option<StyleConfig>> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let config = serde_json::from_str(&content).map_err(|e| {
            Error::ConfigError(format!("Preset '{}' is not valid JSON: {}", name, e))
        })?;

        Ok(Some(config))
    }

    /// Names of all stored presets, sorted.
    pub fn list(&self) -> Result<BTreeSet<String>> {
        self.ensure_dir()?;

        let mut names = BTreeSet::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(PRESET_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.insert(stem.to_string());
            }
        }

        Ok(names)
    }

    /// Remove the preset called `name`. Missing presets are not an error.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if path.is_file() {
            fs::remove_file(&path)?;
            log::debug!("Deleted preset '{}'", name);
        }
        Ok(())
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.{}", name, PRESET_EXTENSION)))
    }
}

/// Accept names made of letters, digits, spaces, `-`, `_` and `.`, not
/// starting with a dot.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.trim().is_empty()
        && name.chars().count() <= MAX_NAME_LEN
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidPresetName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Alignment, HeaderFooterAlignment, Margins};

    fn sample_config() -> StyleConfig {
        StyleConfig {
            font_name: "Georgia".to_string(),
            font_size: 13.5,
            line_spacing: 1.35,
            alignment: Alignment::Justify,
            margins: Margins {
                top: 0.7,
                bottom: 1.1,
                left: 1.25,
                right: 0.9,
            },
            header_text: "Quarterly report".to_string(),
            footer_text: "Confidential".to_string(),
            header_footer_size: 9.0,
            header_footer_alignment: HeaderFooterAlignment::Right,
            logo_width: 1.3,
            logo_height: 0.6,
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path().join("templates"));
        let config = sample_config();

        store.save("report", &config).unwrap();
        let loaded = store.load("report").unwrap().unwrap();
        assert_eq!(loaded, config);

        // Saving what was loaded gives the same thing back again.
        store.save("report", &loaded).unwrap();
        assert_eq!(store.load("report").unwrap().unwrap(), config);
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());
        assert!(store.load("nothing").unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());

        store.save("a", &StyleConfig::default()).unwrap();
        store.save("a", &sample_config()).unwrap();

        assert_eq!(store.load("a").unwrap().unwrap(), sample_config());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path().join("nested").join("templates"));

        assert!(store.list().unwrap().is_empty());
        assert!(store.dir().is_dir());

        store.save("beta", &StyleConfig::default()).unwrap();
        store.save("alpha", &StyleConfig::default()).unwrap();
        fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        store.delete("alpha").unwrap();
        store.delete("alpha").unwrap();
        store.delete("never-existed").unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_unsafe_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());

        for name in ["", "   ", "../escape", "a/b", ".hidden", "a\\b"] {
            let err = store.save(name, &StyleConfig::default()).unwrap_err();
            assert!(matches!(err, Error::InvalidPresetName(_)), "{:?}", name);
        }
        assert!(store.load("../escape").is_err());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());
        let mut config = StyleConfig::default();
        config.logo_height = -1.0;

        assert!(matches!(
            store.save("bad", &config),
            Err(Error::ConfigError(_))
        ));
        assert!(store.load("bad").unwrap().is_none());
    }

    #[test]
    fn test_legacy_preset_keys_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());
        fs::write(
            dir.path().join("legacy.json"),
            r#"{"font_name": "Calibri", "margin_top": 2.0, "hf_align": "Left"}"#,
        )
        .unwrap();

        let config = store.load("legacy").unwrap().unwrap();
        assert_eq!(config.font_name, "Calibri");
        assert_eq!(config.font_size, 12.0);
        assert_eq!(config.margins, Margins { top: 2.0, ..Margins::default() });
        assert_eq!(config.header_footer_alignment, HeaderFooterAlignment::Left);
    }

    #[test]
    fn test_corrupt_preset_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        assert!(matches!(store.load("broken"), Err(Error::ConfigError(_))));
    }
}
