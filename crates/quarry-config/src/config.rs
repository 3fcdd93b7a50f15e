//! Configuration structs with sensible defaults and RON persistence.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the config file inside a config directory.
const CONFIG_FILE: &str = "config.ron";

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Vertical layout of the world and the format version written to disk.
    pub world: WorldConfig,
    /// Bit-width limits for palette-compressed volumes.
    pub palette: PaletteConfig,
    /// Incremental-write cache settings.
    pub cache: CacheConfig,
    /// Log filtering.
    pub logging: LoggingConfig,
}

/// World height and on-disk version settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Vertical index of the lowest section.
    pub min_section_y: i32,
    /// Number of sections in a chunk column.
    pub section_count: usize,
    /// Data version stamped into every written chunk.
    pub data_version: i32,
}

/// Palette bit-width limits.
///
/// Widths are rounded up to a power of two by the palette codec. A volume
/// whose distinct-value count exceeds `2^max_bits` is stored with raw
/// registry ids instead of a local palette.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaletteConfig {
    /// Minimum bits per block-state index.
    pub block_min_bits: u8,
    /// Maximum bits per block-state index before falling back to registry ids.
    pub block_max_bits: u8,
    /// Minimum bits per biome index.
    pub biome_min_bits: u8,
    /// Maximum bits per biome index before falling back to registry ids.
    pub biome_max_bits: u8,
}

/// Incremental-write cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Subdirectory of the output root holding the hash table.
    pub dir_name: String,
    /// File name of the hash table inside `dir_name`.
    pub file_name: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (e.g. "info", "quarry_chunk=debug").
    pub level: String,
}

// --- Default implementations ---

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            min_section_y: -4,
            section_count: 24,
            data_version: 3465,
        }
    }
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            block_min_bits: 4,
            block_max_bits: 8,
            biome_min_bits: 1,
            biome_max_bits: 4,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir_name: ".cache".to_string(),
            file_name: "hashes".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl WorldConfig {
    /// Height of the world in cells.
    pub fn height(&self) -> usize {
        self.section_count * 16
    }

    /// Lowest cell y coordinate.
    pub fn min_y(&self) -> i32 {
        self.min_section_y * 16
    }
}

impl PaletteConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (kind, min, max) in [
            ("block", self.block_min_bits, self.block_max_bits),
            ("biome", self.biome_min_bits, self.biome_max_bits),
        ] {
            if min == 0 || min > max || max > 16 {
                return Err(ConfigError::Invalid(format!(
                    "{kind} palette bits must satisfy 1 <= min <= max <= 16, got {min}..{max}"
                )));
            }
        }
        Ok(())
    }
}

impl CacheConfig {
    /// Both names must be single plain path components.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in [&self.dir_name, &self.file_name] {
            let plain = !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\']);
            if !plain {
                return Err(ConfigError::Invalid(format!(
                    "cache names must be single path components, got {name:?}"
                )));
            }
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Platform config directory for Quarry (e.g. `~/.config/quarry`).
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("quarry"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Rejects settings the codecs cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.section_count == 0 {
            return Err(ConfigError::Invalid("world.section_count must be positive".into()));
        }
        if i32::try_from(self.world.section_count)
            .ok()
            .and_then(|count| self.world.min_section_y.checked_add(count))
            .is_none()
        {
            return Err(ConfigError::Invalid("world extends past the i32 section range".into()));
        }
        self.palette.validate()?;
        self.cache.validate()
    }

    /// Reads and validates `config.ron` in `config_dir`. A missing file is
    /// replaced by the defaults, which are written back.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        match Self::read(&path) {
            Err(ConfigError::ReadError { source, .. }) if source.kind() == ErrorKind::NotFound => {
                let config = Config::default();
                config.save(config_dir)?;
                log::info!("Wrote default config to {}", path.display());
                Ok(config)
            }
            result => result,
        }
    }

    /// Validates and writes the config to `config_dir/config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let path = config_dir.join(CONFIG_FILE);
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new().depth_limit(2))
            .map_err(ConfigError::SerializeError)?;
        std::fs::create_dir_all(config_dir)
            .and_then(|()| std::fs::write(&path, text))
            .map_err(|source| ConfigError::WriteError { path, source })
    }

    /// Reads the file again. Returns the new config only if it differs,
    /// logging which sections changed.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read(&config_dir.join(CONFIG_FILE))?;
        let changed: Vec<&str> = [
            ("world", self.world != fresh.world),
            ("palette", self.palette != fresh.palette),
            ("cache", self.cache != fresh.cache),
            ("logging", self.logging != fresh.logging),
        ]
        .into_iter()
        .filter_map(|(name, differs)| differs.then_some(name))
        .collect();
        if changed.is_empty() {
            return Ok(None);
        }
        log::info!("Config reloaded, changed: {}", changed.join(", "));
        Ok(Some(fresh))
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = ron::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(2))
                .unwrap();
        assert!(ron_str.contains("min_section_y: -4"));
        assert!(ron_str.contains("block_max_bits: 8"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(world: (section_count: 16))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.world.section_count, 16);
        assert_eq!(config.world.min_section_y, -4);
        assert_eq!(config.palette, PaletteConfig::default());
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_world_height() {
        let world = WorldConfig::default();
        assert_eq!(world.height(), 384);
        assert_eq!(world.min_y(), -64);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.world.section_count = 16;
        config.world.min_section_y = 0;
        config.logging.level = "debug".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.palette.block_max_bits = 16;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().palette.block_max_bits, 16);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.palette.block_min_bits = 9;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.cache.dir_name = "../outside".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.world.section_count = 0;
        let dir = tempfile::tempdir().unwrap();
        assert!(config.save(dir.path()).is_err());
        assert!(!dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_invalid_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "(world: (section_count: 0))").unwrap();
        assert!(matches!(Config::load_or_create(dir.path()), Err(ConfigError::Invalid(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "(world: (section_count: 0))");
    }
}
