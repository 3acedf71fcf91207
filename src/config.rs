//! Configuration loading for colsort.
//!
//! Settings live in TOML and are resolved in this order:
//! 1. An explicitly provided `--config` path
//! 2. `.colsort.toml` in the current directory
//! 3. `~/.config/colsort/config.toml`
//! 4. Built-in defaults
//!
//! CLI flags override whatever the file provides. Values are validated
//! eagerly so a run never starts filesystem work with known-bad parameters.
//!
//! # Configuration File Format
//!
//! ```toml
//! [collection]
//! dry_run = false
//! interactive = false
//! recursive = true
//! duplicate_strategy = "rename_new"
//! duplicates_dir = "/data/duplicates"
//! compression_level = 6
//!
//! [video]
//! video_extensions = ["mp4", "mkv", "avi", "mov"]
//! subtitle_extensions = ["srt", "sub", "idx", "ass"]
//!
//! [[rename.patterns]]
//! pattern = "^ep(\\d+)"
//! replacement = "Episode $1"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::duplicates::DuplicateStrategy;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// A value is out of range or a pattern does not compile.
    InvalidValue(String),
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Settings shared by every command.
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Video renaming settings.
    #[serde(default)]
    pub video: VideoConfig,

    /// Mass rename settings.
    #[serde(default)]
    pub rename: RenameConfig,
}

/// Settings shared by every command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Simulate operations without touching the filesystem.
    #[serde(default)]
    pub dry_run: bool,

    /// Ask interactively how to handle each duplicate.
    #[serde(default)]
    pub interactive: bool,

    /// Descend into subdirectories where the command supports it.
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Pack results into archives where the command supports it.
    #[serde(default)]
    pub archive: bool,

    /// Remove sources after processing (move instead of copy).
    #[serde(default, rename = "move")]
    pub move_source: bool,

    /// Policy for colliding destinations.
    #[serde(default = "default_duplicate_strategy")]
    pub duplicate_strategy: DuplicateStrategy,

    /// Where `move_to_duplicates` diverts collisions.
    #[serde(default)]
    pub duplicates_dir: Option<PathBuf>,

    /// Deflate level for archives, 0-9.
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

fn default_true() -> bool {
    true
}

fn default_duplicate_strategy() -> DuplicateStrategy {
    DuplicateStrategy::RenameNew
}

fn default_compression_level() -> u32 {
    6
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            interactive: false,
            recursive: true,
            archive: false,
            move_source: false,
            duplicate_strategy: default_duplicate_strategy(),
            duplicates_dir: None,
            compression_level: default_compression_level(),
        }
    }
}

/// Video renaming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Extensions treated as video files (without dots).
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    /// Extensions treated as subtitle companions (without dots).
    #[serde(default = "default_subtitle_extensions")]
    pub subtitle_extensions: Vec<String>,
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "mkv", "avi", "mov"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_subtitle_extensions() -> Vec<String> {
    ["srt", "sub", "idx", "ass"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            video_extensions: default_video_extensions(),
            subtitle_extensions: default_subtitle_extensions(),
        }
    }
}

/// Mass rename settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenameConfig {
    /// Ordered regex → replacement rules; the first match wins.
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
}

/// One rename rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule {
    /// Regex matched against the file name.
    pub pattern: String,
    /// Replacement text; capture groups are available as `$1`, `$2`, ...
    pub replacement: String,
}

impl RenameConfig {
    /// The rules as plain pairs, preserving order.
    pub fn pattern_pairs(&self) -> Vec<(String, String)> {
        self.patterns
            .iter()
            .map(|rule| (rule.pattern.clone(), rule.replacement.clone()))
            .collect()
    }
}

impl AppConfig {
    /// Load configuration with fallback to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly provided file cannot be read, or if
    /// any discovered file is invalid.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".colsort.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("colsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges and pattern syntax.
    ///
    /// # Errors
    ///
    /// Returns an error for a compression level outside 0-9 or a rename
    /// pattern that does not compile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.compression_level > 9 {
            return Err(ConfigError::InvalidValue(format!(
                "compression_level must be between 0 and 9, got {}",
                self.collection.compression_level
            )));
        }

        for rule in &self.rename.patterns {
            Regex::new(&rule.pattern).map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "rename pattern '{}' does not compile: {}",
                    rule.pattern, e
                ))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = AppConfig::default();
        assert!(!config.collection.dry_run);
        assert!(config.collection.recursive);
        assert_eq!(
            config.collection.duplicate_strategy,
            DuplicateStrategy::RenameNew
        );
        assert_eq!(config.collection.compression_level, 6);
        assert!(config.video.video_extensions.contains(&"mkv".to_string()));
        assert!(config.rename.patterns.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [collection]
            dry_run = true
            duplicate_strategy = "overwrite"
            compression_level = 9
            move = true

            [video]
            video_extensions = ["webm"]

            [[rename.patterns]]
            pattern = "^ep(\\d+)"
            replacement = "Episode $1"
            "#,
        )
        .expect("parse");

        assert!(config.collection.dry_run);
        assert!(config.collection.move_source);
        assert_eq!(
            config.collection.duplicate_strategy,
            DuplicateStrategy::Overwrite
        );
        assert_eq!(config.collection.compression_level, 9);
        assert_eq!(config.video.video_extensions, vec!["webm"]);
        assert_eq!(config.rename.patterns.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [collection]
            interactive = true
            "#,
        )
        .expect("parse");

        assert!(config.collection.interactive);
        assert!(config.collection.recursive);
        assert_eq!(config.collection.compression_level, 6);
    }

    #[test]
    fn test_invalid_compression_level_fails_validation() {
        let config: AppConfig = toml::from_str(
            r#"
            [collection]
            compression_level = 42
            "#,
        )
        .expect("parse");

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_pattern_fails_validation() {
        let config: AppConfig = toml::from_str(
            r#"
            [[rename.patterns]]
            pattern = "[invalid("
            replacement = "x"
            "#,
        )
        .expect("parse");

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_explicit_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(result.is_err());
    }
}
