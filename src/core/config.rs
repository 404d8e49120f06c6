//! Paint engine configuration
//!
//! Loaded from `<config_dir>/paintcore/config.json`. Every field has a
//! default so partial files are accepted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::contracts::validate_pressure;
use super::errors::PaintError;

const DEFAULT_UNDO_LEVELS: usize = 32;
const DEFAULT_PARALLEL_THRESHOLD: usize = 64 * 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaintConfig {
    /// Number of undo groups kept before the oldest is dropped
    pub undo_levels: usize,
    /// LZ4-compress image patches held by the undo history
    pub compress_undo: bool,
    /// Composited areas with at least this many pixels are processed row-parallel
    pub parallel_threshold: usize,
    /// Pressure assumed at stroke start until the first real sample arrives
    pub default_pressure: f64,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for PaintConfig {
    fn default() -> Self {
        Self {
            undo_levels: DEFAULT_UNDO_LEVELS,
            compress_undo: true,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            default_pressure: 0.5,
            log_filter: "paintcore=info".to_string(),
        }
    }
}

impl PaintConfig {
    /// Read a config file
    pub fn load(path: &Path) -> Result<Self, PaintError> {
        let text = std::fs::read_to_string(path)?;
        let config: PaintConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), PaintError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Load from the user config dir, falling back to defaults
    pub fn load_or_default() -> Self {
        let path = default_config_path();
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), PaintError> {
        validate_pressure(self.default_pressure)?;
        if self.undo_levels == 0 {
            return Err(PaintError::InvalidInput(
                "undoLevels must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// `<config_dir>/paintcore/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("paintcore")
        .join("config.json")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config: PaintConfig = serde_json::from_str(r#"{ "undoLevels": 5 }"#).unwrap();
        assert_eq!(config.undo_levels, 5);
        assert!(config.compress_undo);
        assert_eq!(config.default_pressure, 0.5);
    }

    #[test]
    fn save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("paintcore-config-{}", std::process::id()))
            .join("config.json");
        let config = PaintConfig {
            undo_levels: 8,
            compress_undo: false,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = PaintConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn rejects_out_of_range_pressure() {
        let config = PaintConfig {
            default_pressure: 2.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
