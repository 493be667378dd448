// Configuration management for tubepipe
// Handles loading/saving settings, with sensible defaults when config is missing

use dirs::{config_dir, data_local_dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find a config directory")]
    NoConfigDir,

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub extractor: ExtractorConfig,
    pub player: PlayerConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub program: PathBuf,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub volume: f32,
    pub seek_step: f64, // fraction of the track per arrow press
    pub refresh_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_notifications: bool,
    pub notification_duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub filter: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            format: DEFAULT_FORMAT.to_string(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            seek_step: 0.05,
            refresh_interval_ms: 500,
        }
    }
}

impl PlayerConfig {
    pub fn volume(&self) -> f32 {
        if self.volume.is_nan() {
            return 1.0;
        }
        self.volume.clamp(0.0, 1.0)
    }

    pub fn seek_step(&self) -> f64 {
        if self.seek_step.is_nan() {
            return 0.05;
        }
        self.seek_step.clamp(0.0, 1.0)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(50))
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_notifications: true,
            notification_duration_ms: 3000,
        }
    }
}

impl UiConfig {
    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_duration_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let directory = data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tubepipe")
            .join("logs");

        Self {
            directory,
            filter: "info,tubepipe=debug".to_string(),
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults there on first run.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = config_dir().ok_or(ConfigError::NoConfigDir)?.join("tubepipe");
        Ok(dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[player]\nseek_step = 0.1\n\n[extractor]\nprogram = \"/opt/yt-dlp\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.player.seek_step(), 0.1);
        assert_eq!(config.player.refresh_interval_ms, 500);
        assert_eq!(config.extractor.program, PathBuf::from("/opt/yt-dlp"));
        assert_eq!(config.extractor.format, DEFAULT_FORMAT);
        assert!(config.ui.show_notifications);
    }

    #[test]
    fn test_invalid_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[player\nvolume = ").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_out_of_range_values_are_clamped_on_read() {
        let player = PlayerConfig {
            volume: 3.0,
            seek_step: -1.0,
            refresh_interval_ms: 0,
        };
        assert_eq!(player.volume(), 1.0);
        assert_eq!(player.seek_step(), 0.0);
        assert_eq!(player.refresh_interval(), Duration::from_millis(50));
    }
}
