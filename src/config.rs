use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Smallest surface the layout still fits into
pub const MIN_WIDTH: u32 = 280;
pub const MIN_HEIGHT: u32 = 380;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize settings to TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Play a sound when the countdown finishes
    #[serde(default = "default_true")]
    pub alarm_enabled: bool,

    /// WAV file to loop when the countdown finishes.
    /// If None, `alarm.wav` next to the executable or in the working directory is used.
    #[serde(default)]
    pub alarm_sound: Option<PathBuf>,

    /// Opacity while the pointer is over the timer in transparent mode
    #[serde(default = "default_transparent_opacity")]
    pub transparent_opacity: f32,

    /// Start with transparent (click-through) mode switched on
    #[serde(default)]
    pub start_transparent: bool,

    /// Surface size in logical pixels
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,

    /// Distance from the top-left corner of the output
    #[serde(default = "default_margin")]
    pub margin_top: i32,
    #[serde(default = "default_margin")]
    pub margin_left: i32,
}

fn default_true() -> bool {
    true
}

fn default_transparent_opacity() -> f32 {
    0.1
}

fn default_width() -> u32 {
    380
}

fn default_height() -> u32 {
    480
}

fn default_margin() -> i32 {
    100
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alarm_enabled: true,
            alarm_sound: None,
            transparent_opacity: default_transparent_opacity(),
            start_transparent: false,
            width: default_width(),
            height: default_height(),
            margin_top: default_margin(),
            margin_left: default_margin(),
        }
    }
}

impl Settings {
    /// Load config from ~/.config/flip-timer/config.toml
    /// Returns default settings if file doesn't exist or fails to parse
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            warn!("Could not determine config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            info!(path = %path.display(), "No config file found, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => {
                info!(path = %path.display(), "Loaded settings");
                settings
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = toml::from_str(&contents)?;
        Ok(settings.normalized())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Clamp values that would break the layout
    pub fn normalized(mut self) -> Self {
        if !self.transparent_opacity.is_finite() {
            self.transparent_opacity = default_transparent_opacity();
        }
        self.transparent_opacity = self.transparent_opacity.clamp(0.0, 1.0);
        self.width = self.width.max(MIN_WIDTH);
        self.height = self.height.max(MIN_HEIGHT);
        self
    }
}

/// Get the path to the config file: ~/.config/flip-timer/config.toml
pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "flip-timer").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.alarm_enabled);
        assert_eq!(settings.transparent_opacity, 0.1);
        assert_eq!((settings.width, settings.height), (380, 480));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: Settings = toml::from_str("width = 500\n").unwrap();
        assert_eq!(settings.width, 500);
        assert_eq!(settings.height, 480);
        assert!(settings.alarm_enabled);
        assert_eq!(settings.alarm_sound, None);
    }

    #[test]
    fn test_save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let settings = Settings {
            alarm_enabled: false,
            alarm_sound: Some(PathBuf::from("/tmp/bell.wav")),
            transparent_opacity: 0.25,
            start_transparent: true,
            width: 400,
            height: 520,
            margin_top: 10,
            margin_left: 20,
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "width = \"wide\"").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Parse(_))));
        assert!(matches!(
            Settings::load_from(&dir.path().join("absent.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_normalized_clamps() {
        let settings = Settings {
            transparent_opacity: 3.0,
            width: 10,
            height: 10,
            ..Settings::default()
        }
        .normalized();
        assert_eq!(settings.transparent_opacity, 1.0);
        assert_eq!((settings.width, settings.height), (MIN_WIDTH, MIN_HEIGHT));
    }
}
