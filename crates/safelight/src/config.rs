//! Configuration management for safelight.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults. The SOS
//! timing is fixed and deliberately absent here.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::location::{LocationRequest, Position};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "safelight";

/// Default siren sound file name.
const SOUND_FILE_NAME: &str = "alarm.wav";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SAFELIGHT_`)
/// 2. TOML config file at `~/.config/safelight/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera/torch configuration.
    pub camera: CameraConfig,
    /// Siren configuration.
    pub siren: SirenConfig,
    /// Location configuration.
    pub location: LocationConfig,
}

/// Camera-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Directory of the LED class device to drive.
    /// Autodetected under `leds_root` when unset.
    pub led_path: Option<PathBuf>,
    /// Where LED class devices live.
    pub leds_root: PathBuf,
}

/// Siren-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SirenConfig {
    /// Audio player program, invoked with the sound file as its argument.
    pub player: String,
    /// Sound file to loop.
    /// Defaults to `~/.local/share/safelight/alarm.wav`
    pub sound_file: Option<PathBuf>,
    /// Pause between loop iterations in milliseconds.
    pub restart_delay_ms: u64,
}

/// Location-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Give up on a position request after this many milliseconds.
    pub timeout_ms: u64,
    /// Prefer an accurate fix over a fast one.
    pub high_accuracy: bool,
    /// Oldest cached fix to accept, in milliseconds.
    pub maximum_age_ms: u64,
    /// Fixed latitude served when no positioning hardware is present.
    pub latitude: Option<f64>,
    /// Fixed longitude.
    pub longitude: Option<f64>,
    /// Accuracy to report for the fixed position, in meters.
    pub accuracy_m: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            led_path: None,
            leds_root: PathBuf::from("/sys/class/leds"),
        }
    }
}

impl Default for SirenConfig {
    fn default() -> Self {
        Self {
            player: "paplay".to_string(),
            sound_file: None, // Will be resolved to default at runtime
            restart_delay_ms: 0,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            high_accuracy: true,
            maximum_age_ms: 0,
            latitude: None,
            longitude: None,
            accuracy_m: 0.0,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SAFELIGHT_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.location.timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "location.timeout_ms must be greater than 0".to_string(),
            });
        }

        if self.siren.player.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "siren.player must not be empty".to_string(),
            });
        }

        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    return Err(Error::ConfigValidation {
                        message: format!("location.latitude ({lat}) must be within -90..=90"),
                    });
                }
                if !(-180.0..=180.0).contains(&lon) {
                    return Err(Error::ConfigValidation {
                        message: format!("location.longitude ({lon}) must be within -180..=180"),
                    });
                }
            }
            (None, None) => {}
            _ => {
                return Err(Error::ConfigValidation {
                    message: "location.latitude and location.longitude must be set together"
                        .to_string(),
                });
            }
        }

        if self.location.accuracy_m < 0.0 {
            return Err(Error::ConfigValidation {
                message: "location.accuracy_m must not be negative".to_string(),
            });
        }

        Ok(())
    }

    /// Get the siren sound file, resolving defaults if not set.
    #[must_use]
    pub fn sound_file(&self) -> PathBuf {
        self.siren
            .sound_file
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SOUND_FILE_NAME))
    }

    /// Get the pause between siren loop iterations.
    #[must_use]
    pub fn siren_restart_delay(&self) -> Duration {
        Duration::from_millis(self.siren.restart_delay_ms)
    }

    /// Build the position request options.
    #[must_use]
    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            high_accuracy: self.location.high_accuracy,
            timeout: Duration::from_millis(self.location.timeout_ms),
            maximum_age: Duration::from_millis(self.location.maximum_age_ms),
        }
    }

    /// The configured fixed position, if both coordinates are set.
    #[must_use]
    pub fn fixed_position(&self) -> Option<Position> {
        Some(Position {
            latitude: self.location.latitude?,
            longitude: self.location.longitude?,
            accuracy_m: self.location.accuracy_m,
        })
    }
}
