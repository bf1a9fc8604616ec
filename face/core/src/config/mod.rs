//! TOML Configuration File Support
//!
//! Loads the face configuration from `~/.config/sunshine-face/face.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables (`FACE_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! The configuration file lives at `$XDG_CONFIG_HOME/sunshine-face/face.toml`
//! (typically `~/.config/sunshine-face/face.toml`).
//!
//! # Example Configuration
//!
//! ```toml
//! [schedule]
//! interactive_period_ms = 1000
//! muted_period_ms = 60000
//!
//! [sync]
//! topic = "weather-data"
//! asset_timeout_ms = 500
//! icon_size = 40
//! discard_stale_icons = false
//!
//! [display]
//! hour_format_24 = true
//!
//! [palette]
//! text = "#FFFFFF"
//! background = "#03A9F4"
//! temperature = "#B3E5FC"
//! date = "#FFFFFF"
//! text_ambient = "#FFFFFF"
//! background_ambient = "#000000"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::FrameOptions;
use crate::schedule::SchedulePeriods;
use crate::style::{Palette, Rgb};
use crate::sync::{SyncConfig, MAX_ICON_SIZE};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Schedule section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleToml {
    /// Tick period while interactive and not muted
    pub interactive_period_ms: Option<u64>,

    /// Tick period while muted
    pub muted_period_ms: Option<u64>,
}

/// Sync section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncToml {
    /// Data topic carrying weather updates
    pub topic: Option<String>,

    /// Asset resolution timeout in milliseconds
    pub asset_timeout_ms: Option<u64>,

    /// Icon edge length in pixels
    pub icon_size: Option<u32>,

    /// Drop icons older than the one on screen
    pub discard_stale_icons: Option<bool>,
}

/// Display section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayToml {
    /// 24-hour clock
    pub hour_format_24: Option<bool>,
}

/// Palette section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteToml {
    /// Interactive text color
    pub text: Option<Rgb>,
    /// Interactive background color
    pub background: Option<Rgb>,
    /// Interactive temperature color
    pub temperature: Option<Rgb>,
    /// Interactive date color
    pub date: Option<Rgb>,
    /// Ambient text color
    pub text_ambient: Option<Rgb>,
    /// Ambient background color
    pub background_ambient: Option<Rgb>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceToml {
    /// Schedule configuration section
    pub schedule: ScheduleToml,

    /// Sync configuration section
    pub sync: SyncToml,

    /// Display configuration section
    pub display: DisplayToml,

    /// Palette configuration section
    pub palette: PaletteToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the face engine
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct FaceConfig {
    /// Tick periods
    pub schedule: SchedulePeriods,

    /// Sync pipeline settings
    pub sync: SyncConfig,

    /// Frame composition settings
    pub display: FrameOptions,

    /// Colors
    pub palette: Palette,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            schedule: SchedulePeriods::default(),
            sync: SyncConfig::default(),
            display: FrameOptions::default(),
            palette: Palette::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl FaceConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values the engine cannot run with
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.interactive.is_zero() {
            return Err(ConfigError::ValidationError(
                "schedule.interactive_period_ms must be greater than 0".to_string(),
            ));
        }
        if self.schedule.muted.is_zero() {
            return Err(ConfigError::ValidationError(
                "schedule.muted_period_ms must be greater than 0".to_string(),
            ));
        }
        if self.sync.asset_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "sync.asset_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.sync.icon_size == 0 {
            return Err(ConfigError::ValidationError(
                "sync.icon_size must be greater than 0".to_string(),
            ));
        }
        if self.sync.icon_size > MAX_ICON_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "sync.icon_size must be at most {MAX_ICON_SIZE}"
            )));
        }
        if self.sync.topic.trim_start_matches('/').is_empty() {
            return Err(ConfigError::ValidationError(
                "sync.topic must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/sunshine-face/face.toml` or
/// `~/.config/sunshine-face/face.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sunshine-face").join("face.toml"))
}

/// Load configuration from all sources with proper priority
///
/// CLI overrides are not handled here; apply [`ConfigOverrides`] afterwards
/// and call [`FaceConfig::validate`].
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the merged values fail validation. A missing config file is not an error.
pub fn load_config() -> Result<FaceConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if the merged values fail validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<FaceConfig, ConfigError> {
    load_with_env(path, |key| std::env::var(key).ok())
}

fn load_with_env<F>(path: Option<PathBuf>, env: F) -> Result<FaceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = FaceConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: FaceToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut FaceConfig, toml: &FaceToml) {
    if let Some(ms) = toml.schedule.interactive_period_ms {
        config.schedule.interactive = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.schedule.muted_period_ms {
        config.schedule.muted = Duration::from_millis(ms);
    }

    if let Some(ref topic) = toml.sync.topic {
        config.sync.topic.clone_from(topic);
    }
    if let Some(ms) = toml.sync.asset_timeout_ms {
        config.sync.asset_timeout = Duration::from_millis(ms);
    }
    if let Some(size) = toml.sync.icon_size {
        config.sync.icon_size = size;
    }
    if let Some(discard) = toml.sync.discard_stale_icons {
        config.sync.discard_stale_icons = discard;
    }

    if let Some(h24) = toml.display.hour_format_24 {
        config.display.hour_format_24 = h24;
    }

    let palette = &toml.palette;
    let target = &mut config.palette;
    for (value, slot) in [
        (palette.text, &mut target.text),
        (palette.background, &mut target.background),
        (palette.temperature, &mut target.temperature),
        (palette.date, &mut target.date),
        (palette.text_ambient, &mut target.text_ambient),
        (palette.background_ambient, &mut target.background_ambient),
    ] {
        if let Some(color) = value {
            *slot = color;
        }
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut FaceConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(ms) = env("FACE_INTERACTIVE_PERIOD_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.schedule.interactive = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env("FACE_MUTED_PERIOD_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.schedule.muted = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(topic) = env("FACE_TOPIC") {
        config.sync.topic = topic;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env("FACE_ASSET_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.sync.asset_timeout = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(size) = env("FACE_ICON_SIZE").and_then(|v| v.parse::<u32>().ok()) {
        config.sync.icon_size = size;
        config.source = ConfigSource::Env;
    }
    if let Some(discard) = env("FACE_DISCARD_STALE_ICONS") {
        config.sync.discard_stale_icons = discard != "0" && discard.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
    if let Some(h24) = env("FACE_HOUR_FORMAT_24") {
        config.display.hour_format_24 = h24 != "0" && h24.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Topic override
    pub topic: Option<String>,

    /// Icon size override
    pub icon_size: Option<u32>,

    /// Asset timeout override (milliseconds)
    pub asset_timeout_ms: Option<u64>,

    /// 24-hour clock override
    pub hour_format_24: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set topic override
    #[must_use]
    pub fn with_topic(mut self, topic: String) -> Self {
        self.topic = Some(topic);
        self
    }

    /// Set icon size override
    #[must_use]
    pub fn with_icon_size(mut self, size: u32) -> Self {
        self.icon_size = Some(size);
        self
    }

    /// Set asset timeout override
    #[must_use]
    pub fn with_asset_timeout_ms(mut self, ms: u64) -> Self {
        self.asset_timeout_ms = Some(ms);
        self
    }

    /// Set 24-hour clock override
    #[must_use]
    pub fn with_hour_format_24(mut self, h24: bool) -> Self {
        self.hour_format_24 = Some(h24);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut FaceConfig) {
        if self.topic.is_some()
            || self.icon_size.is_some()
            || self.asset_timeout_ms.is_some()
            || self.hour_format_24.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref topic) = self.topic {
            config.sync.topic.clone_from(topic);
        }
        if let Some(size) = self.icon_size {
            config.sync.icon_size = size;
        }
        if let Some(ms) = self.asset_timeout_ms {
            config.sync.asset_timeout = Duration::from_millis(ms);
        }
        if let Some(h24) = self.hour_format_24 {
            config.display.hour_format_24 = h24;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
