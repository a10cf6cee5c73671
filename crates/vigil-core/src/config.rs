use crate::error::MonitorError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Default EAR threshold below which eyes count as closed.
pub const DEFAULT_EAR_THRESHOLD: f32 = 0.32;
/// Default number of raw EAR samples averaged by the smoothing window.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;
/// Default session length in minutes (the first preset).
pub const DEFAULT_SESSION_MINUTES: u32 = 25;

/// Get the configuration directory for vigil.
///
/// # Errors
///
/// Returns an error if the platform configuration directory cannot be determined.
pub fn get_config_dir() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Failed to get config dir"))?;
    path.push("vigil");
    Ok(path)
}

/// Default location of `config.toml`.
///
/// # Errors
///
/// Returns an error if the platform configuration directory cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// Eye classification tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Smoothed EAR strictly below this value means eyes closed
    pub ear_threshold: f32,
    /// Maximum number of raw samples kept in the smoothing window
    pub smoothing_window: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

/// Alert tone parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub frequency_hz: f32,
    pub duration_ms: u64,
}

impl AlertConfig {
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 600.0,
            duration_ms: 160,
        }
    }
}

/// Countdown session parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Preset restored by an explicit end
    pub default_minutes: u32,
    /// Durations offered before a session starts
    pub presets_minutes: Vec<u32>,
    /// Countdown tick period; one tick removes one second
    pub tick_interval_ms: u64,
}

impl SessionConfig {
    #[must_use]
    pub const fn default_duration_seconds(&self) -> u32 {
        self.default_minutes.saturating_mul(60)
    }

    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_minutes: DEFAULT_SESSION_MINUTES,
            presets_minutes: vec![25, 50, 90],
            tick_interval_ms: 1000,
        }
    }
}

/// Top-level monitor configuration, read from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub classifier: ClassifierConfig,
    pub alert: AlertConfig,
    pub session: SessionConfig,
}

impl MonitorConfig {
    /// Load configuration from `path`, or from the default location when `None`.
    ///
    /// A missing file is not an error: defaults are returned instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if
    /// a value fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML or out-of-range values.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let threshold = self.classifier.ear_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(MonitorError::InvalidConfig(format!(
                "classifier.ear_threshold must be a positive number, got {threshold}"
            )));
        }
        if self.classifier.smoothing_window == 0 {
            return Err(MonitorError::InvalidConfig(
                "classifier.smoothing_window must be at least 1".to_string(),
            ));
        }
        if !self.alert.frequency_hz.is_finite() || self.alert.frequency_hz <= 0.0 {
            return Err(MonitorError::InvalidConfig(format!(
                "alert.frequency_hz must be positive, got {}",
                self.alert.frequency_hz
            )));
        }
        if self.session.default_minutes == 0 {
            return Err(MonitorError::InvalidConfig(
                "session.default_minutes must be at least 1".to_string(),
            ));
        }
        if self.session.presets_minutes.contains(&0) {
            return Err(MonitorError::InvalidConfig(
                "session.presets_minutes cannot contain 0".to_string(),
            ));
        }
        if self.session.tick_interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "session.tick_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
