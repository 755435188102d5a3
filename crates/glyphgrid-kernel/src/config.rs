//! Simulation settings.
//!
//! The scheduler and debug knobs that don't involve closures can be loaded
//! from TOML, so hosts can keep them next to the rest of their config.

use glyphgrid_common::ConfigError;
use serde::{Deserialize, Serialize};

use crate::sleep::{DEFAULT_SLEEP_RATIO, MAX_SLEEP_RATIO};

/// Tunable simulation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Sleep block edge length in cells
    pub sleep_ratio: u32,
    /// Distance in cells over which an active cell keeps neighbors awake
    pub wake_radius: u32,

    // === Debug Settings ===
    /// Repaint every cell on every render
    pub always_render: bool,
    /// Tint the background of cells in sleeping blocks
    pub highlight_asleep: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            sleep_ratio: DEFAULT_SLEEP_RATIO,
            wake_radius: 1,
            always_render: false,
            highlight_asleep: false,
        }
    }
}

impl SimulationSettings {
    /// Parses settings from TOML; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serializes settings to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sleep_ratio == 0 {
            return Err(ConfigError::Invalid("sleep_ratio must be at least 1".to_string()));
        }
        if self.sleep_ratio > MAX_SLEEP_RATIO {
            return Err(ConfigError::Invalid(format!(
                "sleep_ratio must be at most {MAX_SLEEP_RATIO}, got {}",
                self.sleep_ratio
            )));
        }
        Ok(())
    }
}
