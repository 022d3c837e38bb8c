//! Configuration for the shoal simulation.
//!
//! Supplied once at startup and not hot-reloadable: a change requires
//! restarting the scheduler. JSON is the primary format; TOML is accepted
//! when the file extension asks for it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Parameters governing the school and its tick loop.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchoolConfig {
    /// Number of agents, fixed for the lifetime of the run.
    pub population: usize,
    /// Forward speed in world units per second.
    pub move_speed: f32,
    /// Per-tick orientation interpolation factor in [0, 1].
    pub agility_damping: f32,
    /// Pitch/yaw angular shove applied to coincident neighbors, radians.
    pub repel_angle: (f32, f32),
    /// Upper bound on the random neighbor index window per agent per tick.
    pub neighbor_sample_count: usize,
    /// Spatial hash grid cell edge length, world units.
    pub cell_size: f32,
    /// Home boundary radius around the school center.
    pub school_radius: f32,
    /// Anchor point the oscillating center moves around.
    #[serde(default)]
    pub home_position: [f32; 3],
    /// Per-axis amplitude of the center's harmonic motion.
    #[serde(default)]
    pub oscillation_amplitude: [f32; 3],
    /// Per-axis frequency of the center's harmonic motion, radians/second.
    #[serde(default)]
    pub oscillation_frequency: [f32; 3],
    /// Minimum wall-clock delay between tick starts, seconds.
    pub tick_interval: f32,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

fn default_random_seed() -> u64 {
    123
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            population: 100,
            move_speed: 2.0,
            agility_damping: 0.2,
            repel_angle: (0.3, 0.3),
            neighbor_sample_count: 8,
            cell_size: 1.0,
            school_radius: 10.0,
            home_position: [0.0; 3],
            oscillation_amplitude: [0.0; 3],
            oscillation_frequency: [0.0; 3],
            tick_interval: 0.05,
            random_seed: default_random_seed(),
        }
    }
}

impl SchoolConfig {
    /// Reject parameter combinations the scheduler cannot run with.
    ///
    /// Negated comparisons so NaN fails validation too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population == 0 {
            return Err(ConfigError::Validation(
                "population must be greater than 0".to_string(),
            ));
        }
        if !(self.cell_size > 0.0) {
            return Err(ConfigError::Validation(
                "cell_size must be positive".to_string(),
            ));
        }
        if !(self.school_radius > 0.0) {
            return Err(ConfigError::Validation(
                "school_radius must be positive".to_string(),
            ));
        }
        if !(self.tick_interval > 0.0) {
            return Err(ConfigError::Validation(
                "tick_interval must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.agility_damping) {
            return Err(ConfigError::Validation(
                "agility_damping must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a configuration file. The format is chosen by
    /// extension: `.toml` parses as TOML, anything else as JSON.
    pub fn from_file(path: &Path) -> Result<SchoolConfig, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: SchoolConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }
}
