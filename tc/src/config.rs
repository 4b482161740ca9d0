//! taskchain configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatch::DispatcherConfig;
use crate::domain::Terrain;
use crate::world::Behavior;

/// Main taskchain configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Tick loop settings
    pub runner: RunnerConfig,

    /// Outbound message throttling
    pub dispatcher: DispatcherConfig,

    /// Base behavior flags
    pub behavior: Behavior,

    /// Simulated world for `tc run`
    pub sim: SimConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call right after loading, so a bad value fails with a clear message
    /// instead of deep inside the simulation.
    pub fn validate(&self) -> Result<()> {
        if self.sim.world_radius < 0 {
            return Err(eyre::eyre!(
                "sim.world-radius must not be negative (got {})",
                self.sim.world_radius
            ));
        }
        if self.sim.loader_interval_ms == 0 {
            return Err(eyre::eyre!("sim.loader-interval-ms must be greater than zero"));
        }
        if self.sim.agent_speed.is_nan() || self.sim.agent_speed <= 0.0 {
            return Err(eyre::eyre!(
                "sim.agent-speed must be greater than zero (got {})",
                self.sim.agent_speed
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    ///
    /// An explicit path must load. Otherwise `./.taskchain.yml`, then
    /// `~/.config/taskchain/taskchain.yml`, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".taskchain.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("taskchain").join("taskchain.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Log level from the config file, read before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => {
                let local = PathBuf::from(".taskchain.yml");
                if local.exists() {
                    local
                } else {
                    dirs::config_dir()?.join("taskchain").join("taskchain.yml")
                }
            }
        };
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Tick loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Runner ticks per second
    #[serde(rename = "tick-rate-hz")]
    pub tick_rate_hz: u32,

    /// Enable the runner at startup
    #[serde(rename = "start-enabled")]
    pub start_enabled: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20,
            start_enabled: true,
        }
    }
}

impl RunnerConfig {
    /// Time between ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate_hz.max(1)))
    }
}

/// Simulated world settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// World generation seed
    pub seed: u64,

    /// Land extends this many cells from the origin
    #[serde(rename = "world-radius")]
    pub world_radius: i32,

    /// Cells loaded around the agent, in cells
    #[serde(rename = "load-radius")]
    pub load_radius: i32,

    /// How often the background loader runs
    #[serde(rename = "loader-interval-ms")]
    pub loader_interval_ms: u64,

    /// World units moved per tick
    #[serde(rename = "agent-speed")]
    pub agent_speed: f64,

    /// Terrain the demo search explores
    #[serde(rename = "search-terrain")]
    pub search_terrain: Terrain,

    /// Give up after this many ticks
    #[serde(rename = "max-ticks")]
    pub max_ticks: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            world_radius: 24,
            load_radius: 3,
            loader_interval_ms: 100,
            agent_speed: 4.0,
            search_terrain: Terrain::Forest,
            max_ticks: 2000,
        }
    }
}

impl SimConfig {
    pub fn loader_interval(&self) -> Duration {
        Duration::from_millis(self.loader_interval_ms)
    }
}
