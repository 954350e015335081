use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::model::{DailyMetric, TemperatureUnit};

/// Default query parameters stored on disk so the CLI does not need
/// the full flag set on every invocation. Everything is optional;
/// explicit flags always win over these values.
///
/// Example TOML:
///
/// ```toml
/// latitude = 40.7128
/// longitude = -74.006
/// timezone = "America/New_York"
/// temperature_unit = "fahrenheit"
/// metrics = ["temperature_2m_max", "temperature_2m_min"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub temperature_unit: Option<String>,
    pub metrics: Option<Vec<String>>,
}

impl Config {
    /// The stored unit as a strongly-typed value, if one is set.
    pub fn temperature_unit(&self) -> Result<Option<TemperatureUnit>> {
        self.temperature_unit
            .as_deref()
            .map(|s| {
                TemperatureUnit::try_from(s)
                    .with_context(|| format!("Invalid temperature_unit in config file: '{s}'"))
            })
            .transpose()
    }

    /// The stored metric list as strongly-typed values, if one is set.
    pub fn metrics(&self) -> Result<Option<Vec<DailyMetric>>> {
        self.metrics
            .as_deref()
            .map(|names| {
                names
                    .iter()
                    .map(|s| {
                        DailyMetric::try_from(s.as_str())
                            .with_context(|| format!("Invalid metric in config file: '{s}'"))
                    })
                    .collect()
            })
            .transpose()
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "meteo", "meteo-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
