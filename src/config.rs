use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default length of a timed exam simulation, in seconds.
pub const DEFAULT_EXAM_SECONDS: u32 = 1800;

/// Default smoothing constant for the readiness score: attempts are damped
/// through `1 - e^(-attempts/k)` so small samples don't swing the score.
pub const DEFAULT_SMOOTHING: f64 = 30.0;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub exam_seconds: Option<u32>,
    pub readiness_smoothing: Option<f64>,
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Could not determine config directory")?;
        Ok(base.join("exam-trainer"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the data directory path (config override, else platform default)
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir().context("Could not determine data directory")?;
        Ok(base.join("exam-trainer"))
    }

    /// Path of the SQLite database file
    pub fn db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("trainer.db"))
    }

    pub fn exam_seconds(&self) -> u32 {
        self.exam_seconds.unwrap_or(DEFAULT_EXAM_SECONDS)
    }

    pub fn readiness_smoothing(&self) -> f64 {
        self.readiness_smoothing.unwrap_or(DEFAULT_SMOOTHING)
    }

    /// Load config from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config =
                toml::from_str(&content).with_context(|| "Failed to parse config file")?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Config path has no parent directory"))?;

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory {:?}", dir))?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&path, &content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }
}
