use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::analysis::DetectorConfig;
use crate::formation::DEFAULT_TOLERANCE_S;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub formation: FormationConfig,
    pub projection: ProjectionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub exit_descent_fpm: f64,
    #[serde(deserialize_with = "human_duration")]
    pub exit_window: Duration,
    pub deployment_decel_g: f64,
    #[serde(deserialize_with = "human_duration")]
    pub deployment_window: Duration,
    pub canopy_descent_fpm: f64,
    pub landing_descent_fpm: f64,
    #[serde(deserialize_with = "human_duration")]
    pub landing_window: Duration,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let d = DetectorConfig::default();
        Self {
            exit_descent_fpm: d.exit_descent_fpm,
            exit_window: d.exit_window,
            deployment_decel_g: d.deployment_decel_g,
            deployment_window: d.deployment_window,
            canopy_descent_fpm: d.canopy_descent_fpm,
            landing_descent_fpm: d.landing_descent_fpm,
            landing_window: d.landing_window,
        }
    }
}

impl From<&DetectionConfig> for DetectorConfig {
    fn from(c: &DetectionConfig) -> Self {
        DetectorConfig {
            exit_descent_fpm: c.exit_descent_fpm,
            exit_window: c.exit_window,
            deployment_decel_g: c.deployment_decel_g,
            deployment_window: c.deployment_window,
            canopy_descent_fpm: c.canopy_descent_fpm,
            landing_descent_fpm: c.landing_descent_fpm,
            landing_window: c.landing_window,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormationConfig {
    /// Start times this close chain into one formation.
    #[serde(deserialize_with = "human_duration")]
    pub tolerance: Duration,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            tolerance: Duration::from_secs(DEFAULT_TOLERANCE_S as u64),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    #[serde(deserialize_with = "human_duration")]
    pub closure_window: Duration,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            closure_window: Duration::from_millis(500),
        }
    }
}

fn human_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let d = &self.detection;
        for (field, value) in [
            ("detection.exit_descent_fpm", d.exit_descent_fpm),
            ("detection.deployment_decel_g", d.deployment_decel_g),
            ("detection.canopy_descent_fpm", d.canopy_descent_fpm),
            ("detection.landing_descent_fpm", d.landing_descent_fpm),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("expected a positive number, got {}", value),
                });
            }
        }
        self.formation_tolerance()?;
        Ok(())
    }

    pub fn detector(&self) -> DetectorConfig {
        DetectorConfig::from(&self.detection)
    }

    pub fn formation_tolerance(&self) -> Result<chrono::Duration, ConfigError> {
        chrono::Duration::from_std(self.formation.tolerance).map_err(|e| ConfigError::Invalid {
            field: "formation.tolerance",
            message: e.to_string(),
        })
    }
}
