use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{fetcher::RefreshPolicy, model::Location};

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// timeout_secs = 10
/// refresh_policy = "keep_stale"
///
/// [default_location]
/// display_name = "Paris, Île-de-France, FR"
/// timezone = "Europe/Paris"
/// latitude = 48.85341
/// longitude = 2.3488
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub forecast_url: String,
    pub geocoding_url: String,

    /// Per-request timeout applied by the HTTP client.
    pub timeout_secs: u64,

    pub refresh_policy: RefreshPolicy,

    /// Location shown when none is requested explicitly.
    pub default_location: Location,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            timeout_secs: 30,
            refresh_policy: RefreshPolicy::default(),
            default_location: Location::new(
                "Fullerton, CA",
                "America/Los_Angeles",
                33.8703,
                -117.9253,
            ),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn set_default_location(&mut self, location: Location) {
        self.default_location = location;
    }

    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
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
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_open_meteo() {
        let cfg = Config::default();

        assert_eq!(cfg.forecast_url, DEFAULT_FORECAST_URL);
        assert_eq!(cfg.geocoding_url, DEFAULT_GEOCODING_URL);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.default_location.display_name, "Fullerton, CA");
        assert_eq!(cfg.refresh_policy, RefreshPolicy::ClearOnRefresh);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg = Config::from_toml("refresh_policy = \"keep_stale\"\ntimeout_secs = 5\n")
            .expect("partial config must parse");

        assert_eq!(cfg.refresh_policy, RefreshPolicy::KeepStale);
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.forecast_url, DEFAULT_FORECAST_URL);
        assert_eq!(cfg.default_location, Config::default().default_location);
    }

    #[test]
    fn set_default_location_survives_toml_roundtrip() {
        let mut cfg = Config::default();
        cfg.set_default_location(Location::new("Tokyo, JP", "Asia/Tokyo", 35.6895, 139.69171));

        let text = toml::to_string_pretty(&cfg).expect("config must serialize");
        let parsed = Config::from_toml(&text).expect("config must parse");

        assert_eq!(parsed, cfg);
        assert_eq!(parsed.default_location.timezone, "Asia/Tokyo");
    }

    #[test]
    fn unknown_refresh_policy_is_rejected() {
        assert!(Config::from_toml("refresh_policy = \"sometimes\"").is_err());
    }
}
