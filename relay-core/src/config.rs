use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{
    location::{
        DEFAULT_IP_LOOKUP_URL, FixedLocationProvider, GuardedLocationProvider, IpLocationProvider,
        LocationProvider,
    },
    model::{Coordinates, LocationOptions},
    weather::{DEFAULT_WEATHER_URL, OpenWeatherClient},
};

/// Where positions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Configured `latitude` / `longitude`.
    #[default]
    Fixed,
    /// IP geolocation lookup.
    Ip,
}

impl LocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSource::Fixed => "fixed",
            LocationSource::Ip => "ip",
        }
    }

    pub const fn all() -> &'static [LocationSource] {
        &[LocationSource::Fixed, LocationSource::Ip]
    }
}

impl std::fmt::Display for LocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for LocationSource {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "fixed" => Ok(LocationSource::Fixed),
            "ip" => Ok(LocationSource::Ip),
            _ => Err(anyhow!(
                "Unknown location source '{value}'. Supported sources: fixed, ip."
            )),
        }
    }
}

/// `[weather]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHER_URL.to_string(),
        }
    }
}

/// `[location]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub source: LocationSource,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub ip_lookup_url: String,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSource::Fixed,
            latitude: None,
            longitude: None,
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
            timeout_ms: LocationOptions::DEFAULT_TIMEOUT.as_millis() as u64,
            maximum_age_ms: LocationOptions::DEFAULT_MAXIMUM_AGE.as_millis() as u64,
        }
    }
}

impl LocationConfig {
    pub fn options(&self) -> LocationOptions {
        LocationOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            maximum_age: Duration::from_millis(self.maximum_age_ms),
        }
    }

    pub fn fixed_coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [weather]
/// base_url = "http://api.openweathermap.org/data/2.5/weather"
///
/// [location]
/// source = "fixed"
/// latitude = 37.7749
/// longitude = -122.4194
/// timeout_ms = 15000
/// maximum_age_ms = 60000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub weather: WeatherConfig,
    pub location: LocationConfig,
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-relay", "weather-relay")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_fixed_location(&mut self, coordinates: Coordinates) {
        self.location.source = LocationSource::Fixed;
        self.location.latitude = Some(coordinates.latitude);
        self.location.longitude = Some(coordinates.longitude);
    }

    pub fn weather_client(&self) -> OpenWeatherClient {
        OpenWeatherClient::new(self.weather.base_url.clone())
    }

    /// Build the configured location provider, wrapped so that the timeout
    /// and maximum age are enforced.
    pub fn location_provider(&self) -> Result<Arc<dyn LocationProvider>> {
        let provider: Arc<dyn LocationProvider> = match self.location.source {
            LocationSource::Fixed => {
                let coords = self.location.fixed_coordinates().ok_or_else(|| {
                    anyhow!(
                        "No fixed location configured.\n\
                         Hint: run `weather-relay configure` or pass --lat and --lon."
                    )
                })?;
                Arc::new(GuardedLocationProvider::new(FixedLocationProvider::new(coords)))
            }
            LocationSource::Ip => Arc::new(GuardedLocationProvider::new(IpLocationProvider::new(
                self.location.ip_lookup_url.clone(),
            ))),
        };

        Ok(provider)
    }
}
