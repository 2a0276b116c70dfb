use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use crate::{display::TemperatureUnit, model::Coordinate, provider::ProviderId};

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Which coordinate a forecast is fetched for once a device fix is known.
///
/// `Fixed` keeps the device fix as a readiness gate only and always queries
/// the configured point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CoordinateSource {
    Fixed {
        latitude: f64,
        longitude: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Device,
}

impl CoordinateSource {
    pub fn fixed(coordinate: Coordinate) -> Self {
        CoordinateSource::Fixed {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            label: None,
        }
    }

    /// Coordinate to query given the device fix that triggered the fetch.
    pub fn resolve(&self, device: Coordinate) -> Coordinate {
        match self {
            CoordinateSource::Fixed { latitude, longitude, .. } => {
                Coordinate::new(*latitude, *longitude)
            }
            CoordinateSource::Device => device,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            CoordinateSource::Fixed { label, .. } => label.as_deref(),
            CoordinateSource::Device => None,
        }
    }
}

impl Default for CoordinateSource {
    fn default() -> Self {
        CoordinateSource::Fixed {
            latitude: 1.30437,
            longitude: 103.82458,
            label: Some("Singapore".to_string()),
        }
    }
}

fn default_location_timeout_secs() -> u64 {
    30
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Optional default provider id, "open-meteo" or "weatherapi".
    /// Unset means Open-Meteo.
    #[serde(default)]
    pub default_provider: Option<String>,

    /// Seconds to wait for a first location fix.
    #[serde(default = "default_location_timeout_secs")]
    pub location_timeout_secs: u64,

    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Example TOML:
    /// [providers.weatherapi]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Example TOML:
    /// [coordinate]
    /// mode = "device"
    #[serde(default)]
    pub coordinate: CoordinateSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: None,
            providers: HashMap::new(),
            coordinate: CoordinateSource::default(),
            location_timeout_secs: default_location_timeout_secs(),
            temperature_unit: TemperatureUnit::default(),
        }
    }
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        match self.default_provider.as_deref() {
            None => Ok(ProviderId::OpenMeteo),
            Some(s) => ProviderId::try_from(s).with_context(|| {
                format!(
                    "Invalid default provider in config.\n\
                     Hint: run `weatherfast configure <provider>` (e.g. `weatherfast configure {}`).",
                    ProviderId::OpenMeteo
                )
            }),
        }
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_secs)
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
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

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
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
        let dirs = ProjectDirs::from("dev", "weatherfast", "weatherfast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set/replace a provider API key; the first keyed provider becomes the default.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        !provider_id.requires_api_key() || self.provider_api_key(provider_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_open_meteo_and_fixed_singapore() {
        let cfg = Config::default();

        assert_eq!(cfg.default_provider_id().unwrap(), ProviderId::OpenMeteo);
        assert_eq!(cfg.coordinate.label(), Some("Singapore"));
        assert_eq!(cfg.location_timeout(), Duration::from_secs(30));
        assert!(cfg.is_provider_configured(ProviderId::OpenMeteo));
        assert!(!cfg.is_provider_configured(ProviderId::WeatherApi));
    }

    #[test]
    fn invalid_default_provider_is_reported() {
        let cfg = Config { default_provider: Some("nope".into()), ..Config::default() };
        let err = cfg.default_provider_id().unwrap_err();

        assert!(format!("{err:#}").contains("Unknown provider 'nope'"));
    }

    #[test]
    fn set_api_key_and_default_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "WA_KEY".into());

        let default = cfg.default_provider_id().expect("default provider must exist");
        assert_eq!(default, ProviderId::WeatherApi);
        assert_eq!(cfg.provider_api_key(ProviderId::WeatherApi), Some("WA_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::WeatherApi));
    }

    #[test]
    fn set_default_provider_overrides_default() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "WA_KEY".into());
        cfg.set_default_provider(ProviderId::OpenMeteo);

        let default = cfg.default_provider_id().expect("default provider must exist");
        assert_eq!(default, ProviderId::OpenMeteo);
    }

    #[test]
    fn fixed_mode_ignores_device_coordinate() {
        let source = CoordinateSource::default();
        let device = Coordinate::new(51.5, -0.12);

        assert_eq!(source.resolve(device), Coordinate::new(1.30437, 103.82458));
        assert_eq!(CoordinateSource::Device.resolve(device), device);
    }

    #[test]
    fn parses_toml_with_device_mode() {
        let cfg = Config::from_toml(
            r#"
            default_provider = "weatherapi"
            location_timeout_secs = 5
            temperature_unit = "fahrenheit"

            [providers.weatherapi]
            api_key = "abc"

            [coordinate]
            mode = "device"
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.coordinate, CoordinateSource::Device);
        assert_eq!(cfg.location_timeout_secs, 5);
        assert_eq!(cfg.temperature_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(cfg.provider_api_key(ProviderId::WeatherApi), Some("abc"));
    }

    #[test]
    fn parses_toml_with_fixed_mode_and_defaults() {
        let cfg = Config::from_toml(
            r#"
            [coordinate]
            mode = "fixed"
            latitude = 48.85
            longitude = 2.35
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.coordinate, CoordinateSource::fixed(Coordinate::new(48.85, 2.35)));
        assert_eq!(cfg.location_timeout_secs, 30);
        assert!(cfg.providers.is_empty());
    }

    #[test]
    fn toml_roundtrip_keeps_coordinate_mode() {
        let cfg = Config::default();
        let text = toml::to_string_pretty(&cfg).expect("serializable");
        let back = Config::from_toml(&text).expect("parseable");

        assert_eq!(back.coordinate, cfg.coordinate);
    }
}
