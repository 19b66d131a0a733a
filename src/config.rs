use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::models::Coordinate;
use crate::permission::PermissionStatus;

/// Environment variable holding the Google Maps API key.
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub maps: MapsConfig,
    pub location: LocationConfig,
    pub ui: UiConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MapsConfig {
    pub static_map_url: String,
    pub geocode_url: String,
    pub timeout_seconds: u64,
    // Never written to config.toml, comes from the environment.
    #[serde(skip)]
    pub api_key: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationConfig {
    pub default_lat: Option<f64>, // Picker starts here instead of "no location"
    pub default_lng: Option<f64>,
    pub permission: PermissionStatus, // Status before the user is ever asked
    pub source: PositionSourceKind,
    pub fixed_lat: f64, // Used when source = "fixed"
    pub fixed_lng: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PositionSourceKind {
    Ip,
    Fixed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
    pub map_step_degrees: f64,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            static_map_url: "https://maps.googleapis.com/maps/api/staticmap".to_string(),
            geocode_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            timeout_seconds: 10,
            api_key: String::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            maps: MapsConfig::default(),
            location: LocationConfig {
                default_lat: None,
                default_lng: None,
                permission: PermissionStatus::Undetermined,
                source: PositionSourceKind::Ip,
                fixed_lat: 55.75583,
                fixed_lng: 37.6173,
            },
            ui: UiConfig {
                tick_rate_ms: 150,
                map_step_degrees: 1.0,
            },
        }
    }
}

impl LocationConfig {
    /// Starting coordinate for the picker; the unset sentinel unless both
    /// halves are configured.
    pub fn default_coordinate(&self) -> Coordinate {
        match (self.default_lat, self.default_lng) {
            (Some(lat), Some(lng)) => Coordinate::new(lat, lng),
            _ => Coordinate::UNSET,
        }
    }
}

impl Config {
    /// Loads config.toml from the working directory and the API key from the
    /// environment (a `.env` file is honoured).
    /// If config.toml doesn't exist, writes the defaults out for the user to edit.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::load_from(Path::new("config.toml"));
        config.maps.api_key = std::env::var(API_KEY_VAR).unwrap_or_else(|_| {
            warn!("{} is not set; map previews and address lookups will be rejected.", API_KEY_VAR);
            String::new()
        });
        config
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(content) = fs::read_to_string(path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    return Config::default();
                }
            }
        }

        let default_config = Config::default();
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", path.display());
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }
}
