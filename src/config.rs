use log::{debug, info};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{AddressParseError, HardwareAddress};
use crate::registry::{SensorRegistry, SensorRegistryEntry};

/// Dataset name written with every reading unless configured otherwise
pub const DEFAULT_MEASUREMENT: &str = "Sensor data";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidAddress(#[from] AddressParseError),

    #[error("invalid RuuviTag entry '{0}', expected MAC=Name")]
    InvalidTag(String),

    #[error("address {address} configured for both '{first}' and '{second}'")]
    DuplicateAddress {
        address: HardwareAddress,
        first: String,
        second: String,
    },

    #[error("DATABASE_URL not set")]
    MissingDatabaseUrl,

    #[error("No RuuviTag sensors configured. Please set RUUVI_TAGS or RUUVI_TAG_<N>_MAC/RUUVI_TAG_<N>_NAME environment variables, or list sensors in the config file")]
    NoSensors,
}

#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Known sensors, in configuration order
    pub sensors: Vec<SensorRegistryEntry>,
    pub database_url: String,
    pub measurement: String,
    /// Bluetooth controller name (e.g. "hci0"); default adapter when unset
    pub adapter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    #[serde(default)]
    database: DatabaseSection,
    #[serde(default)]
    bluetooth: BluetoothSection,
    #[serde(default)]
    sensors: Vec<SensorRegistryEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
    url: Option<String>,
    measurement: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BluetoothSection {
    controller: Option<String>,
}

/// Keep only variables whose name and value are valid UTF-8
fn utf8_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> HashMap<String, String> {
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

impl SensorConfig {
    /// Load from a JSON file when given, otherwise from the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();

        let vars = utf8_vars(env::vars_os());
        let config = match path {
            Some(path) => {
                let body = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json(&body, &vars)?
            }
            None => Self::from_vars(&vars)?,
        };

        info!("Total tags loaded: {}", config.sensors.len());
        for sensor in &config.sensors {
            debug!("Tag: {} -> {}", sensor.address, sensor.location);
        }

        Ok(config)
    }

    /// Parse the JSON config format; `DATABASE_URL` fills in a missing database url
    pub fn from_json(body: &str, vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let file: FileConfig = serde_json::from_str(body)?;

        let database_url = file
            .database
            .url
            .or_else(|| vars.get("DATABASE_URL").cloned())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let config = SensorConfig {
            sensors: file.sensors,
            database_url,
            measurement: file
                .database
                .measurement
                .unwrap_or_else(|| DEFAULT_MEASUREMENT.to_string()),
            adapter: file.bluetooth.controller,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build from environment-style variables
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .cloned()
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let mut sensors = Vec::new();

        // Try RUUVI_TAGS format first
        if let Some(ruuvi_tags) = vars.get("RUUVI_TAGS") {
            debug!("Found RUUVI_TAGS: '{}'", ruuvi_tags);
            for pair in ruuvi_tags.split(',') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }
                let (mac, name) = pair
                    .split_once('=')
                    .ok_or_else(|| ConfigError::InvalidTag(pair.to_string()))?;
                let (mac, name) = (mac.trim(), name.trim());
                if name.is_empty() {
                    return Err(ConfigError::InvalidTag(pair.to_string()));
                }
                sensors.push(SensorRegistryEntry {
                    location: name.to_string(),
                    address: mac.parse()?,
                });
            }
        } else {
            // Fallback to individual variables, ordered by index
            debug!("RUUVI_TAGS environment variable not found, trying individual variables");
            let mut indexed = Vec::new();
            for (key, value) in vars {
                if let Some(index) = key
                    .strip_prefix("RUUVI_TAG_")
                    .and_then(|s| s.strip_suffix("_MAC"))
                {
                    let name_key = format!("RUUVI_TAG_{}_NAME", index);
                    if let Some(name) = vars.get(&name_key) {
                        indexed.push((index.to_string(), value.trim(), name.trim()));
                    }
                }
            }
            indexed.sort_by(|(a, _, _), (b, _, _)| {
                match (a.parse::<u32>(), b.parse::<u32>()) {
                    (Ok(a), Ok(b)) => a.cmp(&b),
                    _ => a.cmp(b),
                }
            });
            for (_, mac, name) in indexed {
                sensors.push(SensorRegistryEntry {
                    location: name.to_string(),
                    address: mac.parse()?,
                });
            }
        }

        let config = SensorConfig {
            sensors,
            database_url,
            measurement: vars
                .get("MEASUREMENT")
                .cloned()
                .unwrap_or_else(|| DEFAULT_MEASUREMENT.to_string()),
            adapter: vars.get("BLUETOOTH_ADAPTER").cloned(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sensors.is_empty() {
            return Err(ConfigError::NoSensors);
        }

        let mut seen: HashSet<HardwareAddress> = HashSet::new();
        for sensor in &self.sensors {
            if !seen.insert(sensor.address) {
                let first = self
                    .sensors
                    .iter()
                    .find(|s| s.address == sensor.address)
                    .map(|s| s.location.clone())
                    .unwrap_or_default();
                return Err(ConfigError::DuplicateAddress {
                    address: sensor.address,
                    first,
                    second: sensor.location.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn registry(&self) -> SensorRegistry {
        SensorRegistry::new(self.sensors.clone())
    }
}
