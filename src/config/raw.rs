use duration_str::deserialize_duration;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

const DEFAULT_CONFIG_FILE: &str = include_str!("nostalgia.default.toml");

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub api: Api,
    pub viewport: Viewport,
    pub cache: Cache,
    pub geolocation: Geolocation,
    pub map: Map,
    pub storage: Storage,
}

impl Config {
    /// Parses `overrides` on top of the embedded default configuration.
    pub fn load(overrides: Option<&str>) -> Result<Self, toml::de::Error> {
        let mut table: toml::Table = toml::from_str(DEFAULT_CONFIG_FILE)?;
        if let Some(overrides) = overrides {
            merge(&mut table, toml::from_str(overrides)?);
        }
        toml::Value::Table(table).try_into()
    }
}

fn merge(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        if let toml::Value::Table(overrides) = value {
            if let Some(toml::Value::Table(base)) = base.get_mut(&key) {
                merge(base, overrides);
                continue;
            }
            base.insert(key, toml::Value::Table(overrides));
        } else {
            base.insert(key, value);
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Api {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    pub max_retries: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub retry_delay: Duration,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Viewport {
    pub fetch_precision: u8,
    pub key_precision: u8,
    pub max_entries: usize,
    #[serde(deserialize_with = "deserialize_duration")]
    pub throttle: Duration,
    pub min_zoom_for_pins: f64,
    pub pins_limit: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cache {
    #[serde(deserialize_with = "deserialize_duration")]
    pub pins_stale_time: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub location_detail_stale_time: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub gc_time: Duration,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Geolocation {
    pub origin: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_age: Duration,
    pub high_accuracy: bool,
    pub auto_request: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Map {
    /// Latitude and longitude in degrees
    pub default_center: [f64; 2],
    pub default_zoom: f64,
    pub user_zoom: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Storage {
    pub dir: PathBuf,
}
