use anyhow::{anyhow, ensure, Result};
use nostalgia_core::{
    entities::MapPoint,
    gateways::{device::PositionOptions, query_cache::StalenessPolicy},
    geolocation::{GeolocationSettings, MapDefaults},
    limiter::LimiterSettings,
    viewport::ViewportSettings,
};
use nostalgia_gateways::http::RetryPolicy;
use std::{
    env, fs,
    io::ErrorKind,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

mod raw;

const DEFAULT_CONFIG_FILE_NAME: &str = "nostalgia.toml";

const ENV_NAME_API_URL: &str = "NOSTALGIA_API_URL";

const VALID_PRECISIONS: RangeInclusive<u8> = 3..=9;
const VALID_PINS_LIMITS: RangeInclusive<usize> = 1..=1000;

pub struct Config {
    pub api: Api,
    pub viewport: ViewportSettings,
    pub cache: Cache,
    pub geolocation: Geolocation,
    pub map: MapDefaults,
    pub storage: Storage,
}

impl Config {
    pub fn try_load_from_file_or_default<P: AsRef<Path>>(file_path: Option<P>) -> Result<Self> {
        let file_path: &Path = file_path.as_ref().map(|p| p.as_ref()).unwrap_or_else(|| {
            log::debug!("No configuration file specified. load {DEFAULT_CONFIG_FILE_NAME}");
            Path::new(DEFAULT_CONFIG_FILE_NAME)
        });

        let overrides = match fs::read_to_string(file_path) {
            Ok(cfg_string) => Some(cfg_string),
            Err(err) => match err.kind() {
                ErrorKind::NotFound => {
                    log::debug!(
                        "{} not found => load default configuration.",
                        file_path.display()
                    );
                    None
                }
                _ => return Err(err.into()),
            },
        };
        let raw_config = raw::Config::load(overrides.as_deref())?;
        let mut cfg = Self::try_from(raw_config)?;
        if let Ok(api_url) = env::var(ENV_NAME_API_URL) {
            cfg.api.base_url = api_url
                .parse()
                .map_err(|err| anyhow!("Invalid {ENV_NAME_API_URL} '{api_url}': {err}"))?;
        }
        Ok(cfg)
    }
}

pub struct Api {
    pub base_url: Url,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

pub struct Cache {
    pub staleness: StalenessPolicy,
    /// Cached queries are dropped this long after they have been fetched.
    pub gc_time: Duration,
}

pub struct Geolocation {
    /// Origin the client is served from
    pub origin: Url,
    pub settings: GeolocationSettings,
}

pub struct Storage {
    /// File system directory of the durable client state
    pub dir: PathBuf,
}

impl TryFrom<raw::Config> for Config {
    type Error = anyhow::Error;
    fn try_from(from: raw::Config) -> Result<Self> {
        let raw::Config {
            api,
            viewport,
            cache,
            geolocation,
            map,
            storage,
        } = from;

        let raw::Api {
            base_url,
            timeout,
            max_retries,
            retry_delay,
        } = api;
        let api = Api {
            base_url: base_url
                .parse()
                .map_err(|err| anyhow!("Invalid API base URL '{base_url}': {err}"))?,
            timeout,
            retry: RetryPolicy {
                max_retries,
                delay: retry_delay,
            },
        };

        let raw::Cache {
            pins_stale_time,
            location_detail_stale_time,
            gc_time,
        } = cache;
        let cache = Cache {
            staleness: StalenessPolicy {
                pins: pins_stale_time,
                location_detail: location_detail_stale_time,
            },
            gc_time,
        };

        let raw::Viewport {
            fetch_precision,
            key_precision,
            max_entries,
            throttle,
            min_zoom_for_pins,
            pins_limit,
        } = viewport;
        ensure!(
            VALID_PRECISIONS.contains(&fetch_precision),
            "The fetch precision must be within {VALID_PRECISIONS:?}"
        );
        ensure!(
            VALID_PRECISIONS.contains(&key_precision),
            "The key precision must be within {VALID_PRECISIONS:?}"
        );
        ensure!(max_entries > 0, "At least one viewport query must be cached");
        ensure!(
            VALID_PINS_LIMITS.contains(&pins_limit),
            "The pins limit must be within {VALID_PINS_LIMITS:?}"
        );
        ensure!(
            min_zoom_for_pins.is_finite(),
            "Invalid minimum zoom for pins"
        );
        let viewport = ViewportSettings {
            fetch_precision,
            key_precision,
            min_zoom_for_pins,
            pins_limit,
            pins_stale_time: cache.staleness.pins,
            limiter: LimiterSettings {
                max_entries,
                throttle,
            },
        };

        let raw::Geolocation {
            origin,
            timeout,
            max_age,
            high_accuracy,
            auto_request,
        } = geolocation;
        let geolocation = Geolocation {
            origin: origin
                .parse()
                .map_err(|err| anyhow!("Invalid origin '{origin}': {err}"))?,
            settings: GeolocationSettings {
                options: PositionOptions {
                    timeout,
                    max_age,
                    high_accuracy,
                },
                auto_request,
            },
        };

        let raw::Map {
            default_center: [lat, lng],
            default_zoom,
            user_zoom,
        } = map;
        let map = MapDefaults {
            center: MapPoint::try_from_lat_lng_deg(lat, lng)?,
            zoom: default_zoom,
            user_zoom,
        };

        let raw::Storage { dir } = storage;
        let storage = Storage { dir };

        Ok(Self {
            api,
            viewport,
            cache,
            geolocation,
            map,
            storage,
        })
    }
}
