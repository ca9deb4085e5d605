use jfs::Store;
use nostalgia_core::{
    entities::*,
    repositories::{ConsentRepo, Error as RepoError, OnboardingRepo},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

type Result<T> = std::result::Result<T, RepoError>;

const CONSENT_KEY: &str = "consent";
const LAST_POSITION_KEY: &str = "last-position";
const ONBOARDING_DISMISSED_KEY: &str = "onboarding-dismissed";

/// Durable key-value storage backed by one JSON file per key.
pub struct JsonFileStorage {
    json_store: Store,
    path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize)]
struct JsonConsent {
    state: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct JsonPosition {
    lat: f64,
    lng: f64,
    ts: i64,
    accuracy: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize)]
struct JsonFlag {
    value: bool,
}

impl From<&Position> for JsonPosition {
    fn from(from: &Position) -> Self {
        let (lat, lng) = from.pos.to_lat_lng_deg();
        Self {
            lat,
            lng,
            ts: from.ts.as_millis(),
            accuracy: from.accuracy,
        }
    }
}

impl TryFrom<JsonPosition> for Position {
    type Error = RepoError;

    fn try_from(from: JsonPosition) -> Result<Self> {
        let JsonPosition {
            lat,
            lng,
            ts,
            accuracy,
        } = from;
        let pos = MapPoint::try_from_lat_lng_deg(lat, lng)
            .map_err(|err| RepoError::Corrupt(format!("last position: {err}")))?;
        Ok(Self {
            pos,
            ts: TimestampMs::from_millis(ts),
            accuracy,
        })
    }
}

impl JsonFileStorage {
    pub fn try_new<P: AsRef<Path>>(directory: P) -> io::Result<Self> {
        let path = directory.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        let json_store = Store::new(&path)?;
        Ok(Self { json_store, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.json_store.get::<T>(key) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                log::warn!("Unable to read '{key}' from {}: {err}", self.path.display());
                Err(err.into())
            }
        }
    }

    fn save<T: Serialize + DeserializeOwned>(&self, key: &str, value: &T) -> Result<()> {
        self.json_store.save_with_id(value, key)?;
        Ok(())
    }
}

impl ConsentRepo for JsonFileStorage {
    fn consent(&self) -> Result<ConsentState> {
        let Some(JsonConsent { state }) = self.load(CONSENT_KEY)? else {
            return Ok(ConsentState::Unset);
        };
        state
            .parse()
            .map_err(|_| RepoError::Corrupt(format!("consent '{state}'")))
    }

    fn set_consent(&self, consent: ConsentState) -> Result<()> {
        let state = consent.as_ref().to_owned();
        self.save(CONSENT_KEY, &JsonConsent { state })
    }

    fn last_position(&self) -> Result<Option<Position>> {
        self.load::<JsonPosition>(LAST_POSITION_KEY)?
            .map(TryFrom::try_from)
            .transpose()
    }

    fn set_last_position(&self, position: &Position) -> Result<()> {
        self.save(LAST_POSITION_KEY, &JsonPosition::from(position))
    }
}

impl OnboardingRepo for JsonFileStorage {
    fn is_onboarding_dismissed(&self) -> Result<bool> {
        Ok(self
            .load::<JsonFlag>(ONBOARDING_DISMISSED_KEY)?
            .is_some_and(|flag| flag.value))
    }

    fn set_onboarding_dismissed(&self, dismissed: bool) -> Result<()> {
        self.save(ONBOARDING_DISMISSED_KEY, &JsonFlag { value: dismissed })
    }
}
