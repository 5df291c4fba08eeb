use crate::model::LightId;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LIGHT_IDS: &[LightId] = &[11, 12, 13];
pub const DEFAULT_NUM_COLORS: usize = 3;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_BACKOFF_INTERVAL: Duration = Duration::from_secs(5);
/// Highest brightness the bridge accepts.
pub const MAX_DEVICE_BRIGHTNESS: u8 = 254;
pub const DEFAULT_TRANSITION_TIME: u16 = 10;
pub const DEFAULT_MIN_BRIGHTNESS: u8 = 30;
pub const DEFAULT_MAX_BRIGHTNESS: u8 = 230;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

impl ConfigError {
    fn invalid(key: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Settings the sync loop reads at the start of every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub light_ids: Vec<LightId>,
    /// Requested palette size; capped by the number of lights.
    pub num_colors: usize,
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,
    #[serde(with = "duration_secs")]
    pub backoff_interval: Duration,
    pub brightness: u8,
    /// Deciseconds.
    pub transition_time: u16,
    pub saturation_boost: Option<f32>,
    pub min_brightness: u8,
    pub max_brightness: u8,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            light_ids: DEFAULT_LIGHT_IDS.to_vec(),
            num_colors: DEFAULT_NUM_COLORS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            backoff_interval: DEFAULT_BACKOFF_INTERVAL,
            brightness: MAX_DEVICE_BRIGHTNESS,
            transition_time: DEFAULT_TRANSITION_TIME,
            saturation_boost: None,
            min_brightness: DEFAULT_MIN_BRIGHTNESS,
            max_brightness: DEFAULT_MAX_BRIGHTNESS,
        }
    }
}

impl SyncConfig {
    /// Number of colors actually extracted: never more than there are lights.
    pub fn color_count(&self) -> usize {
        self.num_colors.min(self.light_ids.len())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.light_ids.is_empty() {
            return Err(ConfigError::invalid("light_ids", "[]", "at least one light is required"));
        }
        if let Some(id) = self.light_ids.iter().find(|id| **id == 0) {
            return Err(ConfigError::invalid("light_ids", id, "light ids are positive"));
        }
        for (i, id) in self.light_ids.iter().enumerate() {
            if self.light_ids[..i].contains(id) {
                return Err(ConfigError::invalid("light_ids", id, "duplicate light id"));
            }
        }
        if self.num_colors == 0 {
            return Err(ConfigError::invalid("num_colors", 0, "at least one color is required"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::invalid(
                "poll_interval",
                format!("{:?}", self.poll_interval),
                "must be positive",
            ));
        }
        if self.backoff_interval <= self.poll_interval {
            return Err(ConfigError::invalid(
                "backoff_interval",
                format!("{:?}", self.backoff_interval),
                "must be longer than the poll interval",
            ));
        }
        if self.brightness > MAX_DEVICE_BRIGHTNESS {
            return Err(ConfigError::invalid("brightness", self.brightness, "must be 0-254"));
        }
        if self.max_brightness > MAX_DEVICE_BRIGHTNESS {
            return Err(ConfigError::invalid(
                "max_brightness",
                self.max_brightness,
                "must be 0-254",
            ));
        }
        if self.min_brightness > self.max_brightness {
            return Err(ConfigError::invalid(
                "min_brightness",
                self.min_brightness,
                "must not exceed max_brightness",
            ));
        }
        if let Some(factor) = self.saturation_boost {
            if !(factor.is_finite() && factor > 0.0) {
                return Err(ConfigError::invalid("saturation_boost", factor, "must be positive"));
            }
        }
        Ok(())
    }

    /// Returns a copy with `update` applied, or the first validation error.
    pub fn apply(&self, update: ConfigUpdate) -> Result<SyncConfig, ConfigError> {
        let mut next = self.clone();
        if let Some(light_ids) = update.light_ids {
            next.light_ids = light_ids;
        }
        if let Some(num_colors) = update.num_colors {
            next.num_colors = num_colors;
        }
        if let Some(interval) = update.poll_interval {
            next.poll_interval = interval;
        }
        if let Some(interval) = update.backoff_interval {
            next.backoff_interval = interval;
        }
        if let Some(brightness) = update.brightness {
            next.brightness = brightness;
        }
        if let Some(transition) = update.transition_time {
            next.transition_time = transition;
        }
        if let Some(boost) = update.saturation_boost {
            next.saturation_boost = boost;
        }
        if let Some(min) = update.min_brightness {
            next.min_brightness = min;
        }
        if let Some(max) = update.max_brightness {
            next.max_brightness = max;
        }
        next.validate()?;
        Ok(next)
    }
}

/// A partial configuration change staged by an operator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigUpdate {
    pub light_ids: Option<Vec<LightId>>,
    pub num_colors: Option<usize>,
    #[serde(default, with = "duration_secs::option")]
    pub poll_interval: Option<Duration>,
    #[serde(default, with = "duration_secs::option")]
    pub backoff_interval: Option<Duration>,
    pub brightness: Option<u8>,
    pub transition_time: Option<u16>,
    /// `Some(None)` (JSON `null`) turns boosting off.
    #[serde(default, deserialize_with = "double_option")]
    pub saturation_boost: Option<Option<f32>>,
    pub min_brightness: Option<u8>,
    pub max_brightness: Option<u8>,
}

/// A field that is present, even as `null`, becomes `Some`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Bridge address and pre-paired username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HueSettings {
    pub bridge_ip: String,
    pub username: String,
}

/// Playback service app credentials plus a refresh token obtained out-of-band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifySettings {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub hue: HueSettings,
    pub spotify: SpotifySettings,
    pub sync: SyncConfig,
}

const REQUIRED_KEYS: [&str; 5] = [
    "HUE_BRIDGE_IP",
    "HUE_USERNAME",
    "SPOTIFY_CLIENT_ID",
    "SPOTIFY_CLIENT_SECRET",
    "SPOTIFY_REFRESH_TOKEN",
];

impl AppConfig {
    /// Loads `env_file` (or `.env` in the working directory) into the process
    /// environment when present, then reads the configuration from it.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let loaded = match env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };
        if loaded {
            info!("Loaded environment file");
        } else {
            debug!("No environment file found, using process environment only");
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        let required = |key: &str| get(key).unwrap_or_default();

        let mut sync = SyncConfig::default();
        if let Some(raw) = get("HUE_LIGHT_IDS") {
            sync.light_ids = parse_light_ids(&raw)?;
        }
        if let Some(raw) = get("NUM_COLORS") {
            sync.num_colors = parse_number("NUM_COLORS", &raw)?;
        }
        if let Some(raw) = get("UPDATE_INTERVAL") {
            sync.poll_interval = Duration::from_secs(parse_number("UPDATE_INTERVAL", &raw)?);
        }
        if let Some(raw) = get("BACKOFF_INTERVAL") {
            sync.backoff_interval = Duration::from_secs(parse_number("BACKOFF_INTERVAL", &raw)?);
        }
        if let Some(raw) = get("BRIGHTNESS") {
            sync.brightness = parse_number("BRIGHTNESS", &raw)?;
        }
        if let Some(raw) = get("TRANSITION_TIME") {
            sync.transition_time = parse_number("TRANSITION_TIME", &raw)?;
        }
        if let Some(raw) = get("SATURATION_BOOST") {
            sync.saturation_boost = Some(parse_number("SATURATION_BOOST", &raw)?);
        }
        if let Some(raw) = get("MIN_BRIGHTNESS") {
            sync.min_brightness = parse_number("MIN_BRIGHTNESS", &raw)?;
        }
        if let Some(raw) = get("MAX_BRIGHTNESS") {
            sync.max_brightness = parse_number("MAX_BRIGHTNESS", &raw)?;
        }
        sync.validate()?;

        Ok(Self {
            hue: HueSettings {
                bridge_ip: required("HUE_BRIDGE_IP"),
                username: required("HUE_USERNAME"),
            },
            spotify: SpotifySettings {
                client_id: required("SPOTIFY_CLIENT_ID"),
                client_secret: required("SPOTIFY_CLIENT_SECRET"),
                refresh_token: required("SPOTIFY_REFRESH_TOKEN"),
            },
            sync,
        })
    }
}

/// Parses a comma-separated light id list such as `"11, 12,13"`.
pub fn parse_light_ids(raw: &str) -> Result<Vec<LightId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<LightId>()
                .map_err(|e| ConfigError::invalid("HUE_LIGHT_IDS", part, e.to_string()))
        })
        .collect()
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::invalid(key, raw, e.to_string()))
}

/// Durations as fractional seconds on the wire.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer};
        use std::time::Duration;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            match Option::<f64>::deserialize(deserializer)? {
                Some(secs) => Duration::try_from_secs_f64(secs)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
