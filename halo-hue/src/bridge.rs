//! HTTP client for the bridge's v1 REST API.

use async_trait::async_trait;
use halo_core::{
    DynResult, HueSettings, LightGroup, LightId, LightInfo, LightState, LightingBridge,
};
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Timeout for every bridge request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Group 0 is the bridge's implicit "all lights" group.
const ALL_LIGHTS_GROUP: &str = "0";

#[derive(Debug, thiserror::Error)]
pub enum HueError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected bridge response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bridge error {kind} at {address}: {description}")]
    Api {
        kind: u32,
        address: String,
        description: String,
    },

    #[error("invalid id {0:?} in bridge response")]
    InvalidId(String),
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: u32,
    #[serde(default)]
    address: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ResponseEntry {
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLightState {
    #[serde(default)]
    on: bool,
    #[serde(default)]
    reachable: bool,
}

#[derive(Debug, Deserialize)]
struct RawLight {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    state: RawLightState,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    lights: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StateCommand {
    on: bool,
    xy: [f64; 2],
    bri: u8,
    transitiontime: u16,
}

/// A paired bridge, addressed as `<base>/lights`, `<base>/groups`, ...
#[derive(Debug, Clone)]
pub struct HueBridge {
    client: Client,
    base_url: String,
}

impl HueBridge {
    /// Connects to `https://<bridge_ip>/api/<username>`. The bridge serves a
    /// self-signed certificate, so certificate validation is disabled.
    pub fn new(settings: &HueSettings) -> Result<Self, HueError> {
        Self::with_base_url(format!(
            "https://{}/api/{}",
            settings.bridge_ip, settings.username
        ))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, HueError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// All lights known to the bridge, ordered by id.
    pub async fn lights(&self) -> Result<Vec<LightInfo>, HueError> {
        let raw: BTreeMap<String, RawLight> = self.get("lights").await?;
        let mut lights = raw
            .into_iter()
            .map(|(id, light)| Ok(light_info(parse_id(&id)?, light)))
            .collect::<Result<Vec<_>, HueError>>()?;
        lights.sort_by_key(|light| light.id);
        Ok(lights)
    }

    /// Rooms and zones, ordered by id, without the implicit all-lights group.
    pub async fn groups(&self) -> Result<Vec<LightGroup>, HueError> {
        let raw: BTreeMap<String, RawGroup> = self.get("groups").await?;
        let mut groups = Vec::with_capacity(raw.len());
        for (id, group) in raw {
            if id == ALL_LIGHTS_GROUP {
                continue;
            }
            let lights = group
                .lights
                .iter()
                .map(|light| parse_id(light))
                .collect::<Result<Vec<_>, _>>()?;
            groups.push(LightGroup {
                id: parse_id(&id)?,
                name: group.name,
                kind: group.kind,
                class: group.class,
                lights,
            });
        }
        groups.sort_by_key(|group| group.id);
        Ok(groups)
    }

    /// Turns the light on at the given color, brightness and transition.
    pub async fn set_light_state(&self, id: LightId, state: &LightState) -> Result<(), HueError> {
        let command = StateCommand {
            on: true,
            xy: [state.xy.0, state.xy.1],
            bri: state.brightness,
            transitiontime: state.transition,
        };
        let url = format!("{}/lights/{}/state", self.base_url, id);
        debug!("PUT {} {:?}", url, command);
        let body: Value = self
            .client
            .put(url)
            .json(&command)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        check_api_errors(&body)
    }

    /// True when the bridge answers with at least one light.
    pub async fn test_connection(&self) -> bool {
        match self.lights().await {
            Ok(lights) => !lights.is_empty(),
            Err(e) => {
                warn!("Bridge connection test failed: {}", e);
                false
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, HueError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {}", url);
        let body: Value = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        check_api_errors(&body)?;
        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl LightingBridge for HueBridge {
    async fn list_lights(&self) -> DynResult<Vec<LightInfo>> {
        Ok(self.lights().await?)
    }

    async fn list_groups(&self) -> DynResult<Vec<LightGroup>> {
        Ok(self.groups().await?)
    }

    async fn set_state(&self, light: LightId, state: &LightState) -> DynResult<()> {
        Ok(self.set_light_state(light, state).await?)
    }

    async fn check_reachable(&self) -> bool {
        self.test_connection().await
    }
}

/// The bridge reports failures as HTTP 200 with a list of `{"error": ..}` entries.
fn check_api_errors(body: &Value) -> Result<(), HueError> {
    let Value::Array(items) = body else {
        return Ok(());
    };
    for item in items {
        let entry: ResponseEntry = serde_json::from_value(item.clone())?;
        if let Some(error) = entry.error {
            return Err(HueError::Api {
                kind: error.kind,
                address: error.address,
                description: error.description,
            });
        }
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<u32, HueError> {
    raw.parse().map_err(|_| HueError::InvalidId(raw.to_string()))
}

fn light_info(id: LightId, raw: RawLight) -> LightInfo {
    LightInfo::new(id, raw.name, raw.kind, raw.state.on, raw.state.reachable)
}
