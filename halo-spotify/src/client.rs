//! HTTP client for the playback service's Web API.

use crate::auth::TokenManager;
use crate::error::{Result, SpotifyError};
use crate::models::{PlaybackState, UserProfile};
use async_trait::async_trait;
use halo_core::{DynResult, PlaybackSource, SpotifySettings, Track};
use log::{debug, info, warn};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Default Web API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

/// Default accounts service base URL (token endpoint lives under it).
pub const DEFAULT_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";

/// Default timeout for API requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Client for the currently-playing endpoints.
///
/// Authorization happens out-of-band: the client only needs the app
/// credentials and a refresh token, and mints access tokens as needed.
#[derive(Debug)]
pub struct SpotifyClient {
    client: Client,
    api_base: String,
    tokens: TokenManager,
}

impl SpotifyClient {
    /// Create a client against the public service endpoints.
    pub fn new(settings: &SpotifySettings) -> Result<Self> {
        Self::builder(settings).build()
    }

    /// Create a builder for overriding endpoints and timeouts.
    pub fn builder(settings: &SpotifySettings) -> ClientBuilder {
        ClientBuilder {
            settings: settings.clone(),
            api_base: DEFAULT_API_BASE.to_string(),
            accounts_base: DEFAULT_ACCOUNTS_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// The track currently playing, or `None` when playback is paused,
    /// stopped, or showing something that is not a track.
    pub async fn current_track(&self) -> Result<Option<Track>> {
        let Some(response) = self.get("me/player").await? else {
            return Ok(None);
        };
        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }
        let state: PlaybackState = serde_json::from_slice(&body)?;
        Ok(state.into_track())
    }

    /// Profile of the authorized user.
    pub async fn current_user(&self) -> Result<UserProfile> {
        match self.get("me").await? {
            Some(response) => Ok(response.json().await?),
            None => Err(SpotifyError::Status {
                status: StatusCode::NO_CONTENT.as_u16(),
                body: String::new(),
            }),
        }
    }

    /// True when the API accepts our credentials.
    pub async fn test_connection(&self) -> bool {
        match self.current_user().await {
            Ok(user) => {
                info!(
                    "Connected to playback service as: {}",
                    user.display_name.as_deref().unwrap_or(&user.id)
                );
                true
            }
            Err(e) => {
                warn!("Playback service connection test failed: {}", e);
                false
            }
        }
    }

    /// GET with one retry on 401 using a freshly minted token. `None` on 204.
    async fn get(&self, path: &str) -> Result<Option<Response>> {
        let url = format!("{}/{}", self.api_base, path);
        let mut response = self.send_get(&url).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Access token rejected, refreshing");
            self.tokens.invalidate().await;
            response = self.send_get(&url).await?;
        }

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => Ok(Some(response)),
            status => Err(SpotifyError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn send_get(&self, url: &str) -> Result<Response> {
        let token = self.tokens.access_token().await?;
        debug!("GET {}", url);
        Ok(self.client.get(url).bearer_auth(token).send().await?)
    }
}

#[async_trait]
impl PlaybackSource for SpotifyClient {
    async fn current_snapshot(&self) -> DynResult<Option<Track>> {
        Ok(self.current_track().await?)
    }

    async fn check_reachable(&self) -> bool {
        self.test_connection().await
    }
}

/// Builder for [`SpotifyClient`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    settings: SpotifySettings,
    api_base: String,
    accounts_base: String,
    timeout: Duration,
}

impl ClientBuilder {
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn accounts_base(mut self, base: impl Into<String>) -> Self {
        self.accounts_base = base.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<SpotifyClient> {
        let client = Client::builder().timeout(self.timeout).build()?;
        let token_url = format!("{}/api/token", self.accounts_base.trim_end_matches('/'));
        let tokens = TokenManager::new(
            client.clone(),
            token_url,
            self.settings.client_id,
            self.settings.client_secret,
            self.settings.refresh_token,
        );
        Ok(SpotifyClient {
            client,
            api_base: self.api_base.trim_end_matches('/').to_string(),
            tokens,
        })
    }
}
