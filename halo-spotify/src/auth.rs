//! Access tokens minted from a long-lived refresh token.

use crate::error::{Result, SpotifyError};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    /// Present when the service rotates the refresh token.
    refresh_token: Option<String>,
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug)]
struct TokenState {
    refresh_token: String,
    access: Option<AccessToken>,
}

#[derive(Debug)]
pub(crate) struct TokenManager {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    state: Mutex<TokenState>,
}

impl TokenManager {
    pub(crate) fn new(
        client: Client,
        token_url: String,
        client_id: String,
        client_secret: String,
        refresh_token: String,
    ) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
            state: Mutex::new(TokenState {
                refresh_token,
                access: None,
            }),
        }
    }

    /// A valid access token, refreshing it first when missing or about to expire.
    pub(crate) async fn access_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if let Some(token) = &state.access {
            if token.expires_at > Instant::now() + EXPIRY_MARGIN {
                return Ok(token.value.clone());
            }
        }

        debug!("Refreshing access token");
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", state.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SpotifyError::Auth {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = response.json().await?;
        if let Some(rotated) = token.refresh_token {
            state.refresh_token = rotated;
        }
        info!("Access token refreshed, valid for {}s", token.expires_in);
        state.access = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(token.access_token)
    }

    /// Forgets the cached access token so the next request refreshes it.
    pub(crate) async fn invalidate(&self) {
        self.state.lock().await.access = None;
    }
}
