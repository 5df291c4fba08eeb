/// Result type alias for playback-service operations.
pub type Result<T> = std::result::Result<T, SpotifyError>;

#[derive(Debug, thiserror::Error)]
pub enum SpotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The token endpoint refused the refresh token.
    #[error("token refresh rejected ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}
