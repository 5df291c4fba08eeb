//! Playback-service client and artwork downloads.

mod artwork;
mod auth;
mod client;
mod error;
mod models;

pub use artwork::{HttpArtworkFetcher, ARTWORK_TIMEOUT};
pub use client::{ClientBuilder, SpotifyClient, DEFAULT_ACCOUNTS_BASE, DEFAULT_API_BASE};
pub use error::{Result, SpotifyError};
pub use models::UserProfile;
