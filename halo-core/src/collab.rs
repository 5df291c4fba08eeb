//! Interfaces to the external services the sync loop depends on.

use crate::model::{LightGroup, LightId, LightInfo, LightState, Track};
use async_trait::async_trait;

pub type DynError = Box<dyn std::error::Error + Send + Sync>;
pub type DynResult<T> = Result<T, DynError>;

/// The music service reporting what is currently playing.
#[async_trait]
pub trait PlaybackSource: Send + Sync {
    /// `None` when nothing is playing.
    async fn current_snapshot(&self) -> DynResult<Option<Track>>;

    async fn check_reachable(&self) -> bool;
}

/// Downloads album artwork.
#[async_trait]
pub trait ArtworkSource: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> DynResult<Vec<u8>>;
}

/// The lighting bridge the colors are pushed to.
#[async_trait]
pub trait LightingBridge: Send + Sync {
    async fn list_lights(&self) -> DynResult<Vec<LightInfo>>;

    /// Rooms and zones. Bridges without grouping report none.
    async fn list_groups(&self) -> DynResult<Vec<LightGroup>> {
        Ok(Vec::new())
    }

    async fn set_state(&self, light: LightId, state: &LightState) -> DynResult<()>;

    async fn check_reachable(&self) -> bool;
}
