//! Shared model, configuration and collaborator interfaces for halo.

pub mod collab;
pub mod config;
pub mod model;

pub use collab::{ArtworkSource, DynError, DynResult, LightingBridge, PlaybackSource};
pub use config::{AppConfig, ConfigError, ConfigUpdate, HueSettings, SpotifySettings, SyncConfig};
pub use model::{
    Color, LightAssignment, LightGroup, LightId, LightInfo, LightState, Palette, Track,
};
