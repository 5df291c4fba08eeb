use halo_core::{LightAssignment, Palette, SyncConfig, Track};
use halo_hue::{DispatchOutcome, DispatchReport};
use serde::Serialize;

/// Notifications published by the sync loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Started,
    TrackChanged {
        track: Track,
        palette: Palette,
        outcome: DispatchOutcome,
    },
    PlaybackStopped,
    TickFailed {
        message: String,
    },
    Stopped,
}

/// Point-in-time view for status readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub active: bool,
    pub config: SyncConfig,
    pub current_track: Option<Track>,
    pub palette: Palette,
    pub assignment: LightAssignment,
    pub last_dispatch: Option<DispatchReport>,
}
