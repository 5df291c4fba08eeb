//! Playback-change watching and the artwork-to-lights sync loop.

mod controller;
mod events;
mod pipeline;
mod session;

pub use controller::{Collaborator, ConnectionReport, ControlError, SyncController};
pub use events::{SyncEvent, SyncStatus};
pub use pipeline::{palette_for_track, run_cycle, select_colors, Collaborators, SyncCycle};
pub use session::{SessionState, SyncSession, TickOutcome};
