//! Lighting bridge client and the palette-to-lights dispatcher.

mod bridge;
mod dispatch;

pub use bridge::{HueBridge, HueError, DEFAULT_TIMEOUT};
pub use dispatch::{assign, dispatch, DispatchOutcome, DispatchReport};
