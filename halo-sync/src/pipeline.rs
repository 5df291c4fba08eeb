//! Track → palette → lights, run once per track change.

use halo_color::{boost_saturation, extract, fallback_palette, filter_by_brightness};
use halo_core::{
    ArtworkSource, LightAssignment, LightingBridge, Palette, PlaybackSource, SyncConfig, Track,
};
use halo_hue::{assign, dispatch, DispatchOutcome};
use log::{info, warn};
use std::sync::Arc;

/// Extracted on top of the requested count so dark colors can be dropped.
const EXTRA_COLORS: usize = 3;

/// Lamps cannot render colors this dark (sum of channels).
const MIN_CHANNEL_SUM: u16 = 120;

/// The external services the loop talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub playback: Arc<dyn PlaybackSource>,
    pub artwork: Arc<dyn ArtworkSource>,
    pub bridge: Arc<dyn LightingBridge>,
}

/// Result of one extraction → assignment → dispatch run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncCycle {
    pub palette: Palette,
    pub assignment: LightAssignment,
    pub outcome: DispatchOutcome,
}

/// Colors for `track`'s artwork, filtered for display on lights.
///
/// A track without artwork yields an empty palette. A failed download is
/// treated like undecodable artwork and yields the fallback palette.
pub async fn palette_for_track(
    artwork: &dyn ArtworkSource,
    track: &Track,
    config: &SyncConfig,
) -> Palette {
    let Some(url) = track.artwork_url.as_deref() else {
        warn!("No album artwork available for {}", track.name);
        return Vec::new();
    };

    let count = config.color_count();
    info!("Extracting {} colors from artwork: {}", count, track.album);
    let colors = match artwork.fetch_bytes(url).await {
        Ok(bytes) => extract(&bytes, count + EXTRA_COLORS),
        Err(e) => {
            warn!("Artwork download failed, using fallback palette: {}", e);
            fallback_palette(count + EXTRA_COLORS)
        }
    };
    select_colors(colors, config)
}

/// Picks the colors sent to the lights from a ranked extraction.
///
/// Near-black colors are dropped unless that leaves too few, the list is cut
/// to the configured count, brightness-filtered, then optionally boosted.
pub fn select_colors(colors: Palette, config: &SyncConfig) -> Palette {
    let count = config.color_count();
    let visible: Palette = colors
        .iter()
        .copied()
        .filter(|c| c.channel_sum() > MIN_CHANNEL_SUM)
        .collect();
    let candidates = if visible.len() < count { colors } else { visible };
    let top: Palette = candidates.into_iter().take(count).collect();

    let filtered = filter_by_brightness(&top, config.min_brightness, config.max_brightness);
    match config.saturation_boost {
        Some(factor) => filtered
            .into_iter()
            .map(|c| boost_saturation(c, factor))
            .collect(),
        None => filtered,
    }
}

/// Runs the full pipeline for `track` and pushes the result to the bridge.
pub async fn run_cycle(
    artwork: &dyn ArtworkSource,
    bridge: &dyn LightingBridge,
    track: &Track,
    config: &SyncConfig,
) -> SyncCycle {
    info!("Now playing: {} - {}", track.name, track.artist);
    let palette = palette_for_track(artwork, track, config).await;
    let assignment = assign(&palette, &config.light_ids);
    let outcome = dispatch(bridge, &assignment, config.brightness, config.transition_time).await;
    SyncCycle {
        palette,
        assignment,
        outcome,
    }
}
