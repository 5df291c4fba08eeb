use crate::quantize::{dominant_colors, Samples};
use anyhow::{bail, Context, Result};
use halo_core::{Color, Palette};
use image::GenericImageView;
use log::{debug, warn};

/// Artwork is downscaled to fit this square before sampling.
const MAX_SAMPLE_DIMENSION: u32 = 150;

const FALLBACK_CYCLE: [Color; 3] = [Color::RED, Color::GREEN, Color::BLUE];

/// Extracts up to `count` dominant colors from compressed image bytes, most
/// dominant first.
///
/// Never fails: undecodable or empty artwork yields [`fallback_palette`].
pub fn extract(image_bytes: &[u8], count: usize) -> Palette {
    if count == 0 {
        return Vec::new();
    }
    match try_extract(image_bytes, count) {
        Ok(palette) => {
            debug!("Extracted {} colors from artwork", palette.len());
            palette
        }
        Err(e) => {
            warn!("Color extraction failed, using fallback palette: {:#}", e);
            fallback_palette(count)
        }
    }
}

/// `count` colors cycling red, green, blue.
pub fn fallback_palette(count: usize) -> Palette {
    FALLBACK_CYCLE.iter().copied().cycle().take(count).collect()
}

fn try_extract(image_bytes: &[u8], count: usize) -> Result<Palette> {
    let img = image::load_from_memory(image_bytes).context("Failed to decode artwork")?;
    let (width, height) = img.dimensions();
    let img = if width > MAX_SAMPLE_DIMENSION || height > MAX_SAMPLE_DIMENSION {
        img.thumbnail(MAX_SAMPLE_DIMENSION, MAX_SAMPLE_DIMENSION)
    } else {
        img
    };

    let rgba = img.to_rgba8();
    let samples = Samples::from_pixels(rgba.pixels().map(|p| p.0));
    if samples.is_empty() {
        bail!("artwork has no opaque pixels");
    }
    Ok(dominant_colors(&samples, count))
}
