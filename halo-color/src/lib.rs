//! Artwork color extraction and the RGB to device chromaticity conversion.

mod adjust;
mod convert;
mod extract;
mod quantize;

pub use adjust::{boost_saturation, filter_by_brightness};
pub use convert::to_device_coordinates;
pub use extract::{extract, fallback_palette};
