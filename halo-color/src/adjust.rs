use halo_core::Color;
use palette::{FromColor, Hsv, Srgb};

/// Keeps colors whose channel mean lies in `[min, max]`.
///
/// If nothing survives, the input is returned unchanged so a non-empty list
/// never comes back empty.
pub fn filter_by_brightness(colors: &[Color], min: u8, max: u8) -> Vec<Color> {
    let (min, max) = (min as f32, max as f32);
    let kept: Vec<Color> = colors
        .iter()
        .copied()
        .filter(|c| (min..=max).contains(&c.brightness()))
        .collect();
    if kept.is_empty() {
        colors.to_vec()
    } else {
        kept
    }
}

/// Scales HSV saturation by `factor` (clamped to 1.0). Grays are returned as is.
pub fn boost_saturation(color: Color, factor: f32) -> Color {
    if color.is_achromatic() {
        return color;
    }
    let rgb: Srgb<f32> = Srgb::new(color.r, color.g, color.b).into_format();
    let mut hsv: Hsv = Hsv::from_color(rgb);
    hsv.saturation = (hsv.saturation * factor).clamp(0.0, 1.0);
    let boosted: Srgb = Srgb::from_color(hsv);
    Color::new(
        to_channel(boosted.red),
        to_channel(boosted.green),
        to_channel(boosted.blue),
    )
}

fn to_channel(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
