use halo_core::Color;

/// Linear RGB to XYZ for the wide-gamut D65 primaries the bridge expects.
const WIDE_GAMUT_D65: [[f64; 3]; 3] = [
    [0.664511, 0.154324, 0.162028],
    [0.283881, 0.668433, 0.047685],
    [0.000088, 0.072310, 0.986039],
];

/// Decimal places the bridge protocol carries for xy coordinates.
const PRECISION: f64 = 10_000.0;

/// Converts an RGB color to the CIE xy chromaticity used to command lights.
///
/// Both coordinates are clamped to `[0, 1]` and rounded to four decimals.
/// Black has no chromaticity and maps to `(0, 0)`. Out-of-gamut points are
/// left for the bridge to map onto the lamp's gamut.
pub fn to_device_coordinates(color: Color) -> (f64, f64) {
    let linear = [color.r, color.g, color.b].map(|c| gamma_expand(c as f64 / 255.0));
    let [x, y, z] = WIDE_GAMUT_D65
        .map(|row| row[0] * linear[0] + row[1] * linear[1] + row[2] * linear[2]);

    let total = x + y + z;
    if total == 0.0 {
        return (0.0, 0.0);
    }
    (round(x / total), round(y / total))
}

fn gamma_expand(c: f64) -> f64 {
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

fn round(v: f64) -> f64 {
    (v.clamp(0.0, 1.0) * PRECISION).round() / PRECISION
}
