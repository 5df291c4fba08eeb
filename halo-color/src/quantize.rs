//! Dominant colors by k-means clustering in Lab space.

use halo_core::{Color, Palette};
use kmeans_colors::get_kmeans;
use palette::{IntoColor, Lab, Srgb};
use std::collections::HashSet;

/// Pixels more transparent than this are ignored.
const MIN_ALPHA: u8 = 125;
const MAX_ITERATIONS: usize = 20;
const CONVERGENCE: f32 = 1e-4;
/// Fixed so the same artwork always yields the same palette.
const SEED: u64 = 0;

/// Opaque pixels in scan order.
#[derive(Debug, Default)]
pub(crate) struct Samples {
    pixels: Vec<[u8; 3]>,
}

impl Samples {
    pub(crate) fn from_pixels<I>(pixels: I) -> Self
    where
        I: IntoIterator<Item = [u8; 4]>,
    {
        let pixels = pixels
            .into_iter()
            .filter(|[_, _, _, a]| *a >= MIN_ALPHA)
            .map(|[r, g, b, _]| [r, g, b])
            .collect();
        Self { pixels }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    fn distinct_colors(&self) -> usize {
        self.pixels.iter().collect::<HashSet<_>>().len()
    }
}

#[derive(Debug, Clone, Default)]
struct Cluster {
    population: u64,
    sum: [u64; 3],
    /// Scan position of the first member pixel.
    first_seen: usize,
}

impl Cluster {
    fn add(&mut self, position: usize, [r, g, b]: [u8; 3]) {
        if self.population == 0 {
            self.first_seen = position;
        }
        self.population += 1;
        self.sum[0] += r as u64;
        self.sum[1] += g as u64;
        self.sum[2] += b as u64;
    }

    fn mean(&self) -> Color {
        let population = self.population.max(1);
        let [r, g, b] = self
            .sum
            .map(|total| ((total + population / 2) / population).min(255) as u8);
        Color::new(r, g, b)
    }
}

/// Clusters the samples into at most `count` colors, most populated first.
///
/// Equal populations keep scan order. Each color is the mean of its member
/// pixels.
pub(crate) fn dominant_colors(samples: &Samples, count: usize) -> Palette {
    // k-means++ seeding needs a distinct pixel per cluster.
    let k = count
        .min(samples.distinct_colors())
        .min(u8::MAX as usize);
    if k == 0 {
        return Vec::new();
    }

    let lab: Vec<Lab> = samples
        .pixels
        .iter()
        .map(|&[r, g, b]| -> Lab { Srgb::new(r, g, b).into_format::<f32>().into_color() })
        .collect();
    let kmeans = get_kmeans(k, MAX_ITERATIONS, CONVERGENCE, false, &lab, SEED);

    let mut clusters = vec![Cluster::default(); kmeans.centroids.len()];
    for (position, (&index, pixel)) in kmeans.indices.iter().zip(&samples.pixels).enumerate() {
        if let Some(cluster) = clusters.get_mut(index as usize) {
            cluster.add(position, *pixel);
        }
    }

    clusters.retain(|c| c.population > 0);
    clusters.sort_by(|a, b| {
        b.population
            .cmp(&a.population)
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });
    clusters.iter().map(Cluster::mean).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(runs: &[([u8; 3], usize)]) -> Samples {
        Samples::from_pixels(
            runs.iter()
                .flat_map(|([r, g, b], n)| std::iter::repeat([*r, *g, *b, 255]).take(*n)),
        )
    }

    #[test]
    fn ranks_by_population() {
        let samples = samples(&[([255, 0, 0], 60), ([0, 0, 255], 30), ([0, 255, 0], 10)]);
        assert_eq!(
            dominant_colors(&samples, 3),
            vec![Color::RED, Color::BLUE, Color::GREEN]
        );
    }

    #[test]
    fn equal_populations_keep_scan_order() {
        let samples = samples(&[([0, 0, 255], 50), ([255, 0, 0], 50)]);
        assert_eq!(dominant_colors(&samples, 2), vec![Color::BLUE, Color::RED]);
    }

    #[test]
    fn fewer_distinct_colors_than_requested() {
        let samples = samples(&[([12, 200, 40], 25)]);
        assert_eq!(dominant_colors(&samples, 4), vec![Color::new(12, 200, 40)]);
    }

    #[test]
    fn cluster_color_is_pixel_mean() {
        let samples = samples(&[([200, 100, 50], 1), ([202, 102, 52], 1)]);
        assert_eq!(dominant_colors(&samples, 1), vec![Color::new(201, 101, 51)]);
    }

    #[test]
    fn transparent_pixels_are_skipped() {
        let samples = Samples::from_pixels(vec![[255, 0, 0, 0], [255, 0, 0, 100]]);
        assert!(samples.is_empty());
        assert!(dominant_colors(&samples, 3).is_empty());
    }

    #[test]
    fn never_exceeds_requested_count() {
        let runs: Vec<([u8; 3], usize)> = (0..40u8)
            .map(|i| ([i * 6, 255 - i * 6, i * 3], 1 + i as usize))
            .collect();
        let palette = dominant_colors(&samples(&runs), 5);
        assert!(!palette.is_empty());
        assert!(palette.len() <= 5);
    }

    #[test]
    fn same_input_same_palette() {
        let runs: Vec<([u8; 3], usize)> = (0..30u8)
            .map(|i| ([i * 8, 90, 255 - i * 8], 3))
            .collect();
        let samples = samples(&runs);
        assert_eq!(dominant_colors(&samples, 4), dominant_colors(&samples, 4));
    }
}
