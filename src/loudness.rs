//! Reduction of a frequency snapshot to a loudness reading

use crate::constants::loudness::{BAR_COUNT, LEVEL_SCALE};

/// An instantaneous loudness reading
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessSample {
    /// Uncalibrated level, 0 to 153 for byte-valued bins
    pub level: u32,
    /// Point-sampled bin magnitudes as percentages
    pub bars: [f32; BAR_COUNT],
}

impl Default for LoudnessSample {
    fn default() -> Self {
        Self {
            level: 0,
            bars: [0.0; BAR_COUNT],
        }
    }
}

/// Estimate loudness from byte frequency bins
///
/// The level is the rounded mean bin magnitude scaled by 0.6; no ceiling is
/// applied. Each bar is the bin at `floor(i / 20 * len)` as a percentage of
/// 255. An empty snapshot yields the zero sample.
///
/// The bar index is computed as exact integer `i * len / 20`. A float product
/// can land one bin lower for some lengths (90 bins, bar 14: 62 instead of
/// 63); both agree for the 128 bins the analyzer produces.
pub fn estimate(bins: &[u8]) -> LoudnessSample {
    if bins.is_empty() {
        return LoudnessSample::default();
    }

    let sum: u64 = bins.iter().map(|&b| u64::from(b)).sum();
    let mean = sum as f64 / bins.len() as f64;
    let level = (mean * LEVEL_SCALE).round() as u32;

    let mut bars = [0.0; BAR_COUNT];
    for (i, bar) in bars.iter_mut().enumerate() {
        let index = i * bins.len() / BAR_COUNT;
        *bar = f32::from(bins[index]) / 255.0 * 100.0;
    }

    LoudnessSample { level, bars }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_bins_scale_by_point_six() {
        for len in [1usize, 7, 128] {
            for v in 0..=255u8 {
                let sample = estimate(&vec![v; len]);
                assert_eq!(sample.level, (f64::from(v) * 0.6).round() as u32, "v={v} len={len}");
            }
        }
    }

    #[test]
    fn test_mean_153_gives_92() {
        assert_eq!(estimate(&[153; 128]).level, 92);
    }

    #[test]
    fn test_full_scale_is_unclamped() {
        let sample = estimate(&[255; 128]);
        assert_eq!(sample.level, 153);
        assert!(sample.bars.iter().all(|&b| (b - 100.0).abs() < 1e-4));
    }

    #[test]
    fn test_bars_stay_in_percent_range() {
        let ramps: [Vec<u8>; 3] = [
            (0..128).map(|i| (i * 2) as u8).collect(),
            (0..=255).rev().collect(),
            vec![0, 255, 3],
        ];
        for bins in &ramps {
            let sample = estimate(bins);
            assert!(sample.bars.iter().all(|&b| (0.0..=100.0).contains(&b)));
        }
    }

    #[test]
    fn test_bars_point_sample_evenly_spaced_bins() {
        let bins: Vec<u8> = (0..128).map(|i| i as u8).collect();
        let sample = estimate(&bins);
        // floor(i / 20 * 128)
        let expected = [0u8, 6, 12, 19, 25, 32, 38, 44, 51, 57, 64, 70, 76, 83, 89, 96, 102, 108, 115, 121];
        for (bar, index) in sample.bars.iter().zip(expected) {
            assert!((bar - f32::from(index) / 255.0 * 100.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_bar_index_uses_exact_integer_math() {
        // 14 * 90 / 20 is exactly 63
        let mut bins = vec![0u8; 90];
        bins[63] = 255;
        let sample = estimate(&bins);
        assert!((sample.bars[14] - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_short_snapshot_repeats_bins() {
        let sample = estimate(&[255, 0]);
        assert!((sample.bars[9] - 100.0).abs() < 1e-4);
        assert_eq!(sample.bars[10], 0.0);
        assert_eq!(sample.level, 77);
    }

    #[test]
    fn test_empty_snapshot_is_silent() {
        assert_eq!(estimate(&[]), LoudnessSample::default());
    }
}
