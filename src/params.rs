//! Generation parameters
//!
//! All knobs that influence a generation pass live in one immutable struct
//! handed to the pipeline. Values are clamped into valid ranges up front;
//! the pipeline itself never rejects input.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Raster dimension limits.
pub const MIN_DIMENSION: usize = 128;
pub const MAX_DIMENSION: usize = 2048;

/// Upper bound on requested river sources.
pub const MAX_RIVER_COUNT: usize = 32;

/// Heightfield synthesis algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Domain-warped fractal continent synthesis
    Warped,
    /// Recursive midpoint displacement (diamond-square)
    Midpoint,
}

/// Shadow engine settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShadowParams {
    /// Overall strength in percent; 0 disables shading entirely
    pub strength_pct: f32,
    /// Maximum cast-shadow ray length in pixels
    pub length_px: usize,
    /// Extra brightening for prominent peaks, percent
    pub peak_lightening_pct: f32,
    /// Prominence required for a cell to cast shadows, percent
    pub prominence_threshold_pct: f32,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            strength_pct: 60.0,
            length_px: 24,
            peak_lightening_pct: 35.0,
            prominence_threshold_pct: 55.0,
        }
    }
}

impl ShadowParams {
    pub fn clamped(self) -> Self {
        Self {
            strength_pct: self.strength_pct.clamp(0.0, 100.0),
            length_px: self.length_px.clamp(4, 128),
            peak_lightening_pct: self.peak_lightening_pct.clamp(0.0, 100.0),
            prominence_threshold_pct: self.prominence_threshold_pct.clamp(0.0, 100.0),
        }
    }
}

/// Full parameter set for one generation pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapParams {
    pub width: usize,
    pub height: usize,
    /// 32-bit master seed
    pub seed: u32,
    pub algorithm: Algorithm,
    /// Terrain smoothness, 1 (rugged) to 100 (gentle)
    pub smoothness: f32,
    /// Continent footprint in percent of the default radius, 50-200
    pub continent_scale_pct: f32,
    /// Rank quantile of elevation that becomes the sea level, 0.05-0.95
    pub sea_level_quantile: f32,
    /// Fraction of cells classified as snowcap, 0.01-0.25
    pub snowcap_fraction: f32,
    /// Target number of river sources
    pub river_count: usize,
    pub shadow: ShadowParams,
}

impl Default for MapParams {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            seed: 0,
            algorithm: Algorithm::Warped,
            smoothness: 50.0,
            continent_scale_pct: 100.0,
            sea_level_quantile: 0.56,
            snowcap_fraction: 0.08,
            river_count: 6,
            shadow: ShadowParams::default(),
        }
    }
}

impl MapParams {
    /// Clamp every field into its documented range.
    pub fn clamped(self) -> Self {
        Self {
            width: self.width.clamp(MIN_DIMENSION, MAX_DIMENSION),
            height: self.height.clamp(MIN_DIMENSION, MAX_DIMENSION),
            seed: self.seed,
            algorithm: self.algorithm,
            smoothness: self.smoothness.clamp(1.0, 100.0),
            continent_scale_pct: self.continent_scale_pct.clamp(50.0, 200.0),
            sea_level_quantile: self.sea_level_quantile.clamp(0.05, 0.95),
            snowcap_fraction: self.snowcap_fraction.clamp(0.01, 0.25),
            river_count: self.river_count.min(MAX_RIVER_COUNT),
            shadow: self.shadow.clamped(),
        }
    }

    /// Smoothness mapped to [0,1]; 0 = most rugged, 1 = most gentle.
    pub fn smoothness_t(&self) -> f32 {
        (self.smoothness - 1.0) / 99.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping_pulls_values_into_range() {
        let params = MapParams {
            width: 16,
            height: 9999,
            smoothness: 500.0,
            continent_scale_pct: 10.0,
            sea_level_quantile: 1.5,
            snowcap_fraction: 0.0,
            river_count: 1000,
            ..MapParams::default()
        }
        .clamped();

        assert_eq!(params.width, MIN_DIMENSION);
        assert_eq!(params.height, MAX_DIMENSION);
        assert_eq!(params.smoothness, 100.0);
        assert_eq!(params.continent_scale_pct, 50.0);
        assert_eq!(params.sea_level_quantile, 0.95);
        assert_eq!(params.snowcap_fraction, 0.01);
        assert_eq!(params.river_count, MAX_RIVER_COUNT);
    }

    #[test]
    fn test_smoothness_t_spans_unit_interval() {
        let mut params = MapParams::default();
        params.smoothness = 1.0;
        assert_eq!(params.smoothness_t(), 0.0);
        params.smoothness = 100.0;
        assert_eq!(params.smoothness_t(), 1.0);
    }

    #[test]
    fn test_in_range_values_survive_clamping() {
        let params = MapParams::default().clamped();
        assert_eq!(params, MapParams::default());
    }
}
