//! Heightfield synthesis
//!
//! Produces a normalized elevation grid from a seed and shape parameters
//! via one of two algorithms:
//! 1. Warped: domain-warped fractal synthesis blending a radial continent
//!    term with macro, detail, and ridge noise layers
//! 2. Midpoint: recursive diamond-square displacement resampled to the
//!    target raster
//!
//! Both end with smoothness-scaled box-blur passes and renormalization to
//! the [0,1] range.

use noise::{NoiseFn, Perlin, Seedable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::grid::Grid;
use crate::params::{Algorithm, MapParams};
use crate::seeds::MapSeeds;

// =============================================================================
// CONTINENT SHAPING
// =============================================================================

/// Constants of the radial continent term.
struct ContinentShape {
    center_x: f64,
    center_y: f64,
    /// Distance-to-elevation falloff rate
    falloff: f64,
    /// Blend weight of the continent term in the final sum
    weight: f64,
    sin_amp_a: f64,
    sin_freq_a: f64,
    sin_amp_b: f64,
    sin_freq_b: f64,
    noise_amp: f64,
    noise_freq: f64,
}

// The two algorithms ship with deliberately divergent shaping constants;
// the midpoint variant weights its center harder and sits slightly off the
// warped variant's center.
const WARPED_CONTINENT: ContinentShape = ContinentShape {
    center_x: 0.52,
    center_y: 0.48,
    falloff: 2.1,
    weight: 0.55,
    sin_amp_a: 0.09,
    sin_freq_a: 10.7,
    sin_amp_b: 0.07,
    sin_freq_b: 14.3,
    noise_amp: 0.22,
    noise_freq: 1.6,
};

const MIDPOINT_CONTINENT: ContinentShape = ContinentShape {
    center_x: 0.50,
    center_y: 0.50,
    falloff: 2.4,
    weight: 0.65,
    sin_amp_a: 0.06,
    sin_freq_a: 8.9,
    sin_amp_b: 0.06,
    sin_freq_b: 11.1,
    noise_amp: 0.18,
    noise_freq: 1.3,
};

/// Raw-range threshold below which a field counts as degenerate.
const WARPED_EPSILON: f32 = 1e-6;
const MIDPOINT_EPSILON: f32 = 1e-9;

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Synthesize a normalized heightfield for the given parameters.
pub fn synthesize(params: &MapParams) -> Grid<f32> {
    let seeds = MapSeeds::from_master(params.seed);
    match params.algorithm {
        Algorithm::Warped => synthesize_warped(params, seeds.heightfield),
        Algorithm::Midpoint => synthesize_midpoint(params, seeds.heightfield),
    }
}

// =============================================================================
// WARPED FRACTAL SYNTHESIS
// =============================================================================

fn synthesize_warped(params: &MapParams, seed: u64) -> Grid<f32> {
    let width = params.width;
    let height = params.height;
    let t = params.smoothness_t() as f64;

    // Separate generators per layer so layers stay uncorrelated
    let warp_noise = Perlin::new(1).set_seed(seed as u32);
    let continent_noise = Perlin::new(1).set_seed(seed as u32 + 1111);
    let macro_noise = Perlin::new(1).set_seed(seed as u32 + 2222);
    let detail_noise = Perlin::new(1).set_seed(seed as u32 + 3333);
    let ridge_noise = Perlin::new(1).set_seed(seed as u32 + 4444);

    // Smoother terrain: weaker warp, lower frequencies, less detail/ridge
    let warp_strength = lerp(0.18, 0.05, t);
    let macro_freq = lerp(3.2, 1.8, t);
    let detail_freq = lerp(13.0, 7.0, t);
    let ridge_freq = lerp(5.5, 3.0, t);

    let macro_weight = lerp(0.32, 0.40, t);
    let detail_weight = lerp(0.17, 0.05, t);
    let ridge_weight = lerp(0.24, 0.06, t);

    let mut field = Grid::new_with(width, height, 0.0f32);

    for y in 0..height {
        for x in 0..width {
            let nx = x as f64 / width as f64;
            let ny = y as f64 / height as f64;

            let (wx, wy) = apply_domain_warp(nx, ny, &warp_noise, warp_strength);

            let continent = continent_term(
                wx,
                wy,
                &continent_noise,
                &WARPED_CONTINENT,
                params.continent_scale_pct as f64,
            );

            let macro_v = fbm(&macro_noise, wx * macro_freq, wy * macro_freq, 5, 0.5, 2.0);
            let detail_v = fbm(&detail_noise, wx * detail_freq, wy * detail_freq, 4, 0.55, 2.1);
            let ridge_v = 1.0 - fbm(&ridge_noise, wx * ridge_freq, wy * ridge_freq, 4, 0.5, 2.0).abs();

            let value = WARPED_CONTINENT.weight * continent
                + macro_weight * macro_v
                + detail_weight * detail_v
                + ridge_weight * ridge_v;

            field.set(x, y, value as f32);
        }
    }

    // 0-4 smoothing passes, more at higher smoothness
    let passes = (t * 4.0).round() as usize;
    for _ in 0..passes {
        field = field.box_blur();
    }

    normalize_field(field, WARPED_EPSILON)
}

// =============================================================================
// MIDPOINT DISPLACEMENT
// =============================================================================

fn synthesize_midpoint(params: &MapParams, seed: u64) -> Grid<f32> {
    let width = params.width;
    let height = params.height;
    let t = params.smoothness_t() as f64;

    let lattice = displace_lattice(width.max(height), seed, t);

    // Resample the square lattice onto the target raster, preserving aspect
    let continent_noise = Perlin::new(1).set_seed(seed as u32 + 5555);
    let max_dim = width.max(height);
    let scale = (lattice.width - 1) as f32 / (max_dim - 1) as f32;

    let mut field = Grid::new_with(width, height, 0.0f32);
    for y in 0..height {
        for x in 0..width {
            let base = lattice.sample_bilinear(x as f32 * scale, y as f32 * scale);

            let nx = x as f64 / width as f64;
            let ny = y as f64 / height as f64;
            let continent = continent_term(
                nx,
                ny,
                &continent_noise,
                &MIDPOINT_CONTINENT,
                params.continent_scale_pct as f64,
            );

            field.set(x, y, base + (MIDPOINT_CONTINENT.weight * continent) as f32);
        }
    }

    // 0-5 smoothing passes; the displaced lattice is noisier than the
    // warped synthesis and tolerates one extra pass
    let passes = (t * 5.0).round() as usize;
    for _ in 0..passes {
        field = field.box_blur();
    }

    normalize_field(field, MIDPOINT_EPSILON)
}

/// Run diamond-square on a `2^n + 1` lattice covering `target` cells.
fn displace_lattice(target: usize, seed: u64, smoothness_t: f64) -> Grid<f32> {
    let mut n = 1usize;
    while n + 1 < target {
        n *= 2;
    }
    let size = n + 1;

    let mut lattice = Grid::new_with(size, size, 0.0f32);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    // Amplitude decays by this factor each time the step halves; smoother
    // terrain decays faster
    let roughness = lerp(0.68, 0.50, smoothness_t) as f32;

    lattice.set(0, 0, rng.gen_range(-0.5..0.5));
    lattice.set(size - 1, 0, rng.gen_range(-0.5..0.5));
    lattice.set(0, size - 1, rng.gen_range(-0.5..0.5));
    lattice.set(size - 1, size - 1, rng.gen_range(-0.5..0.5));

    let mut step = size - 1;
    let mut amplitude = 0.9f32;

    while step > 1 {
        let half = step / 2;

        // Diamond step: centers of squares
        for y in (half..size).step_by(step) {
            for x in (half..size).step_by(step) {
                let avg = (*lattice.get(x - half, y - half)
                    + *lattice.get(x + half, y - half)
                    + *lattice.get(x - half, y + half)
                    + *lattice.get(x + half, y + half))
                    / 4.0;
                lattice.set(x, y, avg + rng.gen_range(-1.0f32..1.0) * amplitude);
            }
        }

        // Square step: midpoints of edges
        for y in (0..size).step_by(half) {
            let x_start = if (y / half) % 2 == 0 { half } else { 0 };
            for x in (x_start..size).step_by(step) {
                let mut sum = 0.0f32;
                let mut count = 0.0f32;
                if x >= half {
                    sum += *lattice.get(x - half, y);
                    count += 1.0;
                }
                if x + half < size {
                    sum += *lattice.get(x + half, y);
                    count += 1.0;
                }
                if y >= half {
                    sum += *lattice.get(x, y - half);
                    count += 1.0;
                }
                if y + half < size {
                    sum += *lattice.get(x, y + half);
                    count += 1.0;
                }
                lattice.set(x, y, sum / count + rng.gen_range(-1.0f32..1.0) * amplitude);
            }
        }

        amplitude *= roughness;
        step = half;
    }

    lattice
}

// =============================================================================
// NOISE FUNCTIONS
// =============================================================================

/// Fractional Brownian Motion - multi-octave noise
fn fbm(
    noise: &Perlin,
    x: f64,
    y: f64,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        total += amplitude * noise.get([x * frequency, y * frequency]);
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    total / max_value
}

/// Domain warping - distort coordinates for organic shapes
fn apply_domain_warp(x: f64, y: f64, noise: &Perlin, strength: f64) -> (f64, f64) {
    let warp_scale = 4.0;

    // First warp layer
    let warp_x1 = noise.get([x * warp_scale, y * warp_scale]);
    let warp_y1 = noise.get([x * warp_scale + 5.2, y * warp_scale + 1.3]);

    // Second warp layer (warp the warp)
    let x2 = x + warp_x1 * strength;
    let y2 = y + warp_y1 * strength;

    let warp_x2 = noise.get([x2 * warp_scale * 2.0, y2 * warp_scale * 2.0]);
    let warp_y2 = noise.get([x2 * warp_scale * 2.0 + 3.7, y2 * warp_scale * 2.0 + 8.1]);

    (
        x + (warp_x1 + warp_x2 * 0.5) * strength,
        y + (warp_y1 + warp_y2 * 0.5) * strength,
    )
}

/// Radial continent term: elevation falls off with distance from a fixed
/// offset center, perturbed by two sinusoids and low-frequency noise.
///
/// `scale_pct` rescales the sample coordinates around the center, so 200%
/// spreads the landmass over twice the default footprint.
fn continent_term(
    x: f64,
    y: f64,
    noise: &Perlin,
    shape: &ContinentShape,
    scale_pct: f64,
) -> f64 {
    let scale = 100.0 / scale_pct;
    let dx = (x - shape.center_x) * scale;
    let dy = (y - shape.center_y) * scale;
    let dist = (dx * dx + dy * dy).sqrt();

    let mut value = 1.0 - dist * shape.falloff;
    value += shape.sin_amp_a * (x * shape.sin_freq_a).sin();
    value += shape.sin_amp_b * (y * shape.sin_freq_b).cos();
    value += shape.noise_amp * noise.get([x * shape.noise_freq, y * shape.noise_freq]);

    value.clamp(-1.0, 1.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

// =============================================================================
// NORMALIZATION
// =============================================================================

/// Rescale a field so min = 0 and max = 1. A degenerate field (raw range
/// below `epsilon`) becomes a uniform mid-value grid instead.
pub fn normalize_field(field: Grid<f32>, epsilon: f32) -> Grid<f32> {
    let (min_val, max_val) = field.min_max();
    let range = max_val - min_val;

    let mut result = field;
    if range < epsilon {
        result.fill(0.5);
        return result;
    }

    for y in 0..result.height {
        for x in 0..result.width {
            let v = *result.get(x, y);
            result.set(x, y, (v - min_val) / range);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params(algorithm: Algorithm) -> MapParams {
        MapParams {
            width: 128,
            height: 128,
            seed: 42,
            algorithm,
            ..MapParams::default()
        }
    }

    #[test]
    fn test_warped_field_is_normalized() {
        let field = synthesize(&small_params(Algorithm::Warped));
        let (min_val, max_val) = field.min_max();
        assert!(min_val.abs() < 1e-5);
        assert!((max_val - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_midpoint_field_is_normalized() {
        let field = synthesize(&small_params(Algorithm::Midpoint));
        let (min_val, max_val) = field.min_max();
        assert!(min_val.abs() < 1e-5);
        assert!((max_val - 1.0).abs() < 1e-5);
        assert_eq!(field.width, 128);
        assert_eq!(field.height, 128);
    }

    #[test]
    fn test_degenerate_field_collapses_to_mid_value() {
        let flat = Grid::new_with(16, 16, 3.7f32);
        let normalized = normalize_field(flat, 1e-6);
        for (_, _, &v) in normalized.iter() {
            assert_eq!(v, 0.5);
        }
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        for algorithm in [Algorithm::Warped, Algorithm::Midpoint] {
            let a = synthesize(&small_params(algorithm));
            let b = synthesize(&small_params(algorithm));
            assert!(a == b);
        }
    }

    #[test]
    fn test_seed_changes_field() {
        let a = synthesize(&small_params(Algorithm::Warped));
        let mut params = small_params(Algorithm::Warped);
        params.seed = 43;
        let b = synthesize(&params);
        assert!(a != b);
    }

    #[test]
    fn test_continent_scale_changes_field() {
        let a = synthesize(&small_params(Algorithm::Warped));
        let mut params = small_params(Algorithm::Warped);
        params.continent_scale_pct = 180.0;
        let b = synthesize(&params);
        assert!(a != b);
    }

    #[test]
    fn test_continent_term_stays_clamped() {
        let noise = Perlin::new(1).set_seed(9);
        for i in 0..50 {
            for j in 0..50 {
                let v = continent_term(
                    i as f64 / 50.0,
                    j as f64 / 50.0,
                    &noise,
                    &WARPED_CONTINENT,
                    50.0,
                );
                assert!((-1.0..=1.0).contains(&v));
            }
        }
    }
}
