//! Terrain classification and raster rendering
//!
//! Elevation and slope cutoffs are rank quantiles of the generated grids,
//! not fixed constants, so the water/land/snow proportions stay stable no
//! matter how the raw elevation distribution shifts between seeds.

use crate::grid::Grid;
use crate::seeds::cell_hash;

/// Per-cell terrain class. Recomputed every generation, never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TerrainClass {
    #[default]
    Sea,
    Plains,
    Mountain,
    Snowcap,
}

impl TerrainClass {
    pub fn is_land(&self) -> bool {
        !matches!(self, TerrainClass::Sea)
    }

    /// Base fill color, RGBA.
    pub fn color(&self) -> [u8; 4] {
        match self {
            TerrainClass::Sea => [38, 84, 139, 255],
            TerrainClass::Plains => [110, 150, 82, 255],
            TerrainClass::Mountain => [139, 130, 113, 255],
            TerrainClass::Snowcap => [237, 241, 245, 255],
        }
    }
}

/// Shallow-water tint for sea cells touching land.
const COASTAL_SEA_COLOR: [u8; 4] = [84, 142, 190, 255];
/// Sand tint for land cells touching sea.
const SHORE_LAND_COLOR: [u8; 4] = [178, 166, 120, 255];
/// River overlay color.
const RIVER_COLOR: [u8; 4] = [56, 110, 165, 255];

/// Fraction of snowcap border cells that get dithered.
const DITHER_FRACTION: f32 = 0.45;
/// Blend ratio toward the neighbor-class average for dithered cells.
const DITHER_BLEND: f32 = 0.5;

/// Elevation and slope cutoffs for one generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cutoffs {
    pub sea_level: f32,
    pub snow_level: f32,
    pub mountain_slope: f32,
}

// =============================================================================
// QUANTILES
// =============================================================================

/// Linear-interpolated order statistic at rank fraction `q`.
pub fn quantile(sorted: &[f32], q: f32) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Compute all class cutoffs from the elevation and slope grids.
///
/// The mountain slope cutoff is a quantile over land-cell slopes only, at
/// a rank that shifts with smoothness: rougher terrain lowers the cutoff
/// so more rock shows.
pub fn compute_cutoffs(
    height: &Grid<f32>,
    slope: &Grid<f32>,
    sea_level_quantile: f32,
    snowcap_fraction: f32,
    smoothness_t: f32,
) -> Cutoffs {
    let mut elevations: Vec<f32> = height.as_slice().to_vec();
    elevations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let sea_level = quantile(&elevations, sea_level_quantile);
    let snow_level = quantile(&elevations, 1.0 - snowcap_fraction);

    let mut land_slopes: Vec<f32> = slope
        .iter()
        .filter(|&(x, y, _)| *height.get(x, y) >= sea_level)
        .map(|(_, _, &s)| s)
        .collect();
    land_slopes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let slope_q = 0.80 + 0.12 * smoothness_t.clamp(0.0, 1.0);
    let mountain_slope = if land_slopes.is_empty() {
        f32::MAX
    } else {
        quantile(&land_slopes, slope_q)
    };

    Cutoffs {
        sea_level,
        snow_level,
        mountain_slope,
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classify every cell against the cutoffs.
pub fn classify(height: &Grid<f32>, slope: &Grid<f32>, cutoffs: &Cutoffs) -> Grid<TerrainClass> {
    let mut classes = Grid::new_with(height.width, height.height, TerrainClass::Sea);

    for y in 0..height.height {
        for x in 0..height.width {
            let elevation = *height.get(x, y);
            let class = if elevation < cutoffs.sea_level {
                TerrainClass::Sea
            } else if elevation >= cutoffs.snow_level {
                TerrainClass::Snowcap
            } else if *slope.get(x, y) >= cutoffs.mountain_slope {
                TerrainClass::Mountain
            } else {
                TerrainClass::Plains
            };
            classes.set(x, y, class);
        }
    }

    classes
}

// =============================================================================
// RENDERING
// =============================================================================

/// Render classes and rivers into an RGBA buffer (row-major, opaque).
///
/// Post passes: coastline highlighting on both sides of the sea/land
/// boundary, then deterministic dithering of snowcap borders, then the
/// river overlay.
pub fn render(classes: &Grid<TerrainClass>, rivers: &Grid<bool>, dither_seed: u64) -> Vec<u8> {
    let width = classes.width;
    let height = classes.height;
    let mut pixels = vec![0u8; width * height * 4];

    for (x, y, class) in classes.iter() {
        put_pixel(&mut pixels, classes.index(x, y), class.color());
    }

    apply_coastline(&mut pixels, classes);
    apply_snow_dither(&mut pixels, classes, dither_seed);

    // Rivers draw last so they stay visible over every land treatment
    for (x, y, &wet) in rivers.iter() {
        if wet && classes.get(x, y).is_land() {
            put_pixel(&mut pixels, classes.index(x, y), RIVER_COLOR);
        }
    }

    pixels
}

/// Recolor cells on either side of the coastline.
fn apply_coastline(pixels: &mut [u8], classes: &Grid<TerrainClass>) {
    for y in 0..classes.height {
        for x in 0..classes.width {
            let class = *classes.get(x, y);
            let mut touches_opposite = false;
            for (nx, ny) in classes.neighbors_8(x, y) {
                if classes.get(nx, ny).is_land() != class.is_land() {
                    touches_opposite = true;
                    break;
                }
            }
            if !touches_opposite {
                continue;
            }
            let tint = if class.is_land() {
                SHORE_LAND_COLOR
            } else {
                COASTAL_SEA_COLOR
            };
            put_pixel(pixels, classes.index(x, y), tint);
        }
    }
}

/// Probabilistically blend snowcap border cells toward their land
/// neighbors' average color. Classification is untouched; only pixels
/// soften.
fn apply_snow_dither(pixels: &mut [u8], classes: &Grid<TerrainClass>, dither_seed: u64) {
    for y in 0..classes.height {
        for x in 0..classes.width {
            if *classes.get(x, y) != TerrainClass::Snowcap {
                continue;
            }

            let mut sum = [0u32; 3];
            let mut count = 0u32;
            for (nx, ny) in classes.neighbors_8(x, y) {
                let neighbor = *classes.get(nx, ny);
                if matches!(neighbor, TerrainClass::Plains | TerrainClass::Mountain) {
                    let c = neighbor.color();
                    sum[0] += c[0] as u32;
                    sum[1] += c[1] as u32;
                    sum[2] += c[2] as u32;
                    count += 1;
                }
            }
            if count == 0 {
                continue;
            }

            let index = classes.index(x, y);
            if cell_hash(index, dither_seed) >= DITHER_FRACTION {
                continue;
            }

            let snow = TerrainClass::Snowcap.color();
            let mut blended = [0u8; 4];
            for c in 0..3 {
                let avg = (sum[c] / count) as f32;
                blended[c] = (snow[c] as f32 + (avg - snow[c] as f32) * DITHER_BLEND) as u8;
            }
            blended[3] = 255;
            put_pixel(pixels, index, blended);
        }
    }
}

#[inline]
fn put_pixel(pixels: &mut [u8], index: usize, color: [u8; 4]) {
    pixels[index * 4..index * 4 + 4].copy_from_slice(&color);
}
