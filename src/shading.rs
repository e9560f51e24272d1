//! Hillshading and cast shadows
//!
//! Produces a signed per-cell illumination nudge from two sources:
//! directional shading of surface normals against a fixed light vector,
//! and ray-marched cast shadows thrown by prominent peaks. The nudge
//! field is centered so the map's net brightness never drifts upward,
//! then applied to the RGBA buffer. Water and river cells are never
//! shaded.

use crate::classify::TerrainClass;
use crate::grid::{Grid, DX, DY};
use crate::params::ShadowParams;
use crate::slope::mean_land_slope;

/// Maximum directional nudge at full strength.
const DIRECTIONAL_MAX: f32 = 0.35;
/// Maximum cast-shadow nudge at full strength.
const CAST_MAX: f32 = 0.45;
/// Cap on shadow-casting peaks per map.
const MAX_CASTERS: usize = 64;
/// Radius of the blurred baseline used for prominence.
const BASELINE_RADIUS: i32 = 6;
/// Vertical exaggeration when building surface normals.
const Z_FACTOR: f32 = 14.0;

/// Light arrives from the top-left; shadows fall toward the bottom-right.
const LIGHT_RAW: (f32, f32, f32) = (-0.6, -0.6, 0.5);

fn light_dir() -> (f32, f32, f32) {
    let (x, y, z) = LIGHT_RAW;
    let len = (x * x + y * y + z * z).sqrt();
    (x / len, y / len, z / len)
}

/// Compute the signed illumination nudge field.
///
/// Returns `None` when strength is zero or below, meaning shading is off.
pub fn shade(
    height: &Grid<f32>,
    slope: &Grid<f32>,
    classes: &Grid<TerrainClass>,
    rivers: &Grid<bool>,
    params: &ShadowParams,
) -> Option<Grid<f32>> {
    if params.strength_pct <= 0.0 {
        return None;
    }
    let strength = params.strength_pct / 100.0;

    let width = height.width;
    let h_px = height.height;
    let mut nudges = Grid::new_with(width, h_px, 0.0f32);

    let prominence = compute_prominence(height, classes, rivers);
    let ridge_threshold = params.prominence_threshold_pct / 100.0;

    // ---- Directional shading ----
    let light = light_dir();
    let flat_dot = light.2;
    // Cells at or below the mean land slope sit in the deadzone and stay
    // unshaded; the smoothstep ramps in above it
    let sea_level = sea_level_guess(height, classes);
    let deadzone_lo = mean_land_slope(slope, height, sea_level).max(1e-5);
    let deadzone_hi = deadzone_lo * 2.5;

    for y in 0..h_px {
        for x in 0..width {
            if !classes.get(x, y).is_land() || *rivers.get(x, y) {
                continue;
            }

            let gx = (*height.get_clamped(x as i32 + 1, y as i32)
                - *height.get_clamped(x as i32 - 1, y as i32))
                * 0.5
                * Z_FACTOR;
            let gy = (*height.get_clamped(x as i32, y as i32 + 1)
                - *height.get_clamped(x as i32, y as i32 - 1))
                * 0.5
                * Z_FACTOR;

            let len = (gx * gx + gy * gy + 1.0).sqrt();
            let (nx, ny, nz) = (-gx / len, -gy / len, 1.0 / len);

            let directional = nx * light.0 + ny * light.1 + nz * light.2 - flat_dot;
            let weight = smooth_step(deadzone_lo, deadzone_hi, *slope.get(x, y));

            let mut nudge = directional * weight * strength;

            // Prominent peaks catch extra light
            let prom = *prominence.get(x, y);
            if prom >= ridge_threshold && nudge > 0.0 {
                nudge *= 1.0 + params.peak_lightening_pct / 100.0 * prom;
            }

            let cap = DIRECTIONAL_MAX * strength;
            nudges.set(x, y, nudge.clamp(-cap, cap));
        }
    }

    // ---- Cast shadows ----
    // Accumulated separately so the cast component clamps to its own
    // maximum before joining the directional term
    let mut cast = Grid::new_with(width, h_px, 0.0f32);
    let casters = find_casters(&prominence, ridge_threshold);
    let length = params.length_px.max(1);
    // Ray height falls over the whole normalized range across the
    // configured length, so short rays decay fast
    let drop_per_step = 1.0 / length as f32;
    let (step_x, step_y) = cast_direction();
    let cast_cap = CAST_MAX * strength;

    for &(cx, cy) in &casters {
        let prom = *prominence.get(cx, cy);
        let mut ray_height = *height.get(cx, cy);

        for t in 1..=length {
            let px = (cx as f32 + step_x * t as f32).round() as i32;
            let py = (cy as f32 + step_y * t as f32).round() as i32;
            if px < 0 || px >= width as i32 || py < 0 || py >= h_px as i32 {
                break;
            }
            let (px, py) = (px as usize, py as usize);

            ray_height -= drop_per_step;
            let terrain = *height.get(px, py);
            if terrain >= ray_height {
                break;
            }

            if !classes.get(px, py).is_land() || *rivers.get(px, py) {
                continue;
            }

            let falloff = 1.0 - t as f32 / length as f32;
            let gap = (ray_height - terrain).min(1.0);
            let darken = gap * prom * falloff * cast_cap;
            let current = *cast.get(px, py);
            cast.set(px, py, (current - darken).max(-cast_cap));
        }
    }

    for y in 0..h_px {
        for x in 0..width {
            let combined = *nudges.get(x, y) + *cast.get(x, y);
            nudges.set(x, y, combined);
        }
    }

    // ---- Net brightness centering ----
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (_, _, &n) in nudges.iter() {
        if n != 0.0 {
            sum += n as f64;
            count += 1;
        }
    }
    if count > 0 {
        let mean = (sum / count as f64) as f32;
        if mean > 0.0 {
            for y in 0..h_px {
                for x in 0..width {
                    let n = *nudges.get(x, y);
                    if n != 0.0 {
                        nudges.set(x, y, n - mean);
                    }
                }
            }
        }
    }

    let total_cap = (DIRECTIONAL_MAX + CAST_MAX) * strength;
    for y in 0..h_px {
        for x in 0..width {
            let n = *nudges.get(x, y);
            nudges.set(x, y, n.clamp(-total_cap, total_cap));
        }
    }

    Some(nudges)
}

/// Apply a nudge field to the RGBA buffer. Positive nudges pull channels
/// toward white, negative ones darken multiplicatively. Water and river
/// cells keep their colors.
pub fn apply(
    pixels: &mut [u8],
    nudges: &Grid<f32>,
    classes: &Grid<TerrainClass>,
    rivers: &Grid<bool>,
) {
    for (x, y, &n) in nudges.iter() {
        if n == 0.0 || !classes.get(x, y).is_land() || *rivers.get(x, y) {
            continue;
        }
        let base = nudges.index(x, y) * 4;
        for c in 0..3 {
            let v = pixels[base + c] as f32;
            let shaded = if n > 0.0 {
                v + (255.0 - v) * n
            } else {
                v * (1.0 + n)
            };
            pixels[base + c] = shaded.clamp(0.0, 255.0) as u8;
        }
    }
}

// =============================================================================
// PROMINENCE
// =============================================================================

/// Height above a locally blurred baseline, normalized to [0,1].
///
/// The baseline averages only land, non-river cells so sea trenches and
/// carved river lines never inflate a peak's apparent height.
fn compute_prominence(
    height: &Grid<f32>,
    classes: &Grid<TerrainClass>,
    rivers: &Grid<bool>,
) -> Grid<f32> {
    let width = height.width;
    let h_px = height.height;
    let mut prominence = Grid::new_with(width, h_px, 0.0f32);

    let mut max_prom = 0.0f32;
    for y in 0..h_px {
        for x in 0..width {
            if !classes.get(x, y).is_land() || *rivers.get(x, y) {
                continue;
            }

            let mut sum = 0.0f32;
            let mut count = 0.0f32;
            for dy in -BASELINE_RADIUS..=BASELINE_RADIUS {
                for dx in -BASELINE_RADIUS..=BASELINE_RADIUS {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx < 0 || nx >= width as i32 || ny < 0 || ny >= h_px as i32 {
                        continue;
                    }
                    let (nx, ny) = (nx as usize, ny as usize);
                    if !classes.get(nx, ny).is_land() || *rivers.get(nx, ny) {
                        continue;
                    }
                    sum += *height.get(nx, ny);
                    count += 1.0;
                }
            }

            let baseline = if count > 0.0 {
                sum / count
            } else {
                *height.get(x, y)
            };
            let prom = *height.get(x, y) - baseline;
            if prom > 0.0 {
                prominence.set(x, y, prom);
                max_prom = max_prom.max(prom);
            }
        }
    }

    if max_prom > 0.0 {
        for y in 0..h_px {
            for x in 0..width {
                let p = *prominence.get(x, y);
                prominence.set(x, y, p / max_prom);
            }
        }
    }

    prominence
}

/// Local prominence maxima above the ridge threshold, best first, capped.
fn find_casters(prominence: &Grid<f32>, ridge_threshold: f32) -> Vec<(usize, usize)> {
    let mut casters: Vec<(usize, usize, f32)> = Vec::new();

    for y in 0..prominence.height {
        for x in 0..prominence.width {
            let p = *prominence.get(x, y);
            if p < ridge_threshold || p == 0.0 {
                continue;
            }
            let mut is_peak = true;
            for dir in 0..8 {
                let nx = x as i32 + DX[dir];
                let ny = y as i32 + DY[dir];
                if nx < 0 || nx >= prominence.width as i32 || ny < 0 || ny >= prominence.height as i32
                {
                    continue;
                }
                if *prominence.get(nx as usize, ny as usize) > p {
                    is_peak = false;
                    break;
                }
            }
            if is_peak {
                casters.push((x, y, p));
            }
        }
    }

    // Strongest peaks first; index order breaks ties deterministically
    casters.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (a.1, a.0).cmp(&(b.1, b.0)))
    });
    casters.truncate(MAX_CASTERS);
    casters.into_iter().map(|(x, y, _)| (x, y)).collect()
}

/// Ground direction shadows travel: directly away from the light.
fn cast_direction() -> (f32, f32) {
    let light = light_dir();
    let len = (light.0 * light.0 + light.1 * light.1).sqrt();
    (-light.0 / len, -light.1 / len)
}

/// Lowest land elevation, used to rebuild the sea cutoff for the slope
/// deadzone without re-deriving quantiles.
fn sea_level_guess(height: &Grid<f32>, classes: &Grid<TerrainClass>) -> f32 {
    let mut lowest_land = f32::MAX;
    for (x, y, class) in classes.iter() {
        if class.is_land() {
            lowest_land = lowest_land.min(*height.get(x, y));
        }
    }
    if lowest_land == f32::MAX {
        0.0
    } else {
        lowest_land
    }
}

fn smooth_step(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
