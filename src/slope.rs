//! Slope derivation
//!
//! Per-cell gradient magnitude of the elevation grid, used by the
//! classifier (mountain cutoff) and the shadow engine (surface normals).

use crate::grid::Grid;

/// Compute the gradient-magnitude grid via central differences.
///
/// Border cells repeat themselves, so the outermost ring reports the
/// one-sided gradient rather than zero.
pub fn compute(height: &Grid<f32>) -> Grid<f32> {
    let mut slope = Grid::new_with(height.width, height.height, 0.0f32);

    for y in 0..height.height {
        for x in 0..height.width {
            let gx = *height.get_clamped(x as i32 + 1, y as i32)
                - *height.get_clamped(x as i32 - 1, y as i32);
            let gy = *height.get_clamped(x as i32, y as i32 + 1)
                - *height.get_clamped(x as i32, y as i32 - 1);
            slope.set(x, y, (gx * gx + gy * gy).sqrt() * 0.5);
        }
    }

    slope
}

/// Mean slope over cells at or above `sea_level`. Returns 0 when the map
/// has no land at all.
pub fn mean_land_slope(slope: &Grid<f32>, height: &Grid<f32>, sea_level: f32) -> f32 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (x, y, &s) in slope.iter() {
        if *height.get(x, y) >= sea_level {
            sum += s as f64;
            count += 1;
        }
    }
    if count > 0 {
        (sum / count as f64) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_field_has_zero_slope() {
        let height = Grid::new_with(16, 16, 0.5f32);
        let slope = compute(&height);
        for (_, _, &s) in slope.iter() {
            assert_eq!(s, 0.0);
        }
    }

    #[test]
    fn test_linear_ramp_has_constant_interior_slope() {
        let mut height = Grid::new_with(16, 16, 0.0f32);
        for y in 0..16 {
            for x in 0..16 {
                height.set(x, y, x as f32 * 0.1);
            }
        }
        let slope = compute(&height);

        // Central difference over a ramp of 0.1/cell: (0.2 / 2) * ... = 0.1 * 0.5
        for y in 0..16 {
            for x in 1..15 {
                assert!((*slope.get(x, y) - 0.05).abs() < 1e-6);
            }
        }

        // Border columns see a one-sided difference, half the interior value
        for y in 0..16 {
            assert!((*slope.get(0, y) - 0.025).abs() < 1e-6);
            assert!((*slope.get(15, y) - 0.025).abs() < 1e-6);
        }
    }

    #[test]
    fn test_slope_is_non_negative() {
        let mut height = Grid::new_with(8, 8, 0.0f32);
        for y in 0..8 {
            for x in 0..8 {
                height.set(x, y, ((x * 31 + y * 17) % 7) as f32 / 7.0);
            }
        }
        for (_, _, &s) in compute(&height).iter() {
            assert!(s >= 0.0);
        }
    }

    #[test]
    fn test_mean_land_slope_ignores_sea() {
        let mut height = Grid::new_with(4, 4, 0.0f32);
        let mut slope = Grid::new_with(4, 4, 0.0f32);
        // Left half sea with wild slopes, right half land with slope 0.2
        for y in 0..4 {
            for x in 0..4 {
                if x < 2 {
                    height.set(x, y, 0.1);
                    slope.set(x, y, 5.0);
                } else {
                    height.set(x, y, 0.8);
                    slope.set(x, y, 0.2);
                }
            }
        }
        let mean = mean_land_slope(&slope, &height, 0.5);
        assert!((mean - 0.2).abs() < 1e-6);
    }
}
