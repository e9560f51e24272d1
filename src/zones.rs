//! Resource zone seeding
//!
//! Places one irregular polygonal zone per resource kind at generation
//! time. Centers are rejection-sampled against a pairwise separation
//! constraint; vertices are jittered around the target radius and then
//! uniformly rescaled so the polygon's area lands near the kind's target.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::seeds::MapSeeds;

/// Resource categories seeded on every fresh map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Ore,
    Stone,
    Timber,
    Fertile,
    Game,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Ore,
        ResourceKind::Stone,
        ResourceKind::Timber,
        ResourceKind::Fertile,
        ResourceKind::Game,
    ];

    /// Target polygon area as a fraction of the unit square.
    pub fn target_area(&self) -> f32 {
        match self {
            ResourceKind::Ore => 0.010,
            ResourceKind::Stone => 0.012,
            ResourceKind::Timber => 0.030,
            ResourceKind::Fertile => 0.025,
            ResourceKind::Game => 0.018,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::Ore => "Ore",
            ResourceKind::Stone => "Stone",
            ResourceKind::Timber => "Timber",
            ResourceKind::Fertile => "Fertile",
            ResourceKind::Game => "Game",
        }
    }
}

/// An irregular polygonal resource zone in normalized map coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceZone {
    pub kind: ResourceKind,
    /// Yield strength in percent
    pub strength_pct: u8,
    /// Normalized (x, y) vertices in [0,1], always at least 3
    pub vertices: Vec<(f32, f32)>,
}

impl ResourceZone {
    /// Shoelace area in normalized units.
    pub fn area(&self) -> f32 {
        polygon_area(&self.vertices)
    }
}

/// Center placement attempts before falling back to the best candidate.
const CENTER_ATTEMPTS: usize = 40;
/// Minimum normalized separation between zone centers.
const MIN_CENTER_SEPARATION: f32 = 0.24;
/// Vertices never leave this inset of the unit square.
const EDGE_MARGIN: f32 = 0.01;
/// Bounds of the uniform area-correction factor.
const MIN_CORRECTION: f32 = 0.66;
const MAX_CORRECTION: f32 = 1.5;

/// Seed the full zone set for a fresh map.
pub fn seed_zones(width: usize, height: usize, map_seed: u32) -> Vec<ResourceZone> {
    let seeds = MapSeeds::from_master(map_seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seeds.zones);

    // Aspect correction keeps zones roughly round on non-square rasters
    let mean_dim = (width + height) as f32 / 2.0;
    let aspect_x = mean_dim / width as f32;
    let aspect_y = mean_dim / height as f32;

    let mut centers: Vec<(f32, f32)> = Vec::new();
    let mut zones = Vec::with_capacity(ResourceKind::ALL.len());

    for kind in ResourceKind::ALL {
        let center = place_center(&mut rng, &centers);
        centers.push(center);

        let vertices = build_polygon(&mut rng, center, kind.target_area(), aspect_x, aspect_y);
        let strength_pct = rng.gen_range(35..=90);

        zones.push(ResourceZone {
            kind,
            strength_pct,
            vertices,
        });
    }

    zones
}

/// Rejection-sample a center clearing the separation constraint, keeping
/// the best-separated candidate as a fallback.
fn place_center(rng: &mut ChaCha8Rng, centers: &[(f32, f32)]) -> (f32, f32) {
    let mut best = (0.5f32, 0.5f32);
    let mut best_separation = f32::MIN;

    for _ in 0..CENTER_ATTEMPTS {
        let candidate = (rng.gen_range(0.15f32..0.85), rng.gen_range(0.15f32..0.85));

        let separation = centers
            .iter()
            .map(|&(cx, cy)| {
                let dx = candidate.0 - cx;
                let dy = candidate.1 - cy;
                (dx * dx + dy * dy).sqrt()
            })
            .fold(f32::MAX, f32::min);

        if separation >= MIN_CENTER_SEPARATION {
            return candidate;
        }
        if separation > best_separation {
            best_separation = separation;
            best = candidate;
        }
    }

    best
}

/// Build 8-11 jittered radial vertices and correct the polygon area toward
/// the target.
fn build_polygon(
    rng: &mut ChaCha8Rng,
    center: (f32, f32),
    target_area: f32,
    aspect_x: f32,
    aspect_y: f32,
) -> Vec<(f32, f32)> {
    let vertex_count = rng.gen_range(8..=11);
    let target_radius = (target_area / std::f32::consts::PI).sqrt();
    let slice = std::f32::consts::TAU / vertex_count as f32;

    let mut vertices = Vec::with_capacity(vertex_count);
    for i in 0..vertex_count {
        let angle = i as f32 * slice + rng.gen_range(-0.35f32..0.35) * slice;
        let radius = target_radius * rng.gen_range(0.7f32..1.3);
        vertices.push((
            center.0 + angle.cos() * radius * aspect_x,
            center.1 + angle.sin() * radius * aspect_y,
        ));
    }

    // Uniformly rescale about the centroid so the area approaches the
    // target; a zero-area polygon skips the rescale entirely
    let actual = polygon_area(&vertices);
    if actual > 1e-9 {
        let factor = (target_area / actual)
            .sqrt()
            .clamp(MIN_CORRECTION, MAX_CORRECTION);
        let centroid = polygon_centroid(&vertices);
        for v in &mut vertices {
            v.0 = centroid.0 + (v.0 - centroid.0) * factor;
            v.1 = centroid.1 + (v.1 - centroid.1) * factor;
        }
    }

    for v in &mut vertices {
        v.0 = v.0.clamp(EDGE_MARGIN, 1.0 - EDGE_MARGIN);
        v.1 = v.1.clamp(EDGE_MARGIN, 1.0 - EDGE_MARGIN);
    }

    vertices
}

/// Unsigned shoelace area.
fn polygon_area(vertices: &[(f32, f32)]) -> f32 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0f32;
    for i in 0..vertices.len() {
        let (x0, y0) = vertices[i];
        let (x1, y1) = vertices[(i + 1) % vertices.len()];
        sum += x0 * y1 - x1 * y0;
    }
    (sum / 2.0).abs()
}

fn polygon_centroid(vertices: &[(f32, f32)]) -> (f32, f32) {
    let n = vertices.len() as f32;
    let (sx, sy) = vertices
        .iter()
        .fold((0.0f32, 0.0f32), |(ax, ay), &(x, y)| (ax + x, ay + y));
    (sx / n, sy / n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_gets_a_zone() {
        let zones = seed_zones(512, 512, 1234);
        assert_eq!(zones.len(), ResourceKind::ALL.len());
        for (zone, kind) in zones.iter().zip(ResourceKind::ALL) {
            assert_eq!(zone.kind, kind);
        }
    }

    #[test]
    fn test_polygons_are_valid() {
        for seed in [0u32, 7, 999, 123456] {
            for zone in seed_zones(512, 512, seed) {
                assert!(zone.vertices.len() >= 3);
                for &(x, y) in &zone.vertices {
                    assert!((0.0..=1.0).contains(&x));
                    assert!((0.0..=1.0).contains(&y));
                }
            }
        }
    }

    #[test]
    fn test_area_lands_near_target() {
        for seed in [3u32, 42, 777] {
            for zone in seed_zones(512, 512, seed) {
                let target = zone.kind.target_area();
                let actual = zone.area();
                assert!(
                    actual >= target * 0.5 && actual <= target * 1.5,
                    "{} area {} vs target {}",
                    zone.kind.display_name(),
                    actual,
                    target
                );
            }
        }
    }

    #[test]
    fn test_strength_is_a_percent() {
        for zone in seed_zones(512, 512, 55) {
            assert!(zone.strength_pct <= 100);
        }
    }

    #[test]
    fn test_seeding_is_deterministic() {
        assert_eq!(seed_zones(300, 200, 42), seed_zones(300, 200, 42));
        assert_ne!(seed_zones(300, 200, 42), seed_zones(300, 200, 43));
    }

    #[test]
    fn test_degenerate_polygon_skips_rescale() {
        let line = vec![(0.2, 0.2), (0.4, 0.4), (0.6, 0.6)];
        assert_eq!(polygon_area(&line), 0.0);
    }
}
