//! Generation pipeline
//!
//! Bundles one full generation pass: heightfield, slope, quantile
//! cutoffs, hydrology, classification, rendering, shading, and zone
//! seeding. The pipeline is pure and synchronous; every call owns its
//! grids and nothing persists between calls. Staleness handling for
//! superseded in-flight generations is the caller's job: compare the
//! `params` carried by a finished `MapData` before consuming it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classify::{self, Cutoffs, TerrainClass};
use crate::grid::Grid;
use crate::heightfield;
use crate::hydrology::{self, RiverNetwork, RiverParams};
use crate::params::MapParams;
use crate::seeds::MapSeeds;
use crate::shading;
use crate::slope;
use crate::zones::{self, ResourceZone};

/// Externally managed river state threaded into a generation: manual
/// sources the user placed, sources they suppressed, and whether the
/// newest manual source should get its own reveal sequence.
#[derive(Clone, Debug, Default)]
pub struct RiverOverrides {
    pub manual_sources: Vec<usize>,
    pub blocked_sources: Vec<usize>,
    pub animate_newest_only: bool,
}

/// Summary statistics for one generated map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapStats {
    pub land_fraction: f32,
    pub water_fraction: f32,
    pub mountain_fraction: f32,
    pub snowcap_fraction: f32,
    pub river_fraction: f32,
    pub river_sources: usize,
}

impl MapStats {
    fn compute(classes: &Grid<TerrainClass>, rivers: &RiverNetwork) -> Self {
        let total = (classes.width * classes.height) as f32;
        let mut land = 0usize;
        let mut mountain = 0usize;
        let mut snow = 0usize;

        for (_, _, &class) in classes.iter() {
            match class {
                TerrainClass::Sea => {}
                TerrainClass::Plains => land += 1,
                TerrainClass::Mountain => {
                    land += 1;
                    mountain += 1;
                }
                TerrainClass::Snowcap => {
                    land += 1;
                    snow += 1;
                }
            }
        }

        Self {
            land_fraction: land as f32 / total,
            water_fraction: 1.0 - land as f32 / total,
            mountain_fraction: mountain as f32 / total,
            snowcap_fraction: snow as f32 / total,
            river_fraction: rivers.river_land_cells as f32 / total,
            river_sources: rivers.source_count(),
        }
    }
}

impl fmt::Display for MapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "land {:.1}% | mountain {:.1}% | snow {:.1}% | rivers {:.2}% ({} sources)",
            self.land_fraction * 100.0,
            self.mountain_fraction * 100.0,
            self.snowcap_fraction * 100.0,
            self.river_fraction * 100.0,
            self.river_sources,
        )
    }
}

/// Everything produced by one generation pass.
pub struct MapData {
    /// The clamped parameters this map was generated from
    pub params: MapParams,
    pub height: Grid<f32>,
    pub slope: Grid<f32>,
    pub cutoffs: Cutoffs,
    pub classes: Grid<TerrainClass>,
    pub rivers: RiverNetwork,
    /// Signed illumination nudges, None when shading is disabled
    pub shading: Option<Grid<f32>>,
    /// RGBA pixel buffer, row-major, opaque
    pub pixels: Vec<u8>,
    pub zones: Vec<ResourceZone>,
    pub stats: MapStats,
}

impl MapData {
    pub fn width(&self) -> usize {
        self.height.width
    }

    pub fn height_px(&self) -> usize {
        self.height.height
    }
}

/// Generate a fresh map with no external river state.
pub fn generate(params: &MapParams) -> MapData {
    generate_with_rivers(params, &RiverOverrides::default())
}

/// Generate a map, merging externally managed river sources.
pub fn generate_with_rivers(params: &MapParams, overrides: &RiverOverrides) -> MapData {
    let params = params.clone().clamped();
    let seeds = MapSeeds::from_master(params.seed);

    let height = heightfield::synthesize(&params);
    let slope = slope::compute(&height);

    let cutoffs = classify::compute_cutoffs(
        &height,
        &slope,
        params.sea_level_quantile,
        params.snowcap_fraction,
        params.smoothness_t(),
    );

    let river_params = RiverParams {
        sea_level: cutoffs.sea_level,
        target_sources: params.river_count,
        seed: seeds.rivers,
        manual_sources: overrides.manual_sources.clone(),
        blocked_sources: overrides.blocked_sources.clone(),
        animate_newest_only: overrides.animate_newest_only,
    };
    let rivers = hydrology::trace(&height, &river_params);

    let classes = classify::classify(&height, &slope, &cutoffs);
    let mut pixels = classify::render(&classes, &rivers.mask, seeds.dither);

    let nudges = shading::shade(&height, &slope, &classes, &rivers.mask, &params.shadow);
    if let Some(ref nudges) = nudges {
        shading::apply(&mut pixels, nudges, &classes, &rivers.mask);
    }

    let zones = zones::seed_zones(params.width, params.height, params.seed);
    let stats = MapStats::compute(&classes, &rivers);

    MapData {
        params,
        height,
        slope,
        cutoffs,
        classes,
        rivers,
        shading: nudges,
        pixels,
        zones,
        stats,
    }
}
