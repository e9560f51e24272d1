//! Hydrology simulation
//!
//! Places river sources by rejection sampling and traces each one downhill
//! as an independent branch walk. Every branch stamps spine cells onto a
//! shared river mask with a circular brush and assigns a monotonically
//! increasing arrival step, which the presentation layer uses to reveal
//! rivers progressively.
//!
//! Branch-local cycle detection reuses one stamp grid: each walk gets a
//! fresh branch id and only compares stamps against that id, so no
//! per-branch visited set is ever allocated.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::grid::{Grid, DX, DY};

/// Radius of the circular brush stamped around each spine cell.
const RIVER_BRUSH_RADIUS: f32 = 1.2;

/// Minimum elevation above sea level for an auto-placed source.
const MIN_SOURCE_RISE: f32 = 0.08;

/// Relaxed rise once most of the attempt budget is spent.
const RELAXED_SOURCE_RISE: f32 = 0.02;

/// Exclusion disc radius around blocked source cells.
const BLOCKED_RADIUS: f32 = 6.0;

/// Placement attempts budgeted per requested source.
const ATTEMPTS_PER_SOURCE: usize = 60;

/// Inputs for one trace pass.
#[derive(Clone, Debug, Default)]
pub struct RiverParams {
    /// Elevation at or below which flow terminates
    pub sea_level: f32,
    /// Requested number of auto-placed sources
    pub target_sources: usize,
    pub seed: u64,
    /// Externally placed source cells (indices), oldest first
    pub manual_sources: Vec<usize>,
    /// Cells whose surroundings may not spawn sources
    pub blocked_sources: Vec<usize>,
    /// Also record an isolated arrival sequence for the newest manual source
    pub animate_newest_only: bool,
}

/// A traced river network.
#[derive(Clone, PartialEq)]
pub struct RiverNetwork {
    /// Cells covered by any river brush stroke
    pub mask: Grid<bool>,
    /// 1-based arrival step per spine cell, 0 = not a river spine
    pub arrival: Grid<u32>,
    /// Arrival sequence restricted to the newest manual source's branch
    pub newest_arrival: Option<Grid<u32>>,
    /// Source cells in trace order
    pub sources: Vec<usize>,
    /// Cells where branches terminated (at/below sea or fully enclosed)
    pub mouths: Vec<usize>,
    /// Number of distinct spine cells, equals the maximum arrival step
    pub spine_cells: u32,
    /// Land cells covered by the river mask
    pub river_land_cells: usize,
}

impl RiverNetwork {
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            mask: Grid::new_with(width, height, false),
            arrival: Grid::new_with(width, height, 0u32),
            newest_arrival: None,
            sources: Vec::new(),
            mouths: Vec::new(),
            spine_cells: 0,
            river_land_cells: 0,
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

// =============================================================================
// SOURCE PLACEMENT
// =============================================================================

/// Rejection-sample auto source cells.
///
/// A candidate must clear the minimum rise above sea level (relaxed once
/// 70% of the budget is spent), keep its distance from earlier sources and
/// blocked discs, and have at least one neighbor it could flow toward.
fn place_sources(
    height: &Grid<f32>,
    params: &RiverParams,
    rng: &mut ChaCha8Rng,
) -> Vec<usize> {
    let width = height.width;
    let h_px = height.height;

    let budget = params.target_sources * ATTEMPTS_PER_SOURCE;
    let relax_after = budget * 7 / 10;
    let min_spacing = (width.max(h_px) / 12).max(4) as f32;

    let mut accepted: Vec<usize> = Vec::new();

    for attempt in 0..budget {
        if accepted.len() >= params.target_sources {
            break;
        }

        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..h_px);
        let cell = height.index(x, y);
        let elevation = *height.get(x, y);

        let rise = if attempt >= relax_after {
            RELAXED_SOURCE_RISE
        } else {
            MIN_SOURCE_RISE
        };
        if elevation < params.sea_level + rise {
            continue;
        }

        if !clears_spacing(height, cell, &accepted, min_spacing) {
            continue;
        }
        if is_blocked(height, cell, &params.blocked_sources) {
            continue;
        }
        if !has_outflow(height, x, y) {
            continue;
        }

        accepted.push(cell);
    }

    accepted
}

/// Merge manual sources behind the auto set: dedup against everything
/// already accepted, drop cells failing the blocked/elevation filters.
/// Returns the surviving newest manual source, if any.
fn merge_manual_sources(
    height: &Grid<f32>,
    params: &RiverParams,
    sources: &mut Vec<usize>,
) -> Option<usize> {
    let mut newest = None;

    for &cell in &params.manual_sources {
        if cell >= height.width * height.height {
            continue;
        }
        if sources.contains(&cell) {
            continue;
        }
        let (x, y) = height.coords(cell);
        if *height.get(x, y) < params.sea_level + RELAXED_SOURCE_RISE {
            continue;
        }
        if is_blocked(height, cell, &params.blocked_sources) {
            continue;
        }
        sources.push(cell);
        newest = Some(cell);
    }

    newest
}

fn clears_spacing(height: &Grid<f32>, cell: usize, accepted: &[usize], spacing: f32) -> bool {
    let (x, y) = height.coords(cell);
    let spacing_sq = spacing * spacing;
    for &other in accepted {
        let (ox, oy) = height.coords(other);
        let dx = x as f32 - ox as f32;
        let dy = y as f32 - oy as f32;
        if dx * dx + dy * dy < spacing_sq {
            return false;
        }
    }
    true
}

fn is_blocked(height: &Grid<f32>, cell: usize, blocked: &[usize]) -> bool {
    let (x, y) = height.coords(cell);
    let radius_sq = BLOCKED_RADIUS * BLOCKED_RADIUS;
    for &b in blocked {
        if b >= height.width * height.height {
            continue;
        }
        let (bx, by) = height.coords(b);
        let dx = x as f32 - bx as f32;
        let dy = y as f32 - by as f32;
        if dx * dx + dy * dy <= radius_sq {
            return true;
        }
    }
    false
}

/// A source needs at least one lower-or-equal neighbor to flow toward.
fn has_outflow(height: &Grid<f32>, x: usize, y: usize) -> bool {
    let elevation = *height.get(x, y);
    for dir in 0..8 {
        let nx = x as i32 + DX[dir];
        let ny = y as i32 + DY[dir];
        if nx < 0 || nx >= height.width as i32 || ny < 0 || ny >= height.height as i32 {
            continue;
        }
        if *height.get(nx as usize, ny as usize) <= elevation {
            return true;
        }
    }
    false
}

// =============================================================================
// FLOW TRACING
// =============================================================================

/// Trace the full river network for a heightfield.
pub fn trace(height: &Grid<f32>, params: &RiverParams) -> RiverNetwork {
    let width = height.width;
    let h_px = height.height;

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut sources = place_sources(height, params, &mut rng);
    let newest_manual = merge_manual_sources(height, params, &mut sources);

    if sources.is_empty() {
        return RiverNetwork::empty(width, h_px);
    }

    let mut network = RiverNetwork::empty(width, h_px);
    if params.animate_newest_only && newest_manual.is_some() {
        network.newest_arrival = Some(Grid::new_with(width, h_px, 0u32));
    }
    network.sources = sources.clone();

    let brush = brush_offsets(RIVER_BRUSH_RADIUS);
    let step_budget = 2 * (width + h_px);

    // One stamp grid for every branch; each walk compares against its own id
    let mut branch_stamp = Grid::new_with(width, h_px, 0u32);
    let mut branch_id = 0u32;
    let mut next_arrival = 0u32;

    for &source in &sources {
        branch_id += 1;
        let track_newest = newest_manual == Some(source) && network.newest_arrival.is_some();
        let mut newest_step = 0u32;
        let mut steps = 0usize;

        // Explicit stack keeps the walk iterative; it holds the single
        // frontier cell of this branch
        let mut pending = vec![source];

        while let Some(cell) = pending.pop() {
            let (x, y) = height.coords(cell);
            let elevation = *height.get(x, y);

            // Another branch already owns this cell: merge and stop
            if *network.arrival.get(x, y) > 0 {
                break;
            }

            branch_stamp.set(x, y, branch_id);
            next_arrival += 1;
            network.arrival.set(x, y, next_arrival);
            if track_newest {
                newest_step += 1;
                if let Some(newest) = network.newest_arrival.as_mut() {
                    newest.set(x, y, newest_step);
                }
            }
            stamp_brush(&mut network.mask, height, params.sea_level, x, y, &brush);

            steps += 1;
            if steps > step_budget {
                break;
            }

            // Lowest neighbor strictly below us that this branch has not
            // walked; failing that, the lowest unvisited neighbor at all
            let mut best_lower: Option<(usize, f32)> = None;
            let mut best_any: Option<(usize, f32)> = None;
            for dir in 0..8 {
                let nx = x as i32 + DX[dir];
                let ny = y as i32 + DY[dir];
                if nx < 0 || nx >= width as i32 || ny < 0 || ny >= h_px as i32 {
                    continue;
                }
                let (nx, ny) = (nx as usize, ny as usize);
                if *branch_stamp.get(nx, ny) == branch_id {
                    continue;
                }
                let n_elev = *height.get(nx, ny);
                let n_cell = height.index(nx, ny);
                if n_elev < elevation && best_lower.map_or(true, |(_, b)| n_elev < b) {
                    best_lower = Some((n_cell, n_elev));
                }
                if best_any.map_or(true, |(_, b)| n_elev < b) {
                    best_any = Some((n_cell, n_elev));
                }
            }

            match best_lower.or(best_any) {
                None => {
                    // Fully enclosed by our own path: terminal cell
                    network.mouths.push(cell);
                    break;
                }
                Some((n_cell, n_elev)) => {
                    if n_elev <= params.sea_level {
                        network.mouths.push(n_cell);
                        break;
                    }
                    pending.push(n_cell);
                }
            }
        }
    }

    network.spine_cells = next_arrival;
    network.river_land_cells = network
        .mask
        .iter()
        .filter(|&(x, y, &m)| m && *height.get(x, y) > params.sea_level)
        .count();

    network
}

fn brush_offsets(radius: f32) -> Vec<(i32, i32)> {
    let r = radius.ceil() as i32;
    let radius_sq = radius * radius;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx * dx + dy * dy) as f32 <= radius_sq {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

/// Stamp the brush around a spine cell. Only land cells take paint so the
/// mask never bleeds into the sea.
fn stamp_brush(
    mask: &mut Grid<bool>,
    height: &Grid<f32>,
    sea_level: f32,
    x: usize,
    y: usize,
    brush: &[(i32, i32)],
) {
    for &(dx, dy) in brush {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx < 0 || nx >= mask.width as i32 || ny < 0 || ny >= mask.height as i32 {
            continue;
        }
        let (nx, ny) = (nx as usize, ny as usize);
        if *height.get(nx, ny) > sea_level {
            mask.set(nx, ny, true);
        }
    }
}

// =============================================================================
// PROGRESSIVE REVEAL
// =============================================================================

/// Which spine cells are visible at `progress` (0 = nothing, 1 = all).
///
/// Pure function of the finished network; the simulator itself never
/// depends on a clock.
pub fn reveal_mask(network: &RiverNetwork, progress: f32) -> Grid<bool> {
    let cutoff = (progress.clamp(0.0, 1.0) * network.spine_cells as f32).ceil() as u32;
    let mut visible = Grid::new_with(network.arrival.width, network.arrival.height, false);
    for (x, y, &step) in network.arrival.iter() {
        if step != 0 && step <= cutoff {
            visible.set(x, y, true);
        }
    }
    visible
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cone descending from the center, flat shelf at the rim.
    fn cone_field(size: usize) -> Grid<f32> {
        let mut height = Grid::new_with(size, size, 0.0f32);
        let center = size as f32 / 2.0;
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                let dist = (dx * dx + dy * dy).sqrt() / center;
                height.set(x, y, (1.0 - dist).clamp(0.05, 1.0));
            }
        }
        height
    }

    fn basic_params(target: usize) -> RiverParams {
        RiverParams {
            sea_level: 0.2,
            target_sources: target,
            seed: 99,
            ..RiverParams::default()
        }
    }

    #[test]
    fn test_zero_sources_yield_empty_network() {
        let height = cone_field(64);
        let network = trace(&height, &basic_params(0));
        assert_eq!(network.source_count(), 0);
        assert_eq!(network.spine_cells, 0);
        assert!(network.mask.iter().all(|(_, _, &m)| !m));
    }

    #[test]
    fn test_submerged_map_yields_empty_network() {
        let height = Grid::new_with(64, 64, 0.1f32);
        let mut params = basic_params(5);
        params.sea_level = 0.5;
        let network = trace(&height, &params);
        assert_eq!(network.source_count(), 0);
    }

    #[test]
    fn test_source_count_never_exceeds_target() {
        let height = cone_field(64);
        let network = trace(&height, &basic_params(4));
        assert!(network.source_count() <= 4);
        assert!(network.source_count() > 0);
    }

    #[test]
    fn test_spine_cells_sit_above_sea_level() {
        let height = cone_field(96);
        let params = basic_params(5);
        let network = trace(&height, &params);
        for (x, y, &step) in network.arrival.iter() {
            if step > 0 {
                assert!(*height.get(x, y) > params.sea_level);
            }
        }
    }

    #[test]
    fn test_max_arrival_equals_spine_count() {
        let height = cone_field(96);
        let network = trace(&height, &basic_params(5));
        let max_step = network.arrival.iter().map(|(_, _, &s)| s).max().unwrap();
        let stamped = network.arrival.iter().filter(|&(_, _, &s)| s > 0).count();
        assert_eq!(max_step, network.spine_cells);
        assert_eq!(stamped as u32, network.spine_cells);
    }

    #[test]
    fn test_flat_basin_walk_terminates_within_budget() {
        // Bowl with a perfectly flat floor: the walk must wander the floor
        // on the fallback rule without ever revisiting a cell
        let size = 48;
        let mut height = Grid::new_with(size, size, 0.0f32);
        let center = size as f32 / 2.0;
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                let dist = (dx * dx + dy * dy).sqrt() / center;
                height.set(x, y, dist.max(0.3));
            }
        }

        let rim = height.index(1, size / 2);
        let params = RiverParams {
            sea_level: 0.0,
            target_sources: 0,
            seed: 1,
            manual_sources: vec![rim],
            ..RiverParams::default()
        };
        let network = trace(&height, &params);

        let budget = 2 * (size + size);
        assert!(network.spine_cells as usize <= budget + 1);
        // No cell stamped twice: arrival steps are unique
        let mut steps: Vec<u32> = network
            .arrival
            .iter()
            .filter_map(|(_, _, &s)| (s > 0).then_some(s))
            .collect();
        steps.sort_unstable();
        steps.dedup();
        assert_eq!(steps.len() as u32, network.spine_cells);
    }

    #[test]
    fn test_manual_source_gets_isolated_sequence() {
        let height = cone_field(64);
        let manual = height.index(16, 16);
        let params = RiverParams {
            sea_level: 0.2,
            target_sources: 0,
            seed: 7,
            manual_sources: vec![manual],
            animate_newest_only: true,
            ..RiverParams::default()
        };
        let network = trace(&height, &params);

        assert!(network.sources.contains(&manual));
        let newest = network.newest_arrival.as_ref().unwrap();
        let newest_cells = newest.iter().filter(|&(_, _, &s)| s > 0).count();
        assert!(newest_cells > 0);
        // The isolated sequence is 1-based and gapless
        let max_newest = newest.iter().map(|(_, _, &s)| s).max().unwrap();
        assert_eq!(max_newest as usize, newest_cells);
    }

    #[test]
    fn test_blocked_disc_excludes_sources() {
        let height = cone_field(64);
        let blocked_center = height.index(32, 32);
        let mut params = basic_params(6);
        params.blocked_sources = vec![blocked_center];
        let network = trace(&height, &params);

        for &source in &network.sources {
            let (x, y) = height.coords(source);
            let dx = x as f32 - 32.0;
            let dy = y as f32 - 32.0;
            assert!(dx * dx + dy * dy > BLOCKED_RADIUS * BLOCKED_RADIUS);
        }
    }

    #[test]
    fn test_reveal_mask_grows_with_progress() {
        let height = cone_field(64);
        let network = trace(&height, &basic_params(4));
        let count = |g: &Grid<bool>| g.iter().filter(|&(_, _, &v)| v).count();

        let none = reveal_mask(&network, 0.0);
        let half = reveal_mask(&network, 0.5);
        let full = reveal_mask(&network, 1.0);

        assert_eq!(count(&none), 0);
        assert!(count(&half) <= count(&full));
        assert_eq!(count(&full) as u32, network.spine_cells);
    }

    #[test]
    fn test_trace_is_deterministic() {
        let height = cone_field(64);
        let a = trace(&height, &basic_params(5));
        let b = trace(&height, &basic_params(5));
        assert!(a == b);
    }
}
