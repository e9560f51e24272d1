//! Seed management for map generation
//!
//! Each subsystem gets its own seed, derived from the 32-bit master seed so
//! that varying one parameter never reshuffles unrelated systems.

/// Seeds for all generation subsystems.
#[derive(Clone, Copy, Debug)]
pub struct MapSeeds {
    /// Master seed (the one shown to the user)
    pub master: u32,
    /// Heightfield synthesis (noise layers, midpoint displacement)
    pub heightfield: u64,
    /// River source placement and flow tracing
    pub rivers: u64,
    /// Snowcap border dithering
    pub dither: u64,
    /// Resource zone placement
    pub zones: u64,
}

impl MapSeeds {
    /// Derive all sub-seeds deterministically from a master seed.
    pub fn from_master(master: u32) -> Self {
        Self {
            master,
            heightfield: derive_seed(master, 0x1),
            rivers: derive_seed(master, 0x2),
            dither: derive_seed(master, 0x3),
            zones: derive_seed(master, 0x4),
        }
    }
}

/// Derive a sub-seed from the master seed and a stream tag.
///
/// Splitmix64 finalizer: stable across Rust releases, well-mixed even for
/// adjacent master seeds.
fn derive_seed(master: u32, stream: u64) -> u64 {
    let mut z = (master as u64) ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Deterministic per-cell hash in [0,1), used for dithering decisions.
pub fn cell_hash(index: usize, seed: u64) -> f32 {
    let mut z = (index as u64) ^ seed;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 40) as f32 / (1u64 << 24) as f32
}
