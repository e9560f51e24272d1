use clap::Parser;

use cartogen::export;
use cartogen::params::{Algorithm, MapParams, ShadowParams};
use cartogen::pipeline;

#[derive(Parser, Debug)]
#[command(name = "cartogen")]
#[command(about = "Generate procedural terrain rasters with rivers, biomes, and shading")]
struct Args {
    /// Width of the map in pixels
    #[arg(short = 'W', long, default_value = "512")]
    width: usize,

    /// Height of the map in pixels
    #[arg(short = 'H', long, default_value = "512")]
    height: usize,

    /// Random seed (uses a random 32-bit seed if not specified)
    #[arg(short, long)]
    seed: Option<u32>,

    /// Heightfield synthesis algorithm
    #[arg(short, long, value_enum, default_value = "warped")]
    algorithm: Algorithm,

    /// Terrain smoothness, 1 (rugged) to 100 (gentle)
    #[arg(long, default_value = "50")]
    smoothness: f32,

    /// Continent footprint in percent, 50-200
    #[arg(long, default_value = "100")]
    continent_scale: f32,

    /// Elevation quantile that becomes sea level, 0.05-0.95
    #[arg(long, default_value = "0.56")]
    sea_level: f32,

    /// Fraction of cells classified as snowcap, 0.01-0.25
    #[arg(long, default_value = "0.08")]
    snowcap: f32,

    /// Number of rivers to trace
    #[arg(short, long, default_value = "6")]
    rivers: usize,

    /// Shadow strength in percent, 0 disables shading
    #[arg(long, default_value = "60")]
    shadow_strength: f32,

    /// Maximum cast-shadow length in pixels
    #[arg(long, default_value = "24")]
    shadow_length: usize,

    /// Output path for the rendered map
    #[arg(short, long, default_value = "map.png")]
    output: String,

    /// Also export the raw heightfield as a grayscale PNG
    #[arg(long)]
    export_heightfield: Option<String>,

    /// Also export the metadata document as JSON
    #[arg(long)]
    export_metadata: Option<String>,
}

fn main() {
    let args = Args::parse();

    let seed = args.seed.unwrap_or_else(rand::random);

    let params = MapParams {
        width: args.width,
        height: args.height,
        seed,
        algorithm: args.algorithm,
        smoothness: args.smoothness,
        continent_scale_pct: args.continent_scale,
        sea_level_quantile: args.sea_level,
        snowcap_fraction: args.snowcap,
        river_count: args.rivers,
        shadow: ShadowParams {
            strength_pct: args.shadow_strength,
            length_px: args.shadow_length,
            ..ShadowParams::default()
        },
    }
    .clamped();

    println!("Generating map with seed: {}", params.seed);
    println!("Map size: {}x{}", params.width, params.height);

    let data = pipeline::generate(&params);

    println!(
        "Sea level at elevation {:.3}, snow line at {:.3}",
        data.cutoffs.sea_level, data.cutoffs.snow_level
    );
    println!(
        "Traced {} river sources ({} spine cells, {} mouths)",
        data.rivers.source_count(),
        data.rivers.spine_cells,
        data.rivers.mouths.len()
    );
    println!("Seeded {} resource zones", data.zones.len());
    println!("Summary: {}", data.stats);

    if let Err(e) = export::write_png(&data, &args.output) {
        eprintln!("Failed to write map: {}", e);
        std::process::exit(1);
    }
    println!("Wrote map to: {}", args.output);

    if let Some(ref path) = args.export_heightfield {
        match export::write_heightfield_png(&data.height, path) {
            Ok(()) => println!("Wrote heightfield to: {}", path),
            Err(e) => eprintln!("Failed to write heightfield: {}", e),
        }
    }

    if let Some(ref path) = args.export_metadata {
        match export::write_json(&data, path) {
            Ok(()) => println!("Wrote metadata to: {}", path),
            Err(e) => eprintln!("Failed to write metadata: {}", e),
        }
    }
}
