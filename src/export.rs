//! Map export
//!
//! Writes the rendered raster and heightfield as PNG and serializes a
//! metadata document: generation parameters, statistics, resource zone
//! polygons in pixel coordinates, and a content-derived identifier.
//! Everything in the document is reconstructed from state already carried
//! by `MapData`, so exporting never re-runs generation.

use std::error::Error;
use std::fs;
use std::path::Path;

use image::{GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::classify::TerrainClass;
use crate::grid::Grid;
use crate::params::MapParams;
use crate::pipeline::{MapData, MapStats};
use crate::zones::ResourceKind;

/// Write the rendered RGBA map.
pub fn write_png(data: &MapData, path: &str) -> Result<(), image::ImageError> {
    let width = data.width() as u32;
    let height = data.height_px() as u32;
    let mut img: RgbaImage = ImageBuffer::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize * 4;
            img.put_pixel(
                x,
                y,
                Rgba([
                    data.pixels[idx],
                    data.pixels[idx + 1],
                    data.pixels[idx + 2],
                    data.pixels[idx + 3],
                ]),
            );
        }
    }

    img.save(path)
}

/// Write the normalized heightfield as an 8-bit grayscale PNG.
pub fn write_heightfield_png(height: &Grid<f32>, path: &str) -> Result<(), image::ImageError> {
    let mut img: GrayImage = ImageBuffer::new(height.width as u32, height.height as u32);

    for y in 0..height.height {
        for x in 0..height.width {
            let v = (height.get(x, y).clamp(0.0, 1.0) * 255.0) as u8;
            img.put_pixel(x as u32, y as u32, Luma([v]));
        }
    }

    img.save(path)
}

/// A resource zone with vertices scaled to pixel coordinates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZonePolygon {
    pub kind: ResourceKind,
    pub strength_pct: u8,
    pub vertices_px: Vec<(f32, f32)>,
}

/// The serialized export document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapDocument {
    /// Content-derived identifier over the class grid
    pub identifier: String,
    pub params: MapParams,
    pub stats: MapStats,
    pub zones: Vec<ZonePolygon>,
}

/// Build the export document from a finished generation.
pub fn export_document(data: &MapData) -> MapDocument {
    let width = data.width() as f32;
    let height = data.height_px() as f32;

    let zones = data
        .zones
        .iter()
        .map(|zone| ZonePolygon {
            kind: zone.kind,
            strength_pct: zone.strength_pct,
            vertices_px: zone
                .vertices
                .iter()
                .map(|&(x, y)| (x * width, y * height))
                .collect(),
        })
        .collect();

    MapDocument {
        identifier: content_identifier(&data.classes),
        params: data.params.clone(),
        stats: data.stats,
        zones,
    }
}

/// Serialize the export document to pretty JSON.
pub fn write_json(data: &MapData, path: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
    let document = export_document(data);
    let json = serde_json::to_string_pretty(&document)?;
    fs::write(path, json)?;
    Ok(())
}

/// FNV-1a over the class grid plus its dimensions.
fn content_identifier(classes: &Grid<TerrainClass>) -> String {
    const FNV_OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

    let mut hash = FNV_OFFSET;
    let mut feed = |byte: u8| {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    };

    for &b in &(classes.width as u32).to_le_bytes() {
        feed(b);
    }
    for &b in &(classes.height as u32).to_le_bytes() {
        feed(b);
    }
    for (_, _, &class) in classes.iter() {
        feed(match class {
            TerrainClass::Sea => 0,
            TerrainClass::Plains => 1,
            TerrainClass::Mountain => 2,
            TerrainClass::Snowcap => 3,
        });
    }

    format!("{:016x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Algorithm;
    use crate::pipeline;

    fn small_map() -> MapData {
        let params = MapParams {
            width: 128,
            height: 128,
            seed: 7,
            algorithm: Algorithm::Warped,
            ..MapParams::default()
        };
        pipeline::generate(&params)
    }

    #[test]
    fn test_document_scales_zone_vertices_to_pixels() {
        let data = small_map();
        let document = export_document(&data);

        assert_eq!(document.zones.len(), data.zones.len());
        for (px, norm) in document.zones.iter().zip(&data.zones) {
            assert_eq!(px.vertices_px.len(), norm.vertices.len());
            for (&(x, y), &(nx, ny)) in px.vertices_px.iter().zip(&norm.vertices) {
                assert!((x - nx * 128.0).abs() < 1e-4);
                assert!((y - ny * 128.0).abs() < 1e-4);
                assert!((0.0..=128.0).contains(&x));
                assert!((0.0..=128.0).contains(&y));
            }
        }
    }

    #[test]
    fn test_identifier_tracks_content() {
        let data = small_map();
        let same = small_map();
        assert_eq!(
            export_document(&data).identifier,
            export_document(&same).identifier
        );

        let mut other_params = data.params.clone();
        other_params.seed = 8;
        let other = pipeline::generate(&other_params);
        assert_ne!(
            export_document(&data).identifier,
            export_document(&other).identifier
        );
    }

    #[test]
    fn test_document_round_trips_through_json() {
        let data = small_map();
        let document = export_document(&data);
        let json = serde_json::to_string(&document).unwrap();
        let parsed: MapDocument = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.identifier, document.identifier);
        assert_eq!(parsed.params, document.params);
        assert_eq!(parsed.zones.len(), document.zones.len());
    }
}
