//! Bridges between heightfield grids and standard raster images.
//!
//! Two modes exist:
//! - *direct*: a single-channel 16-bit raster where each sample is scaled by
//!   the bit depth's raster scale (8 or 16) to fill the 16-bit range;
//! - *legacy*: a two-channel 8-bit raster, vertically flipped, carrying the
//!   high 8 bits of the 12-bit height in the first channel and optionally the
//!   low 4 bits in the second channel's low nibble.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{imageops, ImageBuffer, ImageEncoder, Luma, LumaA};
use serde::{Deserialize, Serialize};

use super::codec::HeightfieldError;
use super::layout::{BitDepth, HeightfieldGrid};
use crate::grid::Grid;

/// 16-bit single-channel raster.
pub type HeightRaster16 = ImageBuffer<Luma<u16>, Vec<u16>>;

/// 8-bit two-channel raster of the legacy bridge.
pub type LegacyRaster = ImageBuffer<LumaA<u8>, Vec<u8>>;

/// Options for the direct 16-bit bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectRasterOptions {
    /// Rotate 90° counter-clockwise on export (and clockwise on import) so the
    /// image matches the in-game orientation when edited.
    pub rotate_for_editing: bool,
    /// Stretch the sample range to the full 16-bit range on export.
    /// Lossy: a normalised export does not import back to the same samples.
    pub normalize: bool,
}

/// Options for the legacy two-channel bridge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegacyRasterOptions {
    /// Carry the low 4 bits of the 12-bit height in the second channel.
    pub precision: bool,
}

impl Default for LegacyRasterOptions {
    fn default() -> Self {
        Self { precision: true }
    }
}

/// Exports a grid as a 16-bit raster.
pub fn to_direct_raster(grid: &HeightfieldGrid, options: &DirectRasterOptions) -> HeightRaster16 {
    let width = grid.width() as u32;
    let height = grid.height() as u32;
    let scale = grid.bit_depth().raster_scale() as u32;
    let (lo, hi) = grid.sample_range();

    let pixels: Vec<u16> = grid
        .samples()
        .as_slice()
        .iter()
        .map(|&s| {
            if options.normalize && hi > lo {
                let normalized = (s - lo) as f32 / (hi - lo) as f32;
                (normalized * 65535.0) as u16
            } else {
                (s as u32 * scale).min(u16::MAX as u32) as u16
            }
        })
        .collect();

    let img = HeightRaster16::from_raw(width, height, pixels)
        .unwrap_or_else(|| HeightRaster16::new(width, height));
    if options.rotate_for_editing {
        imageops::rotate270(&img)
    } else {
        img
    }
}

/// Reads a 16-bit raster into raster-domain float heights, undoing the editing rotation.
pub fn direct_raster_heights(img: &HeightRaster16, options: &DirectRasterOptions) -> Grid<f32> {
    let img = if options.rotate_for_editing {
        imageops::rotate90(img)
    } else {
        img.clone()
    };
    let (w, h) = img.dimensions();
    let data = img.into_raw().into_iter().map(|v| v as f32).collect();
    Grid::from_vec(w as usize, h as usize, data).unwrap_or_else(|| Grid::new(w as usize, h as usize))
}

/// Imports a 16-bit raster: divides by the raster scale (floor) and masks.
pub fn from_direct_raster(
    img: &HeightRaster16,
    zones_wide: u16,
    zones_long: u16,
    bit_depth: BitDepth,
    options: &DirectRasterOptions,
) -> Result<HeightfieldGrid, HeightfieldError> {
    let heights = direct_raster_heights(img, options);
    HeightfieldGrid::from_raster_heights(&heights, zones_wide, zones_long, bit_depth)
}

/// Exports a grid through the legacy two-channel bridge.
pub fn to_legacy_raster(grid: &HeightfieldGrid, options: &LegacyRasterOptions) -> LegacyRaster {
    let width = grid.width() as u32;
    let height = grid.height() as u32;
    let shift = grid.bit_depth().bits() - 12;

    let mut img = LegacyRaster::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        // Row 0 of the raster is the last row of the grid.
        let src_y = grid.height() - 1 - y as usize;
        let value12 = grid.get(x as usize, src_y) >> shift;
        let high = (value12 >> 4) as u8;
        let low = if options.precision { (value12 & 0x0F) as u8 } else { 0 };
        *pixel = LumaA([high, low]);
    }
    img
}

/// Imports a legacy two-channel raster.
///
/// If precision is requested but any second-channel value uses more than 4
/// bits, precision is disabled for the whole image and only the high byte is
/// used.
pub fn from_legacy_raster(
    img: &LegacyRaster,
    zones_wide: u16,
    zones_long: u16,
    bit_depth: BitDepth,
    options: &LegacyRasterOptions,
) -> Result<HeightfieldGrid, HeightfieldError> {
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);
    let shift = bit_depth.bits() - 12;

    let mut precision = options.precision;
    if precision && img.pixels().any(|p| p.0[1] > 0x0F) {
        log::warn!("Legacy raster precision channel exceeds 4 bits; precision mode disabled");
        precision = false;
    }

    let mut samples = vec![0u16; w * h];
    for (x, y, pixel) in img.enumerate_pixels() {
        let dst_y = h - 1 - y as usize;
        let [high, low] = pixel.0;
        let mut value12 = (high as u16) << 4;
        if precision {
            value12 |= low as u16 & 0x0F;
        }
        samples[dst_y * w + x as usize] = value12 << shift;
    }
    HeightfieldGrid::from_samples(w, h, samples, zones_wide, zones_long, bit_depth)
}

/// Writes a 16-bit raster as PNG.
pub fn save_raster16_png(img: &HeightRaster16, path: &Path) -> Result<(), HeightfieldError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
    let byte_slice: &[u8] = bytemuck::cast_slice(img.as_raw());
    encoder.write_image(byte_slice, img.width(), img.height(), image::ExtendedColorType::L16)?;
    Ok(())
}

/// Writes a legacy two-channel raster as PNG.
pub fn save_legacy_png(img: &LegacyRaster, path: &Path) -> Result<(), HeightfieldError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(img.as_raw(), img.width(), img.height(), image::ExtendedColorType::La8)?;
    Ok(())
}

/// Loads any supported image as a 16-bit single-channel raster.
pub fn load_raster16(path: &Path) -> Result<HeightRaster16, HeightfieldError> {
    Ok(image::open(path)?.into_luma16())
}

/// Loads any supported image as a two-channel 8-bit raster.
pub fn load_legacy_raster(path: &Path) -> Result<LegacyRaster, HeightfieldError> {
    Ok(image::open(path)?.into_luma_alpha8())
}
