//! Brightness, contrast and smoothing applied in floating-point raster space.

use image::{imageops, GrayImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

use super::codec::HeightfieldError;
use super::layout::HeightfieldGrid;
use crate::grid::Grid;

/// Fixed pivot of the contrast adjustment (middle of the 16-bit range).
pub const CONTRAST_MIDPOINT: f32 = 32768.0;

/// Height adjustments applied before packing a raster back into a heightfield.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightAdjustments {
    /// Multiplicative scale on the raster-domain height (1.0 = unchanged).
    pub brightness: f32,
    /// Scale around [`CONTRAST_MIDPOINT`] (1.0 = unchanged).
    pub contrast: f32,
    /// Gaussian blur sigma in pixels (0 = off).
    pub smoothing: f32,
}

impl Default for HeightAdjustments {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            smoothing: 0.0,
        }
    }
}

impl HeightAdjustments {
    pub fn is_identity(&self) -> bool {
        self.brightness == 1.0 && self.contrast == 1.0 && self.smoothing <= 0.0
    }

    /// Applies the adjustments to raster-domain heights in place.
    ///
    /// The result is not clipped; clipping happens when the heights are packed.
    pub fn apply(&self, heights: &mut Grid<f32>) {
        for v in heights.as_mut_slice() {
            let bright = *v * self.brightness;
            *v = (bright - CONTRAST_MIDPOINT) * self.contrast + CONTRAST_MIDPOINT;
        }
        if self.smoothing > 0.0 {
            smooth(heights, self.smoothing);
        }
    }

    /// Applies the adjustments to a grid, re-quantising once at the end.
    pub fn apply_to_grid(&self, grid: &mut HeightfieldGrid) -> Result<(), HeightfieldError> {
        if self.is_identity() {
            return Ok(());
        }
        let layout = grid.layout();
        let mut heights = grid.to_raster_heights();
        self.apply(&mut heights);
        let adjusted = HeightfieldGrid::from_raster_heights(&heights, layout.zones_wide, layout.zones_long, grid.bit_depth())?
            .with_version(grid.version());
        *grid = adjusted;
        Ok(())
    }
}

/// Separable Gaussian blur over float heights.
fn smooth(heights: &mut Grid<f32>, sigma: f32) {
    let (w, h) = heights.dims();
    let Some(img) = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w as u32, h as u32, heights.as_slice().to_vec()) else {
        return;
    };
    let blurred = imageops::blur(&img, sigma);
    heights.as_mut_slice().copy_from_slice(blurred.as_raw());
}

/// 8-bit preview of raster-domain heights, stretched to the value range.
pub fn preview_image(heights: &Grid<f32>) -> GrayImage {
    let (lo, hi) = heights.value_range();
    let (w, h) = heights.dims();
    let pixels = heights
        .as_slice()
        .iter()
        .map(|&v| {
            let norm = if hi > lo { (v - lo) / (hi - lo) } else { v / 65535.0 };
            (norm.clamp(0.0, 1.0) * 255.0) as u8
        })
        .collect();
    GrayImage::from_raw(w as u32, h as u32, pixels).unwrap_or_else(|| GrayImage::new(w as u32, h as u32))
}
