//! Equirectangular source images.

use std::path::Path;

use image::RgbImage;

use super::SkyboxError;

/// An equirectangular RGB panorama held as float channels in `[0, 255]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Panorama {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 3]>,
}

impl Panorama {
    /// Builds a panorama from an RGB image.
    ///
    /// A 4:1 strip is folded into a 2:1 buffer: the top half keeps the
    /// original rows and the bottom half is their vertical mirror. Any other
    /// aspect ratio besides 2:1 is accepted with a warning.
    pub fn from_rgb(img: &RgbImage) -> Result<Self, SkyboxError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(SkyboxError::EmptyPanorama);
        }
        let pixels: Vec<[f32; 3]> = img
            .pixels()
            .map(|p| [p.0[0] as f32, p.0[1] as f32, p.0[2] as f32])
            .collect();

        if width == height * 4 {
            log::info!("Folding {}x{} strip into a 2:1 panorama", width, height);
            return Ok(Self::fold_strip(width, height, &pixels));
        }
        if width != height * 2 {
            log::warn!(
                "Panorama is {}x{}; expected a 2:1 (or 4:1) aspect ratio, output will look distorted",
                width,
                height
            );
        }
        Ok(Self { width, height, pixels })
    }

    /// Loads any image format the `image` crate decodes.
    pub fn load(path: &Path) -> Result<Self, SkyboxError> {
        let img = image::open(path)?.to_rgb8();
        Self::from_rgb(&img)
    }

    fn fold_strip(width: u32, height: u32, pixels: &[[f32; 3]]) -> Self {
        let row = width as usize;
        let mut folded = Vec::with_capacity(pixels.len() * 2);
        folded.extend_from_slice(pixels);
        for src in pixels.chunks_exact(row).rev() {
            folded.extend_from_slice(src);
        }
        Self {
            width,
            height: height * 2,
            pixels: folded,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [f32; 3] {
        self.pixels[y * self.width as usize + x]
    }
}
