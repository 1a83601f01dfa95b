//! Procedural tile-transition masks.
//!
//! A mask is a square greyscale stencil used to blend one solid tile into
//! another. Vertex styles rasterise a toothed polygon; field styles threshold
//! a noise-warped gradient. Both finish with an optional Gaussian feather.
//! Generation is a pure function of [`MaskParams`] and [`MaskMode`].

mod config;
mod field;
mod vertex;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{imageops, GrayImage, ImageEncoder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

pub use config::{MaskEngine, MaskMode, MaskParams, MaskStyle};
pub use vertex::{outline, skeleton};

/// Errors that can occur during mask generation and export.
#[derive(Error, Debug)]
pub enum MaskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid mask resolution: {0} (must be at least 2)")]
    InvalidResolution(u32),
    #[error("Invalid mask parameter: {0}")]
    InvalidParameter(String),
}

/// Generates one mask, seeding the jitter generator from `params.seed`.
pub fn generate(params: &MaskParams, mode: MaskMode) -> Result<GrayImage, MaskError> {
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    generate_with_rng(params, mode, &mut rng)
}

/// Generates one mask drawing vertex jitter from `rng`.
///
/// Field styles derive their noise from `params.seed` and ignore `rng`.
pub fn generate_with_rng<R: Rng + ?Sized>(
    params: &MaskParams,
    mode: MaskMode,
    rng: &mut R,
) -> Result<GrayImage, MaskError> {
    params.validate()?;
    let grid = match params.style.engine() {
        MaskEngine::Vertex => vertex::render(params, mode, rng),
        MaskEngine::Field => field::render(params, mode),
    };
    let res = params.resolution;
    let mask = GrayImage::from_raw(res, res, grid.into_vec()).ok_or(MaskError::InvalidResolution(res))?;
    Ok(feather(mask, params.feather))
}

fn feather(mask: GrayImage, sigma: f32) -> GrayImage {
    if sigma > 0.0 {
        imageops::blur(&mask, sigma)
    } else {
        mask
    }
}

/// The cap and diag masks of one parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPair {
    pub cap: GrayImage,
    pub diag: GrayImage,
}

/// Generates both templates independently from the same parameters.
pub fn generate_pair(params: &MaskParams) -> Result<MaskPair, MaskError> {
    Ok(MaskPair {
        cap: generate(params, MaskMode::Cap)?,
        diag: generate(params, MaskMode::Diag)?,
    })
}

/// Writes a mask as an 8-bit greyscale PNG.
pub fn save_mask_png(mask: &GrayImage, path: &Path) -> Result<(), MaskError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(mask.as_raw(), mask.width(), mask.height(), image::ExtendedColorType::L8)?;
    Ok(())
}

/// Generates and writes `<base>_cap.png` and `<base>_diag.png`.
pub fn write_pair(params: &MaskParams, output_dir: &Path, base_name: &str) -> Result<[PathBuf; 2], MaskError> {
    std::fs::create_dir_all(output_dir)?;
    let pair = generate_pair(params)?;
    let cap_path = output_dir.join(format!("{}_{}.png", base_name, MaskMode::Cap.name()));
    let diag_path = output_dir.join(format!("{}_{}.png", base_name, MaskMode::Diag.name()));
    save_mask_png(&pair.cap, &cap_path)?;
    save_mask_png(&pair.diag, &diag_path)?;
    log::info!(
        "Wrote {:?} masks ({}px, seed {}) to {}",
        params.style,
        params.resolution,
        params.seed,
        output_dir.display()
    );
    Ok([cap_path, diag_path])
}
