//! Equirectangular panorama to six-face skybox projection.
//!
//! Every face pixel is unprojected to a world direction, converted to
//! longitude/colatitude and looked up in the panorama with the requested
//! interpolation order.

mod export;
mod face;
mod panorama;
mod projection;
mod sampler;

use std::time::Instant;

use image::{Rgb, RgbImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use export::{
    cross_preview, export_skybox, face_file_name, material_text, write_entry, write_material, SkyboxExportOptions,
    SkyboxExportSummary, CROSS_BACKGROUND,
};
pub use face::CubeFaceId;
pub use panorama::Panorama;
pub use projection::{face_direction, lon_colat, pixel_centre, source_coords};
pub use sampler::Interpolation;

/// Errors that can occur during skybox projection and export.
#[derive(Error, Debug)]
pub enum SkyboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid face resolution: {0}")]
    InvalidResolution(u32),
    #[error("Invalid face index: {0} (expected 0-5)")]
    InvalidFaceIndex(usize),
    #[error("Panorama has no pixels")]
    EmptyPanorama,
}

/// Default longitude offset: the panorama is turned half a revolution.
pub const DEFAULT_ROTATION: f64 = std::f64::consts::PI;

/// Face resolution used for interactive previews.
pub const PREVIEW_RESOLUTION: u32 = 256;

/// Settings of one projection pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionOptions {
    /// Face side length in pixels.
    pub resolution: u32,
    /// Longitude offset in radians.
    pub rotation: f64,
    pub interpolation: Interpolation,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self::export(1024)
    }
}

impl ProjectionOptions {
    /// Cheap preset for previews: 256 px, linear.
    pub fn preview() -> Self {
        Self {
            resolution: PREVIEW_RESOLUTION,
            rotation: DEFAULT_ROTATION,
            interpolation: Interpolation::Linear,
        }
    }

    /// Export preset: caller resolution, cubic.
    pub fn export(resolution: u32) -> Self {
        Self {
            resolution,
            rotation: DEFAULT_ROTATION,
            interpolation: Interpolation::Cubic,
        }
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }
}

/// One projected skybox face.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeFace {
    pub id: CubeFaceId,
    pub image: RgbImage,
}

impl CubeFace {
    pub fn resolution(&self) -> u32 {
        self.image.width()
    }
}

/// Projects the panorama onto face number `face_index` (0-5).
pub fn project_face_index(
    panorama: &Panorama,
    face_index: usize,
    options: &ProjectionOptions,
) -> Result<CubeFace, SkyboxError> {
    let id = CubeFaceId::from_index(face_index).ok_or(SkyboxError::InvalidFaceIndex(face_index))?;
    project_face(panorama, id, options)
}

/// Projects the panorama onto one face.
pub fn project_face(panorama: &Panorama, id: CubeFaceId, options: &ProjectionOptions) -> Result<CubeFace, SkyboxError> {
    let res = options.resolution;
    if res == 0 {
        return Err(SkyboxError::InvalidResolution(res));
    }
    let start = Instant::now();
    let (src_w, src_h) = (panorama.width(), panorama.height());
    let row_len = res as usize * 3;
    let mut buffer = vec![0u8; row_len * res as usize];

    buffer.par_chunks_mut(row_len).enumerate().for_each(|(row, out)| {
        let v = pixel_centre(row as u32, res);
        for (col, px) in out.chunks_exact_mut(3).enumerate() {
            let u = pixel_centre(col as u32, res);
            let (lon, colat) = lon_colat(face_direction(id, u, v), options.rotation);
            let (x, y) = source_coords(lon, colat, src_w, src_h);
            let rgb = panorama.sample(x as f32, y as f32, options.interpolation);
            for (dst, c) in px.iter_mut().zip(rgb) {
                *dst = c.round().clamp(0.0, 255.0) as u8;
            }
        }
    });

    let image = RgbImage::from_raw(res, res, buffer).unwrap_or_else(|| RgbImage::from_pixel(res, res, Rgb([0, 0, 0])));
    log::debug!("Projected face {} at {}px in {:?}", id.key(), res, start.elapsed());
    Ok(CubeFace { id, image })
}

/// Projects all six faces, in emission order.
pub fn project_all(panorama: &Panorama, options: &ProjectionOptions) -> Result<Vec<CubeFace>, SkyboxError> {
    CubeFaceId::all()
        .iter()
        .map(|&id| project_face(panorama, id, options))
        .collect()
}

/// Six low-resolution faces for interactive display.
pub fn preview(panorama: &Panorama) -> Result<Vec<CubeFace>, SkyboxError> {
    project_all(panorama, &ProjectionOptions::preview())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use std::f64::consts::{PI, TAU};

    fn gradient_panorama(width: u32, height: u32) -> Panorama {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / (width - 1)) as u8, (y * 255 / (height - 1)) as u8, 128])
        });
        Panorama::from_rgb(&img).unwrap()
    }

    /// Directions of the pixel centres along one edge of a face.
    ///
    /// Edges are numbered 0 = top row, 1 = right column, 2 = bottom row, 3 = left column.
    fn edge_directions(id: CubeFaceId, edge: usize, res: u32) -> Vec<DVec3> {
        (0..res)
            .map(|i| {
                let t = pixel_centre(i, res);
                let first = pixel_centre(0, res);
                let last = pixel_centre(res - 1, res);
                let (u, v) = match edge {
                    0 => (t, first),
                    1 => (last, t),
                    2 => (t, last),
                    _ => (first, t),
                };
                face_direction(id, u, v)
            })
            .collect()
    }

    fn within_one_source_pixel(a: DVec3, b: DVec3, rotation: f64, width: u32, height: u32) -> bool {
        let (lon_a, colat_a) = lon_colat(a, rotation);
        let (lon_b, colat_b) = lon_colat(b, rotation);
        let mut dlon = (lon_a - lon_b).abs();
        if dlon > PI {
            dlon = TAU - dlon;
        }
        let dcolat = (colat_a - colat_b).abs();
        dlon * width as f64 / TAU < 1.0 && dcolat * height as f64 / PI < 1.0
    }

    #[test]
    fn test_adjoining_face_edges_match() {
        let res = 256;
        let (src_w, src_h) = (64, 32);
        for rotation in [0.0, DEFAULT_ROTATION, 1.234] {
            let edges: Vec<(CubeFaceId, usize, Vec<DVec3>)> = CubeFaceId::all()
                .iter()
                .flat_map(|&id| (0..4).map(move |e| (id, e, edge_directions(id, e, res))))
                .collect();

            for (id, edge, dirs) in &edges {
                let matches = edges
                    .iter()
                    .filter(|(other, _, _)| other != id)
                    .filter(|(_, _, other_dirs)| {
                        let forward = dirs
                            .iter()
                            .zip(other_dirs.iter())
                            .all(|(&a, &b)| within_one_source_pixel(a, b, rotation, src_w, src_h));
                        let reversed = dirs
                            .iter()
                            .zip(other_dirs.iter().rev())
                            .all(|(&a, &b)| within_one_source_pixel(a, b, rotation, src_w, src_h));
                        forward || reversed
                    })
                    .count();
                assert_eq!(matches, 1, "edge {} of {:?} at rotation {}", edge, id, rotation);
            }
        }
    }

    #[test]
    fn test_pos_z_right_edge_meets_pos_x_left_edge() {
        let res = 128;
        let right = edge_directions(CubeFaceId::PosZ, 1, res);
        let left = edge_directions(CubeFaceId::PosX, 3, res);
        for (a, b) in right.iter().zip(left.iter()) {
            assert!(within_one_source_pixel(*a, *b, DEFAULT_ROTATION, 512, 256));
        }
    }

    #[test]
    fn test_uniform_panorama_projects_uniformly() {
        let img = RgbImage::from_pixel(32, 16, Rgb([40, 80, 120]));
        let pano = Panorama::from_rgb(&img).unwrap();
        for order in [Interpolation::Nearest, Interpolation::Linear, Interpolation::Cubic] {
            let options = ProjectionOptions {
                resolution: 8,
                rotation: 0.3,
                interpolation: order,
            };
            for face in project_all(&pano, &options).unwrap() {
                assert_eq!(face.resolution(), 8);
                assert!(face.image.pixels().all(|p| p.0 == [40, 80, 120]), "{:?}", face.id);
            }
        }
    }

    #[test]
    fn test_top_face_samples_top_rows() {
        let pano = gradient_panorama(64, 32);
        let options = ProjectionOptions::export(16);
        let top = project_face(&pano, CubeFaceId::PosY, &options).unwrap();
        let bottom = project_face(&pano, CubeFaceId::NegY, &options).unwrap();
        // Green encodes source row: the top face looks at the first rows.
        assert!(top.image.get_pixel(8, 8).0[1] < 64);
        assert!(bottom.image.get_pixel(8, 8).0[1] > 192);
    }

    #[test]
    fn test_projection_is_deterministic() {
        let pano = gradient_panorama(64, 32);
        let options = ProjectionOptions::preview();
        let a = project_face_index(&pano, 2, &options).unwrap();
        let b = project_face_index(&pano, 2, &options).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.resolution(), PREVIEW_RESOLUTION);
    }

    #[test]
    fn test_invalid_inputs() {
        let pano = gradient_panorama(8, 4);
        assert!(matches!(
            project_face_index(&pano, 6, &ProjectionOptions::preview()),
            Err(SkyboxError::InvalidFaceIndex(6))
        ));
        assert!(matches!(
            project_face(&pano, CubeFaceId::PosZ, &ProjectionOptions::export(0)),
            Err(SkyboxError::InvalidResolution(0))
        ));
    }
}
