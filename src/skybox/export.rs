//! Writing skybox faces, the skybox material, the terrain entry and a cross preview.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{imageops, ImageEncoder, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use super::{project_all, CubeFace, CubeFaceId, Panorama, ProjectionOptions, SkyboxError};

/// Fill colour of the empty cells in the cross preview.
pub const CROSS_BACKGROUND: Rgb<u8> = Rgb([30, 30, 30]);

/// What to write besides the six face images.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyboxExportOptions {
    pub projection: ProjectionOptions,
    /// Write `<base>.mat`.
    pub material: bool,
    /// Write `<base>_entry.txt`.
    pub entry: bool,
    /// Write `<base>_cross.png`.
    pub cross_preview: bool,
}

impl Default for SkyboxExportOptions {
    fn default() -> Self {
        Self {
            projection: ProjectionOptions::default(),
            material: true,
            entry: true,
            cross_preview: false,
        }
    }
}

/// Paths written by [`export_skybox`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkyboxExportSummary {
    pub faces: Vec<PathBuf>,
    pub material: Option<PathBuf>,
    pub entry: Option<PathBuf>,
    pub cross_preview: Option<PathBuf>,
}

/// File name of one face image: `<base>_<key>.png`.
pub fn face_file_name(base_name: &str, id: CubeFaceId) -> String {
    format!("{}_{}.png", base_name, id.key())
}

/// Contents of the skybox material file.
pub fn material_text(base_name: &str) -> String {
    let mut text = String::from("// Skybox Material\ntype skybox\n");
    for id in CubeFaceId::all() {
        text.push_str(&format!("{} {}\n", id.key(), face_file_name(base_name, id)));
    }
    text
}

/// Writes `<base>.mat` into `output_dir`.
pub fn write_material(output_dir: &Path, base_name: &str) -> Result<PathBuf, SkyboxError> {
    let path = output_dir.join(format!("{}.mat", base_name));
    std::fs::write(&path, material_text(base_name))?;
    Ok(path)
}

/// Writes the terrain entry `<base>_entry.txt` into `output_dir`.
pub fn write_entry(output_dir: &Path, base_name: &str, resolution: u32) -> Result<PathBuf, SkyboxError> {
    let path = output_dir.join(format!("{}_entry.txt", base_name));
    let mut writer = BufWriter::new(File::create(&path)?);
    write!(writer, "[Skybox]\nName={}\nRes={}\n", base_name, resolution)?;
    writer.flush()?;
    Ok(path)
}

/// Lays faces out as a 4x3 cross (`nx pz px nz` across the middle row).
///
/// Cells are sized by the first face; missing faces leave background.
pub fn cross_preview(faces: &[CubeFace]) -> RgbImage {
    let res = faces.first().map(|f| f.resolution()).unwrap_or(0);
    let mut canvas = RgbImage::from_pixel(res * 4, res * 3, CROSS_BACKGROUND);
    for face in faces {
        let (col, row) = face.id.cross_cell();
        imageops::replace(&mut canvas, &face.image, (col * res) as i64, (row * res) as i64);
    }
    canvas
}

fn save_rgb_png(img: &RgbImage, path: &Path) -> Result<(), SkyboxError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(img.as_raw(), img.width(), img.height(), image::ExtendedColorType::Rgb8)?;
    Ok(())
}

/// Projects all faces and writes the skybox bundle into `output_dir`.
pub fn export_skybox(
    panorama: &Panorama,
    output_dir: &Path,
    base_name: &str,
    options: &SkyboxExportOptions,
) -> Result<SkyboxExportSummary, SkyboxError> {
    std::fs::create_dir_all(output_dir)?;
    let faces = project_all(panorama, &options.projection)?;

    let mut summary = SkyboxExportSummary::default();
    for face in &faces {
        let path = output_dir.join(face_file_name(base_name, face.id));
        save_rgb_png(&face.image, &path)?;
        summary.faces.push(path);
    }
    if options.material {
        summary.material = Some(write_material(output_dir, base_name)?);
    }
    if options.entry {
        summary.entry = Some(write_entry(output_dir, base_name, options.projection.resolution)?);
    }
    if options.cross_preview {
        let path = output_dir.join(format!("{}_cross.png", base_name));
        save_rgb_png(&cross_preview(&faces), &path)?;
        summary.cross_preview = Some(path);
    }

    log::info!(
        "Exported {} skybox faces at {}px to {}",
        summary.faces.len(),
        options.projection.resolution,
        output_dir.display()
    );
    Ok(summary)
}
