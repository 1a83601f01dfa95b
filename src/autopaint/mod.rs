//! Rule-based material painting of heightfields.
//!
//! Heights and slopes select a material per vertex through an ordered rule
//! list; 2x2 vertex blocks are then reduced to packed tile codes with a
//! marching-squares table and written as a raw material tile file.

mod classify;
mod polyline;
mod rules;
mod slope;
mod tiles;

use std::path::Path;
use std::time::Instant;

use thiserror::Error;

use crate::grid::Grid;
use crate::heightfield::{HeightfieldError, HeightfieldGrid};

pub use classify::{classify_vertices, classify_vertices_with_progress};
pub use polyline::{MaskLibrary, Polyline, PolylineSet, RASTER_MASK_THRESHOLD};
pub use rules::{MaskSource, PaintRule, RuleOverlap, RuleSet, MAX_HEIGHT, MAX_MATERIAL, MAX_SLOPE};
pub use slope::{compute_slope_degrees, SlopeScale};
pub use tiles::{
    classify_corners, encode_tiles, encode_tiles_with_progress, read_tile_file, write_tile_file, MaterialTileCode,
    TileCase, TileShape, CORNER_BL, CORNER_BR, CORNER_TL, CORNER_TR, TILE_CASES,
};

/// Errors that can occur while painting.
#[derive(Error, Debug)]
pub enum AutoPaintError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Rule file error: {0}")]
    Rules(#[from] serde_json::Error),
    #[error("Heightfield error: {0}")]
    Heightfield(#[from] HeightfieldError),
    #[error("Invalid rule {rule}: {reason}")]
    Validation { rule: usize, reason: String },
    #[error("Grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("Mask unavailable: {0}")]
    Resource(String),
    #[error("Tile file size mismatch: expected {expected} bytes, got {actual}")]
    TileFileSize { expected: usize, actual: usize },
}

/// Everything computed by one painting pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintResult {
    pub slopes: Grid<f32>,
    pub materials: Grid<u8>,
    pub tiles: Grid<MaterialTileCode>,
}

/// Paints heightfields with a validated rule set.
#[derive(Debug, Clone)]
pub struct AutoPainter {
    rules: RuleSet,
    overlaps: Vec<RuleOverlap>,
    library: MaskLibrary,
    slope_scale: Option<SlopeScale>,
}

impl AutoPainter {
    /// Validates the rules; overlaps are kept as advisories.
    pub fn new(rules: RuleSet) -> Result<Self, AutoPaintError> {
        let overlaps = rules.validate()?;
        Ok(Self {
            rules,
            overlaps,
            library: MaskLibrary::new(),
            slope_scale: None,
        })
    }

    /// Polylines available to `MaskSource::Polyline` rules.
    pub fn with_library(mut self, library: MaskLibrary) -> Self {
        self.library = library;
        self
    }

    /// Overrides the slope scale (default: derived from the zone size).
    pub fn with_slope_scale(mut self, scale: SlopeScale) -> Self {
        self.slope_scale = Some(scale);
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn overlaps(&self) -> &[RuleOverlap] {
        &self.overlaps
    }

    /// Rasterises every rule mask for a `width` x `height` vertex grid.
    ///
    /// A mask that cannot be loaded is logged and treated as no constraint.
    pub fn resolve_masks(&self, width: usize, height: usize, zone_size: usize) -> Vec<Option<Grid<bool>>> {
        self.rules
            .rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                let source = rule.mask.as_ref()?;
                match self.library.resolve(source, width, height, zone_size) {
                    Ok(mask) => Some(mask),
                    Err(e) => {
                        log::warn!("Rule {}: ignoring {} ({})", i, source, e);
                        None
                    }
                }
            })
            .collect()
    }

    pub fn paint(&self, grid: &HeightfieldGrid) -> Result<PaintResult, AutoPaintError> {
        self.paint_with_progress(grid, |_| {})
    }

    /// Runs slope, classification and tile encoding, reporting overall progress in `[0, 1]`.
    pub fn paint_with_progress<F: FnMut(f32)>(
        &self,
        grid: &HeightfieldGrid,
        mut on_progress: F,
    ) -> Result<PaintResult, AutoPaintError> {
        let start = Instant::now();
        let zone_size = grid.layout().zone_size();
        let heights = grid.to_raster_heights();
        let (w, h) = heights.dims();

        let masks = self.resolve_masks(w, h, zone_size);
        on_progress(0.1);

        let scale = self.slope_scale.unwrap_or_else(|| SlopeScale::for_zone_size(zone_size));
        let slopes = compute_slope_degrees(&heights, &scale);
        on_progress(0.2);

        let materials = classify_vertices_with_progress(&heights, &slopes, &self.rules.rules, &masks, |p| {
            on_progress(0.2 + 0.6 * p)
        })?;
        let tiles = encode_tiles_with_progress(&materials, |p| on_progress(0.8 + 0.2 * p));
        on_progress(1.0);

        log::info!(
            "Painted {}x{} vertices into {}x{} tiles with {} rules in {:.2?}",
            w,
            h,
            tiles.width(),
            tiles.height(),
            self.rules.rules.len(),
            start.elapsed()
        );
        Ok(PaintResult {
            slopes,
            materials,
            tiles,
        })
    }

    /// Paints and writes the material tile file.
    ///
    /// Nothing is written unless painting succeeds.
    pub fn run<F: FnMut(f32)>(
        &self,
        grid: &HeightfieldGrid,
        output: &Path,
        on_progress: F,
    ) -> Result<PaintResult, AutoPaintError> {
        let result = self.paint_with_progress(grid, on_progress)?;
        write_tile_file(&result.tiles, output)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightfield::{BitDepth, ZoneLayout};
    use tempfile::tempdir;

    fn grey_grid() -> HeightfieldGrid {
        let layout = ZoneLayout::new(2, 2, 7).unwrap();
        let mut grid = HeightfieldGrid::new(layout, BitDepth::Thirteen);
        let half = BitDepth::Thirteen.mask() / 2;
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                grid.set(x, y, half);
            }
        }
        grid
    }

    #[test]
    fn test_grey_field_paints_solid_material_three() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("grey.mat16");
        let rules = RuleSet::new(vec![PaintRule::new(3).with_height(0.0, 65535.0).with_slope(0.0, 90.0)]);
        let painter = AutoPainter::new(rules).unwrap();

        let mut progress = Vec::new();
        let result = painter.run(&grey_grid(), &output, |p| progress.push(p)).unwrap();

        assert_eq!(result.materials.dims(), (256, 256));
        assert!(result.materials.as_slice().iter().all(|&m| m == 3));
        assert_eq!(result.tiles.dims(), (128, 128));
        assert!(result.tiles.as_slice().iter().all(|c| c.raw() == 0x3300));

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(bytes.len(), 128 * 128 * 2);
        assert_eq!(&bytes[..2], &[0x00, 0x33]);

        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last(), Some(&1.0));
    }

    #[test]
    fn test_overlapping_rules_resolve_to_later() {
        let rules = RuleSet::new(vec![
            PaintRule::new(1).with_height(30000.0, 40000.0),
            PaintRule::new(2).with_height(0.0, 65535.0),
        ]);
        let painter = AutoPainter::new(rules).unwrap();
        assert_eq!(painter.overlaps().len(), 1);
        let result = painter.paint(&grey_grid()).unwrap();
        assert!(result.materials.as_slice().iter().all(|&m| m == 2));
    }

    #[test]
    fn test_missing_mask_degrades_to_no_constraint() {
        let dir = tempdir().unwrap();
        let rules = RuleSet::new(vec![
            PaintRule::new(4).with_mask(MaskSource::Raster {
                path: dir.path().join("missing.png"),
            }),
            PaintRule::new(6).with_height(0.0, 10.0).with_mask(MaskSource::Polyline {
                name: "nowhere".into(),
            }),
        ]);
        let painter = AutoPainter::new(rules).unwrap();
        let masks = painter.resolve_masks(256, 256, 128);
        assert!(masks.iter().all(Option::is_none));
        let result = painter.paint(&grey_grid()).unwrap();
        assert!(result.materials.as_slice().iter().all(|&m| m == 4));
    }

    #[test]
    fn test_polyline_mask_limits_rule() {
        let mut library = MaskLibrary::new();
        // Left half of a 2560 m map.
        library.insert(Polyline {
            label: "west".into(),
            points: vec![(0.0, 0.0), (1280.0, 0.0), (1280.0, 2560.0), (0.0, 2560.0)],
            closed: true,
        });
        let rules = RuleSet::new(vec![
            PaintRule::new(1),
            PaintRule::new(9).with_mask(MaskSource::Polyline { name: "west".into() }),
        ]);
        let painter = AutoPainter::new(rules).unwrap().with_library(library);
        let result = painter.paint(&grey_grid()).unwrap();
        assert_eq!(*result.materials.get(10, 200), 9);
        assert_eq!(*result.materials.get(200, 10), 1);
        // Seam tiles straddle x = 128.
        let seam = result.tiles.get(63, 20);
        assert_eq!(*seam, MaterialTileCode::solid(9));
        assert_eq!(*result.tiles.get(64, 20), MaterialTileCode::solid(1));
    }

    #[test]
    fn test_invalid_rules_fail_before_painting() {
        let rules = RuleSet::new(vec![PaintRule::new(16)]);
        assert!(matches!(AutoPainter::new(rules), Err(AutoPaintError::Validation { .. })));
    }
}
