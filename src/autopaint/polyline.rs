//! Named polylines from the mission descriptor and rule mask resolution.

use std::collections::HashMap;
use std::path::Path;

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use super::rules::MaskSource;
use super::AutoPaintError;
use crate::grid::Grid;
use crate::heightfield::METERS_PER_ZONE;
use crate::raster::{fill_polygon, stroke_polyline, Point};

/// Raster mask pixels above this value allow their rule.
pub const RASTER_MASK_THRESHOLD: u8 = 127;

/// A labelled path in world meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub label: String,
    pub points: Vec<Point>,
    #[serde(default)]
    pub closed: bool,
}

impl Polyline {
    /// Rasterises the polyline over a `width` x `height` vertex grid.
    ///
    /// Closed polylines are filled, open ones stroked one vertex wide.
    pub fn rasterize(&self, width: usize, height: usize, zone_size: usize) -> Grid<bool> {
        let scale = zone_size as f64 / METERS_PER_ZONE as f64;
        let pixels: Vec<Point> = self.points.iter().map(|&(x, y)| (x * scale, y * scale)).collect();
        let mut mask = Grid::new(width, height);
        if self.closed {
            fill_polygon(&mut mask, &pixels, true);
        } else {
            stroke_polyline(&mut mask, &pixels, false, 0, true);
        }
        mask
    }
}

/// Polylines as produced by the mission descriptor parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolylineSet {
    pub polylines: Vec<Polyline>,
}

impl PolylineSet {
    pub fn from_json(json: &str) -> Result<Self, AutoPaintError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, AutoPaintError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Resolves rule masks to boolean grids.
#[derive(Debug, Clone, Default)]
pub struct MaskLibrary {
    polylines: HashMap<String, Polyline>,
}

impl MaskLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_set(set: PolylineSet) -> Self {
        let mut library = Self::new();
        for polyline in set.polylines {
            library.insert(polyline);
        }
        library
    }

    /// Adds a polyline, replacing any with the same label.
    pub fn insert(&mut self, polyline: Polyline) {
        self.polylines.insert(polyline.label.clone(), polyline);
    }

    pub fn get(&self, label: &str) -> Option<&Polyline> {
        self.polylines.get(label)
    }

    pub fn len(&self) -> usize {
        self.polylines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polylines.is_empty()
    }

    /// Rasterises `source` to the vertex grid.
    ///
    /// Raster masks are resized to the grid and thresholded; polylines are
    /// scaled from meters at the fixed meters-per-zone scale.
    pub fn resolve(
        &self,
        source: &MaskSource,
        width: usize,
        height: usize,
        zone_size: usize,
    ) -> Result<Grid<bool>, AutoPaintError> {
        match source {
            MaskSource::Raster { path } => load_raster_mask(path, width, height),
            MaskSource::Polyline { name } => self
                .get(name)
                .map(|p| p.rasterize(width, height, zone_size))
                .ok_or_else(|| AutoPaintError::Resource(format!("no polyline named '{}'", name))),
        }
    }
}

fn load_raster_mask(path: &Path, width: usize, height: usize) -> Result<Grid<bool>, AutoPaintError> {
    let img = image::open(path)
        .map_err(|e| AutoPaintError::Resource(format!("{}: {}", path.display(), e)))?
        .to_luma8();
    let img = if img.dimensions() == (width as u32, height as u32) {
        img
    } else {
        imageops::resize(&img, width as u32, height as u32, FilterType::Triangle)
    };
    let bits = img.as_raw().iter().map(|&p| p > RASTER_MASK_THRESHOLD).collect();
    Grid::from_vec(width, height, bits)
        .ok_or_else(|| AutoPaintError::Resource(format!("{}: unexpected size after resize", path.display())))
}
