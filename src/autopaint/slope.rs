//! Terrain slope from a height grid.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::heightfield::METERS_PER_ZONE;

/// Converts grid steps and raster height units to a common metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeScale {
    /// Distance between neighbouring vertices.
    pub horizontal_spacing: f32,
    /// Distance represented by one raster height unit.
    pub vertical_scale: f32,
}

impl Default for SlopeScale {
    /// 10 m vertex spacing (128-vertex zones) and 0.1 m per 13-bit step.
    fn default() -> Self {
        Self::for_zone_size(128)
    }
}

impl SlopeScale {
    /// Slope computed directly on grid and raster units.
    pub fn unit() -> Self {
        Self {
            horizontal_spacing: 1.0,
            vertical_scale: 1.0,
        }
    }

    /// World scale for a heightfield with the given zone size.
    pub fn for_zone_size(zone_size: usize) -> Self {
        Self {
            horizontal_spacing: METERS_PER_ZONE / zone_size.max(1) as f32,
            vertical_scale: 0.1 / 8.0,
        }
    }

    fn factor(&self) -> f32 {
        self.vertical_scale / self.horizontal_spacing
    }
}

/// Slope in degrees at every vertex.
///
/// The gradient uses central differences inside the grid and one-sided
/// differences on its borders; a one-vertex-wide axis contributes nothing.
pub fn compute_slope_degrees(heights: &Grid<f32>, scale: &SlopeScale) -> Grid<f32> {
    let (w, h) = heights.dims();
    let factor = scale.factor();
    let data = heights.as_slice();

    let diff = |i0: usize, i1: usize, span: f32| (data[i1] - data[i0]) / span;
    let axis = |pos: usize, len: usize| -> Option<(usize, usize, f32)> {
        if len < 2 {
            None
        } else if pos == 0 {
            Some((0, 1, 1.0))
        } else if pos == len - 1 {
            Some((len - 2, len - 1, 1.0))
        } else {
            Some((pos - 1, pos + 1, 2.0))
        }
    };

    let mut out = vec![0.0f32; w * h];
    out.par_chunks_mut(w.max(1)).enumerate().for_each(|(y, row)| {
        for (x, slope) in row.iter_mut().enumerate() {
            let gx = axis(x, w).map_or(0.0, |(a, b, s)| diff(y * w + a, y * w + b, s));
            let gy = axis(y, h).map_or(0.0, |(a, b, s)| diff(a * w + x, b * w + x, s));
            let magnitude = (gx * gx + gy * gy).sqrt() * factor;
            *slope = magnitude.atan().to_degrees();
        }
    });
    Grid::from_vec(w, h, out).unwrap_or_else(|| Grid::new(w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_is_zero() {
        let heights = Grid::new_with(8, 8, 32768.0);
        let slope = compute_slope_degrees(&heights, &SlopeScale::default());
        assert!(slope.as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_unit_ramp_is_45_degrees() {
        let heights = Grid::from_vec(4, 3, (0..12).map(|i| (i % 4) as f32).collect()).unwrap();
        let slope = compute_slope_degrees(&heights, &SlopeScale::unit());
        for &s in slope.as_slice() {
            assert!((s - 45.0).abs() < 1e-4, "{}", s);
        }
    }

    #[test]
    fn test_world_scale() {
        // One vertex = 10 m; 800 raster units = 10 m of rise.
        let heights = Grid::from_vec(3, 1, vec![0.0, 800.0, 1600.0]).unwrap();
        let slope = compute_slope_degrees(&heights, &SlopeScale::for_zone_size(128));
        assert!((slope.get(1, 0) - 45.0).abs() < 1e-3);
    }

    #[test]
    fn test_borders_are_one_sided() {
        let heights = Grid::from_vec(3, 1, vec![0.0, 1.0, 5.0]).unwrap();
        let slope = compute_slope_degrees(&heights, &SlopeScale::unit());
        assert!((slope.get(0, 0) - 1.0f32.atan().to_degrees()).abs() < 1e-4);
        assert!((slope.get(1, 0) - 2.5f32.atan().to_degrees()).abs() < 1e-4);
        assert!((slope.get(2, 0) - 4.0f32.atan().to_degrees()).abs() < 1e-4);
    }

    #[test]
    fn test_single_vertex() {
        let heights = Grid::new_with(1, 1, 7.0);
        let slope = compute_slope_degrees(&heights, &SlopeScale::unit());
        assert_eq!(slope.as_slice(), &[0.0]);
    }
}
