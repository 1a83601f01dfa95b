//! Per-vertex material classification.

use rayon::prelude::*;

use super::rules::PaintRule;
use super::AutoPaintError;
use crate::grid::Grid;

/// Assigns a material to every vertex.
///
/// # Arguments
/// * `heights` - Heights in the 16-bit raster domain
/// * `slopes` - Slopes in degrees, same shape as `heights`
/// * `rules` - Rules in priority order
/// * `masks` - Optional extra constraint per rule (by index; missing entries mean none)
///
/// # Returns
/// Material ids, 0 where no rule matched. A later matching rule always
/// overwrites an earlier one.
pub fn classify_vertices(
    heights: &Grid<f32>,
    slopes: &Grid<f32>,
    rules: &[PaintRule],
    masks: &[Option<Grid<bool>>],
) -> Result<Grid<u8>, AutoPaintError> {
    classify_vertices_with_progress(heights, slopes, rules, masks, |_| {})
}

/// [`classify_vertices`] reporting the fraction of rules applied.
pub fn classify_vertices_with_progress<F: FnMut(f32)>(
    heights: &Grid<f32>,
    slopes: &Grid<f32>,
    rules: &[PaintRule],
    masks: &[Option<Grid<bool>>],
    mut on_progress: F,
) -> Result<Grid<u8>, AutoPaintError> {
    check_shape(heights, slopes)?;
    for (i, rule) in rules.iter().enumerate() {
        rule.validate(i)?;
        if let Some(Some(mask)) = masks.get(i) {
            check_shape(heights, mask)?;
        }
    }

    let (w, h) = heights.dims();
    let mut materials: Grid<u8> = Grid::new(w, h);
    let hs = heights.as_slice();
    let ss = slopes.as_slice();

    for (i, rule) in rules.iter().enumerate() {
        let mask = masks.get(i).and_then(Option::as_ref).map(Grid::as_slice);
        let hits = materials
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .filter(|&(idx, _)| mask.map_or(true, |m| m[idx]) && rule.matches(hs[idx], ss[idx]))
            .map(|(_, material)| *material = rule.material)
            .count();
        log::debug!("Rule {} (material {}) matched {} vertices", i, rule.material, hits);
        on_progress((i + 1) as f32 / rules.len() as f32);
    }
    Ok(materials)
}

fn check_shape<T, U>(expected: &Grid<T>, actual: &Grid<U>) -> Result<(), AutoPaintError> {
    if expected.same_shape(actual) {
        Ok(())
    } else {
        Err(AutoPaintError::ShapeMismatch {
            expected: expected.dims(),
            actual: actual.dims(),
        })
    }
}
