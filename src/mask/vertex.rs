//! Geometric transition masks: a toothed polyline closed into a polygon.

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::config::{MaskMode, MaskParams, MaskStyle};
use crate::grid::Grid;
use crate::raster::{fill_polygon, Point};

/// Seam endpoints and the corners that close the polygon for a template.
pub(crate) struct Template {
    pub start: Point,
    pub end: Point,
    pub closing: Vec<Point>,
}

impl Template {
    pub fn new(mode: MaskMode, resolution: u32) -> Self {
        let res = resolution as f64;
        match mode {
            MaskMode::Cap => Self {
                start: (0.0, res * 0.75),
                end: (res, res * 0.75),
                closing: vec![(res, res), (0.0, res)],
            },
            MaskMode::Diag => Self {
                start: (0.0, res),
                end: (res, 0.0),
                closing: vec![(res, res)],
            },
        }
    }
}

/// The seam polyline from the template start to its end.
///
/// One uniform draw in `[-jitter, jitter]` is consumed per tooth whether or
/// not the style uses it, so the sequence is fixed by the seed alone.
pub fn outline<R: Rng + ?Sized>(params: &MaskParams, mode: MaskMode, rng: &mut R) -> Vec<Point> {
    let template = Template::new(mode, params.resolution);
    let res = params.resolution as f64;
    let depth_px = res * params.depth;
    let count = params.count();
    let (sx, sy) = template.start;
    let (ex, ey) = template.end;

    let mut pts = Vec::with_capacity(count as usize * 2 + 2);
    pts.push(template.start);
    for i in 1..=count {
        let t = i as f64 / count as f64;
        let px = sx + (ex - sx) * t;
        let py = sy + (ey - sy) * t;

        let noise = -params.jitter + 2.0 * params.jitter * rng.random::<f64>();
        let off = if i % 2 == 0 { depth_px } else { -depth_px } + noise;

        match params.style {
            MaskStyle::Blocky => {
                let lead = sx + (ex - sx) * (i as f64 - 0.9) / count as f64;
                pts.push((lead + off, py + off));
                pts.push((px + off, py + off));
            }
            MaskStyle::Sawtooth => pts.push((px + off, py + off)),
            MaskStyle::Sine => {
                let s = (t * TAU).sin() * depth_px;
                pts.push((px + s, py + s));
            }
            MaskStyle::Stairs => {
                pts.push((px, py + off));
                pts.push((px + res / count as f64, py + off));
            }
            _ => pts.push((px, py + off)),
        }
    }
    pts.push(template.end);
    pts
}

/// The outline with jitter removed: the shape every seed perturbs.
pub fn skeleton(params: &MaskParams, mode: MaskMode) -> Vec<Point> {
    let unjittered = MaskParams {
        jitter: 0.0,
        ..params.clone()
    };
    outline(&unjittered, mode, &mut ChaCha8Rng::seed_from_u64(params.seed))
}

/// Rasterises the closed outline solid (255) on black.
pub fn render<R: Rng + ?Sized>(params: &MaskParams, mode: MaskMode, rng: &mut R) -> Grid<u8> {
    let mut polygon = outline(params, mode, rng);
    polygon.extend(Template::new(mode, params.resolution).closing);
    let res = params.resolution as usize;
    let mut mask = Grid::new(res, res);
    fill_polygon(&mut mask, &polygon, 255u8);
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(style: MaskStyle, jitter: f64) -> MaskParams {
        MaskParams {
            style,
            resolution: 128,
            depth: 0.1,
            density: 8,
            jitter,
            feather: 0.0,
            seed: 0,
        }
    }

    #[test]
    fn test_outline_spans_template() {
        for mode in [MaskMode::Cap, MaskMode::Diag] {
            let p = params(MaskStyle::Sawtooth, 0.0);
            let pts = skeleton(&p, mode);
            let template = Template::new(mode, 128);
            assert_eq!(pts.first(), Some(&template.start));
            assert_eq!(pts.last(), Some(&template.end));
            assert_eq!(pts.len(), 8 + 2);
        }
    }

    #[test]
    fn test_sawtooth_alternates() {
        let pts = skeleton(&params(MaskStyle::Sawtooth, 0.0), MaskMode::Cap);
        // Odd teeth are pulled up, even teeth pushed down by depth * res.
        assert!((pts[1].1 - (96.0 - 12.8)).abs() < 1e-9);
        assert!((pts[2].1 - (96.0 + 12.8)).abs() < 1e-9);
    }

    #[test]
    fn test_points_per_style() {
        let counts = [
            (MaskStyle::Blocky, 2 * 8 + 2),
            (MaskStyle::Sawtooth, 8 + 2),
            (MaskStyle::Sine, 8 + 2),
            (MaskStyle::Stairs, 2 * 8 + 2),
            (MaskStyle::Interlocking, 8 + 2),
        ];
        for (style, expected) in counts {
            assert_eq!(skeleton(&params(style, 0.0), MaskMode::Diag).len(), expected, "{:?}", style);
        }
    }

    #[test]
    fn test_jitter_stays_within_bounds_of_skeleton() {
        for style in [MaskStyle::Blocky, MaskStyle::Stairs, MaskStyle::Interlocking, MaskStyle::Sawtooth] {
            let p = params(style, 5.0);
            let base = skeleton(&p, MaskMode::Cap);
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            let jittered = outline(&p, MaskMode::Cap, &mut rng);
            assert_eq!(base.len(), jittered.len());
            for (a, b) in base.iter().zip(&jittered) {
                assert!((a.0 - b.0).abs() <= 5.0 && (a.1 - b.1).abs() <= 5.0, "{:?}: {:?} vs {:?}", style, a, b);
            }
        }
    }

    #[test]
    fn test_cap_fills_below_seam() {
        let p = params(MaskStyle::Sine, 0.0);
        let mask = render(&p, MaskMode::Cap, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(*mask.get(64, 127), 255);
        assert_eq!(*mask.get(64, 10), 0);
    }

    #[test]
    fn test_diag_fills_lower_right() {
        let p = params(MaskStyle::Interlocking, 0.0);
        let mask = render(&p, MaskMode::Diag, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(*mask.get(124, 124), 255);
        assert_eq!(*mask.get(3, 3), 0);
    }
}
