//! Noise-driven transition masks: a directional gradient warped by fBm noise.

use image::{imageops, GrayImage};
use simdnoise::NoiseBuilder;

use super::config::{MaskMode, MaskParams, MaskStyle};
use crate::grid::Grid;

/// Binary threshold shared by most styles (strictly greater passes).
pub const THRESHOLD: u8 = 128;

/// Half-width of the band around the midpoint kept by plasma traces.
pub const PLASMA_BAND: f32 = 12.0;

/// Crunch noise values above this become speckles in fractal masks.
pub const CRUNCH_THRESHOLD: u8 = 220;

/// Blur sigma of the fractal compositing matte.
pub const CRUNCH_MATTE_SIGMA: f32 = 10.0;

const NOISE_OCTAVES: u8 = 3;

/// Renders a field-engine mask.
pub fn render(params: &MaskParams, mode: MaskMode) -> Grid<u8> {
    let res = params.resolution as usize;
    let freq = params.count() as f32;
    let influence = (params.jitter / 100.0) as f32;
    let seed = noise_seed(params.seed);

    let gradient = gradient(params.style, mode, res);
    let mut noise = noise_field(res, freq, seed);
    match params.style {
        MaskStyle::Cellular => {
            let bands = freq / 5.0;
            noise.as_mut_slice().iter_mut().for_each(|n| *n = (*n * bands).round() / bands);
        }
        MaskStyle::Plasma => noise = interference(&noise, freq),
        _ => {}
    }

    let warped: Vec<u8> = gradient
        .as_slice()
        .iter()
        .zip(noise.as_slice())
        .map(|(&g, &n)| ((g + (n - 0.5) * influence * 2.0).clamp(0.0, 1.0) * 255.0) as u8)
        .collect();
    let mut mask = Grid::from_vec(res, res, warped).unwrap_or_else(|| Grid::new(res, res));

    match params.style {
        MaskStyle::Dither => dither(&mut mask),
        MaskStyle::Plasma => {
            for p in mask.as_mut_slice() {
                *p = if (*p as f32 - THRESHOLD as f32).abs() < PLASMA_BAND { 255 } else { 0 };
            }
        }
        MaskStyle::Fractal => {
            threshold(&mut mask);
            crunch(&mut mask, seed.wrapping_add(1));
        }
        _ => threshold(&mut mask),
    }
    mask
}

fn noise_seed(seed: u64) -> i32 {
    (seed ^ (seed >> 32)) as i32
}

/// Base field in `[0, 1]` that the noise bends.
fn gradient(style: MaskStyle, mode: MaskMode, res: usize) -> Grid<f32> {
    let r = res as f32;
    let mut grid = Grid::new(res, res);
    for y in 0..res {
        for x in 0..res {
            let (fx, fy) = (x as f32, y as f32);
            let value = if style == MaskStyle::Radial {
                ((r - fx).powi(2) + (r - fy).powi(2)).sqrt() / (r * 1.414)
            } else {
                match mode {
                    MaskMode::Cap => fy / r,
                    MaskMode::Diag => (fx + fy) / (r * 2.0),
                }
            };
            grid.set(x, y, value);
        }
    }
    grid
}

/// fBm noise with `cycles` features across the tile, normalised to `[0, 1]`.
pub(crate) fn noise_field(res: usize, cycles: f32, seed: i32) -> Grid<f32> {
    let (mut values, min, max) = NoiseBuilder::fbm_2d(res, res)
        .with_seed(seed)
        .with_freq(cycles / res as f32)
        .with_octaves(NOISE_OCTAVES)
        .generate();
    let range = max - min;
    for v in values.iter_mut() {
        *v = if range > f32::EPSILON { ((*v - min) / range).clamp(0.0, 1.0) } else { 0.5 };
    }
    values.resize(res * res, 0.5);
    Grid::from_vec(res, res, values).unwrap_or_else(|| Grid::new_with(res, res, 0.5))
}

/// `sin(n * f) * cos(nᵀ * f)` renormalised to `[0, 1]`.
fn interference(noise: &Grid<f32>, freq: f32) -> Grid<f32> {
    let res = noise.width();
    let mut out = Grid::new(res, res);
    for y in 0..res {
        for x in 0..res {
            let v = (noise.get(x, y) * freq).sin() * (noise.get(y, x) * freq).cos();
            out.set(x, y, v);
        }
    }
    let (lo, hi) = out.value_range();
    let range = hi - lo;
    for v in out.as_mut_slice() {
        *v = if range > f32::EPSILON { (*v - lo) / range } else { 0.5 };
    }
    out
}

fn threshold(mask: &mut Grid<u8>) {
    for p in mask.as_mut_slice() {
        *p = if *p > THRESHOLD { 255 } else { 0 };
    }
}

/// Floyd-Steinberg error diffusion to black/white at the midpoint.
fn dither(mask: &mut Grid<u8>) {
    let (w, h) = mask.dims();
    let mut buf: Vec<f32> = mask.as_slice().iter().map(|&p| p as f32).collect();
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let old = buf[i];
            let new = if old >= THRESHOLD as f32 { 255.0 } else { 0.0 };
            let err = old - new;
            buf[i] = new;
            if x + 1 < w {
                buf[i + 1] += err * 7.0 / 16.0;
            }
            if y + 1 < h {
                if x > 0 {
                    buf[i + w - 1] += err * 3.0 / 16.0;
                }
                buf[i + w] += err * 5.0 / 16.0;
                if x + 1 < w {
                    buf[i + w + 1] += err * 1.0 / 16.0;
                }
            }
        }
    }
    for (p, v) in mask.as_mut_slice().iter_mut().zip(buf) {
        *p = v as u8;
    }
}

/// Blends speckle noise into the mask through a blurred copy of itself.
fn crunch(mask: &mut Grid<u8>, seed: i32) {
    let res = mask.width();
    let speckles = noise_field(res, (res / 4).max(1) as f32, seed);
    let Some(matte_src) = GrayImage::from_raw(res as u32, res as u32, mask.as_slice().to_vec()) else {
        return;
    };
    let matte = imageops::blur(&matte_src, CRUNCH_MATTE_SIGMA);

    for ((p, &n), a) in mask
        .as_mut_slice()
        .iter_mut()
        .zip(speckles.as_slice())
        .zip(matte.as_raw())
    {
        let speck: u32 = if (n * 255.0) as u8 > CRUNCH_THRESHOLD { 255 } else { 0 };
        let a = *a as u32;
        *p = ((speck * a + *p as u32 * (255 - a) + 127) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(style: MaskStyle, jitter: f64) -> MaskParams {
        MaskParams {
            style,
            resolution: 64,
            depth: 0.1,
            density: 8,
            jitter,
            feather: 0.0,
            seed: 7,
        }
    }

    fn is_binary(mask: &Grid<u8>) -> bool {
        mask.as_slice().iter().all(|&p| p == 0 || p == 255)
    }

    #[test]
    fn test_gradient_ranges() {
        let g = gradient(MaskStyle::Clouds, MaskMode::Cap, 8);
        assert_eq!(*g.get(3, 0), 0.0);
        assert_eq!(*g.get(3, 4), 0.5);
        let g = gradient(MaskStyle::Clouds, MaskMode::Diag, 8);
        assert_eq!(*g.get(4, 4), 0.5);
        let g = gradient(MaskStyle::Radial, MaskMode::Cap, 8);
        assert!(*g.get(0, 0) > 0.99);
        assert!(*g.get(7, 7) < 0.2);
    }

    #[test]
    fn test_noise_field_is_normalised() {
        let n = noise_field(32, 4.0, 99);
        let (lo, hi) = n.value_range();
        assert!(lo >= 0.0 && hi <= 1.0);
        assert!(hi - lo > 0.5, "noise should span most of the range");
    }

    #[test]
    fn test_zero_influence_is_pure_gradient() {
        let mask = render(&params(MaskStyle::Clouds, 0.0), MaskMode::Cap);
        assert!(mask.rows().nth(20).unwrap().iter().all(|&p| p == 0));
        assert!(mask.rows().nth(40).unwrap().iter().all(|&p| p == 255));
    }

    #[test]
    fn test_binary_styles() {
        for style in [
            MaskStyle::Clouds,
            MaskStyle::Dither,
            MaskStyle::Cellular,
            MaskStyle::Plasma,
            MaskStyle::Radial,
        ] {
            for mode in [MaskMode::Cap, MaskMode::Diag] {
                let mask = render(&params(style, 35.0), mode);
                assert!(is_binary(&mask), "{:?} {:?}", style, mode);
            }
        }
    }

    #[test]
    fn test_dither_tracks_gradient() {
        let mask = render(&params(MaskStyle::Dither, 0.0), MaskMode::Cap);
        let mean = |rows: std::ops::Range<usize>| {
            let n = rows.len() * 64;
            let sum: u32 = rows.flat_map(|y| (0..64).map(move |x| (x, y))).map(|(x, y)| *mask.get(x, y) as u32).sum();
            sum as f32 / n as f32
        };
        let top = mean(0..16);
        let bottom = mean(48..64);
        assert!(top < 80.0 && bottom > 175.0, "top {} bottom {}", top, bottom);
    }

    #[test]
    fn test_field_styles_are_deterministic() {
        for style in [MaskStyle::Fractal, MaskStyle::Plasma, MaskStyle::Cellular] {
            let p = params(style, 50.0);
            assert_eq!(render(&p, MaskMode::Diag), render(&p, MaskMode::Diag));
        }
    }
}
