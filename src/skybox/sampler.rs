//! Resampling of panorama pixels at fractional coordinates.
//!
//! Columns wrap around (longitude is periodic); rows clamp at the poles.

use serde::{Deserialize, Serialize};

use super::panorama::Panorama;

/// Interpolation order used when sampling the panorama.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
    Cubic,
}

impl Panorama {
    /// Samples all three channels at fractional pixel `(x, y)`.
    pub fn sample(&self, x: f32, y: f32, order: Interpolation) -> [f32; 3] {
        match order {
            Interpolation::Nearest => self.sample_nearest(x, y),
            Interpolation::Linear => self.sample_bilinear(x, y),
            Interpolation::Cubic => self.sample_bicubic(x, y),
        }
    }

    #[inline]
    fn texel(&self, x: i32, y: i32) -> [f32; 3] {
        let sx = x.rem_euclid(self.width() as i32) as usize;
        let sy = y.clamp(0, self.height() as i32 - 1) as usize;
        self.pixel(sx, sy)
    }

    fn sample_nearest(&self, x: f32, y: f32) -> [f32; 3] {
        self.texel(x.round() as i32, y.round() as i32)
    }

    fn sample_bilinear(&self, x: f32, y: f32) -> [f32; 3] {
        let x0 = x.floor() as i32;
        let y0 = y.floor() as i32;
        let fx = x - x.floor();
        let fy = y - y.floor();

        let v00 = self.texel(x0, y0);
        let v10 = self.texel(x0 + 1, y0);
        let v01 = self.texel(x0, y0 + 1);
        let v11 = self.texel(x0 + 1, y0 + 1);

        let mut out = [0.0; 3];
        for c in 0..3 {
            let top = v00[c] * (1.0 - fx) + v10[c] * fx;
            let bottom = v01[c] * (1.0 - fx) + v11[c] * fx;
            out[c] = top * (1.0 - fy) + bottom * fy;
        }
        out
    }

    fn sample_bicubic(&self, x: f32, y: f32) -> [f32; 3] {
        let x0 = x.floor() as i32;
        let y0 = y.floor() as i32;
        let fx = x - x.floor();
        let fy = y - y.floor();

        let mut out = [0.0; 3];
        for c in 0..3 {
            let mut rows = [0.0f32; 4];
            for (j, row) in rows.iter_mut().enumerate() {
                let sy = y0 + j as i32 - 1;
                let p: [f32; 4] = std::array::from_fn(|i| self.texel(x0 + i as i32 - 1, sy)[c]);
                *row = catmull_rom(p[0], p[1], p[2], p[3], fx);
            }
            out[c] = catmull_rom(rows[0], rows[1], rows[2], rows[3], fy);
        }
        out
    }
}

/// Catmull-Rom spline through `p1`..`p2` at `t` in `[0, 1]`.
#[inline]
fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn ramp() -> Panorama {
        // Red channel increases with x; green with y.
        let img = RgbImage::from_fn(8, 4, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 0]));
        Panorama::from_rgb(&img).unwrap()
    }

    #[test]
    fn test_integer_coords_hit_texels() {
        let pano = ramp();
        for order in [Interpolation::Nearest, Interpolation::Linear, Interpolation::Cubic] {
            let v = pano.sample(3.0, 2.0, order);
            assert!((v[0] - 30.0).abs() < 1e-4, "{:?}: {:?}", order, v);
            assert!((v[1] - 20.0).abs() < 1e-4, "{:?}: {:?}", order, v);
        }
    }

    #[test]
    fn test_linear_midpoint() {
        let pano = ramp();
        let v = pano.sample(2.5, 1.5, Interpolation::Linear);
        assert!((v[0] - 25.0).abs() < 1e-4);
        assert!((v[1] - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_columns_wrap() {
        let pano = ramp();
        // Halfway between the last column (70) and the first (0).
        let v = pano.sample(7.5, 0.0, Interpolation::Linear);
        assert!((v[0] - 35.0).abs() < 1e-4);
        let v = pano.sample(-1.0, 0.0, Interpolation::Nearest);
        assert_eq!(v[0], 70.0);
    }

    #[test]
    fn test_rows_clamp() {
        let pano = ramp();
        let v = pano.sample(0.0, -3.0, Interpolation::Cubic);
        assert!((v[1] - 0.0).abs() < 1e-4);
        let v = pano.sample(0.0, 10.0, Interpolation::Linear);
        assert!((v[1] - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_catmull_rom_is_exact_on_lines() {
        assert!((catmull_rom(0.0, 1.0, 2.0, 3.0, 0.25) - 1.25).abs() < 1e-6);
    }
}
