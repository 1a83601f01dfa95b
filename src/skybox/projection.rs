//! Face-local coordinates to world directions and equirectangular lookups.

use std::f64::consts::{PI, TAU};

use glam::DVec3;

use super::face::CubeFaceId;

/// Face-local coordinate of the centre of pixel `i` in a face of `resolution`
/// pixels, in `(-1, 1)`.
#[inline]
pub fn pixel_centre(i: u32, resolution: u32) -> f64 {
    -1.0 + (2.0 * i as f64 + 1.0) / resolution as f64
}

/// Unnormalised world direction for face-local `(u, v)`.
///
/// `u` runs along face columns, `v` along face rows (top to bottom). Each
/// face pins one world axis at ±1; the sign conventions make adjoining faces
/// share their edges.
#[inline]
pub fn face_direction(face: CubeFaceId, u: f64, v: f64) -> DVec3 {
    match face {
        CubeFaceId::PosZ => DVec3::new(-1.0, -u, -v),
        CubeFaceId::NegZ => DVec3::new(1.0, u, -v),
        CubeFaceId::PosX => DVec3::new(u, -1.0, -v),
        CubeFaceId::NegX => DVec3::new(-u, 1.0, -v),
        CubeFaceId::PosY => DVec3::new(-v, -u, 1.0),
        CubeFaceId::NegY => DVec3::new(v, -u, -1.0),
    }
}

/// Longitude in `[0, 2π)` and colatitude in `[0, π]` of a direction.
///
/// `rotation` is added to the longitude before wrapping.
#[inline]
pub fn lon_colat(dir: DVec3, rotation: f64) -> (f64, f64) {
    let r = dir.length();
    let colat = (dir.z / r).clamp(-1.0, 1.0).acos();
    let lon = (dir.y.atan2(dir.x) + rotation).rem_euclid(TAU);
    (lon, colat)
}

/// Fractional source pixel for a longitude/colatitude pair in a
/// `width` x `height` equirectangular image.
#[inline]
pub fn source_coords(lon: f64, colat: f64, width: u32, height: u32) -> (f64, f64) {
    let x = width as f64 * lon / TAU - 0.5;
    let y = height as f64 * colat / PI - 0.5;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_pixel_centres_are_symmetric() {
        assert!((pixel_centre(0, 4) + 0.75).abs() < EPS);
        assert!((pixel_centre(3, 4) - 0.75).abs() < EPS);
        assert!((pixel_centre(0, 1)).abs() < EPS);
    }

    #[test]
    fn test_each_face_pins_one_axis() {
        let expected = [
            (CubeFaceId::PosZ, DVec3::new(-1.0, 0.0, 0.0)),
            (CubeFaceId::NegZ, DVec3::new(1.0, 0.0, 0.0)),
            (CubeFaceId::PosX, DVec3::new(0.0, -1.0, 0.0)),
            (CubeFaceId::NegX, DVec3::new(0.0, 1.0, 0.0)),
            (CubeFaceId::PosY, DVec3::new(0.0, 0.0, 1.0)),
            (CubeFaceId::NegY, DVec3::new(0.0, 0.0, -1.0)),
        ];
        for (face, centre) in expected {
            let dir = face_direction(face, 0.0, 0.0);
            assert!((dir - centre).length() < EPS, "{:?} centre {:?}", face, dir);
        }
    }

    #[test]
    fn test_poles_and_equator() {
        let (_, colat) = lon_colat(DVec3::Z, 0.0);
        assert!(colat.abs() < EPS);
        let (_, colat) = lon_colat(-DVec3::Z, 0.0);
        assert!((colat - PI).abs() < EPS);
        let (lon, colat) = lon_colat(DVec3::Y, 0.0);
        assert!((lon - PI / 2.0).abs() < EPS);
        assert!((colat - PI / 2.0).abs() < EPS);
    }

    #[test]
    fn test_rotation_wraps_longitude() {
        let (lon, _) = lon_colat(DVec3::X, PI);
        assert!((lon - PI).abs() < EPS);
        let (lon, _) = lon_colat(DVec3::new(-1.0, -1e-12, 0.0), PI);
        assert!((0.0..TAU).contains(&lon));
    }

    #[test]
    fn test_source_coords_cover_image() {
        let (x, y) = source_coords(0.0, 0.0, 64, 32);
        assert_eq!((x, y), (-0.5, -0.5));
        let (x, y) = source_coords(PI, PI / 2.0, 64, 32);
        assert!((x - 31.5).abs() < EPS);
        assert!((y - 15.5).abs() < EPS);
    }
}
