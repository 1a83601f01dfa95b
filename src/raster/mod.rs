//! Polygon filling and polyline stroking into grids.
//!
//! Coordinates are continuous pixel-space positions: pixel `(x, y)` covers
//! `[x, x + 1) x [y, y + 1)` and is considered inside a polygon when its
//! centre is (even-odd rule).

use crate::grid::Grid;

/// A point in continuous pixel space.
pub type Point = (f64, f64);

/// Even-odd test of a single point against a polygon (ray casting).
pub fn point_in_polygon(x: f64, y: f64, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Fills a closed polygon into `grid` with `value`.
///
/// The polygon is implicitly closed (last point connects back to the first).
/// Pixels outside the grid are ignored.
pub fn fill_polygon<T: Copy>(grid: &mut Grid<T>, polygon: &[Point], value: T) {
    if polygon.len() < 3 {
        return;
    }
    let (width, height) = grid.dims();
    let (min_y, max_y) = polygon
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    let first_row = (min_y - 0.5).ceil().max(0.0) as usize;
    let last_row = ((max_y - 0.5).floor().max(-1.0) + 1.0).min(height as f64) as usize;

    let mut crossings: Vec<f64> = Vec::with_capacity(polygon.len());
    for y in first_row..last_row {
        let yc = y as f64 + 0.5;
        crossings.clear();
        let mut j = polygon.len() - 1;
        for i in 0..polygon.len() {
            let (xi, yi) = polygon[i];
            let (xj, yj) = polygon[j];
            if (yi > yc) != (yj > yc) {
                crossings.push(xi + (yc - yi) * (xj - xi) / (yj - yi));
            }
            j = i;
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let start = (span[0] - 0.5).ceil().clamp(0.0, width as f64) as usize;
            let end = (span[1] - 0.5).ceil().clamp(0.0, width as f64) as usize;
            for x in start..end {
                grid.set(x, y, value);
            }
        }
    }
}

/// Draws the segments of a polyline with a square brush of the given radius.
///
/// A radius of 0 draws one-pixel-wide lines. With `closed` the last point is
/// joined back to the first.
pub fn stroke_polyline<T: Copy>(grid: &mut Grid<T>, points: &[Point], closed: bool, radius: usize, value: T) {
    let Some(&first) = points.first() else {
        return;
    };
    if points.len() == 1 {
        stamp(grid, to_pixel(first), radius, value);
        return;
    }
    for pair in points.windows(2) {
        stroke_segment(grid, pair[0], pair[1], radius, value);
    }
    if closed && points.len() > 2 {
        if let Some(&last) = points.last() {
            stroke_segment(grid, last, first, radius, value);
        }
    }
}

fn to_pixel((x, y): Point) -> (i64, i64) {
    (x.floor() as i64, y.floor() as i64)
}

/// Clips a segment to an axis-aligned box (Liang-Barsky).
///
/// Returns `None` when no part of the segment lies inside the box.
fn clip_segment(from: Point, to: Point, (min_x, min_y, max_x, max_y): (f64, f64, f64, f64)) -> Option<(Point, Point)> {
    if ![from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [
        (-dx, from.0 - min_x),
        (dx, max_x - from.0),
        (-dy, from.1 - min_y),
        (dy, max_y - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    // Endpoints inside the box are kept exactly.
    let at = |t: f64, end: Point| if t == 0.0 || t == 1.0 { end } else { (from.0 + t * dx, from.1 + t * dy) };
    Some((at(t0, from), at(t1, to)))
}

/// Bresenham's line between the pixels containing `from` and `to`.
///
/// The segment is first clipped to the grid grown by the brush, so only
/// pixels that can touch the grid are walked.
fn stroke_segment<T: Copy>(grid: &mut Grid<T>, from: Point, to: Point, radius: usize, value: T) {
    let (width, height) = grid.dims();
    let margin = radius as f64 + 1.0;
    let bounds = (-margin, -margin, width as f64 + margin, height as f64 + margin);
    let Some((from, to)) = clip_segment(from, to, bounds) else {
        return;
    };
    let (x0, y0) = to_pixel(from);
    let (x1, y1) = to_pixel(to);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        stamp(grid, (x, y), radius, value);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn stamp<T: Copy>(grid: &mut Grid<T>, (cx, cy): (i64, i64), radius: usize, value: T) {
    let (width, height) = grid.dims();
    let r = radius as i64;
    for y in (cy - r).max(0)..=(cy + r).min(height as i64 - 1) {
        for x in (cx - r).max(0)..=(cx + r).min(width as i64 - 1) {
            grid.set(x as usize, y as usize, value);
        }
    }
}
