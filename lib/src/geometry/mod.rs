//! Geometry primitives.
//!
//! - [`Point`] - 2D point with integer coordinates (scaled)
//! - [`PointF`] - 2D point with floating-point coordinates
//! - [`Line`] - Line segment between two points
//!
//! ## Coordinate System
//!
//! Coordinates are scaled by `SCALING_FACTOR` (1,000,000), so 1 unit = 1 nanometer.
//!
//! - Use `scale()` to convert from mm to internal units
//! - Use `unscale()` to convert from internal units to mm

mod line;
mod point;

pub use line::Line;
pub use point::{Point, PointF};

use crate::CoordF;

/// Calculate the cross product of two 2D vectors (returns a scalar).
#[inline]
pub fn cross2(v1: Point, v2: Point) -> i128 {
    v1.x as i128 * v2.y as i128 - v1.y as i128 * v2.x as i128
}

/// Calculate the dot product of two 2D vectors.
#[inline]
pub fn dot2(v1: Point, v2: Point) -> i128 {
    v1.x as i128 * v2.x as i128 + v1.y as i128 * v2.y as i128
}

/// Twice the signed area of a closed ring (shoelace formula).
///
/// Positive for counter-clockwise rings.
pub fn signed_area2<I>(ring: I) -> i128
where
    I: IntoIterator<Item = Point>,
    I::IntoIter: Clone,
{
    let iter = ring.into_iter();
    let first = match iter.clone().next() {
        Some(p) => p,
        None => return 0,
    };
    let mut sum = 0i128;
    let mut prev = first;
    for p in iter.skip(1) {
        sum += cross2(prev, p);
        prev = p;
    }
    sum + cross2(prev, first)
}

/// Signed area of a closed ring in scaled units squared.
#[inline]
pub fn signed_area<I>(ring: I) -> CoordF
where
    I: IntoIterator<Item = Point>,
    I::IntoIter: Clone,
{
    signed_area2(ring) as CoordF / 2.0
}
