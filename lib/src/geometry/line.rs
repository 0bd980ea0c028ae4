//! Line segment type.
//!
//! Segments are what the metadata reattachment pass tests output vertices
//! against, so the queries here favour unrounded distances.

use super::{Point, PointF};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A line segment defined by two endpoints.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub a: Point,
    pub b: Point,
}

impl Line {
    /// Create a new line segment from two points.
    #[inline]
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// Get the direction vector (b - a).
    #[inline]
    pub fn direction(&self) -> Point {
        self.b - self.a
    }

    /// Get the direction vector as floating-point.
    #[inline]
    pub fn direction_f(&self) -> PointF {
        self.b.to_f64() - self.a.to_f64()
    }

    /// Get the length of the line segment.
    #[inline]
    pub fn length(&self) -> CoordF {
        self.a.distance(&self.b)
    }

    /// Check if this line segment is a point (zero length).
    #[inline]
    pub fn is_point(&self) -> bool {
        self.a == self.b
    }

    /// Reverse the direction of the line segment.
    #[inline]
    pub fn reverse(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
        }
    }

    /// Unit normal pointing to the right of the direction of travel.
    ///
    /// For a counter-clockwise ring this is the outward normal.
    #[inline]
    pub fn outward_normal(&self) -> PointF {
        let dir = self.direction_f();
        PointF::new(dir.y, -dir.x).normalize()
    }

    /// Calculate the distance from a point to this line segment.
    pub fn distance_to_point(&self, p: &Point) -> CoordF {
        p.project_onto_segment(self.a, self.b).distance(&p.to_f64())
    }

    /// Distance from a point to the infinite line through this segment.
    pub fn distance_to_point_infinite(&self, p: &Point) -> CoordF {
        if self.is_point() {
            return self.a.distance(p);
        }
        (self.ccw(p) as CoordF).abs() / self.length()
    }

    /// Check whether a point lies on the segment within `tolerance`.
    #[inline]
    pub fn contains_point(&self, p: &Point, tolerance: CoordF) -> bool {
        if !self.bbox_contains(p, tolerance) {
            return false;
        }
        self.distance_to_point(p) <= tolerance
    }

    /// Cheap rejection test against the segment's expanded bounding box.
    #[inline]
    pub fn bbox_contains(&self, p: &Point, tolerance: CoordF) -> bool {
        let tol = tolerance.ceil() as Coord;
        p.x >= self.a.x.min(self.b.x) - tol
            && p.x <= self.a.x.max(self.b.x) + tol
            && p.y >= self.a.y.min(self.b.y) - tol
            && p.y <= self.a.y.max(self.b.y) + tol
    }

    /// Check if moving from `from` to `to` runs the same way as this segment.
    #[inline]
    pub fn same_direction(&self, from: &Point, to: &Point) -> bool {
        super::dot2(*to - *from, self.direction()) > 0
    }

    /// Cross product sign of point p relative to this line.
    /// Positive when p is to the left.
    #[inline]
    pub fn ccw(&self, p: &Point) -> i128 {
        super::cross2(self.direction(), *p - self.a)
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line({:?} -> {:?})", self.a, self.b)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.a, self.b)
    }
}

impl From<(Point, Point)> for Line {
    fn from((a, b): (Point, Point)) -> Self {
        Line::new(a, b)
    }
}
