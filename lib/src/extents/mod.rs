//! Colored subdivisions of polygon edges.
//!
//! A [`ColorExtents`] partitions one directed edge, start to end, into
//! colored runs ([`ColorExtent`]). Lengths are measured along the edge's
//! dominant [`Axis`] rather than its Euclidean length, so they stay integral
//! and split exactly when the kernel cuts an edge at a grid point.
//!
//! Lists are owned by an [`ExtentsArena`] and referenced by [`ExtentsId`].
//!
//! # Invariants
//!
//! - the sum of extent lengths equals `total_length`;
//! - a list that has been given a color is never emptied by rescaling;
//! - only lists with the same axis may be merged.
//!
//! Breaking one of these is a bug in the caller and panics.

mod arena;

pub use arena::{ExtentsArena, ExtentsId};

use crate::color::ColorId;
use crate::geometry::Point;
use crate::Coord;
use std::fmt;

/// Distance metric used along one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// X when `|dx| > |dy|`, otherwise Y.
    #[inline]
    pub fn dominant(start: Point, end: Point) -> Axis {
        if (end.x - start.x).abs() > (end.y - start.y).abs() {
            Axis::X
        } else {
            Axis::Y
        }
    }

    /// Distance between two points along this axis.
    #[inline]
    pub fn measure(self, start: Point, end: Point) -> Coord {
        match self {
            Axis::X => (end.x - start.x).abs(),
            Axis::Y => (end.y - start.y).abs(),
        }
    }
}

/// One colored run of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorExtent {
    pub color: ColorId,
    pub length: Coord,
}

/// Ordered colored runs covering one directed edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorExtents {
    axis: Axis,
    extents: Vec<ColorExtent>,
    total_length: Coord,
}

impl ColorExtents {
    /// An empty list using `axis`.
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            extents: Vec::new(),
            total_length: 0,
        }
    }

    /// An empty list for the edge `start`-`end`.
    pub fn for_edge(start: Point, end: Point) -> Self {
        Self::new(Axis::dominant(start, end))
    }

    /// An empty list sharing this list's axis.
    pub fn empty_like(&self) -> Self {
        Self::new(self.axis)
    }

    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    #[inline]
    pub fn total_length(&self) -> Coord {
        self.total_length
    }

    /// Number of runs.
    #[inline]
    pub fn len(&self) -> usize {
        self.extents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColorExtent> {
        self.extents.iter()
    }

    pub fn as_slice(&self) -> &[ColorExtent] {
        &self.extents
    }

    /// Color of the run at the start of the edge.
    pub fn first_color(&self) -> Option<ColorId> {
        self.extents.first().map(|e| e.color)
    }

    /// Color of the run at the end of the edge.
    pub fn last_color(&self) -> Option<ColorId> {
        self.extents.last().map(|e| e.color)
    }

    /// Append a run at the end of the edge.
    ///
    /// Zero-length runs are only kept in an empty list, so a degenerate edge
    /// still records its color.
    pub fn push(&mut self, color: ColorId, length: Coord) {
        assert!(length >= 0, "negative extent length {length}");
        if length == 0 && !self.extents.is_empty() {
            return;
        }
        self.extents.push(ColorExtent { color, length });
        self.total_length += length;
    }

    /// Runs as `(color, from, to)` distances from the edge start.
    pub fn segments(&self) -> impl Iterator<Item = (ColorId, Coord, Coord)> + '_ {
        self.extents.iter().scan(0, |travelled, e| {
            let from = *travelled;
            *travelled += e.length;
            Some((e.color, from, *travelled))
        })
    }

    /// Color at `distance` from the edge start; boundaries belong to the later run.
    pub fn color_at(&self, distance: Coord) -> Option<ColorId> {
        self.segments()
            .find(|&(_, from, to)| distance >= from && distance < to)
            .map(|(color, _, _)| color)
            .or_else(|| {
                (distance >= self.total_length)
                    .then(|| self.last_color())
                    .flatten()
            })
    }

    /// Reverse run order. Lengths and total are unchanged.
    pub fn reverse(&mut self) {
        self.extents.reverse();
    }

    /// Rescale to the edge `start`-`end`.
    ///
    /// Run boundaries are placed at `floor(travelled * new / old)` so rounding
    /// never accumulates along the list. Runs that shrink to nothing are
    /// dropped.
    pub fn resize(&mut self, start: Point, end: Point) {
        assert!(!self.extents.is_empty(), "resize of an empty color extents list");
        let axis = Axis::dominant(start, end);
        let new_len = axis.measure(start, end);
        let old_len = self.total_length;
        self.axis = axis;
        if new_len == old_len {
            return;
        }
        if old_len == 0 {
            let color = self.extents[self.extents.len() - 1].color;
            self.extents = vec![ColorExtent {
                color,
                length: new_len,
            }];
            self.total_length = new_len;
            return;
        }
        if new_len == 0 {
            let color = self.dominant_color();
            self.extents = vec![ColorExtent { color, length: 0 }];
            self.total_length = 0;
            return;
        }

        let mut rescaled = Vec::with_capacity(self.extents.len());
        let mut travelled: i128 = 0;
        let mut prev_end: i128 = 0;
        for e in &self.extents {
            travelled += e.length as i128;
            let new_end = travelled * new_len as i128 / old_len as i128;
            let length = (new_end - prev_end) as Coord;
            prev_end = new_end;
            if length > 0 {
                rescaled.push(ColorExtent {
                    color: e.color,
                    length,
                });
            }
        }
        debug_assert_eq!(travelled, old_len as i128);
        debug_assert_eq!(prev_end, new_len as i128);
        self.extents = rescaled;
        self.total_length = new_len;
    }

    /// Move the first `distance` of this list onto the end of `other`.
    ///
    /// A run straddling the cut is divided; a cut on a run boundary divides
    /// nothing.
    pub fn transfer_front(&mut self, distance: Coord, other: &mut ColorExtents) {
        assert!(
            (0..=self.total_length).contains(&distance),
            "transfer of {distance} from color extents of length {}",
            self.total_length
        );
        assert_eq!(self.axis, other.axis, "transfer between mismatched axes");

        let mut whole = 0;
        let mut moved: Coord = 0;
        while whole < self.extents.len()
            && moved < distance
            && moved + self.extents[whole].length <= distance
        {
            moved += self.extents[whole].length;
            whole += 1;
        }
        other.extents.extend(self.extents.drain(..whole));
        let remainder = distance - moved;
        if remainder > 0 {
            let first = &mut self.extents[0];
            other.extents.push(ColorExtent {
                color: first.color,
                length: remainder,
            });
            first.length -= remainder;
        }
        self.total_length -= distance;
        other.total_length += distance;
    }

    /// Move every run of `other` onto the end of this list, leaving `other` empty.
    pub fn append(&mut self, other: &mut ColorExtents) {
        assert_eq!(self.axis, other.axis, "append of mismatched axes");
        self.extents.append(&mut other.extents);
        self.total_length += std::mem::take(&mut other.total_length);
    }

    /// Move every run of `other` onto the front of this list, leaving `other` empty.
    pub fn prepend(&mut self, other: &mut ColorExtents) {
        assert_eq!(self.axis, other.axis, "prepend of mismatched axes");
        let mut front = std::mem::take(&mut other.extents);
        front.append(&mut self.extents);
        self.extents = front;
        self.total_length += std::mem::take(&mut other.total_length);
    }

    /// Splice runs onto the end of this list.
    pub fn extend<I>(&mut self, runs: I)
    where
        I: IntoIterator<Item = ColorExtent>,
    {
        for run in runs {
            self.push(run.color, run.length);
        }
    }

    /// Color of the longest run; the earliest wins ties.
    fn dominant_color(&self) -> ColorId {
        let mut best = self.extents[0];
        for e in &self.extents[1..] {
            if e.length > best.length {
                best = *e;
            }
        }
        best.color
    }
}

impl<'a> IntoIterator for &'a ColorExtents {
    type Item = &'a ColorExtent;
    type IntoIter = std::slice::Iter<'a, ColorExtent>;

    fn into_iter(self) -> Self::IntoIter {
        self.extents.iter()
    }
}

impl fmt::Display for ColorExtents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColorExtents[{:?}, {}:", self.axis, self.total_length)?;
        for e in &self.extents {
            write!(f, " {}@{}", e.length, e.color.index())?;
        }
        write!(f, "]")
    }
}
