//! Clipper-style polygon operations on metadata-carrying paths.
//!
//! Every vertex is a [`ZPoint`]: integer coordinates plus one spare `i64`
//! field the kernel treats as opaque. By convention the `z` of vertex `k`
//! describes the directed edge that ends at `k`.
//!
//! Boolean operations run on geo's `BooleanOps`; offsetting is done here in
//! the ClipperOffset manner. Whenever a vertex is synthesized, truncated,
//! cloned or reversed, the kernel calls back into a [`ZCallbacks`]
//! implementation so the caller can keep its metadata consistent. The
//! default callbacks copy `z` verbatim, which is all [`CopyZ`] does.
//!
//! Conventions:
//! - outer rings are counter-clockwise, holes clockwise;
//! - boolean results use the non-zero fill rule;
//! - offsets are cleaned with a positive-winding union.

mod edge_grid;
mod offset;
mod reattach;

pub use reattach::SNAP_TOLERANCE;

use crate::geometry::{signed_area, Point};
use crate::{Coord, CoordF};
use geo::{BooleanOps, Coord as GeoCoord, LineString, MultiPolygon, OpType, Polygon as GeoPolygon};
use geo::algorithm::bool_ops::FillRule;
use reattach::SourceIndex;

/// A polygon vertex with a metadata field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ZPoint {
    pub x: Coord,
    pub y: Coord,
    pub z: i64,
}

impl ZPoint {
    #[inline]
    pub const fn new(x: Coord, y: Coord, z: i64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn at(point: Point, z: i64) -> Self {
        Self {
            x: point.x,
            y: point.y,
            z,
        }
    }

    #[inline]
    pub const fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

pub type ZPath = Vec<ZPoint>;
pub type ZPaths = Vec<ZPath>;

/// One connected part of a boolean result: an outer ring and its holes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZExPolygon {
    pub contour: ZPath,
    pub holes: ZPaths,
}

pub type ZExPolygons = Vec<ZExPolygon>;

impl ZExPolygon {
    pub fn new(contour: ZPath) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    /// Contour first, then holes.
    pub fn rings(&self) -> impl Iterator<Item = &ZPath> {
        std::iter::once(&self.contour).chain(self.holes.iter())
    }

    pub fn rings_mut(&mut self) -> impl Iterator<Item = &mut ZPath> {
        std::iter::once(&mut self.contour).chain(self.holes.iter_mut())
    }

    pub fn into_paths(self) -> ZPaths {
        let mut paths = Vec::with_capacity(1 + self.holes.len());
        paths.push(self.contour);
        paths.extend(self.holes);
        paths
    }

    /// Enclosed area in scaled units squared.
    pub fn area(&self) -> CoordF {
        path_area(&self.contour).abs() - self.holes.iter().map(|h| path_area(h).abs()).sum::<CoordF>()
    }
}

/// Signed area of a ring, positive when counter-clockwise.
pub fn path_area(path: &[ZPoint]) -> CoordF {
    signed_area(path.iter().map(ZPoint::point))
}

/// Flatten parts into a plain path list.
pub fn flatten(parts: ZExPolygons) -> ZPaths {
    parts.into_iter().flat_map(ZExPolygon::into_paths).collect()
}

/// How an offset vertex was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetStep {
    /// Shifted along a straight run of edges
    Parallel,
    /// Miter, square or fold-over point synthesized at a corner
    Corner,
}

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OffsetJoinType {
    /// Square corners
    Square,
    /// Mitered corners, squared off beyond the limit (in multiples of delta)
    Miter(CoordF),
}

impl Default for OffsetJoinType {
    fn default() -> Self {
        OffsetJoinType::Miter(2.0)
    }
}

/// Metadata callbacks invoked by the kernel.
///
/// `z` values are opaque to the kernel. Implementations that own data behind
/// a `z` must make `clone_z` hand out an independent copy, since the kernel
/// may mutate clones separately through `reverse_z` and `strip_begin`.
pub trait ZCallbacks {
    /// A vertex was synthesized on input edges.
    ///
    /// `prev` carries the edge the output boundary arrives along, `next` the
    /// edge it leaves along. Both may be the same vertex.
    fn edge_midpoint(&mut self, prev: &ZPoint, next: &ZPoint, pt: &mut ZPoint) {
        let _ = next;
        pt.z = prev.z;
    }

    /// An offset vertex was produced from `source`.
    ///
    /// The incoming edge's handle is the one stored on `source`.
    fn offset_step(&mut self, source: &ZPoint, pt: &mut ZPoint, step: OffsetStep) {
        let _ = step;
        pt.z = source.z;
    }

    /// A raw offset ring is complete.
    fn finish_offset(&mut self, path: &mut [ZPoint]) {
        let _ = path;
    }

    /// Produce an independent copy of a handle.
    fn clone_z(&mut self, z: i64) -> i64 {
        z
    }

    /// The edge a handle describes now runs the other way.
    fn reverse_z(&mut self, z: i64) {
        let _ = z;
    }

    /// The edge `from`-`to` described by `z` was cut at `cut`.
    ///
    /// `z` keeps the part from `cut` to `to`; the returned handle describes
    /// the part from `from` to `cut`.
    fn strip_begin(&mut self, z: i64, from: Point, to: Point, cut: Point) -> i64 {
        let _ = (from, to, cut);
        z
    }
}

/// Callbacks that copy `z` verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyZ;

impl ZCallbacks for CopyZ {}

// ============================================================================
// Conversion
// ============================================================================

/// Drop consecutive duplicates and the closing point.
pub(crate) fn clean_ring(path: &[ZPoint]) -> ZPath {
    let mut ring: ZPath = path.to_vec();
    ring.dedup_by(|b, a| a.point() == b.point());
    while ring.len() > 1 && ring[0].point() == ring[ring.len() - 1].point() {
        ring.pop();
    }
    ring
}

fn ring_to_geo(path: &[ZPoint]) -> LineString<f64> {
    let mut coords: Vec<GeoCoord<f64>> = path
        .iter()
        .map(|p| GeoCoord {
            x: p.x as f64,
            y: p.y as f64,
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

fn paths_to_geo(paths: &[ZPath]) -> MultiPolygon<f64> {
    MultiPolygon::new(
        paths
            .iter()
            .map(|p| GeoPolygon::new(ring_to_geo(p), vec![]))
            .collect(),
    )
}

fn ring_from_geo(ring: &LineString<f64>) -> Vec<Point> {
    let mut points: Vec<Point> = ring
        .coords()
        .map(|c| Point::new(c.x.round() as Coord, c.y.round() as Coord))
        .collect();
    points.dedup();
    while points.len() > 1 && points[0] == points[points.len() - 1] {
        points.pop();
    }
    points
}

fn from_geo<H>(result: &MultiPolygon<f64>, index: &SourceIndex<'_>, hooks: &mut H) -> ZExPolygons
where
    H: ZCallbacks + ?Sized,
{
    let mut parts = Vec::with_capacity(result.0.len());
    for poly in &result.0 {
        let contour = ring_from_geo(poly.exterior());
        if contour.len() < 3 {
            continue;
        }
        let contour = index.restore(contour, hooks);
        let holes = poly
            .interiors()
            .iter()
            .map(ring_from_geo)
            .filter(|h| h.len() >= 3)
            .map(|h| index.restore(h, hooks))
            .collect();
        parts.push(ZExPolygon { contour, holes });
    }
    parts
}

/// Convert parts to geo polygons, in scaled units.
pub fn to_geo(parts: &[ZExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(
        parts
            .iter()
            .map(|part| {
                GeoPolygon::new(
                    ring_to_geo(&part.contour),
                    part.holes.iter().map(|h| ring_to_geo(h)).collect(),
                )
            })
            .collect(),
    )
}

// ============================================================================
// Boolean Operations
// ============================================================================

fn boolean<H>(subject: &[ZPath], clip: &[ZPath], op: OpType, fill_rule: FillRule, hooks: &mut H) -> ZExPolygons
where
    H: ZCallbacks + ?Sized,
{
    let subject: ZPaths = subject
        .iter()
        .map(|p| clean_ring(p))
        .filter(|p| p.len() >= 3)
        .collect();
    let clip: ZPaths = clip
        .iter()
        .map(|p| clean_ring(p))
        .filter(|p| p.len() >= 3)
        .collect();

    let result = paths_to_geo(&subject).boolean_op_with_fill_rule(&paths_to_geo(&clip), op, fill_rule);
    let index = SourceIndex::new(subject.iter().chain(clip.iter()));
    let parts = from_geo(&result, &index, hooks);
    log::trace!(
        "{:?}: {} subject + {} clip rings -> {} parts",
        op,
        subject.len(),
        clip.len(),
        parts.len()
    );
    parts
}

/// Compute the union of two sets of paths.
pub fn union<H>(subject: &[ZPath], clip: &[ZPath], hooks: &mut H) -> ZExPolygons
where
    H: ZCallbacks + ?Sized,
{
    boolean(subject, clip, OpType::Union, FillRule::NonZero, hooks)
}

/// Compute the intersection of two sets of paths.
pub fn intersection<H>(subject: &[ZPath], clip: &[ZPath], hooks: &mut H) -> ZExPolygons
where
    H: ZCallbacks + ?Sized,
{
    boolean(subject, clip, OpType::Intersection, FillRule::NonZero, hooks)
}

/// Compute the difference of two sets of paths (subject - clip).
pub fn difference<H>(subject: &[ZPath], clip: &[ZPath], hooks: &mut H) -> ZExPolygons
where
    H: ZCallbacks + ?Sized,
{
    boolean(subject, clip, OpType::Difference, FillRule::NonZero, hooks)
}

/// Split a path set into its connected parts.
pub fn split_into_parts<H>(paths: &[ZPath], hooks: &mut H) -> ZExPolygons
where
    H: ZCallbacks + ?Sized,
{
    union(paths, &[], hooks)
}

// ============================================================================
// Offset Operations
// ============================================================================

/// Offset closed paths by `delta` scaled units, grouped into parts.
///
/// Positive delta inflates (grows) the polygons, negative delta deflates (shrinks) them.
pub fn offset_ex<H>(paths: &[ZPath], delta: Coord, join_type: OffsetJoinType, hooks: &mut H) -> ZExPolygons
where
    H: ZCallbacks + ?Sized,
{
    let mut raw: ZPaths = Vec::with_capacity(paths.len());
    for path in paths {
        let path = clean_ring(path);
        if path.len() < 3 {
            continue;
        }
        let mut ring = offset::offset_ring(&path, delta as CoordF, join_type, hooks);
        if ring.len() < 3 {
            continue;
        }
        hooks.finish_offset(&mut ring);
        raw.push(ring);
    }

    let result = paths_to_geo(&raw).boolean_op_with_fill_rule(
        &MultiPolygon::<f64>::new(vec![]),
        OpType::Union,
        FillRule::Positive,
    );
    let index = SourceIndex::new(raw.iter());
    let parts = from_geo(&result, &index, hooks);
    log::trace!(
        "offset by {}: {} rings -> {} parts",
        delta,
        raw.len(),
        parts.len()
    );
    parts
}

/// Offset closed paths by `delta` scaled units.
pub fn offset<H>(paths: &[ZPath], delta: Coord, join_type: OffsetJoinType, hooks: &mut H) -> ZPaths
where
    H: ZCallbacks + ?Sized,
{
    flatten(offset_ex(paths, delta, join_type, hooks))
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Reverse a closed path in place.
///
/// Each handle moves to the vertex that ends its edge after reversal and is
/// passed through [`ZCallbacks::reverse_z`].
pub fn reverse_path<H>(path: &mut ZPath, hooks: &mut H)
where
    H: ZCallbacks + ?Sized,
{
    let n = path.len();
    if n == 0 {
        return;
    }
    let zs: Vec<i64> = path.iter().map(|p| p.z).collect();
    path.reverse();
    for (i, p) in path.iter_mut().enumerate() {
        let z = zs[(n - i) % n];
        hooks.reverse_z(z);
        p.z = z;
    }
}

/// Set every vertex field of a path set.
pub fn fill_z(paths: &mut [ZPath], z: i64) {
    for p in paths.iter_mut().flat_map(|path| path.iter_mut()) {
        p.z = z;
    }
}

/// Total enclosed area of a set of parts, in scaled units squared.
pub fn total_area(parts: &[ZExPolygon]) -> CoordF {
    parts.iter().map(ZExPolygon::area).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale;
    use std::collections::HashMap;

    fn path(points: &[(Coord, Coord, i64)]) -> ZPath {
        points.iter().map(|&(x, y, z)| ZPoint::new(x, y, z)).collect()
    }

    fn make_square(x: Coord, y: Coord, size: Coord, z: i64) -> ZPath {
        path(&[
            (x, y, z),
            (x + size, y, z),
            (x + size, y + size, z),
            (x, y + size, z),
        ])
    }

    fn z_by_point(parts: &[ZExPolygon]) -> HashMap<(Coord, Coord), i64> {
        parts
            .iter()
            .flat_map(|p| p.rings())
            .flat_map(|r| r.iter())
            .map(|p| ((p.x, p.y), p.z))
            .collect()
    }

    #[derive(Default)]
    struct Recorder {
        strips: usize,
        reversals: usize,
        midpoints: usize,
    }

    impl ZCallbacks for Recorder {
        fn edge_midpoint(&mut self, prev: &ZPoint, _next: &ZPoint, pt: &mut ZPoint) {
            self.midpoints += 1;
            pt.z = prev.z;
        }

        fn reverse_z(&mut self, _z: i64) {
            self.reversals += 1;
        }

        fn strip_begin(&mut self, z: i64, _from: Point, _to: Point, _cut: Point) -> i64 {
            self.strips += 1;
            z
        }
    }

    #[test]
    fn test_union_two_triangles_seam() {
        let p0 = path(&[(0, 0, 10), (4000, 0, 11), (2000, 2000, 12)]);
        let p1 = path(&[(2000, 0, 13), (6000, 0, 14), (4000, 2000, 15)]);

        let result = union(&[p0], &[p1], &mut CopyZ);
        assert_eq!(result.len(), 1);
        assert!(result[0].holes.is_empty());

        let z = z_by_point(&result);
        // Seam vertex takes the edge the boundary arrives along: (4000,2000) -> (2000,0)
        assert_eq!(z[&(3000, 1000)], 13);
        assert_eq!(z[&(2000, 2000)], 12);
        assert_eq!(z[&(4000, 2000)], 15);
        assert_eq!(z[&(6000, 0)], 14);
        assert_eq!(z[&(0, 0)], 10);
        // Collinear input vertex kept on the merged bottom edge
        assert_eq!(z[&(4000, 0)], 11);
    }

    #[test]
    fn test_union_overlapping_squares_area() {
        let a = make_square(0, 0, scale(10.0), 1);
        let b = make_square(scale(5.0), 0, scale(10.0), 2);
        let result = union(&[a], &[b], &mut CopyZ);
        assert_eq!(result.len(), 1);
        let area = total_area(&result);
        assert!((area - 150.0 * 1e12).abs() < 1e6);
    }

    #[test]
    fn test_union_truncated_edges_call_strip() {
        let s = scale(10.0);
        let a = make_square(0, 0, s, 1);
        let b = path(&[
            (s / 2, s / 5, 2),
            (s + s / 2, s / 5, 2),
            (s + s / 2, 4 * s / 5, 2),
            (s / 2, 4 * s / 5, 2),
        ]);
        let mut hooks = Recorder::default();
        let result = union(&[a], &[b], &mut hooks);
        assert_eq!(result.len(), 1);
        assert!(hooks.strips >= 2);
        assert!(hooks.midpoints >= 2);
        assert_eq!(hooks.reversals % 2, 0);
    }

    #[test]
    fn test_intersection() {
        let a = make_square(0, 0, scale(10.0), 1);
        let b = make_square(scale(5.0), 0, scale(10.0), 2);
        let result = intersection(&[a], &[b], &mut CopyZ);
        assert_eq!(result.len(), 1);
        assert!((total_area(&result) - 50.0 * 1e12).abs() < 1e6);
    }

    #[test]
    fn test_difference_with_hole() {
        let outer = make_square(0, 0, scale(10.0), 1);
        let inner = make_square(scale(2.0), scale(2.0), scale(6.0), 2);
        let result = difference(&[outer], &[inner], &mut CopyZ);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1);
        assert!(path_area(&result[0].contour) > 0.0);
        assert!(path_area(&result[0].holes[0]) < 0.0);
        assert!((result[0].area() - 64.0 * 1e12).abs() < 1e6);

        // Hole vertices come from the clip square
        assert!(result[0].holes[0].iter().all(|p| p.z == 2));
    }

    #[test]
    fn test_difference_trims_reversed_extents() {
        use crate::color::{ColorCache, ColorId};
        use crate::extents::{ColorExtents, ExtentsArena};
        use crate::job::JobId;
        use crate::metadata::{ColorHooks, MetaHandle};

        let job = JobId::next();
        let mut colors = ColorCache::new(job);
        let mut arena = ExtentsArena::new(job);
        let red = colors.intern(1.0, 0.0, 0.0);
        let blue = colors.intern(0.0, 0.0, 1.0);

        // Every edge is 30% red then 70% blue along its own direction
        let mut ring = |points: &[(Coord, Coord)]| -> ZPath {
            let n = points.len();
            (0..n)
                .map(|k| {
                    let (px, py) = points[(k + n - 1) % n];
                    let (x, y) = points[k];
                    let mut list = ColorExtents::for_edge(Point::new(px, py), Point::new(x, y));
                    let len = list.axis().measure(Point::new(px, py), Point::new(x, y));
                    list.push(red, len * 3 / 10);
                    list.push(blue, len - len * 3 / 10);
                    ZPoint::new(x, y, MetaHandle::Extents(arena.insert(list)).encode())
                })
                .collect()
        };
        let square = ring(&[(0, 0), (3000, 0), (3000, 3000), (0, 3000)]);
        let notch = ring(&[(1000, -500), (2000, -500), (2000, 2000), (1000, 2000)]);

        let mut hooks = ColorHooks::new(&colors, &mut arena);
        let result = difference(&[square], &[notch], &mut hooks);
        assert_eq!(result.len(), 1);
        assert!(result[0].holes.is_empty());

        let contour = &result[0].contour;
        let n = contour.len();
        let mut runs: HashMap<((Coord, Coord), (Coord, Coord)), Vec<(ColorId, Coord)>> =
            HashMap::new();
        for i in 0..n {
            let prev = contour[(i + n - 1) % n];
            let curr = contour[i];
            let MetaHandle::Extents(id) = hooks.handle(curr.z) else {
                panic!("vertex {:?} lost its extents", curr.point());
            };
            let list = hooks.arena().get(id);
            runs.insert(
                ((prev.x, prev.y), (curr.x, curr.y)),
                list.iter().map(|e| (e.color, e.length)).collect(),
            );
        }

        // Notch edges run backwards through the result
        assert_eq!(runs[&((1000, 0), (1000, 2000))], vec![(blue, 1250), (red, 750)]);
        assert_eq!(runs[&((1000, 2000), (2000, 2000))], vec![(blue, 700), (red, 300)]);
        assert_eq!(runs[&((2000, 2000), (2000, 0))], vec![(blue, 1750), (red, 250)]);
        // Square bottom edge, cut on both sides of the notch
        assert_eq!(runs[&((0, 0), (1000, 0))], vec![(red, 900), (blue, 100)]);
        assert_eq!(runs[&((2000, 0), (3000, 0))], vec![(blue, 1000)]);
        // Untouched square edge
        assert_eq!(runs[&((3000, 0), (3000, 3000))], vec![(red, 900), (blue, 2100)]);

        assert_eq!(hooks.diagnostics().length_mismatches, 0);
    }

    #[test]
    fn test_split_into_parts_disjoint() {
        let a = make_square(0, 0, scale(1.0), 1);
        let b = make_square(scale(5.0), 0, scale(1.0), 2);
        let parts = split_into_parts(&[a, b], &mut CopyZ);
        assert_eq!(parts.len(), 2);
        let mut zs: Vec<i64> = parts.iter().map(|p| p.contour[0].z).collect();
        zs.sort();
        assert_eq!(zs, vec![1, 2]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(union(&[], &[], &mut CopyZ).is_empty());
        let degenerate = path(&[(0, 0, 1), (10, 0, 1)]);
        assert!(split_into_parts(&[degenerate], &mut CopyZ).is_empty());
    }

    #[test]
    fn test_offset_shrink_square() {
        let s = scale(10.0);
        let square = path(&[(0, 0, 1), (s, 0, 2), (s, s, 3), (0, s, 4)]);
        let result = offset(&[square], -scale(1.0), OffsetJoinType::default(), &mut CopyZ);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].len(), 4);

        let d = scale(1.0);
        let z: HashMap<(Coord, Coord), i64> = result[0].iter().map(|p| ((p.x, p.y), p.z)).collect();
        // Inner corner k arrives along the shifted edge ending at corner k
        assert_eq!(z[&(d, d)], 1);
        assert_eq!(z[&(s - d, d)], 2);
        assert_eq!(z[&(s - d, s - d)], 3);
        assert_eq!(z[&(d, s - d)], 4);
    }

    #[test]
    fn test_offset_grow_square() {
        let square = make_square(0, 0, scale(10.0), 1);
        let result = offset_ex(&[square], scale(1.0), OffsetJoinType::default(), &mut CopyZ);
        assert_eq!(result.len(), 1);
        assert!((result[0].area() - 144.0 * 1e12).abs() < 1e6);
    }

    #[test]
    fn test_offset_shrink_to_nothing() {
        let square = make_square(0, 0, scale(2.0), 1);
        let result = offset(&[square], -scale(2.0), OffsetJoinType::default(), &mut CopyZ);
        assert!(result.is_empty());
    }

    #[test]
    fn test_offset_square_with_hole() {
        let outer = make_square(0, 0, scale(10.0), 1);
        let mut hole = make_square(scale(4.0), scale(4.0), scale(2.0), 2);
        hole.reverse();
        let result = offset_ex(&[outer, hole], -scale(1.0), OffsetJoinType::default(), &mut CopyZ);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1);
        // 8x8 minus a 4x4 hole
        assert!((result[0].area() - 48.0 * 1e12).abs() < 1e6);
    }

    #[test]
    fn test_reverse_path_moves_handles() {
        let mut p = path(&[(0, 0, 1), (10, 0, 2), (10, 10, 3), (0, 10, 4)]);
        let original = p.clone();
        let mut hooks = Recorder::default();
        reverse_path(&mut p, &mut hooks);

        assert_eq!(p[0].point(), Point::new(0, 10));
        // Edge (0,10)->(0,0) was carried by (0,0); reversed it ends at (0,10)
        assert_eq!(p[0].z, 1);
        assert!(path_area(&p) < 0.0);
        assert_eq!(hooks.reversals, 4);

        reverse_path(&mut p, &mut hooks);
        assert_eq!(p, original);
    }

    #[test]
    fn test_fill_z() {
        let mut paths = vec![make_square(0, 0, 10, 1), make_square(20, 0, 10, 2)];
        fill_z(&mut paths, 7);
        assert!(paths.iter().flatten().all(|p| p.z == 7));
    }
}
