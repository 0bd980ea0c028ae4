//! Restoring vertex metadata after a boolean pass.
//!
//! The boolean engine works on bare coordinates, so every output ring comes
//! back without its `z` values. [`SourceIndex`] remembers the input rings and
//! matches each output vertex to the input geometry it came from:
//!
//! - a vertex that coincides with an input vertex takes that vertex's handle,
//!   trimmed when the output edge only covers part of the input edge;
//! - a vertex synthesized on input edges goes through
//!   [`ZCallbacks::edge_midpoint`], with the edge the output arrives along as
//!   `prev` and the edge it leaves along as `next`.
//!
//! Input edges are indexed by their end vertex, since that vertex carries the
//! edge's handle, and bucketed in an [`EdgeGrid`] so each lookup only tests
//! nearby edges.

use super::edge_grid::EdgeGrid;
use super::{ZCallbacks, ZPath, ZPoint};
use crate::geometry::{Line, Point};
use crate::CoordF;
use std::collections::HashMap;

/// Distance (scaled units) within which output geometry matches input geometry.
pub const SNAP_TOLERANCE: CoordF = 2.0;

#[derive(Debug, Clone, Copy)]
struct SourceEdge {
    ring: usize,
    end: usize,
    line: Line,
}

/// The input edge an output edge runs along.
#[derive(Debug, Clone, Copy)]
struct Carrier {
    edge: SourceEdge,
    reversed: bool,
}

impl Carrier {
    /// Start and end of the input edge in output traversal order.
    fn span(&self) -> (Point, Point) {
        if self.reversed {
            (self.edge.line.b, self.edge.line.a)
        } else {
            (self.edge.line.a, self.edge.line.b)
        }
    }
}

/// Input rings of one kernel call, indexed for metadata lookup.
pub struct SourceIndex<'a> {
    rings: Vec<&'a [ZPoint]>,
    edges: Vec<SourceEdge>,
    grid: EdgeGrid,
    vertices: HashMap<Point, Vec<(usize, usize)>>,
}

impl<'a> SourceIndex<'a> {
    /// Index rings in input order: subject rings first, then clip rings.
    pub fn new<I>(rings: I) -> Self
    where
        I: IntoIterator<Item = &'a ZPath>,
    {
        let rings: Vec<&[ZPoint]> = rings.into_iter().map(|r| r.as_slice()).collect();
        let mut edges = Vec::new();
        let mut vertices: HashMap<Point, Vec<(usize, usize)>> = HashMap::new();
        for (r, ring) in rings.iter().enumerate() {
            let n = ring.len();
            for (k, v) in ring.iter().enumerate() {
                let prev = ring[(k + n - 1) % n].point();
                if prev != v.point() {
                    edges.push(SourceEdge {
                        ring: r,
                        end: k,
                        line: Line::new(prev, v.point()),
                    });
                }
                vertices.entry(v.point()).or_default().push((r, k));
            }
        }
        let lines: Vec<Line> = edges.iter().map(|e| e.line).collect();
        let grid = EdgeGrid::new(&lines, SNAP_TOLERANCE + 1.0);
        Self {
            rings,
            edges,
            grid,
            vertices,
        }
    }

    fn vertex(&self, ring: usize, index: usize) -> &ZPoint {
        let r = self.rings[ring];
        &r[index % r.len()]
    }

    fn carrier_vertex(&self, carrier: &Carrier) -> &ZPoint {
        self.vertex(carrier.edge.ring, carrier.edge.end)
    }

    fn incoming_edge(&self, ring: usize, index: usize) -> SourceEdge {
        let r = self.rings[ring];
        let n = r.len();
        let end = index % n;
        SourceEdge {
            ring,
            end,
            line: Line::new(r[(end + n - 1) % n].point(), r[end].point()),
        }
    }

    /// Rebuild the metadata of one output ring.
    pub fn restore<H>(&self, ring: Vec<Point>, hooks: &mut H) -> ZPath
    where
        H: ZCallbacks + ?Sized,
    {
        let ring = self.reinsert_collinear(ring);
        let n = ring.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let q = ring[(i + n - 1) % n];
            let p = ring[i];
            let s = ring[(i + 1) % n];
            let z = self.attach(q, p, s, hooks);
            out.push(ZPoint::at(p, z));
        }
        out
    }

    fn attach<H>(&self, q: Point, p: Point, s: Point, hooks: &mut H) -> i64
    where
        H: ZCallbacks + ?Sized,
    {
        if let Some(hits) = self.vertices.get(&p) {
            return self.attach_to_vertex(hits, q, p, hooks);
        }

        let containing: Vec<SourceEdge> = self
            .grid
            .near_point(p)
            .iter()
            .map(|&i| self.edges[i])
            .filter(|e| e.line.contains_point(&p, SNAP_TOLERANCE))
            .collect();

        if containing.is_empty() {
            let Some(nearest) = self.nearest_edge(&p) else {
                return 0;
            };
            log::trace!("vertex {:?} lies on no input edge, using nearest", p);
            let carrier = self.vertex(nearest.ring, nearest.end);
            let mut pt = ZPoint::at(p, 0);
            hooks.edge_midpoint(carrier, carrier, &mut pt);
            return pt.z;
        }

        let arriving = Self::find_carrier(&containing, q, p);
        let leaving = Self::find_carrier(&containing, p, s);
        let first = arriving.unwrap_or(Carrier {
            edge: containing[0],
            reversed: false,
        });
        let second = leaving.unwrap_or(match containing.get(1) {
            Some(&edge) => Carrier {
                edge,
                reversed: false,
            },
            None => first,
        });

        let mut pt = ZPoint::at(p, 0);
        hooks.edge_midpoint(self.carrier_vertex(&first), self.carrier_vertex(&second), &mut pt);
        match arriving {
            Some(carrier) => self.trim(pt.z, &carrier, q, p, hooks),
            None => pt.z,
        }
    }

    fn attach_to_vertex<H>(&self, hits: &[(usize, usize)], q: Point, p: Point, hooks: &mut H) -> i64
    where
        H: ZCallbacks + ?Sized,
    {
        // Incoming edge traversed forwards
        for &(r, k) in hits {
            let edge = self.incoming_edge(r, k);
            if Self::runs_along(&edge.line, q, p) {
                let carrier = Carrier {
                    edge,
                    reversed: false,
                };
                let z = hooks.clone_z(self.carrier_vertex(&carrier).z);
                return self.trim(z, &carrier, q, p, hooks);
            }
        }
        // Outgoing edge traversed backwards
        for &(r, k) in hits {
            let edge = self.incoming_edge(r, k + 1);
            if Self::runs_along(&edge.line.reverse(), q, p) {
                let carrier = Carrier {
                    edge,
                    reversed: true,
                };
                let z = hooks.clone_z(self.carrier_vertex(&carrier).z);
                return self.trim(z, &carrier, q, p, hooks);
            }
        }
        let (r, k) = hits[0];
        hooks.clone_z(self.vertex(r, k).z)
    }

    /// Cut a cloned handle down to the part of the carrier edge the output covers.
    fn trim<H>(&self, z: i64, carrier: &Carrier, q: Point, p: Point, hooks: &mut H) -> i64
    where
        H: ZCallbacks + ?Sized,
    {
        let (start, end) = carrier.span();
        if carrier.reversed {
            hooks.reverse_z(z);
        }
        if !p.coincides_with(&end, SNAP_TOLERANCE) {
            hooks.reverse_z(z);
            hooks.strip_begin(z, end, start, p);
            hooks.reverse_z(z);
        }
        if !q.coincides_with(&start, SNAP_TOLERANCE) {
            hooks.strip_begin(z, start, p, q);
        }
        z
    }

    /// An edge the output runs along from `from` to `to`, preferring forward traversal.
    fn find_carrier(edges: &[SourceEdge], from: Point, to: Point) -> Option<Carrier> {
        if from == to {
            return None;
        }
        let forward = edges
            .iter()
            .find(|e| Self::runs_along(&e.line, from, to))
            .map(|&edge| Carrier {
                edge,
                reversed: false,
            });
        forward.or_else(|| {
            edges
                .iter()
                .find(|e| Self::runs_along(&e.line.reverse(), from, to))
                .map(|&edge| Carrier {
                    edge,
                    reversed: true,
                })
        })
    }

    fn runs_along(line: &Line, from: Point, to: Point) -> bool {
        from != to
            && line.contains_point(&from, SNAP_TOLERANCE)
            && line.contains_point(&to, SNAP_TOLERANCE)
            && line.same_direction(&from, &to)
    }

    fn nearest_edge(&self, p: &Point) -> Option<SourceEdge> {
        self.grid
            .nearest(*p, |i| self.edges[i].line.distance_to_point(p))
            .map(|i| self.edges[i])
    }

    /// Put back input vertices the boolean engine merged away as collinear.
    ///
    /// A vertex is restored when it lies strictly inside an output edge and its
    /// own incoming edge runs along that output edge.
    fn reinsert_collinear(&self, ring: Vec<Point>) -> Vec<Point> {
        let n = ring.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let q = ring[(i + n - 1) % n];
            let p = ring[i];
            let segment = Line::new(q, p);
            let mut extra: Vec<(i128, Point)> = Vec::new();
            for edge in self.grid.near_segment(&segment).into_iter().map(|i| &self.edges[i]) {
                let u = edge.line.b;
                if u.coincides_with(&q, SNAP_TOLERANCE)
                    || u.coincides_with(&p, SNAP_TOLERANCE)
                    || !segment.contains_point(&u, SNAP_TOLERANCE)
                {
                    continue;
                }
                let u_prev = edge.line.a;
                if segment.distance_to_point_infinite(&u_prev) <= SNAP_TOLERANCE
                    && segment.same_direction(&u_prev, &u)
                {
                    extra.push((q.distance_squared(&u), u));
                }
            }
            extra.sort();
            extra.dedup_by_key(|(_, u)| *u);
            out.extend(extra.into_iter().map(|(_, u)| u));
            out.push(p);
        }
        out
    }
}
