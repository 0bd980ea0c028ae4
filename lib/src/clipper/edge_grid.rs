//! Uniform grid over a set of segments.
//!
//! Every segment is registered in each cell it passes within `padding` of,
//! so a point query only has to look at one cell and a segment query only at
//! the cells the segment crosses. Cells are stored sparsely.

use crate::geometry::{Line, Point};
use crate::CoordF;
use std::collections::HashMap;

/// Smallest cell edge, in scaled units.
const MIN_CELL: CoordF = 64.0;

type Cell = (i64, i64);

pub(crate) struct EdgeGrid {
    cell: CoordF,
    padding: CoordF,
    cells: HashMap<Cell, Vec<usize>>,
    // Occupied cell range, inclusive
    min: Cell,
    max: Cell,
}

impl EdgeGrid {
    /// Index `lines` by position. Indices returned by queries refer to this slice.
    pub fn new(lines: &[Line], padding: CoordF) -> Self {
        let total: CoordF = lines.iter().map(Line::length).sum();
        let mean = if lines.is_empty() {
            0.0
        } else {
            total / lines.len() as CoordF
        };
        let mut grid = Self {
            cell: mean.max(MIN_CELL).max(4.0 * padding),
            padding,
            cells: HashMap::new(),
            min: (i64::MAX, i64::MAX),
            max: (i64::MIN, i64::MIN),
        };
        for (i, line) in lines.iter().enumerate() {
            grid.for_each_cell(line, |cells, key| cells.entry(key).or_default().push(i));
        }
        for &(cx, cy) in grid.cells.keys() {
            grid.min = (grid.min.0.min(cx), grid.min.1.min(cy));
            grid.max = (grid.max.0.max(cx), grid.max.1.max(cy));
        }
        log::trace!(
            "edge grid: {} lines in {} cells of {:.0}",
            lines.len(),
            grid.cells.len(),
            grid.cell
        );
        grid
    }

    #[inline]
    fn cell_of(&self, x: CoordF) -> i64 {
        (x / self.cell).floor() as i64
    }

    /// Visit every cell within `padding` of the segment, column by column.
    fn for_each_cell<F>(&mut self, line: &Line, mut visit: F)
    where
        F: FnMut(&mut HashMap<Cell, Vec<usize>>, Cell),
    {
        let (a, b) = if line.a.x <= line.b.x {
            (line.a, line.b)
        } else {
            (line.b, line.a)
        };
        let pad = self.padding;
        let cx0 = self.cell_of(a.x as CoordF - pad);
        let cx1 = self.cell_of(b.x as CoordF + pad);
        for cx in cx0..=cx1 {
            let (ylo, yhi) = self.column_span(a, b, cx);
            for cy in self.cell_of(ylo - pad)..=self.cell_of(yhi + pad) {
                visit(&mut self.cells, (cx, cy));
            }
        }
    }

    /// Y range of segment `a`-`b` (with `a.x <= b.x`) over the padded column `cx`.
    fn column_span(&self, a: Point, b: Point, cx: i64) -> (CoordF, CoordF) {
        let (ax, ay, bx, by) = (a.x as CoordF, a.y as CoordF, b.x as CoordF, b.y as CoordF);
        if bx - ax <= 0.0 {
            return (ay.min(by), ay.max(by));
        }
        let x0 = (cx as CoordF * self.cell - self.padding).max(ax);
        let x1 = ((cx + 1) as CoordF * self.cell + self.padding).min(bx);
        let y_at = |x: CoordF| ay + (by - ay) * ((x - ax) / (bx - ax));
        let (y0, y1) = (y_at(x0), y_at(x1));
        (y0.min(y1), y0.max(y1))
    }

    /// Lines that may pass within `padding` of `p`, in index order.
    pub fn near_point(&self, p: Point) -> &[usize] {
        let key = (self.cell_of(p.x as CoordF), self.cell_of(p.y as CoordF));
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lines that may pass within `padding` of the segment, in index order.
    pub fn near_segment(&self, line: &Line) -> Vec<usize> {
        let mut found = Vec::new();
        let (a, b) = if line.a.x <= line.b.x {
            (line.a, line.b)
        } else {
            (line.b, line.a)
        };
        let pad = self.padding;
        for cx in self.cell_of(a.x as CoordF - pad)..=self.cell_of(b.x as CoordF + pad) {
            if cx < self.min.0 || cx > self.max.0 {
                continue;
            }
            let (ylo, yhi) = self.column_span(a, b, cx);
            let cy0 = self.cell_of(ylo - pad).max(self.min.1);
            let cy1 = self.cell_of(yhi + pad).min(self.max.1);
            for cy in cy0..=cy1 {
                if let Some(ids) = self.cells.get(&(cx, cy)) {
                    found.extend_from_slice(ids);
                }
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Index of the line closest to `p`, searching outwards ring by ring.
    ///
    /// Ties go to the lowest index.
    pub fn nearest<F>(&self, p: Point, distance: F) -> Option<usize>
    where
        F: Fn(usize) -> CoordF,
    {
        if self.cells.is_empty() {
            return None;
        }
        let (px, py) = (self.cell_of(p.x as CoordF), self.cell_of(p.y as CoordF));
        let reach = (px - self.min.0)
            .abs()
            .max((self.max.0 - px).abs())
            .max((py - self.min.1).abs())
            .max((self.max.1 - py).abs());

        let mut best: Option<(CoordF, usize)> = None;
        for r in 0..=reach {
            for (cx, cy) in ring_cells(px, py, r) {
                let Some(ids) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for &i in ids {
                    let d = distance(i);
                    let better = match best {
                        None => true,
                        Some((bd, bi)) => d < bd || (d == bd && i < bi),
                    };
                    if better {
                        best = Some((d, i));
                    }
                }
            }
            // Cells beyond ring r are at least r cells away from p's cell
            if let Some((d, _)) = best {
                if d <= r as CoordF * self.cell {
                    break;
                }
            }
        }
        best.map(|(_, i)| i)
    }
}

/// Cells at Chebyshev distance exactly `r` from `(cx, cy)`.
fn ring_cells(cx: i64, cy: i64, r: i64) -> impl Iterator<Item = Cell> {
    let side = (-r..=r).flat_map(move |d| {
        let horizontal = [(cx + d, cy - r), (cx + d, cy + r)];
        let vertical = [(cx - r, cy + d), (cx + r, cy + d)];
        // Corners appear in both lists; keep them in the horizontal one
        let inner = d != -r && d != r;
        horizontal
            .into_iter()
            .chain(vertical.into_iter().filter(move |_| inner))
    });
    let centre = std::iter::once((cx, cy)).filter(move |_| r == 0);
    centre.chain(side.filter(move |_| r > 0))
}
