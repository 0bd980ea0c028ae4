//! Raw polygon offsetting.
//!
//! Builds the un-cleaned offset ring of a closed path the way ClipperOffset
//! does: each vertex is pushed along the unit normals of its two edges and
//! joined with a miter or square corner. Convex corners that fold over when
//! shrinking get a small reversed loop, which the positive-winding union in
//! the caller removes.
//!
//! # Algorithm
//!
//! For vertex `j` with incoming edge normal `n_k` and outgoing normal `n_j`:
//! 1. `sin_a = n_k x n_j`. Nearly collinear edges emit one shifted point.
//! 2. If `sin_a * delta < 0` the corner folds: emit `p + n_k d`, `p`, `p + n_j d`.
//! 3. Otherwise miter at `p + (n_k + n_j) * d / (1 + cos_a)` when within the
//!    miter limit, else square the corner off with two points.

use super::{OffsetJoinType, OffsetStep, ZCallbacks, ZPath, ZPoint};
use crate::geometry::{Line, PointF};
use crate::CoordF;

/// Offset one closed ring by `delta` (scaled units). Outward for a CCW ring.
pub fn offset_ring<H>(path: &[ZPoint], delta: CoordF, join: OffsetJoinType, hooks: &mut H) -> ZPath
where
    H: ZCallbacks + ?Sized,
{
    let n = path.len();
    let normals: Vec<PointF> = (0..n)
        .map(|i| Line::new(path[i].point(), path[(i + 1) % n].point()).outward_normal())
        .collect();
    let miter_threshold = match join {
        // Limits below 2 behave as 2, as in ClipperOffset
        OffsetJoinType::Miter(limit) => Some(2.0 / (limit.max(2.0) * limit.max(2.0))),
        OffsetJoinType::Square => None,
    };

    let mut out = Vec::with_capacity(n * 2);
    for j in 0..n {
        let k = (j + n - 1) % n;
        let src = &path[j];
        let p = src.point().to_f64();
        let (nk, nj) = (normals[k], normals[j]);
        let cos_a = nk.dot(&nj);
        let sin_a = nk.cross(&nj).clamp(-1.0, 1.0);

        let mut emit = |pt: PointF, step: OffsetStep, out: &mut ZPath| {
            let mut z_pt = ZPoint::at(pt.round(), 0);
            hooks.offset_step(src, &mut z_pt, step);
            out.push(z_pt);
        };

        if (sin_a * delta).abs() < 1.0 && cos_a > 0.0 {
            emit(p + nk * delta, OffsetStep::Parallel, &mut out);
            continue;
        }
        if sin_a * delta < 0.0 {
            emit(p + nk * delta, OffsetStep::Corner, &mut out);
            emit(p, OffsetStep::Corner, &mut out);
            emit(p + nj * delta, OffsetStep::Corner, &mut out);
            continue;
        }
        let r = 1.0 + cos_a;
        match miter_threshold {
            Some(threshold) if r >= threshold => {
                emit(p + (nk + nj) * (delta / r), OffsetStep::Corner, &mut out);
            }
            _ => {
                let dx = (sin_a.atan2(cos_a) / 4.0).tan();
                let a = PointF::new(nk.x - nk.y * dx, nk.y + nk.x * dx);
                let b = PointF::new(nj.x + nj.y * dx, nj.y - nj.x * dx);
                emit(p + a * delta, OffsetStep::Corner, &mut out);
                emit(p + b * delta, OffsetStep::Corner, &mut out);
            }
        }
    }
    out.dedup_by(|b, a| a.point() == b.point());
    if out.len() > 1 && out[0].point() == out[out.len() - 1].point() {
        out.pop();
    }
    out
}
