//! Vertex metadata handles and the color hook adapter.
//!
//! The kernel carries one `i64` per vertex. Inside the crate that field is
//! always a [`MetaHandle`]; encoding and decoding happen only here.
//!
//! Layout of an encoded handle:
//!
//! ```text
//!  63 | 62 ....... 31 | 30 ...... 2 | 1 0
//!   0 |     index     |    job      | tag     tag: 0 none, 1 color, 2 extents
//! ```
//!
//! [`ColorHooks`] implements the kernel callbacks for color tracking. A
//! color handle is immutable and shared freely; an extents handle is owned
//! by exactly one vertex, so every copy the kernel makes is a deep clone.

use crate::clipper::{OffsetStep, ZCallbacks, ZPoint};
use crate::color::{ColorCache, ColorId};
use crate::extents::{ExtentsArena, ExtentsId};
use crate::geometry::Point;
use crate::job::{JobId, JOB_BITS, JOB_MASK};
use std::fmt;
use std::ops::AddAssign;

const TAG_BITS: u32 = 2;
const TAG_MASK: i64 = (1 << TAG_BITS) - 1;
const TAG_COLOR: i64 = 1;
const TAG_EXTENTS: i64 = 2;
const INDEX_SHIFT: u32 = TAG_BITS + JOB_BITS;

/// Typed view of a vertex metadata field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MetaHandle {
    #[default]
    None,
    Color(ColorId),
    Extents(ExtentsId),
}

impl MetaHandle {
    /// Pack into the kernel's vertex field.
    pub fn encode(self) -> i64 {
        match self {
            MetaHandle::None => 0,
            MetaHandle::Color(id) => pack(TAG_COLOR, id.job(), id.index()),
            MetaHandle::Extents(id) => pack(TAG_EXTENTS, id.job(), id.index()),
        }
    }

    /// Unpack a vertex field.
    ///
    /// # Panics
    ///
    /// Panics on an unknown tag; such a value was never produced by `encode`.
    pub fn decode(z: i64) -> MetaHandle {
        if z == 0 {
            return MetaHandle::None;
        }
        assert!(z > 0, "corrupt vertex handle {z:#x}");
        let job = JobId::from_raw(((z >> TAG_BITS) as u32) & JOB_MASK);
        let index = (z >> INDEX_SHIFT) as u32;
        match z & TAG_MASK {
            TAG_COLOR => MetaHandle::Color(ColorId::from_parts(job, index)),
            TAG_EXTENTS => MetaHandle::Extents(ExtentsId::from_parts(job, index)),
            tag => panic!("corrupt vertex handle {z:#x} (tag {tag})"),
        }
    }

    /// Unpack a vertex field that must belong to `job`.
    ///
    /// # Panics
    ///
    /// Panics when the handle was issued by another job.
    pub fn decode_for(z: i64, job: JobId) -> MetaHandle {
        let handle = Self::decode(z);
        if let Some(owner) = handle.job() {
            assert_eq!(
                owner, job,
                "vertex handle {z:#x} belongs to job {owner:?}, not {job:?}"
            );
        }
        handle
    }

    pub fn job(&self) -> Option<JobId> {
        match self {
            MetaHandle::None => None,
            MetaHandle::Color(id) => Some(id.job()),
            MetaHandle::Extents(id) => Some(id.job()),
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, MetaHandle::None)
    }
}

fn pack(tag: i64, job: JobId, index: u32) -> i64 {
    ((index as i64) << INDEX_SHIFT) | ((job.raw() as i64) << TAG_BITS) | tag
}

impl fmt::Debug for MetaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaHandle::None => write!(f, "None"),
            MetaHandle::Color(id) => write!(f, "{id:?}"),
            MetaHandle::Extents(id) => write!(f, "{id:?}"),
        }
    }
}

/// Counters for recoverable metadata inconsistencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookDiagnostics {
    /// Cuts where the edge length disagreed with the stored extents total.
    pub length_mismatches: usize,
    /// Cuts at distance zero or at the full edge length.
    pub degenerate_cuts: usize,
}

impl AddAssign for HookDiagnostics {
    fn add_assign(&mut self, rhs: Self) {
        self.length_mismatches += rhs.length_mismatches;
        self.degenerate_cuts += rhs.degenerate_cuts;
    }
}

/// Kernel callbacks that keep color and extents handles consistent.
pub struct ColorHooks<'a> {
    colors: &'a ColorCache,
    arena: &'a mut ExtentsArena,
    diagnostics: HookDiagnostics,
}

impl<'a> ColorHooks<'a> {
    pub fn new(colors: &'a ColorCache, arena: &'a mut ExtentsArena) -> Self {
        assert_eq!(
            colors.job(),
            arena.job(),
            "color cache and extents arena belong to different jobs"
        );
        Self {
            colors,
            arena,
            diagnostics: HookDiagnostics::default(),
        }
    }

    pub fn colors(&self) -> &ColorCache {
        self.colors
    }

    pub fn arena(&self) -> &ExtentsArena {
        self.arena
    }

    pub fn diagnostics(&self) -> HookDiagnostics {
        self.diagnostics
    }

    /// Decode a vertex field, checking it belongs to this job.
    pub fn handle(&self, z: i64) -> MetaHandle {
        MetaHandle::decode_for(z, self.colors.job())
    }

    /// The color a vertex field carries, if it is a plain color handle.
    pub fn color_of(&self, z: i64) -> Option<ColorId> {
        match self.handle(z) {
            MetaHandle::Color(id) => Some(id),
            _ => None,
        }
    }

    pub fn placeholder(&self) -> ColorId {
        self.colors.placeholder()
    }

    pub fn placeholder_z(&self) -> i64 {
        MetaHandle::Color(self.colors.placeholder()).encode()
    }
}

impl ZCallbacks for ColorHooks<'_> {
    fn edge_midpoint(&mut self, prev: &ZPoint, _next: &ZPoint, pt: &mut ZPoint) {
        pt.z = self.clone_z(prev.z);
    }

    fn offset_step(&mut self, source: &ZPoint, pt: &mut ZPoint, step: OffsetStep) {
        pt.z = self.clone_z(source.z);
        log::trace!("offset {:?} {:?} -> {:?}", step, source.point(), pt.point());
    }

    fn finish_offset(&mut self, path: &mut [ZPoint]) {
        let n = path.len();
        for i in 0..n {
            if let MetaHandle::Extents(id) = self.handle(path[i].z) {
                let prev = path[(i + n - 1) % n].point();
                self.arena.resize(id, prev, path[i].point());
            }
        }
    }

    fn clone_z(&mut self, z: i64) -> i64 {
        match self.handle(z) {
            MetaHandle::None | MetaHandle::Color(_) => z,
            MetaHandle::Extents(id) => MetaHandle::Extents(self.arena.clone_extents(id)).encode(),
        }
    }

    fn reverse_z(&mut self, z: i64) {
        if let MetaHandle::Extents(id) = self.handle(z) {
            self.arena.reverse(id);
        }
    }

    fn strip_begin(&mut self, z: i64, from: Point, to: Point, cut: Point) -> i64 {
        let MetaHandle::Extents(id) = self.handle(z) else {
            return z;
        };
        let list = self.arena.get(id);
        let axis = list.axis();
        let total = list.total_length();
        let edge_len = axis.measure(from, to);
        let mut distance = axis.measure(from, cut);

        if edge_len != total {
            log::warn!(
                "edge {:?}->{:?} measures {} but its extents total {}, rescaling cut",
                from,
                to,
                edge_len,
                total
            );
            self.diagnostics.length_mismatches += 1;
            distance = if edge_len > 0 {
                (distance as i128 * total as i128 / edge_len as i128) as i64
            } else {
                0
            };
        }
        let distance = distance.clamp(0, total);
        if distance == 0 || distance == total {
            log::debug!(
                "degenerate cut at {} of {} on edge {:?}->{:?}",
                distance,
                total,
                from,
                to
            );
            self.diagnostics.degenerate_cuts += 1;
        }

        let front = self.arena.empty_like(id);
        self.arena.transfer_front(id, distance, front);
        // The remainder stays on a vertex, so it must keep a color
        if self.arena.get(id).is_empty() {
            if let Some(color) = self.arena.get(front).last_color() {
                self.arena.push(id, color, 0);
            }
        }
        MetaHandle::Extents(front).encode()
    }
}
