//! Job-scoped color context.
//!
//! A [`ColorJob`] owns everything one slicing job needs to track colors: the
//! interning cache, the extents arena and the split configuration. Handles
//! issued by one job carry its [`JobId`] and are rejected by every other job,
//! so concurrent jobs must each build their own context.

use crate::clipper::{self, ZExPolygons, ZPath, ZPaths};
use crate::color::{Color, ColorCache, ColorId};
use crate::config::SplitConfig;
use crate::extents::{ColorExtents, ExtentsArena};
use crate::metadata::{ColorHooks, HookDiagnostics, MetaHandle};
use crate::region::{self, Region};
use crate::{Coord, Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Number of job bits carried inside an encoded vertex handle.
pub(crate) const JOB_BITS: u32 = 29;
pub(crate) const JOB_MASK: u32 = (1 << JOB_BITS) - 1;

/// Identifier stamped into every handle a job issues.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u32);

impl JobId {
    /// Allocate a fresh id. Ids are never reused within a process.
    ///
    /// # Panics
    ///
    /// Panics once all 2^29 - 1 ids have been handed out.
    pub fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        match take_id(&NEXT) {
            Some(id) => JobId(id),
            None => panic!("all {JOB_MASK} job ids are in use"),
        }
    }

    #[inline]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        JobId(raw & JOB_MASK)
    }

    #[inline]
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Take the next id from `counter`, or `None` once every id is taken.
fn take_id(counter: &AtomicU32) -> Option<u32> {
    counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
            (n <= JOB_MASK).then_some(n + 1)
        })
        .ok()
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

/// Everything one slicing job uses to track colors.
#[derive(Debug)]
pub struct ColorJob {
    id: JobId,
    colors: ColorCache,
    extents: ExtentsArena,
    config: SplitConfig,
    diagnostics: HookDiagnostics,
}

impl Default for ColorJob {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorJob {
    /// Start a job with default settings.
    ///
    /// Every job gets its own [`JobId`], so handles from any other job in the
    /// process are rejected. See [`JobId::next`] for the id limit.
    pub fn new() -> Self {
        Self::with_config(SplitConfig::default())
    }

    /// Start a job with the given settings.
    pub fn with_config(config: SplitConfig) -> Self {
        let id = JobId::next();
        log::debug!("starting color job {:?}", id);
        Self {
            id,
            colors: ColorCache::new(id),
            extents: ExtentsArena::new(id),
            config,
            diagnostics: HookDiagnostics::default(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    pub fn colors(&self) -> &ColorCache {
        &self.colors
    }

    pub fn extents(&self) -> &ExtentsArena {
        &self.extents
    }

    /// Recoverable inconsistencies seen by every hook pass so far.
    pub fn diagnostics(&self) -> HookDiagnostics {
        self.diagnostics
    }

    /// Intern a color in this job's cache.
    pub fn intern(&mut self, r: f32, g: f32, b: f32) -> ColorId {
        self.colors.intern(r, g, b)
    }

    /// The placeholder ("bad") color.
    pub fn placeholder(&self) -> ColorId {
        self.colors.placeholder()
    }

    /// Look up the value of an interned color.
    pub fn color(&self, id: ColorId) -> &Color {
        self.colors.get(id)
    }

    /// Vertex field value carrying a color handle.
    pub fn color_z(&self, id: ColorId) -> i64 {
        MetaHandle::Color(id).encode()
    }

    /// Decode a vertex field issued by this job.
    pub fn handle(&self, z: i64) -> MetaHandle {
        MetaHandle::decode_for(z, self.id)
    }

    /// Build a colored ring from scaled coordinates, every vertex tagged with `color`.
    pub fn colored_path(&self, points: &[(Coord, Coord)], color: ColorId) -> ZPath {
        let z = self.color_z(color);
        points
            .iter()
            .map(|&(x, y)| clipper::ZPoint::new(x, y, z))
            .collect()
    }

    /// Replace every per-vertex color handle with a one-extent list covering
    /// the edge that ends at that vertex.
    ///
    /// Vertices that already carry extents are left alone.
    pub fn attach_extents(&mut self, paths: &mut ZPaths) -> Result<()> {
        for path in paths.iter_mut() {
            let n = path.len();
            for i in 0..n {
                let prev = path[(i + n - 1) % n].point();
                let curr = path[i].point();
                match self.handle(path[i].z) {
                    MetaHandle::Color(color) => {
                        let mut list = ColorExtents::for_edge(prev, curr);
                        list.push(color, list.axis().measure(prev, curr));
                        let id = self.extents.insert(list);
                        path[i].z = MetaHandle::Extents(id).encode();
                    }
                    MetaHandle::Extents(_) => {}
                    MetaHandle::None => {
                        return Err(Error::Metadata(format!(
                            "vertex {} carries no color handle",
                            curr
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Per-vertex colors of a path; extents handles report their trailing color.
    pub fn resolve_colors(&self, path: &[clipper::ZPoint]) -> Vec<Option<ColorId>> {
        path.iter()
            .map(|p| match self.handle(p.z) {
                MetaHandle::None => None,
                MetaHandle::Color(id) => Some(id),
                MetaHandle::Extents(id) => self.extents.get(id).last_color(),
            })
            .collect()
    }

    /// Offset colored paths by `delta` (scaled units), keeping per-edge extents in step.
    pub fn offset(&mut self, paths: &ZPaths, delta: Coord) -> ZPaths {
        let join = self.config.offset_join();
        let (result, diagnostics) = {
            let mut hooks = ColorHooks::new(&self.colors, &mut self.extents);
            let result = clipper::offset(paths, delta, join, &mut hooks);
            (result, hooks.diagnostics())
        };
        self.diagnostics += diagnostics;
        result
    }

    /// Union of colored paths under the non-zero fill rule.
    pub fn union(&mut self, subject: &ZPaths, clip: &ZPaths) -> ZExPolygons {
        let (result, diagnostics) = {
            let mut hooks = ColorHooks::new(&self.colors, &mut self.extents);
            let result = clipper::union(subject, clip, &mut hooks);
            (result, hooks.diagnostics())
        };
        self.diagnostics += diagnostics;
        result
    }

    /// Difference of colored paths under the non-zero fill rule.
    pub fn difference(&mut self, subject: &ZPaths, clip: &ZPaths) -> ZExPolygons {
        let (result, diagnostics) = {
            let mut hooks = ColorHooks::new(&self.colors, &mut self.extents);
            let result = clipper::difference(subject, clip, &mut hooks);
            (result, hooks.diagnostics())
        };
        self.diagnostics += diagnostics;
        result
    }

    /// Split colored polygons into border, infill and unoptimized regions.
    ///
    /// `distance` is the inward offset in scaled units.
    pub fn split_into_colors(&mut self, polygons: &ZPaths, distance: Coord) -> Result<Vec<Region>> {
        let (regions, diagnostics) = {
            let mut hooks = ColorHooks::new(&self.colors, &mut self.extents);
            let regions = region::split_into_colors(polygons, distance, &self.config, &mut hooks)?;
            (regions, hooks.diagnostics())
        };
        self.diagnostics += diagnostics;
        Ok(regions)
    }
}
