//! Job-scoped owner of every extents list.
//!
//! Lists are addressed by [`ExtentsId`] and are never freed one by one; the
//! whole arena is dropped with its job. Operations that involve two lists
//! take both ids and move runs by value between them.

use super::{ColorExtent, ColorExtents};
use crate::color::ColorId;
use crate::geometry::Point;
use crate::job::JobId;
use crate::Coord;
use std::fmt;

/// Handle to a list owned by an [`ExtentsArena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtentsId {
    job: JobId,
    index: u32,
}

impl ExtentsId {
    pub(crate) const fn from_parts(job: JobId, index: u32) -> Self {
        Self { job, index }
    }

    #[inline]
    pub fn job(&self) -> JobId {
        self.job
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Debug for ExtentsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtentsId({})", self.index)
    }
}

#[derive(Debug, Clone)]
pub struct ExtentsArena {
    job: JobId,
    lists: Vec<ColorExtents>,
}

impl ExtentsArena {
    pub fn new(job: JobId) -> Self {
        Self {
            job,
            lists: Vec::new(),
        }
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    /// Number of lists ever allocated.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    fn slot(&self, id: ExtentsId) -> usize {
        assert_eq!(
            id.job, self.job,
            "extents handle {id:?} belongs to job {:?}, not {:?}",
            id.job, self.job
        );
        let slot = id.index as usize;
        assert!(slot < self.lists.len(), "dangling extents handle {id:?}");
        slot
    }

    /// Mutable access to two distinct lists at once.
    fn pair_mut(&mut self, a: ExtentsId, b: ExtentsId) -> (&mut ColorExtents, &mut ColorExtents) {
        let (i, j) = (self.slot(a), self.slot(b));
        assert_ne!(i, j, "operation needs two distinct extents lists");
        if i < j {
            let (lo, hi) = self.lists.split_at_mut(j);
            (&mut lo[i], &mut hi[0])
        } else {
            let (lo, hi) = self.lists.split_at_mut(i);
            (&mut hi[0], &mut lo[j])
        }
    }

    /// Take ownership of a list.
    pub fn insert(&mut self, list: ColorExtents) -> ExtentsId {
        assert!(self.lists.len() < u32::MAX as usize, "extents arena exhausted");
        let id = ExtentsId::from_parts(self.job, self.lists.len() as u32);
        self.lists.push(list);
        id
    }

    /// New empty list for the edge `start`-`end`.
    pub fn create(&mut self, start: Point, end: Point) -> ExtentsId {
        self.insert(ColorExtents::for_edge(start, end))
    }

    /// Deep copy of a list.
    pub fn clone_extents(&mut self, id: ExtentsId) -> ExtentsId {
        let copy = self.get(id).clone();
        self.insert(copy)
    }

    /// New empty list sharing the axis of `id`.
    pub fn empty_like(&mut self, id: ExtentsId) -> ExtentsId {
        let empty = self.get(id).empty_like();
        self.insert(empty)
    }

    pub fn get(&self, id: ExtentsId) -> &ColorExtents {
        &self.lists[self.slot(id)]
    }

    fn get_mut(&mut self, id: ExtentsId) -> &mut ColorExtents {
        let slot = self.slot(id);
        &mut self.lists[slot]
    }

    /// Total length of a list.
    pub fn length(&self, id: ExtentsId) -> Coord {
        self.get(id).total_length()
    }

    pub fn push(&mut self, id: ExtentsId, color: ColorId, length: Coord) {
        self.get_mut(id).push(color, length);
    }

    pub fn reverse(&mut self, id: ExtentsId) {
        self.get_mut(id).reverse();
    }

    pub fn resize(&mut self, id: ExtentsId, start: Point, end: Point) {
        self.get_mut(id).resize(start, end);
    }

    /// Move the first `distance` of `id` onto the end of `other`.
    pub fn transfer_front(&mut self, id: ExtentsId, distance: Coord, other: ExtentsId) {
        let (list, other) = self.pair_mut(id, other);
        list.transfer_front(distance, other);
    }

    /// Move all runs of `other` onto the end of `id`.
    pub fn append(&mut self, id: ExtentsId, other: ExtentsId) {
        let (list, other) = self.pair_mut(id, other);
        list.append(other);
    }

    /// Move all runs of `other` onto the front of `id`.
    pub fn prepend(&mut self, id: ExtentsId, other: ExtentsId) {
        let (list, other) = self.pair_mut(id, other);
        list.prepend(other);
    }

    /// Splice runs onto the end of `id`.
    pub fn extend<I>(&mut self, id: ExtentsId, runs: I)
    where
        I: IntoIterator<Item = ColorExtent>,
    {
        self.get_mut(id).extend(runs);
    }
}
