//! Color values and the interning cache.
//!
//! Colors are compared by identity once interned: two calls to
//! [`ColorCache::intern`] with equal components return the same [`ColorId`],
//! so downstream code can compare and hash handles instead of floats.
//!
//! The cache keeps one reserved entry, the placeholder, which marks infill
//! and unresolved area. It is never handed out by `intern`.

use crate::job::JobId;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// An RGB color with normalized float components.
#[derive(Clone, Copy, Debug, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a color. Negative zero is folded into zero so it interns alike.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r + 0.0,
            g: g + 0.0,
            b: b + 0.0,
        }
    }

    /// `#rrggbb` form, as used by debug renderers.
    pub fn to_hex(&self) -> String {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

// Lexicographic on (r, g, b) with a total float order, so the BTreeMap key is sound.
impl Ord for Color {
    fn cmp(&self, other: &Self) -> Ordering {
        self.r
            .total_cmp(&other.r)
            .then_with(|| self.g.total_cmp(&other.g))
            .then_with(|| self.b.total_cmp(&other.b))
    }
}

impl PartialOrd for Color {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Color {}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Handle to an interned color.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorId {
    job: JobId,
    index: u32,
}

impl ColorId {
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

    /// True for the reserved placeholder entry.
    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.index == PLACEHOLDER_INDEX
    }
}

impl fmt::Debug for ColorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_placeholder() {
            write!(f, "ColorId(placeholder)")
        } else {
            write!(f, "ColorId({})", self.index)
        }
    }
}

const PLACEHOLDER_INDEX: u32 = 0;

/// Job-scoped set of interned colors.
#[derive(Debug, Clone)]
pub struct ColorCache {
    job: JobId,
    colors: Vec<Color>,
    lookup: BTreeMap<Color, u32>,
}

impl ColorCache {
    /// Create an empty cache holding only the placeholder.
    pub fn new(job: JobId) -> Self {
        Self {
            job,
            colors: vec![Color::new(0.0, 0.0, 0.0)],
            lookup: BTreeMap::new(),
        }
    }

    /// The job this cache belongs to.
    pub fn job(&self) -> JobId {
        self.job
    }

    /// Intern an RGB triple, returning the shared handle for it.
    pub fn intern(&mut self, r: f32, g: f32, b: f32) -> ColorId {
        self.intern_color(Color::new(r, g, b))
    }

    /// Intern a color value.
    pub fn intern_color(&mut self, color: Color) -> ColorId {
        let color = Color::new(color.r, color.g, color.b);
        if let Some(&index) = self.lookup.get(&color) {
            return ColorId::from_parts(self.job, index);
        }
        assert!(self.colors.len() < u32::MAX as usize, "color cache exhausted");
        let index = self.colors.len() as u32;
        self.colors.push(color);
        self.lookup.insert(color, index);
        ColorId::from_parts(self.job, index)
    }

    /// The reserved color marking infill and unresolved area.
    #[inline]
    pub fn placeholder(&self) -> ColorId {
        ColorId::from_parts(self.job, PLACEHOLDER_INDEX)
    }

    /// Look up an interned color.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by another job's cache.
    pub fn get(&self, id: ColorId) -> &Color {
        assert_eq!(
            id.job, self.job,
            "color handle {id:?} belongs to job {:?}, not {:?}",
            id.job, self.job
        );
        &self.colors[id.index as usize]
    }

    /// Number of distinct interned colors, excluding the placeholder.
    pub fn len(&self) -> usize {
        self.colors.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate interned colors in interning order, excluding the placeholder.
    pub fn iter(&self) -> impl Iterator<Item = (ColorId, &Color)> + '_ {
        self.colors
            .iter()
            .enumerate()
            .skip(1)
            .map(move |(i, c)| (ColorId::from_parts(self.job, i as u32), c))
    }
}
