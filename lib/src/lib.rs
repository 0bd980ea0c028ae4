//! # Color Slicer
//!
//! Multi-material color tracking for a 2D polygon slicer.
//!
//! Polygon vertices carry one spare integer field. This library keeps colors
//! attached to polygon edges through that field while the boundary kernel
//! offsets, clips and merges them:
//! - interned colors, compared and referenced by handle
//! - per-edge extents: an ordered split of an edge's length into colored runs
//! - kernel callbacks that keep extents correct as edges are cut, cloned and reversed
//! - splitting a colored shape into single-color borders, infill and mixed leftovers
//!
//! ## Example
//!
//! ```rust,ignore
//! use color_slicer::{scale, ColorJob};
//!
//! let mut job = ColorJob::new();
//! let red = job.intern(1.0, 0.0, 0.0);
//! let s = scale(10.0);
//! let square = job.colored_path(&[(0, 0), (s, 0), (s, s), (0, s)], red);
//! let regions = job.split_into_colors(&vec![square], scale(0.4))?;
//! ```

// Core modules
pub mod clipper;
pub mod color;
pub mod config;
pub mod extents;
pub mod geometry;
pub mod job;
pub mod metadata;
pub mod region;

// Re-export commonly used types
pub use color::{Color, ColorCache, ColorId};
pub use config::{JoinType, SplitConfig};
pub use extents::{Axis, ColorExtent, ColorExtents, ExtentsArena, ExtentsId};
pub use geometry::{Line, Point, PointF};
pub use job::{ColorJob, JobId};
pub use metadata::{ColorHooks, HookDiagnostics, MetaHandle};
pub use region::{split_into_colors, Region, RegionKind};

// Re-export kernel operations
pub use clipper::{
    difference, intersection, offset, offset_ex, reverse_path, split_into_parts, union, CopyZ,
    OffsetJoinType, OffsetStep, ZCallbacks, ZExPolygon, ZExPolygons, ZPath, ZPaths, ZPoint,
};

/// Coordinate type used throughout the slicer.
/// Using i64 for integer coordinates (scaled by SCALING_FACTOR) to avoid floating-point issues.
pub type Coord = i64;

/// Floating-point coordinate type for unscaled values.
pub type CoordF = f64;

/// Scaling factor: coordinates are stored as integers scaled by this factor.
/// 1 unit = 1 nanometer, so 1mm = 1_000_000 units.
pub const SCALING_FACTOR: f64 = 1_000_000.0;

/// Scale a floating-point coordinate to integer.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale an integer coordinate to floating-point.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for color split operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("Metadata error: {0}")]
    Metadata(String),
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
