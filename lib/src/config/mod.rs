//! Color-split configuration.
//!
//! Settings are plain serde structs. Any field missing from a JSON document
//! takes its default, so partial files are valid.

use crate::clipper::OffsetJoinType;
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Corner style used by the inward offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    /// Mitered corners, squared off beyond the miter limit.
    #[default]
    Miter,
    /// Corners always squared off.
    Square,
}

impl JoinType {
    /// Returns the display name for this join type.
    pub fn name(&self) -> &'static str {
        match self {
            JoinType::Miter => "Miter",
            JoinType::Square => "Square",
        }
    }
}

/// Settings for splitting colored polygons into regions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Corner style of the inward offset.
    pub join_type: JoinType,
    /// Miter limit, in multiples of the offset distance.
    pub miter_limit: CoordF,
    /// Residual parts smaller than this (mm²) are dropped as kernel noise.
    pub min_region_area: CoordF,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            join_type: JoinType::Miter,
            miter_limit: 2.0,
            min_region_area: 1e-6,
        }
    }
}

impl SplitConfig {
    /// Create a new SplitConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SplitConfig = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid split config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("loading split config from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    /// Builder method: set the join type.
    pub fn join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    /// Builder method: set the miter limit.
    pub fn miter_limit(mut self, limit: CoordF) -> Self {
        self.miter_limit = limit;
        self
    }

    /// Builder method: set the minimum residual area (mm²).
    pub fn min_region_area(mut self, area: CoordF) -> Self {
        self.min_region_area = area;
        self
    }

    /// The kernel join for these settings.
    pub fn offset_join(&self) -> OffsetJoinType {
        match self.join_type {
            JoinType::Miter => OffsetJoinType::Miter(self.miter_limit),
            JoinType::Square => OffsetJoinType::Square,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.miter_limit >= 1.0) {
            return Err(Error::Config(format!(
                "miter limit must be at least 1, got {}",
                self.miter_limit
            )));
        }
        if !(self.min_region_area >= 0.0) {
            return Err(Error::Config(format!(
                "minimum region area must not be negative, got {}",
                self.min_region_area
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SplitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SplitConfig:")?;
        writeln!(f, "  Join: {}", self.join_type.name())?;
        writeln!(f, "  Miter limit: {:.2}", self.miter_limit)?;
        write!(f, "  Min region area: {:e}mm²", self.min_region_area)
    }
}
