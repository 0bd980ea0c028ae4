//! Color-split regions.
//!
//! After an inward offset, the band between a colored boundary and its
//! offset is cut into single-color border quadrilaterals, the offset itself
//! becomes infill, and whatever neither claims is left over as unoptimized
//! regions.
//!
//! # Algorithm
//!
//! 1. Tag every input vertex with a back-reference `(polygon, point)` and
//!    offset that shadow copy inward. The back-references survive the kernel
//!    verbatim.
//! 2. Walk each offset ring. Two consecutive offset vertices are adjacent
//!    when the second refers to the original point right after the one the
//!    first refers to. A maximal chain of adjacent pairs follows one arc of
//!    the original boundary.
//! 3. Each adjacent pair yields a quad `[orig prev, orig curr, off curr, off prev]`
//!    colored like the original edge ending at `orig curr`. Each chain yields
//!    a claim mask covering all of its quads.
//! 4. The connected parts of the offset are infill and are claimed too.
//! 5. `original - claims` is split into parts. Each part has its placeholder
//!    vertices repaired from their neighbors; a part whose vertices then agree
//!    on one color becomes a border, anything else stays unoptimized.
//!
//! Border quads of the same color are not merged.

use crate::clipper::{self, clean_ring, fill_z, path_area, CopyZ, ZExPolygon, ZPath, ZPaths, ZPoint};
use crate::color::ColorId;
use crate::config::SplitConfig;
use crate::metadata::{ColorHooks, MetaHandle};
use crate::{Coord, CoordF, Error, Result, SCALING_FACTOR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a split region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    /// Band along the boundary attributed to one color.
    Border,
    /// Area inside the inward offset.
    Infill,
    /// Leftover area whose vertices disagree on a color.
    Unoptimized,
}

impl RegionKind {
    #[inline]
    pub fn is_border(&self) -> bool {
        matches!(self, RegionKind::Border)
    }

    #[inline]
    pub fn is_infill(&self) -> bool {
        matches!(self, RegionKind::Infill)
    }

    #[inline]
    pub fn is_unoptimized(&self) -> bool {
        matches!(self, RegionKind::Unoptimized)
    }

    /// Get a human-readable name for this region kind.
    pub fn name(&self) -> &'static str {
        match self {
            RegionKind::Border => "border",
            RegionKind::Infill => "infill",
            RegionKind::Unoptimized => "unoptimized",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One output area of a color split.
///
/// `paths` is an outer ring followed by its holes. Border regions carry their
/// color; infill and unoptimized regions carry the placeholder.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub paths: ZPaths,
    pub kind: RegionKind,
    pub color: ColorId,
}

impl Region {
    pub fn new(paths: ZPaths, kind: RegionKind, color: ColorId) -> Self {
        Self { paths, kind, color }
    }

    /// Enclosed area in mm².
    pub fn area(&self) -> CoordF {
        let scaled: CoordF = self.paths.iter().map(|p| path_area(p)).sum();
        scaled.abs() / (SCALING_FACTOR * SCALING_FACTOR)
    }

    /// Whether the region carries a real color.
    pub fn is_resolved(&self) -> bool {
        !self.color.is_placeholder()
    }

    /// Per-vertex colors, ring by ring. Placeholder and bare vertices are `None`.
    pub fn vertex_colors(&self) -> Vec<Vec<Option<ColorId>>> {
        self.paths
            .iter()
            .map(|path| path.iter().map(|p| resolved_color(p.z)).collect())
            .collect()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} region {:?}, {} rings, {:.4}mm²",
            self.kind,
            self.color,
            self.paths.len(),
            self.area()
        )
    }
}

fn resolved_color(z: i64) -> Option<ColorId> {
    match MetaHandle::decode(z) {
        MetaHandle::Color(id) if !id.is_placeholder() => Some(id),
        _ => None,
    }
}

// ============================================================================
// Back-references
// ============================================================================

/// Shadow vertex field pointing at an original vertex.
fn encode_ref(poly: usize, point: usize) -> i64 {
    (((poly as i64) + 1) << 32) | point as i64
}

fn decode_ref(z: i64, polygons: &[ZPath]) -> Option<(usize, usize)> {
    if z <= 0 {
        return None;
    }
    let poly = ((z >> 32) - 1) as usize;
    let point = (z & 0xffff_ffff) as usize;
    (poly < polygons.len() && point < polygons[poly].len()).then_some((poly, point))
}

/// Whether `curr` refers to the original vertex right after `prev`.
fn follows(prev: (usize, usize), curr: (usize, usize), polygons: &[ZPath]) -> bool {
    prev.0 == curr.0 && (prev.1 + 1) % polygons[prev.0].len() == curr.1
}

// ============================================================================
// Split
// ============================================================================

/// Split colored polygons into border, infill and unoptimized regions.
///
/// Every input vertex must carry a color handle; `distance` is the inward
/// offset in scaled units. The returned regions cover the input area without
/// overlapping.
pub fn split_into_colors(
    polygons: &[ZPath],
    distance: Coord,
    config: &SplitConfig,
    hooks: &mut ColorHooks<'_>,
) -> Result<Vec<Region>> {
    if distance <= 0 {
        return Err(Error::Config(format!(
            "color split distance must be positive, got {distance}"
        )));
    }
    let polygons: ZPaths = polygons
        .iter()
        .map(|p| clean_ring(p))
        .filter(|p| p.len() >= 3)
        .collect();
    if polygons.is_empty() {
        return Ok(Vec::new());
    }

    let mut colors: Vec<Vec<ColorId>> = Vec::with_capacity(polygons.len());
    for path in &polygons {
        let mut ring = Vec::with_capacity(path.len());
        for p in path {
            match hooks.color_of(p.z) {
                Some(id) if !id.is_placeholder() => ring.push(id),
                Some(_) => {
                    return Err(Error::Metadata(format!(
                        "vertex {} carries the placeholder color",
                        p.point()
                    )))
                }
                None => {
                    return Err(Error::Metadata(format!(
                        "vertex {} carries no color handle",
                        p.point()
                    )))
                }
            }
        }
        colors.push(ring);
    }

    let total: CoordF = polygons.iter().map(|p| path_area(p)).sum();
    if total <= 0.0 {
        return Err(Error::Geometry(format!(
            "polygon set has non-positive area {total}; outer rings must be counter-clockwise"
        )));
    }

    // Shadow copy carrying back-references
    let shadow: ZPaths = polygons
        .iter()
        .enumerate()
        .map(|(i, path)| {
            path.iter()
                .enumerate()
                .map(|(j, p)| ZPoint::at(p.point(), encode_ref(i, j)))
                .collect()
        })
        .collect();
    let offset_paths = clipper::offset(&shadow, -distance, config.offset_join(), &mut CopyZ);

    let placeholder = hooks.placeholder();
    let placeholder_z = hooks.placeholder_z();
    let mut regions = Vec::new();
    let mut claims: ZPaths = Vec::new();

    for path in &offset_paths {
        claim_border(
            path,
            &polygons,
            &colors,
            placeholder_z,
            &mut regions,
            &mut claims,
        );
    }
    let borders = regions.len();

    for part in clipper::split_into_parts(&offset_paths, &mut CopyZ) {
        let mut paths = part.into_paths();
        fill_z(&mut paths, placeholder_z);
        claims.extend(paths.iter().cloned());
        regions.push(Region::new(paths, RegionKind::Infill, placeholder));
    }
    let infill = regions.len() - borders;

    let min_area = config.min_region_area * SCALING_FACTOR * SCALING_FACTOR;
    let residual = clipper::difference(&polygons, &claims, hooks);
    let mut unoptimized = 0;
    let mut repaired = 0;
    for mut part in residual {
        let area = part.area();
        if area < min_area {
            log::debug!(
                "dropping {:.3e}mm² residual sliver",
                area / (SCALING_FACTOR * SCALING_FACTOR)
            );
            continue;
        }
        let region = classify_residual(&mut part, placeholder);
        if region.kind.is_border() {
            repaired += 1;
        } else {
            unoptimized += 1;
        }
        regions.push(region);
    }

    log::debug!(
        "split {} polygons at {}: {} border, {} infill, {} repaired, {} unoptimized",
        polygons.len(),
        distance,
        borders,
        infill,
        repaired,
        unoptimized
    );
    Ok(regions)
}

/// Emit border quads and claim masks for one offset ring.
fn claim_border(
    path: &[ZPoint],
    polygons: &[ZPath],
    colors: &[Vec<ColorId>],
    placeholder_z: i64,
    regions: &mut Vec<Region>,
    claims: &mut ZPaths,
) {
    let n = path.len();
    if n < 2 {
        return;
    }
    let refs: Vec<Option<(usize, usize)>> = path.iter().map(|p| decode_ref(p.z, polygons)).collect();
    let adjacent: Vec<bool> = (0..n)
        .map(|i| match (refs[i], refs[(i + 1) % n]) {
            (Some(a), Some(b)) => follows(a, b, polygons),
            _ => false,
        })
        .collect();

    for i in 0..n {
        if !adjacent[i] {
            continue;
        }
        let j = (i + 1) % n;
        let (Some((poly, a)), Some((_, b))) = (refs[i], refs[j]) else {
            continue;
        };
        let color_z = MetaHandle::Color(colors[poly][b]).encode();
        let mut quad = vec![
            ZPoint::at(polygons[poly][a].point(), color_z),
            ZPoint::at(polygons[poly][b].point(), color_z),
            ZPoint::at(path[j].point(), color_z),
            ZPoint::at(path[i].point(), color_z),
        ];
        let area = path_area(&quad);
        if area == 0.0 {
            continue;
        }
        if area < 0.0 {
            quad.reverse();
        }
        regions.push(Region::new(vec![quad], RegionKind::Border, colors[poly][b]));
    }

    if adjacent.iter().all(|&a| a) {
        // The offset ring follows a whole original ring
        let Some((poly, _)) = refs[0] else {
            return;
        };
        let mut inner: ZPath = path.to_vec();
        inner.reverse();
        let mut rings = vec![polygons[poly].clone(), inner];
        fill_z(&mut rings, placeholder_z);
        claims.extend(rings);
        return;
    }

    // Start right after a break so no chain wraps past the end
    let start = (0..n).find(|&i| !adjacent[(i + n - 1) % n]).unwrap_or(0);
    let mut chain: Vec<usize> = Vec::new();
    for k in 0..n {
        let i = (start + k) % n;
        if adjacent[i] {
            if chain.is_empty() {
                chain.push(i);
            }
            chain.push((i + 1) % n);
        } else if !chain.is_empty() {
            claims.push(chain_mask(&chain, path, &refs, polygons, placeholder_z));
            chain.clear();
        }
    }
    if !chain.is_empty() {
        claims.push(chain_mask(&chain, path, &refs, polygons, placeholder_z));
    }
}

/// Original arc of a chain closed by the reversed offset arc.
fn chain_mask(
    chain: &[usize],
    path: &[ZPoint],
    refs: &[Option<(usize, usize)>],
    polygons: &[ZPath],
    placeholder_z: i64,
) -> ZPath {
    let mut mask = Vec::with_capacity(chain.len() * 2);
    if let Some((poly, first)) = refs[chain[0]] {
        let ring = &polygons[poly];
        for step in 0..chain.len() {
            mask.push(ZPoint::at(ring[(first + step) % ring.len()].point(), placeholder_z));
        }
    }
    mask.extend(
        chain
            .iter()
            .rev()
            .map(|&i| ZPoint::at(path[i].point(), placeholder_z)),
    );
    if path_area(&mask) < 0.0 {
        mask.reverse();
    }
    mask
}

/// Repair placeholder vertices of a residual part and classify it.
fn classify_residual(part: &mut ZExPolygon, placeholder: ColorId) -> Region {
    for ring in part.rings_mut() {
        repair_ring(ring);
    }

    let mut agreed: Option<ColorId> = None;
    let mut mixed = false;
    for p in part.rings().flat_map(|r| r.iter()) {
        match (resolved_color(p.z), agreed) {
            (None, _) => mixed = true,
            (Some(c), None) => agreed = Some(c),
            (Some(c), Some(a)) if c != a => mixed = true,
            _ => {}
        }
    }

    let paths = std::mem::take(part).into_paths();
    match agreed {
        Some(color) if !mixed => Region::new(paths, RegionKind::Border, color),
        _ => Region::new(paths, RegionKind::Unoptimized, placeholder),
    }
}

/// An unresolved vertex copies its next neighbor when that one is resolved,
/// else its previous neighbor. Passes run in place until nothing changes.
fn repair_ring(ring: &mut [ZPoint]) {
    let n = ring.len();
    loop {
        let mut changed = false;
        for i in 0..n {
            if resolved_color(ring[i].z).is_some() {
                continue;
            }
            let next = ring[(i + 1) % n].z;
            let prev = ring[(i + n - 1) % n].z;
            if resolved_color(next).is_some() {
                ring[i].z = next;
                changed = true;
            } else if resolved_color(prev).is_some() {
                ring[i].z = prev;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}
