//! Channel ordinals derived from geometry identifiers.
//!
//! Hits are ordered by a flat channel number computed from the geometry
//! address: the optical-module number for calorimeter hits and the Geiger
//! cell number for tracker hits.

use crate::types::GeomId;

/// Geometry category of a main-wall optical module.
pub const CALO_OM_TYPE: u32 = 1302;
/// Geometry category of an X-wall optical module.
pub const XCALO_OM_TYPE: u32 = 1232;
/// Geometry category of a gamma-veto optical module.
pub const GVETO_OM_TYPE: u32 = 1252;
/// Geometry category of a Geiger cell.
pub const GEIGER_CELL_TYPE: u32 = 1204;

const CALO_COLUMNS: u32 = 20;
const CALO_ROWS: u32 = 13;
const XCALO_OM_OFFSET: u32 = 2 * CALO_COLUMNS * CALO_ROWS; // 520
const GVETO_OM_OFFSET: u32 = XCALO_OM_OFFSET + 2 * 2 * 2 * 16; // 648

const GEIGER_ROWS: u32 = 113;
const GEIGER_LAYERS: u32 = 9;

// ============================================================================
// Main wall (type 1302)
// Address: [module, side, column, row]
// ============================================================================

fn main_wall_om_num(gid: &GeomId) -> Option<u32> {
    let side = gid.get(1)?;
    let column = gid.get(2)?;
    let row = gid.get(3)?;
    side.checked_mul(CALO_COLUMNS * CALO_ROWS)?
        .checked_add(column.checked_mul(CALO_ROWS)?)?
        .checked_add(row)
}

// ============================================================================
// X-wall (type 1232)
// Address: [module, side, wall, column, row]
// ============================================================================

fn xwall_om_num(gid: &GeomId) -> Option<u32> {
    let side = gid.get(1)?;
    let wall = gid.get(2)?;
    let column = gid.get(3)?;
    let row = gid.get(4)?;
    side.checked_mul(64)?
        .checked_add(wall.checked_mul(32)?)?
        .checked_add(column.checked_mul(16)?)?
        .checked_add(row)?
        .checked_add(XCALO_OM_OFFSET)
}

// ============================================================================
// Gamma veto (type 1252)
// Address: [module, side, wall, column]
// ============================================================================

fn gveto_om_num(gid: &GeomId) -> Option<u32> {
    let side = gid.get(1)?;
    let wall = gid.get(2)?;
    let column = gid.get(3)?;
    side.checked_mul(32)?
        .checked_add(wall.checked_mul(16)?)?
        .checked_add(column)?
        .checked_add(GVETO_OM_OFFSET)
}

/// Optical-module number of a calorimeter geometry id.
///
/// Main-wall modules come first (0..520), then X-wall (520..648), then gamma
/// veto (648..712). Returns `None` for other categories, short addresses, or
/// addresses whose number does not fit in a `u32`; `None` orders before every
/// valid number.
pub fn om_num(gid: &GeomId) -> Option<u32> {
    match gid.kind {
        CALO_OM_TYPE => main_wall_om_num(gid),
        XCALO_OM_TYPE => xwall_om_num(gid),
        GVETO_OM_TYPE => gveto_om_num(gid),
        _ => None,
    }
}

// ============================================================================
// Geiger cell (type 1204)
// Address: [module, side, layer, row]
// ============================================================================

/// Geiger cell number of a tracker geometry id.
///
/// Cells are numbered row-major within a side: `1017 * side + 9 * row + layer`.
pub fn gg_num(gid: &GeomId) -> Option<u32> {
    if gid.kind != GEIGER_CELL_TYPE {
        return None;
    }
    let side = gid.get(1)?;
    let layer = gid.get(2)?;
    let row = gid.get(3)?;
    side.checked_mul(GEIGER_ROWS * GEIGER_LAYERS)?
        .checked_add(row.checked_mul(GEIGER_LAYERS)?)?
        .checked_add(layer)
}
