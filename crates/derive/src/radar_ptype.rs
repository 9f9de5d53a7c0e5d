//! `radar_ptype_combo`: reflectivity + per-pixel dominant precip type folded
//! into one indexed palette field.

use crate::error::DeriveResult;
use crate::grid::Grid;
use colormap::palette::{build_radar_ptype_flat_palette, RADAR_PTYPE_ORDER};

pub struct RadarPtypeComponents<'a> {
    pub refl: &'a Grid,
    pub rain: &'a Grid,
    pub snow: &'a Grid,
    pub sleet: &'a Grid,
    pub frzr: &'a Grid,
}

/// `min_visible_dbz` comes from the variable's hints (falling back to the
/// palette's crate-level default); echo below it stays transparent.
pub fn derive_radar_ptype_combo(c: &RadarPtypeComponents, min_visible_dbz: f32) -> DeriveResult<Grid> {
    c.refl.check_same_shape(c.rain)?;
    c.refl.check_same_shape(c.snow)?;
    c.refl.check_same_shape(c.sleet)?;
    c.refl.check_same_shape(c.frzr)?;

    let palette = build_radar_ptype_flat_palette();
    let n = c.refl.data.len();
    let mut out = vec![f32::NAN; n];

    for i in 0..n {
        let masks = [c.rain.data[i], c.snow.data[i], c.sleet.data[i], c.frzr.data[i]];
        let mask_max = masks.iter().cloned().filter(|v| v.is_finite()).fold(f32::NEG_INFINITY, f32::max);
        if !mask_max.is_finite() || mask_max <= 0.0 {
            continue;
        }
        let mut best_idx = 0usize;
        let mut best_val = f32::NEG_INFINITY;
        for (idx, &v) in masks.iter().enumerate() {
            if v.is_finite() && v > best_val {
                best_val = v;
                best_idx = idx;
            }
        }
        let mut code = RADAR_PTYPE_ORDER[best_idx];
        // "frzr" resolves to whichever of rain/snow is more supported when
        // either is also active at this pixel; ties go to rain.
        if code == "frzr" && (masks[0] > 0.0 || masks[1] > 0.0) {
            code = if masks[0] >= masks[1] { "rain" } else { "snow" };
        }

        let refl_v = c.refl.data[i];
        let refl_safe = if refl_v.is_finite() { refl_v.max(0.0) } else { f32::NAN };
        if !refl_safe.is_finite() || refl_safe < min_visible_dbz {
            continue;
        }
        let normalized = (refl_safe / 70.0).clamp(0.0, 1.0);
        let breaks = &palette.breaks[code];
        let count = breaks.count;
        let local_bin = (normalized * (count - 1) as f32).round().clamp(0.0, (count - 1) as f32) as usize;
        out[i] = (breaks.offset + local_bin) as f32;
    }

    Ok(Grid { data: out, width: c.refl.width, height: c.refl.height })
}
