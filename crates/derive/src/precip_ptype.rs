//! `precip_ptype_blend`: surface precipitation rate + dominant precip type
//! folded into one indexed palette field.

use crate::error::DeriveResult;
use crate::grid::Grid;
use colormap::palette::{build_precip_ptype_flat_palette, precip_ptype_range, PRECIP_PTYPE_ORDER};

pub struct PrecipPtypeComponents<'a> {
    /// Surface precipitation rate in kg m⁻² s⁻¹ (GFS PRATE units).
    pub prate: &'a Grid,
    pub rain: &'a Grid,
    pub snow: &'a Grid,
    pub sleet: &'a Grid,
    pub frzr: &'a Grid,
}

const SECONDS_PER_HOUR: f32 = 3600.0;

pub fn derive_precip_ptype_blend(c: &PrecipPtypeComponents) -> DeriveResult<Grid> {
    c.prate.check_same_shape(c.rain)?;
    c.prate.check_same_shape(c.snow)?;
    c.prate.check_same_shape(c.sleet)?;
    c.prate.check_same_shape(c.frzr)?;

    let palette = build_precip_ptype_flat_palette();
    let (range_min, range_max) = precip_ptype_range();
    let range_min = range_min as f32;
    let span = ((range_max as f32) - range_min).max(1e-6);

    let n = c.prate.data.len();
    let mut out = vec![f32::NAN; n];

    for i in 0..n {
        let prate = c.prate.data[i];
        let prate_mmhr = if prate.is_finite() { prate.max(0.0) * SECONDS_PER_HOUR } else { f32::NAN };
        if !prate_mmhr.is_finite() || prate_mmhr <= 0.0 {
            continue;
        }

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
        let code = PRECIP_PTYPE_ORDER[best_idx];

        let normalized = ((prate_mmhr - range_min) / span).clamp(0.0, 1.0);
        let breaks = &palette.breaks[code];
        let count = breaks.count;
        let local_bin = (normalized * (count - 1) as f32).round().clamp(0.0, (count - 1) as f32) as usize;
        out[i] = (breaks.offset + local_bin) as f32;
    }

    Ok(Grid { data: out, width: c.prate.width, height: c.prate.height })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(v: f32) -> Grid {
        Grid { data: vec![v], width: 1, height: 1 }
    }

    #[test]
    fn rain_dominant_pixel_lands_in_rain_range() {
        let prate = g(0.001); // 3.6 mm/hr
        let rain = g(1.0);
        let snow = g(0.0);
        let sleet = g(0.0);
        let frzr = g(0.0);
        let out = derive_precip_ptype_blend(&PrecipPtypeComponents {
            prate: &prate,
            rain: &rain,
            snow: &snow,
            sleet: &sleet,
            frzr: &frzr,
        })
        .unwrap();
        let palette = build_precip_ptype_flat_palette();
        let rain_break = &palette.breaks["rain"];
        let idx = out.data[0] as usize;
        assert!(idx >= rain_break.offset && idx < rain_break.offset + rain_break.count);
    }

    #[test]
    fn zero_rate_is_transparent() {
        let prate = g(0.0);
        let rain = g(1.0);
        let snow = g(0.0);
        let sleet = g(0.0);
        let frzr = g(0.0);
        let out = derive_precip_ptype_blend(&PrecipPtypeComponents {
            prate: &prate,
            rain: &rain,
            snow: &snow,
            sleet: &sleet,
            frzr: &frzr,
        })
        .unwrap();
        assert!(out.data[0].is_nan());
    }
}
