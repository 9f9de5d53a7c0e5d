//! Gate 2: pixel statistics sanity checks on a frame before it's encoded.
//!
//! Runs on the in-memory RGBA/value buffers immediately before they're
//! handed to the artifact encoder; the buffers are bit-identical to the
//! pixel data the encoder writes.

use std::collections::HashSet;

const SPEC_RANGE_MARGIN_FRACTION: f64 = 0.2;

/// Per-variable Gate 2 thresholds. Categorical-ptype frames are legitimately
/// sparse (an echo-free CONUS is normal), and `allow_dry_frame` variables
/// (accumulations early in a run) may be entirely empty or flat.
#[derive(Debug, Clone, Copy)]
pub struct GateProfile {
    pub alpha_coverage_min: f64,
    pub nodata_ratio_max: f64,
    pub allow_dry_frame: bool,
}

impl GateProfile {
    pub fn standard() -> Self {
        Self { alpha_coverage_min: 0.05, nodata_ratio_max: 0.95, allow_dry_frame: false }
    }

    pub fn categorical_ptype() -> Self {
        Self { alpha_coverage_min: 0.002, nodata_ratio_max: 0.998, allow_dry_frame: false }
    }

    pub fn for_variable(categorical_ptype: bool, allow_dry_frame: bool) -> Self {
        let mut profile = if categorical_ptype { Self::categorical_ptype() } else { Self::standard() };
        if allow_dry_frame {
            profile.alpha_coverage_min = 0.0;
            profile.allow_dry_frame = true;
        }
        profile
    }
}

/// Checks RGBA + value buffers for catastrophic-failure signatures:
/// all-transparent, solid-color, flat value field, grid misalignment.
/// Returns hard-fail reasons (empty == pass); a declared-range mismatch is
/// logged as a warning only, never a hard fail.
pub fn check_pixel_sanity(rgba: &[u8], values: &[f32], spec_range: Option<(f64, f64)>, profile: &GateProfile) -> Vec<String> {
    let mut reasons = Vec::new();
    let pixel_count = rgba.len() / 4;

    let mut valid_count = 0usize;
    let mut band_values: [HashSet<u32>; 3] = [HashSet::new(), HashSet::new(), HashSet::new()];
    for px in rgba.chunks_exact(4) {
        if px[3] == 255 {
            valid_count += 1;
            for band in 0..3 {
                band_values[band].insert(px[band] as u32);
            }
        }
    }

    let coverage = if pixel_count > 0 { valid_count as f64 / pixel_count as f64 } else { 0.0 };
    if coverage < profile.alpha_coverage_min {
        reasons.push(format!(
            "alpha coverage too low: {:.2}% (<{:.1}%); likely all-transparent",
            coverage * 100.0,
            profile.alpha_coverage_min * 100.0
        ));
    }

    if !profile.allow_dry_frame {
        for (band, label) in band_values.iter().zip(["R", "G", "B"]) {
            if !band.is_empty() && band.len() < 2 {
                reasons.push(format!("band {label} is constant; likely colormap bug"));
            }
        }
    }

    let finite: Vec<f64> = values.iter().filter(|v| v.is_finite()).map(|&v| v as f64).collect();
    let nodata_ratio = if values.is_empty() { 1.0 } else { 1.0 - finite.len() as f64 / values.len() as f64 };
    if nodata_ratio > profile.nodata_ratio_max {
        reasons.push(format!(
            "value nodata ratio too high: {:.2}% (>{:.1}%); likely grid misalignment or empty fetch",
            nodata_ratio * 100.0,
            profile.nodata_ratio_max * 100.0
        ));
    }

    if !finite.is_empty() {
        let vmin = finite.iter().cloned().fold(f64::INFINITY, f64::min);
        let vmax = finite.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if vmin == vmax && !profile.allow_dry_frame {
            reasons.push(format!("value field is flat (min==max=={vmin:.2}); likely constant input or unit conversion error"));
        }
        if let Some((spec_min, spec_max)) = spec_range {
            let span = spec_max - spec_min;
            let margin = span * SPEC_RANGE_MARGIN_FRACTION;
            if vmin < spec_min - margin || vmax > spec_max + margin {
                tracing::warn!(vmin, vmax, spec_min, spec_max, "value range outside spec range ± 20%; may indicate unit error");
            }
        }
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_rgba(r: u8, g: u8, b: u8, a: u8, n: usize) -> Vec<u8> {
        (0..n).flat_map(|_| [r, g, b, a]).collect()
    }

    #[test]
    fn all_transparent_fails_alpha_coverage() {
        let rgba = solid_rgba(0, 0, 0, 0, 100);
        let values = vec![f32::NAN; 100];
        let reasons = check_pixel_sanity(&rgba, &values, None, &GateProfile::standard());
        assert!(reasons.iter().any(|r| r.contains("alpha coverage")));
    }

    #[test]
    fn solid_color_fails_band_distinctness() {
        let mut rgba = solid_rgba(50, 50, 50, 255, 100);
        // make alpha coverage pass (>5%) but every visible pixel is identical
        for px in rgba.chunks_exact_mut(4) {
            px[3] = 255;
        }
        let values: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let reasons = check_pixel_sanity(&rgba, &values, None, &GateProfile::standard());
        assert!(reasons.iter().any(|r| r.contains("is constant")));
    }

    #[test]
    fn healthy_frame_passes() {
        let rgba: Vec<u8> = (0..100).flat_map(|i| [i as u8, (i * 2) as u8, (i * 3) as u8, 255]).collect();
        let values: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let reasons = check_pixel_sanity(&rgba, &values, Some((0.0, 99.0)), &GateProfile::standard());
        assert!(reasons.is_empty());
    }

    #[test]
    fn flat_value_field_fails() {
        let rgba: Vec<u8> = (0..100).flat_map(|i| [i as u8, (i * 2) as u8, (i * 3) as u8, 255]).collect();
        let values = vec![42.0f32; 100];
        let reasons = check_pixel_sanity(&rgba, &values, None, &GateProfile::standard());
        assert!(reasons.iter().any(|r| r.contains("flat")));
    }

    #[test]
    fn sparse_categorical_frame_passes_relaxed_profile() {
        // 0.5% visible echo: fails the standard 5% floor, passes the 0.2%
        // categorical-ptype floor.
        let n = 1000;
        let mut rgba = solid_rgba(0, 0, 0, 0, n);
        let mut values = vec![f32::NAN; n];
        for i in 0..5 {
            let px = i * 4;
            rgba[px] = 10 + i as u8;
            rgba[px + 1] = 20 + i as u8;
            rgba[px + 2] = 30 + i as u8;
            rgba[px + 3] = 255;
            values[i] = i as f32;
        }
        assert!(!check_pixel_sanity(&rgba, &values, None, &GateProfile::standard()).is_empty());
        assert!(check_pixel_sanity(&rgba, &values, None, &GateProfile::categorical_ptype()).is_empty());
    }

    #[test]
    fn dry_frame_profile_accepts_empty_and_flat_fields() {
        let rgba = solid_rgba(0, 0, 0, 0, 100);
        let values = vec![f32::NAN; 100];
        let profile = GateProfile::for_variable(false, true);
        // nodata ratio still applies, so a fully-NaN field fails even when dry
        // frames are allowed; a flat-zero field passes.
        assert!(check_pixel_sanity(&rgba, &values, None, &profile).iter().all(|r| r.contains("nodata")));

        let flat = vec![0.0f32; 100];
        assert!(check_pixel_sanity(&rgba, &flat, None, &profile).is_empty());
    }
}
