//! Color map application: float32 field -> one RGBA pixel per input cell,
//! rendered row-parallel for the three color-map kinds this system needs.

use crate::hex::{expand_anchored_ramp, expand_ramp, parse_hex, Rgb};
use crate::types::{ColorMapSpec, Rgba};
use rayon::prelude::*;

/// Builds the 256-entry RGBA LUT for a continuous color map: piecewise
/// linear RGB interpolation, alpha fixed at 255. Explicit value-positioned
/// anchors win over the evenly spaced colors list when both are given.
fn build_continuous_lut(colors: &[String], anchors: &[(f64, String)], range_min: f64, range_max: f64) -> [Rgb; 256] {
    let expanded = if anchors.is_empty() {
        let parsed: Vec<Rgb> = colors
            .iter()
            .map(|c| parse_hex(c).unwrap_or(Rgb(0, 0, 0)))
            .collect();
        expand_ramp(&parsed, 256)
    } else {
        let parsed: Vec<(f64, Rgb)> = anchors
            .iter()
            .map(|(v, c)| (*v, parse_hex(c).unwrap_or(Rgb(0, 0, 0))))
            .collect();
        expand_anchored_ramp(&parsed, range_min, range_max, 256)
    };
    let mut lut = [Rgb(0, 0, 0); 256];
    lut.copy_from_slice(&expanded);
    lut
}

/// Applies a color-map spec to `data` (row-major, `height * width` finite or
/// NaN values) producing one RGBA pixel per input pixel.
pub fn apply(spec: &ColorMapSpec, data: &[f32], width: usize) -> Vec<Rgba> {
    match spec {
        ColorMapSpec::Continuous { range_min, range_max, colors, anchors, transparent_below_min } => {
            apply_continuous(data, width, *range_min, *range_max, colors, anchors, *transparent_below_min)
        }
        ColorMapSpec::Discrete { breaks, colors, transparent_below_min } => {
            apply_discrete(data, width, breaks, colors, *transparent_below_min)
        }
        ColorMapSpec::Indexed { colors, transparent_zero } => {
            apply_indexed(data, width, colors, *transparent_zero)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_continuous(
    data: &[f32],
    width: usize,
    range_min: f64,
    range_max: f64,
    colors: &[String],
    anchors: &[(f64, String)],
    transparent_below_min: bool,
) -> Vec<Rgba> {
    let lut = build_continuous_lut(colors, anchors, range_min, range_max);
    let span = range_max - range_min;
    let mut out = vec![Rgba::default(); data.len()];
    out.par_chunks_mut(width.max(1)).zip(data.par_chunks(width.max(1))).for_each(
        |(out_row, in_row)| {
            for (px, &v) in out_row.iter_mut().zip(in_row.iter()) {
                let v = v as f64;
                if !v.is_finite() {
                    *px = Rgba(0, 0, 0, 0);
                    continue;
                }
                if transparent_below_min && v < range_min {
                    *px = Rgba(0, 0, 0, 0);
                    continue;
                }
                let idx = if span == 0.0 {
                    0
                } else {
                    (((v - range_min) / span) * 255.0).round().clamp(0.0, 255.0) as usize
                };
                let Rgb(r, g, b) = lut[idx];
                *px = Rgba(r, g, b, 255);
            }
        },
    );
    out
}

/// Right-open bin lookup: the index of the bin `[breaks[i], breaks[i+1])`
/// holding `v`; values below the first breakpoint yield `-1`.
fn digitize_bin(v: f64, breaks: &[f64]) -> i64 {
    let idx = breaks.partition_point(|&b| b <= v);
    idx as i64 - 1
}

fn apply_discrete(
    data: &[f32],
    width: usize,
    breaks: &[f64],
    colors: &[String],
    transparent_below_min: bool,
) -> Vec<Rgba> {
    let palette: Vec<Rgb> = colors.iter().map(|c| parse_hex(c).unwrap_or(Rgb(0, 0, 0))).collect();
    let max_idx = palette.len().saturating_sub(1) as i64;
    let first_break = breaks.first().copied().unwrap_or(f64::NEG_INFINITY);

    let mut out = vec![Rgba::default(); data.len()];
    out.par_chunks_mut(width.max(1)).zip(data.par_chunks(width.max(1))).for_each(
        |(out_row, in_row)| {
            for (px, &v) in out_row.iter_mut().zip(in_row.iter()) {
                let v = v as f64;
                if !v.is_finite() {
                    *px = Rgba(0, 0, 0, 0);
                    continue;
                }
                if transparent_below_min && v < first_break {
                    *px = Rgba(0, 0, 0, 0);
                    continue;
                }
                let bin = digitize_bin(v, breaks).clamp(0, max_idx) as usize;
                let Rgb(r, g, b) = palette.get(bin).copied().unwrap_or(Rgb(0, 0, 0));
                *px = Rgba(r, g, b, 255);
            }
        },
    );
    out
}

fn apply_indexed(data: &[f32], width: usize, colors: &[String], transparent_zero: bool) -> Vec<Rgba> {
    let palette: Vec<Rgb> = colors.iter().map(|c| parse_hex(c).unwrap_or(Rgb(0, 0, 0))).collect();
    let max_idx = palette.len().saturating_sub(1) as i64;

    let mut out = vec![Rgba::default(); data.len()];
    out.par_chunks_mut(width.max(1)).zip(data.par_chunks(width.max(1))).for_each(
        |(out_row, in_row)| {
            for (px, &v) in out_row.iter_mut().zip(in_row.iter()) {
                if !v.is_finite() {
                    *px = Rgba(0, 0, 0, 0);
                    continue;
                }
                let idx = (v.round() as i64).clamp(0, max_idx);
                if transparent_zero && idx == 0 {
                    *px = Rgba(0, 0, 0, 0);
                    continue;
                }
                let Rgb(r, g, b) = palette.get(idx as usize).copied().unwrap_or(Rgb(0, 0, 0));
                *px = Rgba(r, g, b, 255);
            }
        },
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_grayscale_round_trip() {
        let spec = ColorMapSpec::Continuous {
            range_min: 0.0,
            range_max: 255.0,
            colors: vec!["#000000".into(), "#ffffff".into()],
            anchors: Vec::new(),
            transparent_below_min: false,
        };
        let data = [0.0_f32, 128.0, 255.0];
        let out = apply(&spec, &data, 3);
        assert_eq!(out[0], Rgba(0, 0, 0, 255));
        assert!((out[1].0 as i32 - 128).abs() <= 1);
        assert_eq!(out[2], Rgba(255, 255, 255, 255));
    }

    #[test]
    fn continuous_anchors_pin_colors_to_values() {
        // Non-uniform anchors: the black→white transition finishes a
        // quarter of the way through the range, then holds white.
        let spec = ColorMapSpec::Continuous {
            range_min: 0.0,
            range_max: 100.0,
            colors: Vec::new(),
            anchors: vec![(0.0, "#000000".into()), (25.0, "#ffffff".into()), (100.0, "#ffffff".into())],
            transparent_below_min: false,
        };
        let data = [0.0_f32, 12.5, 25.0, 80.0];
        let out = apply(&spec, &data, 4);
        assert_eq!(out[0], Rgba(0, 0, 0, 255));
        assert!((out[1].0 as i32 - 128).abs() <= 3);
        assert_eq!(out[2], Rgba(255, 255, 255, 255));
        assert_eq!(out[3], Rgba(255, 255, 255, 255));
    }

    #[test]
    fn continuous_nan_is_transparent() {
        let spec = ColorMapSpec::Continuous {
            range_min: 0.0,
            range_max: 10.0,
            colors: vec!["#000000".into(), "#ffffff".into()],
            anchors: Vec::new(),
            transparent_below_min: false,
        };
        let out = apply(&spec, &[f32::NAN], 1);
        assert_eq!(out[0], Rgba(0, 0, 0, 0));
    }

    #[test]
    fn discrete_right_open_bins() {
        let spec = ColorMapSpec::Discrete {
            breaks: vec![0.0, 10.0, 20.0],
            colors: vec!["#ff0000".into(), "#00ff00".into(), "#0000ff".into()],
            transparent_below_min: true,
        };
        // value exactly equal to a breakpoint lands in that breakpoint's bin.
        let data = [0.0_f32, 10.0, 20.0, -1.0];
        let out = apply(&spec, &data, 4);
        assert_eq!(out[0], Rgba(255, 0, 0, 255));
        assert_eq!(out[1], Rgba(0, 255, 0, 255));
        assert_eq!(out[2], Rgba(0, 0, 255, 255));
        assert_eq!(out[3], Rgba(0, 0, 0, 0));
    }

    #[test]
    fn indexed_lookup_and_transparent_zero() {
        let spec = ColorMapSpec::Indexed {
            colors: vec!["#000000".into(), "#ff0000".into(), "#00ff00".into()],
            transparent_zero: true,
        };
        let data = [0.0_f32, 1.0, 2.0, 5.0];
        let out = apply(&spec, &data, 4);
        assert_eq!(out[0], Rgba(0, 0, 0, 0));
        assert_eq!(out[1], Rgba(255, 0, 0, 255));
        assert_eq!(out[2], Rgba(0, 255, 0, 255));
        assert_eq!(out[3], Rgba(0, 255, 0, 255)); // clamped to last index
    }
}
