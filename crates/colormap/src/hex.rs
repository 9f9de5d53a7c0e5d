//! Hex color parsing and linear ramp expansion. Ramps come in two forms:
//! a plain color list spaced evenly across `[0,1]`, and explicit
//! `(value, color)` anchors at arbitrary positions within a physical
//! range; both expand to the requested number of output stops by
//! per-channel linear interpolation.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Error)]
#[error("invalid hex color: {0}")]
pub struct HexParseError(pub String);

pub fn parse_hex(s: &str) -> Result<Rgb, HexParseError> {
    let s = s.trim().trim_start_matches('#');
    if s.len() != 6 {
        return Err(HexParseError(s.to_string()));
    }
    let byte = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&s[range], 16).map_err(|_| HexParseError(s.to_string()))
    };
    Ok(Rgb(byte(0..2)?, byte(2..4)?, byte(4..6)?))
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Linearly interpolates `y` at `x` given control points `(xs[i], ys[i])`
/// sorted ascending by `xs`, clamping outside the range.
fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    let i = xs.partition_point(|&v| v <= x).saturating_sub(1);
    let (x0, x1) = (xs[i], xs[i + 1]);
    let t = if x1 > x0 { (x - x0) / (x1 - x0) } else { 0.0 };
    lerp(ys[i], ys[i + 1], t)
}

/// Expands explicit `(value, color)` anchors into `n` evenly spaced RGB
/// samples across `[range_min, range_max]`, interpolating per channel at
/// each anchor's value position. Anchors need not be evenly spaced; values
/// outside the anchored span clamp to the nearest end color.
pub fn expand_anchored_ramp(anchors: &[(f64, Rgb)], range_min: f64, range_max: f64, n: usize) -> Vec<Rgb> {
    assert!(!anchors.is_empty(), "expand_anchored_ramp requires at least one anchor");
    let mut sorted: Vec<(f64, Rgb)> = anchors.to_vec();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let xs: Vec<f64> = sorted.iter().map(|a| a.0).collect();
    let rs: Vec<f64> = sorted.iter().map(|a| a.1 .0 as f64).collect();
    let gs: Vec<f64> = sorted.iter().map(|a| a.1 .1 as f64).collect();
    let bs: Vec<f64> = sorted.iter().map(|a| a.1 .2 as f64).collect();

    let count = n.max(1);
    (0..count)
        .map(|i| {
            let frac = if count > 1 { i as f64 / (count - 1) as f64 } else { 0.0 };
            let v = range_min + (range_max - range_min) * frac;
            let r = interp(v, &xs, &rs).round().clamp(0.0, 255.0) as u8;
            let g = interp(v, &xs, &gs).round().clamp(0.0, 255.0) as u8;
            let b = interp(v, &xs, &bs).round().clamp(0.0, 255.0) as u8;
            Rgb(r, g, b)
        })
        .collect()
}

/// Expands `anchors` (spaced evenly across `[0,1]`) into `n` evenly spaced
/// RGB samples via per-channel linear interpolation.
pub fn expand_ramp(anchors: &[Rgb], n: usize) -> Vec<Rgb> {
    assert!(!anchors.is_empty(), "expand_ramp requires at least one anchor");
    if anchors.len() == 1 {
        return vec![anchors[0]; n];
    }
    let stop_positions: Vec<f64> = (0..anchors.len())
        .map(|i| i as f64 / (anchors.len() - 1) as f64)
        .collect();
    let target_positions: Vec<f64> = if n <= 1 {
        vec![0.0]
    } else {
        (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
    };
    let rs: Vec<f64> = anchors.iter().map(|c| c.0 as f64).collect();
    let gs: Vec<f64> = anchors.iter().map(|c| c.1 as f64).collect();
    let bs: Vec<f64> = anchors.iter().map(|c| c.2 as f64).collect();

    target_positions
        .iter()
        .map(|&t| {
            let r = interp(t, &stop_positions, &rs).round().clamp(0.0, 255.0) as u8;
            let g = interp(t, &stop_positions, &gs).round().clamp(0.0, 255.0) as u8;
            let b = interp(t, &stop_positions, &bs).round().clamp(0.0, 255.0) as u8;
            Rgb(r, g, b)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex() {
        assert_eq!(parse_hex("#ff0000").unwrap(), Rgb(255, 0, 0));
        assert_eq!(parse_hex("00ff00").unwrap(), Rgb(0, 255, 0));
    }

    #[test]
    fn expand_ramp_midpoint() {
        let out = expand_ramp(&[Rgb(0, 0, 0), Rgb(255, 255, 255)], 3);
        assert_eq!(out[0], Rgb(0, 0, 0));
        assert_eq!(out[1], Rgb(128, 128, 128));
        assert_eq!(out[2], Rgb(255, 255, 255));
    }

    #[test]
    fn expand_ramp_single_anchor_is_constant() {
        let out = expand_ramp(&[Rgb(10, 20, 30)], 4);
        assert!(out.iter().all(|&c| c == Rgb(10, 20, 30)));
    }

    #[test]
    fn anchored_ramp_interpolates_at_value_positions() {
        // Anchors crowd the low end of the range: the ramp must hit white
        // at v=64 and stay clamped there for the rest of the span.
        let anchors = [(0.0, Rgb(0, 0, 0)), (64.0, Rgb(255, 255, 255))];
        let out = expand_anchored_ramp(&anchors, 0.0, 255.0, 256);
        assert_eq!(out[0], Rgb(0, 0, 0));
        assert!((out[32].0 as i32 - 128).abs() <= 2);
        assert_eq!(out[64], Rgb(255, 255, 255));
        assert_eq!(out[255], Rgb(255, 255, 255));
    }

    #[test]
    fn anchored_ramp_sorts_unordered_anchors() {
        let anchors = [(100.0, Rgb(255, 0, 0)), (0.0, Rgb(0, 0, 0))];
        let out = expand_anchored_ramp(&anchors, 0.0, 100.0, 3);
        assert_eq!(out[0], Rgb(0, 0, 0));
        assert_eq!(out[2], Rgb(255, 0, 0));
    }
}
