//! `precip_total_cumulative` and `snowfall_total_10to1_cumulative`: running
//! sums across successive rolling-window APCP steps up to the requested
//! forecast hour.
//!
//! `kg/m²` liquid-water-equivalent is numerically `mm` of depth, so the
//! same `KGM2_TO_IN` factor converts both precip and snow-water-equivalent
//! sums to inches once the snow-liquid-ratio has been applied.

use crate::error::{DeriveError, DeriveResult};
use crate::grid::Grid;

pub const KGM2_TO_IN: f32 = 0.03937007874015748;

fn check_series_shapes(series: &[Grid]) -> DeriveResult<(usize, usize)> {
    let first = series.first().expect("at least one step required");
    for step in &series[1..] {
        first.check_same_shape(step)?;
    }
    Ok((first.width, first.height))
}

/// Sums qualifying APCP steps (below `min_step_lwe_kgm2` is treated as
/// measurement noise and contributes zero) and converts to inches.
pub fn derive_precip_total_cumulative(apcp_steps: &[Grid], min_step_lwe_kgm2: f32) -> DeriveResult<Grid> {
    if apcp_steps.is_empty() {
        return Err(DeriveError::ShapeMismatch { a_w: 0, a_h: 0, b_w: 0, b_h: 0 });
    }
    let (width, height) = check_series_shapes(apcp_steps)?;
    let n = width * height;
    let mut out = vec![0.0f32; n];

    for i in 0..n {
        let mut sum_kgm2 = 0.0f32;
        for step in apcp_steps {
            let v = step.data[i];
            if v.is_finite() && v >= min_step_lwe_kgm2 {
                sum_kgm2 += v;
            }
        }
        out[i] = sum_kgm2 * KGM2_TO_IN;
    }

    Ok(Grid { data: out, width, height })
}

/// Sums APCP steps gated by a categorical snow mask, applies the
/// snow-liquid-ratio, and converts to inches. A single step whose `csnow`
/// value falls outside the valid `[0, 1]` fraction range poisons the whole
/// cell's result to `NaN`; an out-of-range categorical mask is corrupted
/// upstream data, not "no snow".
pub fn derive_snowfall_total_10to1_cumulative(
    apcp_steps: &[Grid],
    csnow_steps: &[Grid],
    slr: f32,
    snow_mask_threshold: f32,
    min_step_lwe_kgm2: f32,
) -> DeriveResult<Grid> {
    if apcp_steps.is_empty() || apcp_steps.len() != csnow_steps.len() {
        return Err(DeriveError::ShapeMismatch { a_w: apcp_steps.len(), a_h: 0, b_w: csnow_steps.len(), b_h: 0 });
    }
    let (width, height) = check_series_shapes(apcp_steps)?;
    check_series_shapes(csnow_steps)?;
    apcp_steps[0].check_same_shape(&csnow_steps[0])?;
    let n = width * height;
    let mut out = vec![0.0f32; n];

    for i in 0..n {
        let mut sum_snow_kgm2 = 0.0f32;
        let mut poisoned = false;
        for (apcp, csnow) in apcp_steps.iter().zip(csnow_steps) {
            let csnow_v = csnow.data[i];
            if !csnow_v.is_finite() || !(0.0..=1.0).contains(&csnow_v) {
                poisoned = true;
                break;
            }
            let apcp_v = apcp.data[i];
            if apcp_v.is_finite() && apcp_v >= min_step_lwe_kgm2 && csnow_v >= snow_mask_threshold {
                sum_snow_kgm2 += apcp_v;
            }
        }
        out[i] = if poisoned { f32::NAN } else { sum_snow_kgm2 * slr * KGM2_TO_IN };
    }

    Ok(Grid { data: out, width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid2x2(v00: f32, v01: f32, v10: f32, v11: f32) -> Grid {
        Grid { data: vec![v00, v01, v10, v11], width: 2, height: 2 }
    }

    #[test]
    fn snowfall_matches_reference_vector() {
        let apcp_steps = vec![
            grid2x2(2.0, 2.0, 2.0, 2.0),
            grid2x2(1.0, 1.0, 1.0, 1.0),
            grid2x2(3.0, 3.0, 3.0, 3.0),
            grid2x2(4.0, 4.0, 4.0, 4.0),
        ];
        let csnow_steps = vec![
            grid2x2(1.0, 393661.4, 0.0, 0.0),
            grid2x2(0.0, 393661.4, 0.0, 0.0),
            grid2x2(0.4, 393661.4, 1.0, 0.0),
            grid2x2(0.6, 393661.4, 1.0, 0.0),
        ];

        let out = derive_snowfall_total_10to1_cumulative(&apcp_steps, &csnow_steps, 10.0, 0.5, 0.01).unwrap();

        assert!((out.data[0] - 2.3622048).abs() < 1e-5);
        assert!(out.data[1].is_nan());
        assert!((out.data[2] - 2.7559056).abs() < 1e-5);
        assert!((out.data[3] - 0.0).abs() < 1e-5);
    }

    #[test]
    fn precip_total_sums_qualifying_steps_and_converts_to_inches() {
        let apcp_steps = vec![grid2x2(2.0, 2.0, 2.0, 2.0), grid2x2(0.005, 0.005, 0.005, 0.005)];
        let out = derive_precip_total_cumulative(&apcp_steps, 0.01).unwrap();
        // second step is below the noise floor and contributes nothing
        assert!((out.data[0] - 2.0 * KGM2_TO_IN).abs() < 1e-6);
    }
}
