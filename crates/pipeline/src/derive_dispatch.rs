//! Derive-strategy dispatch: resolves which component variables a derived
//! variable needs, fetches and warps each onto the target grid, then calls
//! the matching pure function in `derive`. The cumulative strategies read a
//! rolling-window series of forecast steps instead of a single fh.

use crate::error::{PipelineError, PipelineResult};
use capabilities::{Registry, VariableCapability, VariableKind};
use chrono::{DateTime, Utc};
use fetch::{FetchRequest, VariableFetcher};
use std::collections::HashMap;
use wx_common::{warp, Resampling, SourceRaster, TargetGrid};

/// Resampling selection by variable kind: smoothing a categorical or
/// palette-indexed field invents classes that never existed upstream, so
/// only continuous fields get bilinear.
pub(crate) fn resampling_for_kind(kind: VariableKind) -> Resampling {
    match kind {
        VariableKind::Continuous => Resampling::Bilinear,
        VariableKind::Discrete | VariableKind::Indexed => Resampling::Nearest,
    }
}

pub struct DeriveContext<'a> {
    pub registry: &'a Registry,
    pub fetcher: &'a dyn VariableFetcher,
    pub model_id: &'a str,
    pub product: &'a str,
    pub run_time: DateTime<Utc>,
    pub target_grid: &'a TargetGrid,
}

fn require_hint<'a>(hints: &'a HashMap<String, String>, key: &str, strategy: &str) -> PipelineResult<&'a str> {
    hints
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| PipelineError::UnsupportedDeriveStrategy(format!("{strategy}: missing hint {key:?}")))
}

/// Fetches one component field and warps it onto the target grid, in the
/// component's SOURCE units. Strategies own all unit math over their
/// components (hypot then m/s→mph, kg/m² sums then →inches, dBZ
/// normalization), so the component's own display `conversion_id` must not
/// be applied here.
async fn fetch_component_warped(ctx: &DeriveContext<'_>, fh: u32, component_key: &str) -> PipelineResult<(Vec<f32>, usize, usize)> {
    let var = ctx.registry.get_variable(ctx.model_id, component_key)?.clone();
    let pattern = var
        .selectors
        .search
        .first()
        .cloned()
        .ok_or_else(|| PipelineError::UnsupportedDeriveStrategy(format!("component {component_key} has no search pattern")))?;
    let req = FetchRequest {
        model_id: ctx.model_id.to_string(),
        product: ctx.product.to_string(),
        search_pattern: pattern,
        run_time: ctx.run_time,
        fh,
    };
    let raw = ctx.fetcher.fetch(&req).await?;
    let src = SourceRaster { data: &raw.data, height: raw.height, width: raw.width, crs: raw.crs, affine: raw.affine };
    let (warped, _affine, h, w) = warp(&src, ctx.target_grid, resampling_for_kind(var.kind), None);
    Ok((warped, w, h))
}

fn grid_of(data: Vec<f32>, width: usize, height: usize) -> derive::Grid {
    derive::Grid { data, width, height }
}

async fn fetch_series_warped(ctx: &DeriveContext<'_>, component_key: &str, step_hours: u32, upto_fh: u32) -> PipelineResult<Vec<derive::Grid>> {
    let step_hours = step_hours.max(1);
    let mut steps = Vec::new();
    let mut fh = step_hours;
    while fh <= upto_fh {
        let (data, w, h) = fetch_component_warped(ctx, fh, component_key).await?;
        steps.push(grid_of(data, w, h));
        fh += step_hours;
    }
    if steps.is_empty() {
        return Err(PipelineError::UnsupportedDeriveStrategy(format!(
            "no rolling-window steps available for component {component_key} up to fh{upto_fh:03}"
        )));
    }
    Ok(steps)
}

/// Computes one derived variable's field at `fh`, returning the field plus
/// its pixel dimensions on the target grid.
pub async fn derive_field(ctx: &DeriveContext<'_>, fh: u32, var: &VariableCapability) -> PipelineResult<(derive::Grid, usize, usize)> {
    let strategy = var
        .derive_strategy_id
        .as_deref()
        .ok_or_else(|| PipelineError::UnsupportedDeriveStrategy(format!("{} has no derive_strategy_id", var.var_key)))?;
    let hints = &var.selectors.hints;

    match strategy {
        "wspd10m" => {
            // A direct speed field wins when the catalog names one; a miss
            // there falls back to the u/v hypot rather than failing the frame.
            if let Some(speed_key) = hints.get("speed_component") {
                match fetch_component_warped(ctx, fh, speed_key).await {
                    Ok((speed, w, h)) => {
                        let grid = derive::convert_speed_to_mph(&grid_of(speed, w, h));
                        return Ok((grid, w, h));
                    }
                    Err(PipelineError::Fetch(e)) => {
                        tracing::warn!(component = %speed_key, error = %e, "speed component unavailable, deriving from u/v");
                    }
                    Err(other) => return Err(other),
                }
            }
            let u_key = require_hint(hints, "u_component", strategy)?;
            let v_key = require_hint(hints, "v_component", strategy)?;
            let (u_data, w, h) = fetch_component_warped(ctx, fh, u_key).await?;
            let (v_data, _, _) = fetch_component_warped(ctx, fh, v_key).await?;
            let grid = derive::derive_wspd10m(&grid_of(u_data, w, h), &grid_of(v_data, w, h))?;
            Ok((grid, w, h))
        }

        "radar_ptype_combo" => {
            let refl_key = require_hint(hints, "refl_component", strategy)?;
            let rain_key = require_hint(hints, "rain_component", strategy)?;
            let snow_key = require_hint(hints, "snow_component", strategy)?;
            let sleet_key = require_hint(hints, "sleet_component", strategy)?;
            let frzr_key = require_hint(hints, "frzr_component", strategy)?;
            let min_visible_dbz = var.selectors.hint_f64("min_visible_dbz", colormap::palette::DEFAULT_MIN_VISIBLE_DBZ) as f32;

            let (refl, w, h) = fetch_component_warped(ctx, fh, refl_key).await?;
            let (rain, _, _) = fetch_component_warped(ctx, fh, rain_key).await?;
            let (snow, _, _) = fetch_component_warped(ctx, fh, snow_key).await?;
            let (sleet, _, _) = fetch_component_warped(ctx, fh, sleet_key).await?;
            let (frzr, _, _) = fetch_component_warped(ctx, fh, frzr_key).await?;

            let components = derive::RadarPtypeComponents {
                refl: &grid_of(refl, w, h),
                rain: &grid_of(rain, w, h),
                snow: &grid_of(snow, w, h),
                sleet: &grid_of(sleet, w, h),
                frzr: &grid_of(frzr, w, h),
            };
            let grid = derive::derive_radar_ptype_combo(&components, min_visible_dbz)?;
            Ok((grid, w, h))
        }

        "precip_ptype_blend" => {
            let prate_key = require_hint(hints, "prate_component", strategy)?;
            let rain_key = require_hint(hints, "rain_component", strategy)?;
            let snow_key = require_hint(hints, "snow_component", strategy)?;
            let sleet_key = require_hint(hints, "sleet_component", strategy)?;
            let frzr_key = require_hint(hints, "frzr_component", strategy)?;

            let (prate, w, h) = fetch_component_warped(ctx, fh, prate_key).await?;
            let (rain, _, _) = fetch_component_warped(ctx, fh, rain_key).await?;
            let (snow, _, _) = fetch_component_warped(ctx, fh, snow_key).await?;
            let (sleet, _, _) = fetch_component_warped(ctx, fh, sleet_key).await?;
            let (frzr, _, _) = fetch_component_warped(ctx, fh, frzr_key).await?;

            let components = derive::PrecipPtypeComponents {
                prate: &grid_of(prate, w, h),
                rain: &grid_of(rain, w, h),
                snow: &grid_of(snow, w, h),
                sleet: &grid_of(sleet, w, h),
                frzr: &grid_of(frzr, w, h),
            };
            let grid = derive::derive_precip_ptype_blend(&components)?;
            Ok((grid, w, h))
        }

        "precip_total_cumulative" => {
            let apcp_key = require_hint(hints, "apcp_component", strategy)?;
            let step_hours = var.selectors.hint_u32("step_hours", 6);
            let min_step = var.selectors.hint_f64("min_step_lwe_kgm2", 0.01) as f32;

            let steps = fetch_series_warped(ctx, apcp_key, step_hours, fh).await?;
            let (w, h) = (steps[0].width, steps[0].height);
            let grid = derive::derive_precip_total_cumulative(&steps, min_step)?;
            Ok((grid, w, h))
        }

        "snowfall_total_10to1_cumulative" => {
            let apcp_key = require_hint(hints, "apcp_component", strategy)?;
            let snow_key = require_hint(hints, "snow_component", strategy)?;
            let step_hours = var.selectors.hint_u32("step_hours", 6);
            let min_step = var.selectors.hint_f64("min_step_lwe_kgm2", 0.01) as f32;
            let snow_mask_threshold = var.selectors.hint_f64("snow_mask_threshold", 0.5) as f32;
            let slr = var.selectors.hint_f64("slr", 10.0) as f32;

            let apcp_steps = fetch_series_warped(ctx, apcp_key, step_hours, fh).await?;
            let csnow_steps = fetch_series_warped(ctx, snow_key, step_hours, fh).await?;
            let (w, h) = (apcp_steps[0].width, apcp_steps[0].height);
            let grid =
                derive::derive_snowfall_total_10to1_cumulative(&apcp_steps, &csnow_steps, slr, snow_mask_threshold, min_step)?;
            Ok((grid, w, h))
        }

        other => Err(PipelineError::UnsupportedDeriveStrategy(other.to_string())),
    }
}
