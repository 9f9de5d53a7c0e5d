//! Per-frame build orchestration: resolve capability → fetch/derive →
//! convert units → warp → colorize → encode → gate → sidecar.
//!
//! Gate 2 runs on the in-memory RGBA/value buffers *before* the Artifact
//! Encoder is invoked; a bad frame never reaches GDAL at all. Gate 1 then
//! validates the two COGs that were actually written. Either gate failing
//! drops the frame (`Ok(None)`) rather than erroring; only infrastructure
//! failures (fetch, GDAL subprocess, io) propagate as `Err`.

use crate::contour::{self, FREEZE_LEVEL_F};
use crate::derive_dispatch::{derive_field, resampling_for_kind, DeriveContext};
use crate::error::{PipelineError, PipelineResult};
use crate::gate2::{check_pixel_sanity, GateProfile};
use crate::sidecar::{build_sidecar_json, ContourRef, PtypeTables, Sidecar, SidecarInput};
use capabilities::{RegionSpec, Registry, VariableCapability, VariableKind};
use chrono::{DateTime, Utc};
use colormap::Rgba;
use fetch::{convert_units, FetchRequest, VariableFetcher};
use raster_io::{validate_cog, write_rgba_cog, write_value_cog, CogExpectation, OverviewResampling};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use wx_common::{affine_and_shape, project_bbox, warp, Crs, RunId, SourceRaster, TargetGrid};

pub struct BuildFrameRequest<'a> {
    pub registry: &'a Registry,
    pub fetcher: &'a dyn VariableFetcher,
    pub model_id: &'a str,
    pub region: &'a RegionSpec,
    pub var_id: &'a str,
    pub run_time: DateTime<Utc>,
    pub fh: u32,
    pub staging_root: &'a Path,
}

#[derive(Debug, Clone)]
pub struct FrameArtifacts {
    pub rgba_cog_path: PathBuf,
    pub value_cog_path: PathBuf,
    pub sidecar_path: PathBuf,
    pub sidecar: Sidecar,
}

fn flatten_rgba(pixels: &[Rgba]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() * 4);
    for px in pixels {
        out.extend_from_slice(&[px.0, px.1, px.2, px.3]);
    }
    out
}

fn finite_min_max(values: &[f32]) -> (Option<f64>, Option<f64>) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut any = false;
    for &v in values {
        if v.is_finite() {
            any = true;
            let v = v as f64;
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
    }
    if any {
        (Some(min), Some(max))
    } else {
        (None, None)
    }
}

fn spec_range_of(color_map: &colormap::ColorMapSpec) -> Option<(f64, f64)> {
    match color_map {
        colormap::ColorMapSpec::Continuous { range_min, range_max, .. } => Some((*range_min, *range_max)),
        _ => None,
    }
}

/// The two categorical-ptype composites get the relaxed Gate 2 thresholds;
/// an echo-free frame is weather, not a build failure.
fn is_categorical_ptype(var: &VariableCapability) -> bool {
    matches!(var.derive_strategy_id.as_deref(), Some("radar_ptype_combo") | Some("precip_ptype_blend"))
}

fn ptype_tables_for(var: &VariableCapability) -> Option<PtypeTables> {
    match var.color_map_id.as_deref() {
        Some("radar_ptype") => Some(PtypeTables::from(&colormap::palette::build_radar_ptype_flat_palette())),
        Some("precip_ptype") => Some(PtypeTables::from(&colormap::palette::build_precip_ptype_flat_palette())),
        _ => None,
    }
}

fn staging_dir(staging_root: &Path, model_id: &str, run_id: &RunId, var_id: &str) -> PathBuf {
    staging_root.join(model_id).join(run_id.as_str()).join(var_id)
}

/// The three paths one frame occupies in staging, without building
/// anything; the scheduler uses this to check whether a `(var, fh)` target
/// is already satisfied before submitting it to the worker pool.
pub struct FramePaths {
    pub rgba_cog_path: PathBuf,
    pub value_cog_path: PathBuf,
    pub sidecar_path: PathBuf,
}

pub fn frame_paths(staging_root: &Path, model_id: &str, run_id: &RunId, var_id: &str, fh: u32) -> FramePaths {
    let dir = staging_dir(staging_root, model_id, run_id, var_id);
    FramePaths {
        rgba_cog_path: dir.join(format!("fh{fh:03}.rgba.cog.tif")),
        value_cog_path: dir.join(format!("fh{fh:03}.val.cog.tif")),
        sidecar_path: dir.join(format!("fh{fh:03}.json")),
    }
}

impl FramePaths {
    pub fn all_exist(&self) -> bool {
        self.rgba_cog_path.is_file() && self.value_cog_path.is_file() && self.sidecar_path.is_file()
    }
}

fn cleanup_artifacts(paths: &[&Path]) {
    for p in paths {
        let _ = std::fs::remove_file(p);
    }
}

async fn write_sidecar_atomic(path: &Path, sidecar: &Sidecar) -> PipelineResult<()> {
    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(sidecar).map_err(|e| PipelineError::Io { path: path.display().to_string(), detail: e.to_string() })?;
    tokio::fs::write(&tmp_path, &body)
        .await
        .map_err(|e| PipelineError::Io { path: tmp_path.display().to_string(), detail: e.to_string() })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| PipelineError::Io { path: path.display().to_string(), detail: e.to_string() })?;
    Ok(())
}

/// Builds one (model, region, var, fh) frame: two COGs plus a sidecar, or
/// `None` if either quality gate rejects it.
pub async fn build_frame(req: BuildFrameRequest<'_>) -> PipelineResult<Option<FrameArtifacts>> {
    let var_key = req.registry.normalize_var_key(req.model_id, req.var_id)?;
    let var = req.registry.get_variable(req.model_id, &var_key)?.clone();
    let model = req.registry.get_model(req.model_id)?.clone();

    let grid_meters = *model
        .grid_meters_by_region
        .get(&req.region.id)
        .ok_or_else(|| PipelineError::NoGridMetersForRegion { model: req.model_id.to_string(), region: req.region.id.clone() })?;

    let bbox_3857 = project_bbox(&req.region.bbox_wgs84, Crs::Epsg4326, Crs::Epsg3857);
    let target_grid = TargetGrid { bbox_3857, meters: grid_meters };
    let (affine, height, width) = affine_and_shape(&target_grid);

    let values: Vec<f32> = if var.derive_strategy_id.is_some() {
        let ctx = DeriveContext {
            registry: req.registry,
            fetcher: req.fetcher,
            model_id: req.model_id,
            product: &model.product_code,
            run_time: req.run_time,
            target_grid: &target_grid,
        };
        let (grid, _w, _h) = derive_field(&ctx, req.fh, &var).await?;
        grid.data
    } else {
        let pattern = var
            .selectors
            .search
            .first()
            .cloned()
            .ok_or_else(|| PipelineError::UnsupportedDeriveStrategy(format!("{} is primary but has no search pattern", var.var_key)))?;
        let fetch_req = FetchRequest {
            model_id: req.model_id.to_string(),
            product: model.product_code.clone(),
            search_pattern: pattern,
            run_time: req.run_time,
            fh: req.fh,
        };
        let raw = req.fetcher.fetch(&fetch_req).await?;
        // Conversion lookup prefers the declared id, then the variable key
        // itself; an unregistered name is a no-op either way.
        let conversion = var.conversion_id.as_deref().unwrap_or(&var.var_key);
        let converted = convert_units(&raw.data, Some(conversion));
        let src = SourceRaster { data: &converted, height: raw.height, width: raw.width, crs: raw.crs, affine: raw.affine };
        let (warped, _affine, _h, _w) = warp(&src, &target_grid, resampling_for_kind(var.kind), None);
        warped
    };

    let color_map_id = var.color_map_id.as_deref().ok_or_else(|| PipelineError::MissingColorMap { var: var.var_key.clone() })?;
    let color_map = req.registry.get_color_map(color_map_id).ok_or_else(|| PipelineError::UnknownColorMap(color_map_id.to_string()))?;

    let rgba_pixels = colormap::apply(color_map, &values, width);
    let rgba_bytes = flatten_rgba(&rgba_pixels);

    let spec_range = if matches!(var.kind, VariableKind::Continuous) { spec_range_of(color_map) } else { None };
    let gate_profile = GateProfile::for_variable(is_categorical_ptype(&var), var.constraints.allow_dry_frame);
    let gate2_reasons = check_pixel_sanity(&rgba_bytes, &values, spec_range, &gate_profile);
    if !gate2_reasons.is_empty() {
        tracing::warn!(model = req.model_id, var = %var.var_key, fh = req.fh, reasons = ?gate2_reasons, "gate 2 rejected frame");
        return Ok(None);
    }

    let run_id = RunId::from_cycle(req.run_time);
    let dir = staging_dir(req.staging_root, req.model_id, &run_id, &var.var_key);
    tokio::fs::create_dir_all(&dir).await.map_err(|e| PipelineError::Io { path: dir.display().to_string(), detail: e.to_string() })?;

    let paths = frame_paths(req.staging_root, req.model_id, &run_id, &var.var_key, req.fh);
    let hover_downsample = var.selectors.hint_u32("hover_value_downsample_factor", 1).max(1);
    let overview = match var.kind {
        VariableKind::Continuous => OverviewResampling::Average,
        VariableKind::Discrete | VariableKind::Indexed => OverviewResampling::Nearest,
    };

    write_rgba_cog(&rgba_bytes, width, height, &affine, &paths.rgba_cog_path, overview).await?;
    write_value_cog(&values, width, height, &affine, &paths.value_cog_path, hover_downsample).await?;

    let rgba_gate1 = validate_cog(&paths.rgba_cog_path, &CogExpectation { bands: 4, dtype: "Byte", grid_meters }).await?;
    let value_gate1 = validate_cog(
        &paths.value_cog_path,
        &CogExpectation { bands: 1, dtype: "Float32", grid_meters: grid_meters * hover_downsample as f64 },
    )
    .await?;
    if !rgba_gate1.is_empty() || !value_gate1.is_empty() {
        tracing::warn!(
            model = req.model_id, var = %var.var_key, fh = req.fh,
            rgba_reasons = ?rgba_gate1, value_reasons = ?value_gate1, "gate 1 rejected frame"
        );
        cleanup_artifacts(&[&paths.rgba_cog_path, &paths.value_cog_path]);
        return Ok(None);
    }

    let mut contours: Option<BTreeMap<String, ContourRef>> = None;
    if var.var_key == "tmp2m" {
        let rel_path = contour::iso_rel_path(req.fh, FREEZE_LEVEL_F);
        let contour_path = dir.join(&rel_path);
        match contour::build_iso_contour(&paths.value_cog_path, &contour_path, &rel_path, FREEZE_LEVEL_F).await {
            Ok(contour_ref) => {
                let mut map = BTreeMap::new();
                map.insert(contour::iso_key(FREEZE_LEVEL_F), contour_ref);
                contours = Some(map);
            }
            Err(reason) => {
                tracing::warn!(model = req.model_id, var = %var.var_key, fh = req.fh, %reason, "contour generation failed, shipping frame without contours");
            }
        }
    }

    let (min, max) = finite_min_max(&values);
    let sidecar = build_sidecar_json(SidecarInput {
        model: req.model_id,
        run_id: run_id.as_str(),
        var_id: &var.var_key,
        fh: req.fh,
        run_time: req.run_time,
        kind: &format!("{:?}", var.kind).to_ascii_lowercase(),
        units: var.units.as_deref().unwrap_or(""),
        min,
        max,
        color_map,
        hover_value_downsample_factor: if hover_downsample > 1 { Some(hover_downsample) } else { None },
        ptype: ptype_tables_for(&var),
        contours,
    });
    write_sidecar_atomic(&paths.sidecar_path, &sidecar).await?;

    Ok(Some(FrameArtifacts {
        rgba_cog_path: paths.rgba_cog_path,
        value_cog_path: paths.value_cog_path,
        sidecar_path: paths.sidecar_path,
        sidecar,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_min_max_ignores_nan() {
        let values = vec![f32::NAN, 1.0, 5.0, f32::NAN, -2.0];
        let (min, max) = finite_min_max(&values);
        assert_eq!(min, Some(-2.0));
        assert_eq!(max, Some(5.0));
    }

    #[test]
    fn finite_min_max_all_nan_is_none() {
        let values = vec![f32::NAN, f32::NAN];
        assert_eq!(finite_min_max(&values), (None, None));
    }

    #[test]
    fn flatten_rgba_preserves_pixel_order() {
        let pixels = vec![Rgba(1, 2, 3, 4), Rgba(5, 6, 7, 8)];
        assert_eq!(flatten_rgba(&pixels), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn frame_paths_use_zero_padded_artifact_names() {
        let run_id = RunId::parse("20260217_06z").unwrap();
        let paths = frame_paths(Path::new("/data/staging"), "hrrr", &run_id, "tmp2m", 3);
        assert_eq!(paths.rgba_cog_path, Path::new("/data/staging/hrrr/20260217_06z/tmp2m/fh003.rgba.cog.tif"));
        assert_eq!(paths.value_cog_path, Path::new("/data/staging/hrrr/20260217_06z/tmp2m/fh003.val.cog.tif"));
        assert_eq!(paths.sidecar_path, Path::new("/data/staging/hrrr/20260217_06z/tmp2m/fh003.json"));
    }

    #[test]
    fn categorical_ptype_detection_keys_on_derive_strategy() {
        let registry = Registry::with_defaults();
        let radar = registry.get_variable("hrrr", "radar_ptype").unwrap();
        assert!(is_categorical_ptype(radar));
        let tmp2m = registry.get_variable("hrrr", "tmp2m").unwrap();
        assert!(!is_categorical_ptype(tmp2m));
    }
}
