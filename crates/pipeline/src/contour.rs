//! Iso-contour generation for temperature frames.
//!
//! Optional and non-fatal: `build_frame` wraps this in warning-and-continue
//! rather than failing the whole build.

use crate::sidecar::ContourRef;
use raster_io::gdal_proc::run_gdal;
use std::path::Path;

/// The one contour level this system currently publishes: the 32°F freezing
/// line on `tmp2m` frames.
pub const FREEZE_LEVEL_F: f64 = 32.0;

/// Sidecar key and relative path for a freeze-line contour file.
pub fn iso_key(level: f64) -> String {
    format!("iso{}", level.round() as i64)
}

pub fn iso_rel_path(fh: u32, level: f64) -> String {
    format!("contours/fh{fh:03}.{}.geojson", iso_key(level))
}

/// `gdalwarp`s the value COG to EPSG:4326 through bilinear resampling
/// (smooths the stair-stepped per-pixel field before contouring, and puts
/// the contour vertices in the lon/lat coordinates the sidecar contract
/// declares) then runs `gdal_contour` at `level`, writing a GeoJSON
/// FeatureCollection. `rel_path` is the path recorded in the sidecar,
/// relative to the frame's variable directory.
pub async fn build_iso_contour(
    value_cog_path: &Path,
    out_geojson_path: &Path,
    rel_path: &str,
    level: f64,
) -> Result<ContourRef, String> {
    if let Some(parent) = out_geojson_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    let smoothed = value_cog_path.with_extension("smoothed.tif");
    let smoothed_str = smoothed.display().to_string();
    let value_str = value_cog_path.display().to_string();

    let warp_result = run_gdal("gdalwarp", &["-t_srs", "EPSG:4326", "-r", "bilinear", "-overwrite", &value_str, &smoothed_str]).await;
    if let Err(e) = warp_result {
        let _ = std::fs::remove_file(&smoothed);
        return Err(e.to_string());
    }

    let level_str = level.to_string();
    let out_str = out_geojson_path.display().to_string();
    let contour_result = run_gdal("gdal_contour", &["-fl", &level_str, "-a", "value", "-f", "GeoJSON", &smoothed_str, &out_str]).await;

    let _ = std::fs::remove_file(&smoothed);
    contour_result.map_err(|e| e.to_string())?;

    Ok(ContourRef { format: "geojson".to_string(), path: rel_path.to_string(), srs: "EPSG:4326".to_string(), level })
}
