//! Gate 1: structural validation of a written COG via `gdalinfo -json`;
//! band count, band dtype, CRS, internal tiling, overview presence, pixel
//! size, and the `IMAGE_STRUCTURE.LAYOUT == COG` tag GDAL's COG driver
//! stamps on output.

use crate::error::{RasterIoError, RasterIoResult};
use crate::gdal_proc::run_gdal;
use serde_json::Value;
use std::path::Path;

pub struct CogExpectation {
    pub bands: usize,
    pub dtype: &'static str,
    pub grid_meters: f64,
}

/// Runs Gate 1 and returns the list of failure reasons (empty == pass).
/// Every check runs rather than short-circuiting on the first failure, so
/// callers see the full picture.
pub async fn validate_cog(path: &Path, expect: &CogExpectation) -> RasterIoResult<Vec<String>> {
    let stdout = run_gdal("gdalinfo", &["-json", &path.display().to_string()]).await?;
    let info: Value = serde_json::from_str(&stdout)
        .map_err(|e| RasterIoError::InvalidGdalinfoJson { path: path.display().to_string(), detail: e.to_string() })?;

    let mut reasons = Vec::new();
    let bands = info.get("bands").and_then(Value::as_array).cloned().unwrap_or_default();

    if bands.len() != expect.bands {
        reasons.push(format!("band count: expected {}, got {}", expect.bands, bands.len()));
    }

    if let Some(first_band) = bands.first() {
        let actual_dtype = first_band.get("type").and_then(Value::as_str).unwrap_or("");
        if actual_dtype != expect.dtype {
            reasons.push(format!("band type: expected {}, got {actual_dtype}", expect.dtype));
        }

        let block: Vec<u64> = first_band
            .get("block")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default();
        let expected_block = [crate::cog::COG_BLOCKSIZE as u64, crate::cog::COG_BLOCKSIZE as u64];
        if block != expected_block {
            reasons.push(format!("block size: expected {expected_block:?}, got {block:?}"));
        }

        let overviews = first_band.get("overviews").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
        if overviews.is_empty() {
            reasons.push("no overviews found".to_string());
        }
    }

    let crs_wkt = info.pointer("/coordinateSystem/wkt").and_then(Value::as_str).unwrap_or("");
    if !crs_wkt.contains("3857") {
        reasons.push("CRS does not contain EPSG:3857".to_string());
    }

    if let Some(gt) = info.get("geoTransform").and_then(Value::as_array) {
        if gt.len() >= 6 {
            let pixel_x = gt[1].as_f64().unwrap_or(0.0).abs();
            let pixel_y = gt[5].as_f64().unwrap_or(0.0).abs();
            if (pixel_x - expect.grid_meters).abs() > 0.1 || (pixel_y - expect.grid_meters).abs() > 0.1 {
                reasons.push(format!(
                    "pixel size: expected {:.1}m, got ({:.1}, {:.1})",
                    expect.grid_meters, pixel_x, pixel_y
                ));
            }
        }
    }

    let layout = info.pointer("/metadata/IMAGE_STRUCTURE/LAYOUT").and_then(Value::as_str).unwrap_or("");
    if layout != "COG" {
        reasons.push(format!("layout: expected COG, got {layout:?}"));
    }

    Ok(reasons)
}
