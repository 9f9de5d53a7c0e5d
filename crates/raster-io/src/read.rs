//! GDAL-subprocess raster reads backing the Read API's point sampling and
//! tile extraction endpoints. Writing is `cog.rs`'s job; this module only
//! ever reads a COG that some earlier pipeline run already produced.

use crate::error::{RasterIoError, RasterIoResult};
use crate::gdal_proc::run_gdal;
use std::path::Path;
use wx_common::BoundingBox;

/// Reads one pixel's value from a single-band float32 COG at a georeferenced
/// EPSG:3857 point, via `gdallocationinfo -valonly -geoloc`. `None` covers
/// both nodata and a point outside the raster's extent; `gdallocationinfo`
/// prints nothing for the latter and the band's nodata sentinel for the
/// former, and neither is distinguishable from the other without also
/// parsing `gdalinfo`, so both collapse to "no data here".
pub async fn sample_point(value_cog_path: &Path, x: f64, y: f64) -> RasterIoResult<Option<f32>> {
    let path_str = value_cog_path.display().to_string();
    let x_str = x.to_string();
    let y_str = y.to_string();
    let output = run_gdal("gdallocationinfo", &["-valonly", "-geoloc", &path_str, &x_str, &y_str]).await?;
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Ok(None),
    }
}

/// Extracts a `tile_size` x `tile_size` PNG window from an RGBA COG covering
/// `tile_bbox_3857`. A tile that doesn't overlap the raster's extent at all
/// short-circuits to a fully transparent PNG rather than asking
/// `gdal_translate` to rasterize past the source.
pub async fn render_tile_png(
    rgba_cog_path: &Path,
    raster_bbox_3857: &BoundingBox,
    tile_bbox_3857: &BoundingBox,
    tile_size: u32,
    out_path: &Path,
) -> RasterIoResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RasterIoError::Io { path: parent.display().to_string(), detail: e.to_string() })?;
    }

    if !raster_bbox_3857.intersects(tile_bbox_3857) {
        return write_transparent_png(tile_size, out_path);
    }

    let src = rgba_cog_path.display().to_string();
    let dst = out_path.display().to_string();
    let size_str = tile_size.to_string();
    let ulx = tile_bbox_3857.min_x.to_string();
    let uly = tile_bbox_3857.max_y.to_string();
    let lrx = tile_bbox_3857.max_x.to_string();
    let lry = tile_bbox_3857.min_y.to_string();

    run_gdal(
        "gdal_translate",
        &[
            "-of", "PNG",
            "-projwin", &ulx, &uly, &lrx, &lry,
            "-projwin_srs", "EPSG:3857",
            "-outsize", &size_str, &size_str,
            &src, &dst,
        ],
    )
    .await?;
    Ok(())
}

/// Writes a fully transparent `size` x `size` PNG; the response body for
/// tiles that miss the raster entirely.
pub fn write_transparent_png(size: u32, out_path: &Path) -> RasterIoResult<()> {
    let img = image::RgbaImage::new(size, size);
    img.save(out_path).map_err(|e| RasterIoError::Io { path: out_path.display().to_string(), detail: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn disjoint_tile_writes_transparent_png_without_invoking_gdal() {
        let dir = tempdir().unwrap();
        let raster_bbox = BoundingBox::new(-13_000_000.0, 2_800_000.0, -7_000_000.0, 6_300_000.0);
        let tile_bbox = BoundingBox::new(10_000_000.0, 10_000_000.0, 10_100_000.0, 10_100_000.0);
        let out_path = dir.path().join("tile.png");

        render_tile_png(Path::new("/nonexistent.tif"), &raster_bbox, &tile_bbox, 512, &out_path).await.unwrap();

        let img = image::open(&out_path).unwrap().to_rgba8();
        assert_eq!(img.width(), 512);
        assert_eq!(img.height(), 512);
        assert!(img.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn transparent_png_helper_is_fully_transparent() {
        let dir = tempdir().unwrap();
        let out_path = dir.path().join("blank.png");
        write_transparent_png(256, &out_path).unwrap();
        let img = image::open(&out_path).unwrap().to_rgba8();
        assert!(img.pixels().all(|p| p[3] == 0));
    }
}
