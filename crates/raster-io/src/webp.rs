//! RGBA COG → lossy WebP conversion for animation loop frames.
//!
//! Used by the scheduler's post-promotion pregeneration pass and by the
//! Read API when a loop frame is requested before pregeneration reached it.
//! GDAL rasterizes the COG to a temporary PNG (this crate's established
//! subprocess boundary); `image`/`webp` downsample and encode in-process.

use crate::error::{RasterIoError, RasterIoResult};
use crate::gdal_proc::run_gdal;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
// Leading `::` keeps the extern `webp` crate distinct from this module's
// own `crate::webp` path.
use ::webp::Encoder;

/// One quality/size tier of the loop cache. Tier 0 is the full playback
/// tier; tier 1 trades fidelity for startup latency on slow clients.
#[derive(Debug, Clone, Copy)]
pub struct WebpTier {
    pub quality: f32,
    pub max_dim: u32,
}

pub const DEFAULT_TIER0: WebpTier = WebpTier { quality: 82.0, max_dim: 1600 };
pub const DEFAULT_TIER1: WebpTier = WebpTier { quality: 60.0, max_dim: 800 };

/// Categorical/indexed legends must not be blurred by a smoothing filter;
/// a softened boundary between two discrete colors invents a color that
/// never appeared in the legend. Continuous gradients tolerate it fine.
pub fn filter_for_kind(kind: &str) -> FilterType {
    match kind {
        "discrete" | "indexed" => FilterType::Nearest,
        _ => FilterType::Triangle,
    }
}

async fn rasterize_to_png(cog_path: &Path) -> RasterIoResult<tempfile::NamedTempFile> {
    let tmp = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .map_err(|e| RasterIoError::Io { path: cog_path.display().to_string(), detail: e.to_string() })?;
    let src = cog_path.to_string_lossy().into_owned();
    let dst = tmp.path().to_string_lossy().into_owned();
    run_gdal("gdal_translate", &["-of", "PNG", &src, &dst]).await?;
    Ok(tmp)
}

/// Converts one RGBA COG into a downsampled lossy WebP at `dest`, written
/// atomically. `kind` (from the frame's sidecar) selects the downsampling
/// filter.
pub async fn convert_rgba_cog_to_loop_webp(rgba_cog_path: &Path, dest: &Path, kind: &str, tier: WebpTier) -> RasterIoResult<()> {
    let io_err = |path: &Path, e: String| RasterIoError::Io { path: path.display().to_string(), detail: e };

    let png_tmp = rasterize_to_png(rgba_cog_path).await?;
    let bytes = tokio::fs::read(png_tmp.path()).await.map_err(|e| io_err(png_tmp.path(), e.to_string()))?;
    let mut image = image::load_from_memory(&bytes).map_err(|e| io_err(rgba_cog_path, e.to_string()))?;

    let (w, h) = (image.width(), image.height());
    if w.max(h) > tier.max_dim {
        let scale = tier.max_dim as f64 / w.max(h) as f64;
        let new_w = ((w as f64 * scale).round() as u32).max(1);
        let new_h = ((h as f64 * scale).round() as u32).max(1);
        image = DynamicImage::ImageRgba8(image::imageops::resize(&image.to_rgba8(), new_w, new_h, filter_for_kind(kind)));
    } else {
        image = DynamicImage::ImageRgba8(image.to_rgba8());
    }

    let encoded: Vec<u8> = Encoder::from_image(&image)
        .map_err(|e| io_err(rgba_cog_path, e.to_string()))?
        .encode(tier.quality)
        .to_vec();

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| io_err(parent, e.to_string()))?;
    }
    let tmp_dest = dest.with_extension("webp.tmp");
    tokio::fs::write(&tmp_dest, &encoded).await.map_err(|e| io_err(&tmp_dest, e.to_string()))?;
    tokio::fs::rename(&tmp_dest, dest).await.map_err(|e| io_err(dest, e.to_string()))
}
