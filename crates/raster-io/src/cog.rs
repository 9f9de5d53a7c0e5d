//! Artifact encoder: RGBA/value COG writers.
//!
//! No crate in this stack writes GeoTIFF directly, so this writes the pixel
//! buffer plus an ENVI `.hdr` sidecar (a plain-text format GDAL reads
//! natively) and hands that to a single `gdal_translate -of COG` call.
//! GDAL's COG driver builds internal tiling and overviews itself, so one
//! subprocess round trip produces the finished artifact.

use crate::error::{RasterIoError, RasterIoResult};
use crate::gdal_proc::run_gdal;
use std::path::{Path, PathBuf};
use wx_common::Affine;

pub const COG_BLOCKSIZE: u32 = 512;
pub const COG_COMPRESS: &str = "DEFLATE";

/// Overview policy for an RGBA artifact. Continuous color ramps take
/// averaged overviews on their color bands, with alpha held on nearest so
/// a downsampled domain edge never gains partial transparency; that split
/// needs a per-band build (see `build_continuous_rgba_cog`).
/// Discrete/indexed palettes stay on `Nearest` for every band so an
/// overview never contains a color outside the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverviewResampling {
    Average,
    Nearest,
}

impl OverviewResampling {
    fn gdal_name(self) -> &'static str {
        match self {
            OverviewResampling::Average => "AVERAGE",
            OverviewResampling::Nearest => "NEAREST",
        }
    }
}

/// WKT for EPSG:3857 (WGS 84 / Pseudo-Mercator); every artifact this
/// pipeline writes shares this one CRS, so it's a constant rather than a
/// lookup.
const EPSG_3857_WKT: &str = concat!(
    "PROJCS[\"WGS 84 / Pseudo-Mercator\",",
    "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",",
    "SPHEROID[\"WGS 84\",6378137,298.257223563]],",
    "PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]],",
    "PROJECTION[\"Mercator_1SP\"],PARAMETER[\"central_meridian\",0],",
    "PARAMETER[\"scale_factor\",1],PARAMETER[\"false_easting\",0],",
    "PARAMETER[\"false_northing\",0],UNIT[\"metre\",1],",
    "AXIS[\"X\",EAST],AXIS[\"Y\",NORTH],AUTHORITY[\"EPSG\",\"3857\"]]"
);

enum EnviDataType {
    Byte,
    Float32,
}

impl EnviDataType {
    fn code(&self) -> u32 {
        match self {
            EnviDataType::Byte => 1,
            EnviDataType::Float32 => 4,
        }
    }
}

fn envi_header(width: usize, height: usize, bands: usize, dtype: &EnviDataType, interleave: &str, affine: &Affine) -> String {
    format!(
        "ENVI\ndescription = {{weather raster artifact}}\nsamples = {width}\nlines = {height}\n\
         bands = {bands}\nheader offset = 0\nfile type = ENVI Standard\ndata type = {dtype}\n\
         interleave = {interleave}\nbyte order = 0\nmap info = {{Pseudo-Mercator, 1.0, 1.0, {ulx}, {uly}, {xres}, {yres}, units=Meters}}\n\
         coordinate system string = {{{wkt}}}\n",
        width = width,
        height = height,
        bands = bands,
        dtype = dtype.code(),
        interleave = interleave,
        ulx = affine.c,
        uly = affine.f,
        xres = affine.pixel_size_x(),
        yres = affine.pixel_size_y(),
        wkt = EPSG_3857_WKT,
    )
}

fn write_sidecar(stem: &Path, header: &str, raw: &[u8]) -> RasterIoResult<()> {
    let img_path = stem.with_extension("img");
    let hdr_path = stem.with_extension("hdr");
    std::fs::write(&img_path, raw).map_err(|e| RasterIoError::Io { path: img_path.display().to_string(), detail: e.to_string() })?;
    std::fs::write(&hdr_path, header).map_err(|e| RasterIoError::Io { path: hdr_path.display().to_string(), detail: e.to_string() })?;
    Ok(())
}

fn cleanup_sidecar(stem: &Path) {
    let _ = std::fs::remove_file(stem.with_extension("img"));
    let _ = std::fs::remove_file(stem.with_extension("hdr"));
}

fn staging_stem(out_path: &Path) -> PathBuf {
    out_path.with_extension("src")
}

async fn translate_to_cog(src_img: &Path, out_path: &Path, nodata: Option<&str>, overview: OverviewResampling) -> RasterIoResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RasterIoError::Io { path: parent.display().to_string(), detail: e.to_string() })?;
    }
    let compress_opt = format!("COMPRESS={COG_COMPRESS}");
    let blocksize_opt = format!("BLOCKSIZE={COG_BLOCKSIZE}");
    let overview_opt = format!("OVERVIEW_RESAMPLING={}", overview.gdal_name());
    let src_str = src_img.display().to_string();
    let out_str = out_path.display().to_string();

    let mut args = vec!["-of", "COG", "-co", &compress_opt, "-co", &blocksize_opt, "-co", &overview_opt];
    if let Some(nd) = nodata {
        args.push("-a_nodata");
        args.push(nd);
    }
    args.push(&src_str);
    args.push(&out_str);
    run_gdal("gdal_translate", &args).await?;
    Ok(())
}

/// Halving overview levels down to roughly tile size; at least one level so
/// the structural gate's overview check always has something to find.
fn overview_levels(width: usize, height: usize) -> Vec<u32> {
    let mut levels = Vec::new();
    let mut level = 2u32;
    while width.max(height) as u32 / level >= 256 {
        levels.push(level);
        level *= 2;
    }
    if levels.is_empty() {
        levels.push(2);
    }
    levels
}

/// Per-band overview build for continuous RGBA frames: each band becomes
/// its own base TIFF carrying its own overviews (average for R/G/B, nearest
/// for alpha), a VRT stacks the four back together, and the final COG
/// translate reuses the per-band overviews instead of rebuilding them under
/// a single policy.
async fn build_continuous_rgba_cog(src_img: &Path, out_path: &Path, width: usize, height: usize) -> RasterIoResult<()> {
    const BAND_RESAMPLING: [&str; 4] = ["average", "average", "average", "nearest"];

    let band_path = |band: usize| out_path.with_extension(format!("band{band}.tif"));
    let vrt_path = out_path.with_extension("stack.vrt");
    let levels: Vec<String> = overview_levels(width, height).iter().map(u32::to_string).collect();

    let result = async {
        for (idx, resampling) in BAND_RESAMPLING.iter().copied().enumerate() {
            let band = idx + 1;
            let band_arg = band.to_string();
            let src_str = src_img.display().to_string();
            let dst_str = band_path(band).display().to_string();
            run_gdal("gdal_translate", &["-b", &band_arg, &src_str, &dst_str]).await?;

            let mut addo_args: Vec<&str> = vec!["-r", resampling, &dst_str];
            addo_args.extend(levels.iter().map(String::as_str));
            run_gdal("gdaladdo", &addo_args).await?;
        }

        let vrt_str = vrt_path.display().to_string();
        let band_strs: Vec<String> = (1..=4).map(|band| band_path(band).display().to_string()).collect();
        let mut vrt_args: Vec<&str> = vec!["-separate", &vrt_str];
        vrt_args.extend(band_strs.iter().map(String::as_str));
        run_gdal("gdalbuildvrt", &vrt_args).await?;

        let compress_opt = format!("COMPRESS={COG_COMPRESS}");
        let blocksize_opt = format!("BLOCKSIZE={COG_BLOCKSIZE}");
        let out_str = out_path.display().to_string();
        run_gdal(
            "gdal_translate",
            &[
                "-of", "COG",
                "-co", &compress_opt,
                "-co", &blocksize_opt,
                "-co", "OVERVIEWS=FORCE_USE_EXISTING",
                &vrt_str, &out_str,
            ],
        )
        .await?;
        Ok(())
    }
    .await;

    for band in 1..=4 {
        let p = band_path(band);
        let _ = std::fs::remove_file(p.with_extension("tif.ovr"));
        let _ = std::fs::remove_file(&p);
    }
    let _ = std::fs::remove_file(&vrt_path);
    result
}

/// Writes a 4-band uint8 RGBA Cloud Optimized GeoTIFF. `rgba` must already
/// be pixel-interleaved (R,G,B,A per pixel, row-major); exactly the layout
/// the colorize stage produces and exactly ENVI's `bip` interleave, so no
/// reshuffling is needed before handoff.
///
/// `Nearest` frames go through one COG translate; `Average` frames take the
/// per-band route so alpha keeps nearest overviews while R/G/B average.
pub async fn write_rgba_cog(
    rgba: &[u8],
    width: usize,
    height: usize,
    affine: &Affine,
    out_path: &Path,
    overview: OverviewResampling,
) -> RasterIoResult<()> {
    debug_assert_eq!(rgba.len(), width * height * 4);
    let stem = staging_stem(out_path);
    let header = envi_header(width, height, 4, &EnviDataType::Byte, "bip", affine);
    write_sidecar(&stem, &header, rgba)?;
    let src_img = stem.with_extension("img");
    let result = match overview {
        OverviewResampling::Nearest => translate_to_cog(&src_img, out_path, None, OverviewResampling::Nearest).await,
        OverviewResampling::Average => build_continuous_rgba_cog(&src_img, out_path, width, height).await,
    };
    cleanup_sidecar(&stem);
    result
}

/// Decimates a row-major grid by taking every `factor`-th pixel in each
/// axis (nearest, anchored at the top-left pixel). The affine origin is
/// unchanged; only the pixel size scales.
fn decimate_nearest(values: &[f32], width: usize, height: usize, factor: usize) -> (Vec<f32>, usize, usize) {
    let out_w = width.div_ceil(factor);
    let out_h = height.div_ceil(factor);
    let mut out = Vec::with_capacity(out_w * out_h);
    for row in (0..height).step_by(factor) {
        for col in (0..width).step_by(factor) {
            out.push(values[row * width + col]);
        }
    }
    (out, out_w, out_h)
}

/// Writes a 1-band float32 value Cloud Optimized GeoTIFF. `NaN` cells are
/// registered as the band's nodata value. `downsample_factor > 1` decimates
/// the grid by that integer factor (nearest) and scales the affine's pixel
/// size to match; the hover-sampling resolution tradeoff from the artifact
/// contract.
pub async fn write_value_cog(
    values: &[f32],
    width: usize,
    height: usize,
    affine: &Affine,
    out_path: &Path,
    downsample_factor: u32,
) -> RasterIoResult<()> {
    debug_assert_eq!(values.len(), width * height);
    let factor = downsample_factor.max(1) as usize;

    let (decimated, out_w, out_h, out_affine);
    if factor > 1 {
        let (d, w, h) = decimate_nearest(values, width, height, factor);
        decimated = d;
        out_w = w;
        out_h = h;
        out_affine = Affine::from_origin(affine.c, affine.f, affine.pixel_size_x() * factor as f64, affine.pixel_size_y() * factor as f64);
    } else {
        decimated = values.to_vec();
        out_w = width;
        out_h = height;
        out_affine = *affine;
    }

    let stem = staging_stem(out_path);
    let raw: &[u8] = bytemuck_cast_f32(&decimated);
    let header = envi_header(out_w, out_h, 1, &EnviDataType::Float32, "bsq", &out_affine);
    write_sidecar(&stem, &header, raw)?;
    // Value rasters are for point queries, never display; averaged overview
    // pixels would invent values that never occurred in the field.
    let result = translate_to_cog(&stem.with_extension("img"), out_path, Some("nan"), OverviewResampling::Nearest).await;
    cleanup_sidecar(&stem);
    result
}

/// Reinterprets an `f32` slice as raw little-endian bytes without pulling in
/// a `bytemuck` dependency; native little-endian `f32` layout is exactly
/// what ENVI's `byte order = 0` declares.
fn bytemuck_cast_f32(values: &[f32]) -> &[u8] {
    // SAFETY: `f32` has no padding/alignment requirements beyond its size,
    // and the resulting slice never outlives `values`.
    unsafe { std::slice::from_raw_parts(values.as_ptr() as *const u8, std::mem::size_of_val(values)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_reports_exact_geometry() {
        let affine = Affine::from_origin(-100.0, 50.0, 2000.0, 2000.0);
        let header = envi_header(10, 20, 4, &EnviDataType::Byte, "bip", &affine);
        assert!(header.contains("samples = 10"));
        assert!(header.contains("lines = 20"));
        assert!(header.contains("bands = 4"));
        assert!(header.contains("interleave = bip"));
        assert!(header.contains("-100"));
        assert!(header.contains("3857"));
    }

    #[test]
    fn overview_levels_halve_down_to_tile_scale() {
        // A 3000x1800 CONUS grid: 1500, 750, 375 stay above the floor;
        // 187 does not.
        assert_eq!(overview_levels(3000, 1800), vec![2, 4, 8]);
    }

    #[test]
    fn tiny_rasters_still_get_one_overview_level() {
        assert_eq!(overview_levels(100, 100), vec![2]);
    }

    #[test]
    fn decimation_takes_every_kth_pixel() {
        // 4x4 grid of row*10+col values, factor 2 -> the four corners of
        // each 2x2 block's top-left pixel.
        let values: Vec<f32> = (0..4).flat_map(|r| (0..4).map(move |c| (r * 10 + c) as f32)).collect();
        let (out, w, h) = decimate_nearest(&values, 4, 4, 2);
        assert_eq!((w, h), (2, 2));
        assert_eq!(out, vec![0.0, 2.0, 20.0, 22.0]);
    }

    #[test]
    fn decimation_rounds_ragged_edges_up() {
        let values = vec![0.0f32; 5 * 5];
        let (out, w, h) = decimate_nearest(&values, 5, 5, 2);
        assert_eq!((w, h), (3, 3));
        assert_eq!(out.len(), 9);
    }

    #[test]
    fn byte_reinterpretation_round_trips() {
        let values = vec![1.5f32, -2.25, f32::NAN];
        let raw = bytemuck_cast_f32(&values);
        assert_eq!(raw.len(), 12);
        let back: Vec<f32> = raw.chunks_exact(4).map(|c| f32::from_le_bytes(c.try_into().unwrap())).collect();
        assert_eq!(back[0], 1.5);
        assert_eq!(back[1], -2.25);
        assert!(back[2].is_nan());
    }
}
