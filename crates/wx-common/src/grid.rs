//! Target-grid geometry: pixel-aligned affine transforms and a pure
//! in-process bilinear/nearest reprojection.

use crate::bbox::BoundingBox;
use crate::crs::Crs;
use rayon::prelude::*;

/// North-up affine transform: `x = a*col + c`, `y = e*row + f`.
///
/// `b` and `d` are always zero for the rotation-free grids this system
/// produces; they're kept so the struct reads like GDAL's six-parameter
/// geotransform, not because any caller sets them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    /// North-up transform anchored at the grid's top-left corner.
    pub fn from_origin(west: f64, north: f64, pixel_size_x: f64, pixel_size_y: f64) -> Self {
        Self {
            a: pixel_size_x,
            b: 0.0,
            c: west,
            d: 0.0,
            e: -pixel_size_y,
            f: north,
        }
    }

    pub fn pixel_to_coord(&self, col: f64, row: f64) -> (f64, f64) {
        (self.a * col + self.b * row + self.c, self.d * col + self.e * row + self.f)
    }

    /// Inverts [`Affine::pixel_to_coord`]. Only valid for the axis-aligned
    /// (`b == 0 && d == 0`) transforms this crate ever constructs.
    pub fn coord_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.c) / self.a, (y - self.f) / self.e)
    }

    pub fn pixel_size_x(&self) -> f64 {
        self.a.abs()
    }

    pub fn pixel_size_y(&self) -> f64 {
        self.e.abs()
    }
}

/// A model/region's fixed target extent: the canonical EPSG:3857 bbox plus
/// meters-per-pixel. Every frame for that (model, region) shares one of
/// these, and therefore shares width/height/affine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetGrid {
    pub bbox_3857: BoundingBox,
    pub meters: f64,
}

/// Snaps `bbox` outward to integer multiples of `meters` (floor on the
/// min edges, ceil on the max edges) and returns the resulting affine plus
/// pixel dimensions.
pub fn affine_and_shape(grid: &TargetGrid) -> (Affine, usize, usize) {
    let TargetGrid { bbox_3857, meters } = *grid;
    let aligned_xmin = (bbox_3857.min_x / meters).floor() * meters;
    let aligned_ymax = (bbox_3857.max_y / meters).ceil() * meters;
    let aligned_xmax = (bbox_3857.max_x / meters).ceil() * meters;
    let aligned_ymin = (bbox_3857.min_y / meters).floor() * meters;

    let width = (((aligned_xmax - aligned_xmin) / meters).round() as i64).max(1) as usize;
    let height = (((aligned_ymax - aligned_ymin) / meters).round() as i64).max(1) as usize;

    let affine = Affine::from_origin(aligned_xmin, aligned_ymax, meters, meters);
    (affine, height, width)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resampling {
    Bilinear,
    Nearest,
}

/// Source raster description handed to [`warp`].
pub struct SourceRaster<'a> {
    pub data: &'a [f32],
    pub height: usize,
    pub width: usize,
    pub crs: Crs,
    pub affine: Affine,
}

/// Reprojects `src` onto `dst_grid`'s pixel-aligned grid.
///
/// Pure function: identical inputs yield identical outputs to float32
/// precision. `nan` in the source is always treated as nodata regardless
/// of `src_nodata`.
pub fn warp(
    src: &SourceRaster,
    dst_grid: &TargetGrid,
    resampling: Resampling,
    src_nodata: Option<f32>,
) -> (Vec<f32>, Affine, usize, usize) {
    let (dst_affine, dst_h, dst_w) = affine_and_shape(dst_grid);
    let mut out = vec![f32::NAN; dst_h * dst_w];

    out.par_chunks_mut(dst_w).enumerate().for_each(|(row, out_row)| {
        for col in 0..dst_w {
            let (mx, my) = dst_affine.pixel_to_coord(col as f64 + 0.5, row as f64 + 0.5);
            let (sx, sy) = src.crs.from_epsg3857(mx, my);
            let (src_col, src_row) = src.affine.coord_to_pixel(sx, sy);

            out_row[col] = match resampling {
                Resampling::Nearest => sample_nearest(src, src_row, src_col, src_nodata),
                Resampling::Bilinear => sample_bilinear(src, src_row, src_col, src_nodata),
            };
        }
    });

    (out, dst_affine, dst_h, dst_w)
}

fn in_bounds(row: isize, col: isize, height: usize, width: usize) -> bool {
    row >= 0 && col >= 0 && (row as usize) < height && (col as usize) < width
}

fn read_px(src: &SourceRaster, row: isize, col: isize, nodata: Option<f32>) -> f32 {
    if !in_bounds(row, col, src.height, src.width) {
        return f32::NAN;
    }
    let v = src.data[row as usize * src.width + col as usize];
    match nodata {
        Some(nd) if v == nd => f32::NAN,
        _ => v,
    }
}

fn sample_nearest(src: &SourceRaster, src_row: f64, src_col: f64, nodata: Option<f32>) -> f32 {
    read_px(src, src_row.floor() as isize, src_col.floor() as isize, nodata)
}

fn sample_bilinear(src: &SourceRaster, src_row: f64, src_col: f64, nodata: Option<f32>) -> f32 {
    // Pixel centers are at integer + 0.5; shift so floor/frac align on centers.
    let r = src_row - 0.5;
    let c = src_col - 0.5;
    let r0 = r.floor();
    let c0 = c.floor();
    let fr = r - r0;
    let fc = c - c0;

    let v00 = read_px(src, r0 as isize, c0 as isize, nodata);
    let v10 = read_px(src, r0 as isize, c0 as isize + 1, nodata);
    let v01 = read_px(src, r0 as isize + 1, c0 as isize, nodata);
    let v11 = read_px(src, r0 as isize + 1, c0 as isize + 1, nodata);

    let samples = [v00, v10, v01, v11];
    if samples.iter().any(|v| v.is_nan()) {
        // Fall back to nearest when any corner is nodata/out-of-bounds so a
        // single masked neighbor doesn't poison an otherwise-valid pixel.
        return sample_nearest(src, src_row, src_col, nodata);
    }

    let top = v00 as f64 * (1.0 - fc) + v10 as f64 * fc;
    let bottom = v01 as f64 * (1.0 - fc) + v11 as f64 * fc;
    (top * (1.0 - fr) + bottom * fr) as f32
}
