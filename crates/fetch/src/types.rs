//! Fetch adapter request/response shapes.

use chrono::{DateTime, Utc};
use wx_common::{Affine, Crs};

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub model_id: String,
    pub product: String,
    pub search_pattern: String,
    pub run_time: DateTime<Utc>,
    pub fh: u32,
}

/// One decoded 2-D variable field in its source projection, with GRIB/GDAL
/// nodata sentinels and absurd magnitudes (`|v| > 1e12`) already mapped to
/// `NaN`.
#[derive(Debug, Clone)]
pub struct RawGrid {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub crs: Crs,
    pub affine: Affine,
}
