//! The two coordinate reference systems this crate ever needs to juggle.
//!
//! Upstream GRIB grids are geographic (EPSG:4326); every published artifact
//! is projected (EPSG:3857). Full CRS generality is out of scope; the
//! Fetch Adapter and GDAL boundary are the only places that would ever see
//! anything else.

/// Mean earth radius used by the spherical Web Mercator projection, in meters.
const EARTH_RADIUS_M: f64 = 6_378_137.0;
const ORIGIN_SHIFT_M: f64 = std::f64::consts::PI * EARTH_RADIUS_M;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    Epsg4326,
    Epsg3857,
}

impl Crs {
    /// Projects a point in this CRS to EPSG:3857 meters.
    pub fn to_epsg3857(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Crs::Epsg3857 => (x, y),
            Crs::Epsg4326 => {
                let mx = x * ORIGIN_SHIFT_M / 180.0;
                let lat_rad = y.to_radians();
                let my = ((std::f64::consts::FRAC_PI_4 + lat_rad / 2.0).tan()).ln()
                    * EARTH_RADIUS_M;
                (mx, my)
            }
        }
    }

    /// Inverse of [`Crs::to_epsg3857`]: maps an EPSG:3857 point back into this CRS.
    pub fn from_epsg3857(&self, mx: f64, my: f64) -> (f64, f64) {
        match self {
            Crs::Epsg3857 => (mx, my),
            Crs::Epsg4326 => {
                let lon = mx / ORIGIN_SHIFT_M * 180.0;
                let lat = (2.0 * (my / EARTH_RADIUS_M).exp().atan()
                    - std::f64::consts::FRAC_PI_2)
                    .to_degrees();
                (lon, lat)
            }
        }
    }
}

/// Projects a bounding box from `from` to `to` by projecting its four
/// corners and taking the enclosing extent; correct for the monotonic
/// WGS84<->Web Mercator mapping this crate deals in.
pub fn project_bbox(bbox: &crate::bbox::BoundingBox, from: Crs, to: Crs) -> crate::bbox::BoundingBox {
    if from == to {
        return *bbox;
    }
    let corners = [
        (bbox.min_x, bbox.min_y),
        (bbox.min_x, bbox.max_y),
        (bbox.max_x, bbox.min_y),
        (bbox.max_x, bbox.max_y),
    ];
    let projected: Vec<(f64, f64)> = corners.iter().map(|&(x, y)| to_via(from, to, x, y)).collect();
    let min_x = projected.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_x = projected.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = projected.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = projected.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    crate::bbox::BoundingBox::new(min_x, min_y, max_x, max_y)
}

fn to_via(from: Crs, to: Crs, x: f64, y: f64) -> (f64, f64) {
    let (mx, my) = from.to_epsg3857(x, y);
    to.from_epsg3857(mx, my)
}
