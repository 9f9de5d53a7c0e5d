//! Slippy-map tile addressing in EPSG:3857.
//!
//! The published rasters are already Web Mercator, so a `{z}/{x}/{y}` tile
//! is just a square window in projected meters; no per-tile reprojection.

use wx_common::BoundingBox;

/// Half the Web Mercator world span in meters (the projected extent of
/// ±180°, ±85.051129°).
pub const WEB_MERCATOR_MAX_M: f64 = 20_037_508.342789244;

/// Tiles served from the RGBA COGs are 512-pixel "retina" tiles.
pub const TILE_SIZE_PX: u32 = 512;

/// The EPSG:3857 bounding box of one XYZ tile, or `None` when `x`/`y` fall
/// outside the `z` grid.
pub fn tile_bbox_3857(z: u8, x: u32, y: u32) -> Option<BoundingBox> {
    if z > 24 {
        return None;
    }
    let n = 1u64 << z;
    if (x as u64) >= n || (y as u64) >= n {
        return None;
    }
    let world = 2.0 * WEB_MERCATOR_MAX_M;
    let size = world / n as f64;
    let min_x = -WEB_MERCATOR_MAX_M + x as f64 * size;
    let max_y = WEB_MERCATOR_MAX_M - y as f64 * size;
    Some(BoundingBox::new(min_x, max_y - size, min_x + size, max_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_zero_is_the_whole_world() {
        let bbox = tile_bbox_3857(0, 0, 0).unwrap();
        assert!((bbox.min_x + WEB_MERCATOR_MAX_M).abs() < 1e-6);
        assert!((bbox.max_x - WEB_MERCATOR_MAX_M).abs() < 1e-6);
        assert!((bbox.width() - bbox.height()).abs() < 1e-6);
    }

    #[test]
    fn zoom_one_quadrants_tile_the_world() {
        let nw = tile_bbox_3857(1, 0, 0).unwrap();
        let se = tile_bbox_3857(1, 1, 1).unwrap();
        assert!(nw.max_y > se.max_y);
        assert!(nw.min_x < se.min_x);
        assert!((nw.width() - WEB_MERCATOR_MAX_M).abs() < 1e-6);
    }

    #[test]
    fn out_of_grid_coordinates_are_rejected() {
        assert!(tile_bbox_3857(1, 2, 0).is_none());
        assert!(tile_bbox_3857(1, 0, 2).is_none());
        assert!(tile_bbox_3857(25, 0, 0).is_none());
    }

    #[test]
    fn conus_tile_overlaps_conus_extent() {
        // z=4 x=2 y=5 covers the US west; it must intersect the CONUS
        // EPSG:3857 extent.
        let conus = BoundingBox::new(-13_914_936.0, 2_753_408.0, -7_403_739.0, 6_446_275.0);
        let tile = tile_bbox_3857(4, 2, 5).unwrap();
        assert!(conus.intersects(&tile));
    }
}
