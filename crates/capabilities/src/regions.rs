//! Region presets. Only `conus` is canonical for new scheduler runs; `pnw`
//! and `north_central` are kept solely so historical on-disk artifacts and
//! requests still resolve.

use crate::types::RegionSpec;
use wx_common::BoundingBox;

pub fn conus() -> RegionSpec {
    RegionSpec {
        id: "conus".to_string(),
        name: "CONUS".to_string(),
        bbox_wgs84: BoundingBox::new(-125.0, 24.0, -66.5, 50.0),
        clip: false,
        historical_alias: false,
    }
}

pub fn pnw() -> RegionSpec {
    RegionSpec {
        id: "pnw".to_string(),
        name: "Pacific Northwest".to_string(),
        bbox_wgs84: BoundingBox::new(-125.5, 41.5, -111.0, 49.5),
        clip: true,
        historical_alias: true,
    }
}

pub fn north_central() -> RegionSpec {
    RegionSpec {
        id: "north_central".to_string(),
        name: "North Central".to_string(),
        bbox_wgs84: BoundingBox::new(-106.0, 40.0, -92.0, 50.0),
        clip: true,
        historical_alias: true,
    }
}

/// Looks up a region preset by id. Used by the scheduler to resolve a
/// model's `canonical_region` into the `RegionSpec` the Build Pipeline needs.
pub fn by_id(id: &str) -> Option<RegionSpec> {
    match id {
        "conus" => Some(conus()),
        "pnw" => Some(pnw()),
        "north_central" => Some(north_central()),
        _ => None,
    }
}

/// Every preset, canonical first. Served to clients as region metadata.
pub fn all() -> Vec<RegionSpec> {
    vec![conus(), pnw(), north_central()]
}
