//! Shared geometry, identifiers, and error types for the weather raster
//! build-and-serve pipeline.

pub mod bbox;
pub mod crs;
pub mod grid;
pub mod runid;

pub use bbox::BoundingBox;
pub use crs::{project_bbox, Crs};
pub use grid::{affine_and_shape, warp, Affine, Resampling, SourceRaster, TargetGrid};
pub use runid::RunId;
