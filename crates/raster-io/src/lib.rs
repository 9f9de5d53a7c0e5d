//! Artifact encoding, structural validation, and raster reads over the
//! GDAL subprocess boundary.
//!
//! GRIB2 parsing and pixel composition happen upstream of this crate
//! (`derive`, `colormap`); this crate's scope is writing the two COGs per
//! frame, reading pixels/tiles back for the API, and shelling out to GDAL
//! for the parts of the artifact contract (internal tiling, overviews, COG
//! layout tag) no in-process Rust crate in this stack can produce.

pub mod cog;
pub mod error;
pub mod gdal_proc;
pub mod read;
pub mod validate;
pub mod webp;

pub use cog::{write_rgba_cog, write_value_cog, OverviewResampling, COG_BLOCKSIZE, COG_COMPRESS};
pub use error::{RasterIoError, RasterIoResult};
pub use read::{render_tile_png, sample_point};
pub use validate::{validate_cog, CogExpectation};
pub use webp::{convert_rgba_cog_to_loop_webp, WebpTier};
