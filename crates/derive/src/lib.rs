//! Derive strategies: pure computations over already-fetched,
//! already-aligned component grids. Orchestrating which components to
//! fetch for a given `derive_strategy_id` is the build pipeline's job;
//! this crate only implements the math.

pub mod cumulative;
pub mod error;
pub mod grid;
pub mod precip_ptype;
pub mod radar_ptype;
pub mod wspd;

pub use cumulative::{derive_precip_total_cumulative, derive_snowfall_total_10to1_cumulative, KGM2_TO_IN};
pub use error::{DeriveError, DeriveResult};
pub use grid::Grid;
pub use precip_ptype::{derive_precip_ptype_blend, PrecipPtypeComponents};
pub use radar_ptype::{derive_radar_ptype_combo, RadarPtypeComponents};
pub use wspd::{convert_speed_to_mph, derive_wspd10m};
