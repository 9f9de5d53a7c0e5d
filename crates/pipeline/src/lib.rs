//! The frame build pipeline: fetch or derive one variable's field, warp it
//! onto the model/region's target grid, colorize it, encode it as a pair of
//! COGs, run both quality gates, and write the sidecar.

pub mod build_frame;
pub mod contour;
pub mod derive_dispatch;
pub mod error;
pub mod gate2;
pub mod sidecar;

pub use build_frame::{build_frame, frame_paths, BuildFrameRequest, FramePaths, FrameArtifacts};
pub use error::{PipelineError, PipelineResult};
