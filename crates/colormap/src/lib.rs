//! Color map application for the frame-rendering pipeline: continuous-ramp,
//! discrete-binned, and pre-indexed palettes.

pub mod apply;
pub mod catalog;
pub mod hex;
pub mod palette;
pub mod types;

pub use apply::apply;
pub use catalog::default_color_maps;
pub use types::{ColorMapSpec, Rgba};
