//! Color-map definitions: continuous ramps, discrete bins, and pre-indexed
//! palettes.

use crate::hex::Rgb;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorMapSpec {
    Continuous {
        range_min: f64,
        range_max: f64,
        /// Evenly spaced ramp colors, used when `anchors` is empty.
        #[serde(default)]
        colors: Vec<String>,
        /// Explicit `(value, color)` anchors at arbitrary positions within
        /// the range; takes precedence over `colors` when non-empty.
        #[serde(default)]
        anchors: Vec<(f64, String)>,
        #[serde(default)]
        transparent_below_min: bool,
    },
    Discrete {
        /// Sorted breakpoints; `colors.len()` is `breaks.len()` or `breaks.len() - 1`.
        breaks: Vec<f64>,
        colors: Vec<String>,
        #[serde(default = "default_true")]
        transparent_below_min: bool,
    },
    Indexed {
        colors: Vec<String>,
        #[serde(default)]
        transparent_zero: bool,
    },
}

fn default_true() -> bool {
    true
}

impl ColorMapSpec {
    pub fn parse_colors(colors: &[String]) -> Vec<Rgb> {
        colors
            .iter()
            .map(|c| crate::hex::parse_hex(c).unwrap_or(Rgb(0, 0, 0)))
            .collect()
    }
}

/// RGBA output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);
