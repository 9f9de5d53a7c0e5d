//! Typed model/variable capability records: immutable value types
//! deserializable straight from the YAML catalog.

use colormap::ColorMapSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wx_common::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Continuous,
    Discrete,
    Indexed,
}

/// GRIB search patterns / filter keys / component-wiring hints for one variable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VarSelectors {
    #[serde(default)]
    pub search: Vec<String>,
    #[serde(default)]
    pub filter_by_keys: HashMap<String, String>,
    #[serde(default)]
    pub hints: HashMap<String, String>,
}

impl VarSelectors {
    /// Reads a hint, falling back to `default` when absent. Hint values are
    /// authoritative over any crate-level constant of the same name.
    pub fn hint_f64(&self, key: &str, default: f64) -> f64 {
        self.hints.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    pub fn hint_u32(&self, key: &str, default: u32) -> u32 {
        self.hints.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    pub fn hint_str<'a>(&'a self, key: &str) -> Option<&'a str> {
        self.hints.get(key).map(|s| s.as_str())
    }
}

/// A named coverage region with its immutable WGS84 bbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSpec {
    pub id: String,
    pub name: String,
    pub bbox_wgs84: BoundingBox,
    #[serde(default)]
    pub clip: bool,
    /// `true` for regions carried only for historical-artifact resolution,
    /// never selected by new scheduler runs.
    #[serde(default)]
    pub historical_alias: bool,
}

/// Per-variable build/display constraints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableConstraints {
    #[serde(default)]
    pub min_fh: Option<u32>,
    #[serde(default)]
    pub max_fh: Option<u32>,
    #[serde(default)]
    pub allow_dry_frame: bool,
}

/// An immutable variable capability record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableCapability {
    pub var_key: String,
    pub display_name: String,
    pub kind: VariableKind,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub conversion_id: Option<String>,
    #[serde(default)]
    pub color_map_id: Option<String>,
    #[serde(default)]
    pub derive_strategy_id: Option<String>,
    #[serde(default)]
    pub selectors: VarSelectors,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub derived: bool,
    #[serde(default)]
    pub default_fh: Option<u32>,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub constraints: VariableConstraints,
    /// Aliases that `normalize_var_key` resolves to this `var_key`,
    /// case-insensitively.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl VariableCapability {
    /// A variable is buildable iff it's a primary upstream fetch or a
    /// derive-strategy output; everything else is a component-only input.
    pub fn is_buildable(&self) -> bool {
        self.primary || self.derived
    }
}

/// Probe/fallback configuration for resolving the latest upstream cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDiscovery {
    pub probe_var_key: String,
    #[serde(default = "default_true")]
    pub probe_enabled: bool,
    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: u32,
    pub cycle_cadence_hours: u32,
    pub fallback_lag_hours: u32,
}

fn default_true() -> bool {
    true
}
fn default_probe_attempts() -> u32 {
    4
}

/// An immutable model capability record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCapability {
    pub model_id: String,
    pub display_name: String,
    pub product_code: String,
    pub canonical_region: String,
    pub grid_meters_by_region: HashMap<String, f64>,
    pub run_discovery: RunDiscovery,
    #[serde(default)]
    pub ui_defaults: HashMap<String, String>,
    pub variable_catalog: HashMap<String, VariableCapability>,
}

impl ModelCapability {
    pub fn target_fhs(&self, cycle_hour: u32) -> Vec<u32> {
        crate::catalog::target_fhs_for(&self.model_id, cycle_hour)
    }
}

/// Color maps are keyed independently of variables so several variables can
/// share one definition.
pub type ColorMapCatalog = HashMap<String, ColorMapSpec>;
