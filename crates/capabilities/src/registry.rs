//! The read-only capabilities registry.
//!
//! Constructed once at process startup and shared by the scheduler and API
//! services: a plain immutable map plus lookup methods that turn misses
//! into typed errors instead of `Option`.

use crate::error::{CapabilitiesError, CapabilitiesResult};
use crate::types::{ColorMapCatalog, ModelCapability, VariableCapability};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub struct Registry {
    models: HashMap<String, ModelCapability>,
    color_maps: ColorMapCatalog,
}

impl Registry {
    pub fn new(models: Vec<ModelCapability>, color_maps: ColorMapCatalog) -> Self {
        Self {
            models: models.into_iter().map(|m| (m.model_id.clone(), m)).collect(),
            color_maps,
        }
    }

    /// Compiled-in hrrr/gfs/nbm catalog plus the default color-map catalog,
    /// so binaries run without external config.
    pub fn with_defaults() -> Self {
        Self::new(crate::catalog::default_models(), colormap::default_color_maps())
    }

    pub fn list_models(&self) -> Vec<&ModelCapability> {
        let mut models: Vec<&ModelCapability> = self.models.values().collect();
        models.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        models
    }

    pub fn get_model(&self, model_id: &str) -> CapabilitiesResult<&ModelCapability> {
        self.models
            .get(model_id)
            .ok_or_else(|| CapabilitiesError::UnknownModel(model_id.to_string()))
    }

    pub fn get_variable(&self, model_id: &str, var_key: &str) -> CapabilitiesResult<&VariableCapability> {
        let model = self.get_model(model_id)?;
        model.variable_catalog.get(var_key).ok_or_else(|| CapabilitiesError::UnknownVariable {
            model: model_id.to_string(),
            var: var_key.to_string(),
        })
    }

    pub fn get_color_map(&self, color_map_id: &str) -> Option<&colormap::ColorMapSpec> {
        self.color_maps.get(color_map_id)
    }

    /// Resolves an alias (or the canonical key itself) case-insensitively
    /// against the model's declared alias table.
    pub fn normalize_var_key(&self, model_id: &str, raw: &str) -> CapabilitiesResult<String> {
        let model = self.get_model(model_id)?;
        let needle = raw.to_ascii_lowercase();
        for (key, var) in &model.variable_catalog {
            if key.to_ascii_lowercase() == needle {
                return Ok(key.clone());
            }
            if var.aliases.iter().any(|a| a.to_ascii_lowercase() == needle) {
                return Ok(key.clone());
            }
        }
        Err(CapabilitiesError::UnknownVariable { model: model_id.to_string(), var: raw.to_string() })
    }

    /// The first declared GRIB search pattern for a variable, used to probe
    /// upstream inventories for run discovery.
    pub fn probe_pattern(&self, model_id: &str, var_key: &str) -> CapabilitiesResult<String> {
        let var = self.get_variable(model_id, var_key)?;
        var.selectors.search.first().cloned().ok_or_else(|| CapabilitiesError::UnknownVariable {
            model: model_id.to_string(),
            var: var_key.to_string(),
        })
    }

    /// Deterministic JSON shape for `GET /capabilities`: sorted model list,
    /// flattened catalog, and per-model availability.
    pub fn to_capabilities_json(&self, availability: &HashMap<String, ModelAvailability>) -> CapabilitiesDoc {
        let supported_models: Vec<String> = {
            let mut ids: Vec<String> = self.models.keys().cloned().collect();
            ids.sort();
            ids
        };

        let mut model_catalog = BTreeMap::new();
        for (model_id, model) in &self.models {
            let mut variables = BTreeMap::new();
            for (var_key, var) in &model.variable_catalog {
                variables.insert(
                    var_key.clone(),
                    VariableDoc {
                        display_name: var.display_name.clone(),
                        kind: format!("{:?}", var.kind).to_ascii_lowercase(),
                        units: var.units.clone(),
                        color_map_id: var.color_map_id.clone(),
                        derive_strategy_id: var.derive_strategy_id.clone(),
                        primary: var.primary,
                        derived: var.derived,
                        buildable: var.is_buildable(),
                    },
                );
            }
            model_catalog.insert(
                model_id.clone(),
                ModelDoc {
                    display_name: model.display_name.clone(),
                    canonical_region: model.canonical_region.clone(),
                    ui_defaults: model.ui_defaults.clone(),
                    variables,
                },
            );
        }

        CapabilitiesDoc {
            contract_version: CONTRACT_VERSION,
            supported_models,
            model_catalog,
            availability: availability.clone().into_iter().collect(),
        }
    }
}

pub const CONTRACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Default)]
pub struct ModelAvailability {
    pub latest_run: Option<String>,
    pub published_runs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableDoc {
    pub display_name: String,
    pub kind: String,
    pub units: Option<String>,
    pub color_map_id: Option<String>,
    pub derive_strategy_id: Option<String>,
    pub primary: bool,
    pub derived: bool,
    pub buildable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelDoc {
    pub display_name: String,
    pub canonical_region: String,
    pub ui_defaults: HashMap<String, String>,
    pub variables: BTreeMap<String, VariableDoc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapabilitiesDoc {
    pub contract_version: u32,
    pub supported_models: Vec<String>,
    pub model_catalog: BTreeMap<String, ModelDoc>,
    pub availability: BTreeMap<String, ModelAvailability>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hrrr_tmp2m_and_precip_total_shape_matches_scenario_1() {
        let registry = Registry::with_defaults();
        let doc = registry.to_capabilities_json(&HashMap::new());
        assert_eq!(doc.supported_models, vec!["gfs", "hrrr", "nbm"]);

        let hrrr = &doc.model_catalog["hrrr"];
        assert!(hrrr.variables["tmp2m"].buildable);
        assert_eq!(hrrr.variables["tmp2m"].kind, "continuous");

        let gfs = &doc.model_catalog["gfs"];
        assert_eq!(gfs.variables["qpf6h"].kind, "continuous");
        assert!(gfs.variables["qpf6h"].buildable);
    }

    #[test]
    fn single_model_registry_serializes_expected_shape() {
        use crate::types::{RunDiscovery, VarSelectors, VariableCapability, VariableConstraints, VariableKind};

        let tmp2m = VariableCapability {
            var_key: "tmp2m".to_string(),
            display_name: "2m Temp".to_string(),
            kind: VariableKind::Continuous,
            units: Some("F".to_string()),
            conversion_id: Some("c_to_f".to_string()),
            color_map_id: Some("tmp2m".to_string()),
            derive_strategy_id: None,
            selectors: VarSelectors::default(),
            primary: true,
            derived: false,
            default_fh: None,
            order: None,
            constraints: VariableConstraints::default(),
            aliases: Vec::new(),
        };
        let precip_total = VariableCapability {
            var_key: "precip_total".to_string(),
            derive_strategy_id: Some("precip_total_cumulative".to_string()),
            primary: false,
            derived: true,
            kind: VariableKind::Discrete,
            display_name: "Total Precipitation".to_string(),
            ..tmp2m.clone()
        };
        let model = ModelCapability {
            model_id: "hrrr".to_string(),
            display_name: "HRRR".to_string(),
            product_code: "sfc".to_string(),
            canonical_region: "conus".to_string(),
            grid_meters_by_region: [("conus".to_string(), 3000.0)].into_iter().collect(),
            run_discovery: RunDiscovery {
                probe_var_key: "tmp2m".to_string(),
                probe_enabled: true,
                probe_attempts: 4,
                cycle_cadence_hours: 1,
                fallback_lag_hours: 3,
            },
            ui_defaults: HashMap::new(),
            variable_catalog: [("tmp2m".to_string(), tmp2m), ("precip_total".to_string(), precip_total)]
                .into_iter()
                .collect(),
        };

        let registry = Registry::new(vec![model], colormap::default_color_maps());
        let doc = registry.to_capabilities_json(&HashMap::new());
        assert_eq!(doc.supported_models, vec!["hrrr"]);
        let hrrr = &doc.model_catalog["hrrr"];
        assert!(hrrr.variables["tmp2m"].buildable);
        assert_eq!(hrrr.variables["tmp2m"].kind, "continuous");
        assert!(hrrr.variables["precip_total"].buildable);
        assert_eq!(hrrr.variables["precip_total"].derive_strategy_id.as_deref(), Some("precip_total_cumulative"));
    }

    #[test]
    fn normalize_var_key_is_case_insensitive() {
        let registry = Registry::with_defaults();
        assert_eq!(registry.normalize_var_key("hrrr", "T2M").unwrap(), "tmp2m");
        assert_eq!(registry.normalize_var_key("hrrr", "2T").unwrap(), "tmp2m");
    }

    #[test]
    fn unknown_model_and_variable_are_typed_errors() {
        let registry = Registry::with_defaults();
        assert!(matches!(registry.get_model("ecmwf"), Err(CapabilitiesError::UnknownModel(_))));
        assert!(matches!(
            registry.get_variable("hrrr", "nope"),
            Err(CapabilitiesError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn probe_pattern_resolves_first_search_entry() {
        let registry = Registry::with_defaults();
        let pattern = registry.probe_pattern("hrrr", "tmp2m").unwrap();
        assert_eq!(pattern, ":TMP:2 m above ground:");
    }
}
