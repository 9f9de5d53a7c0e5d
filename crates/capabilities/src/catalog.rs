//! Default, compiled-in model/variable catalog for `hrrr`, `gfs`, and
//! `nbm`, shipped so the scheduler/API binaries run without external YAML
//! config for tests and local development.

use crate::types::{
    ModelCapability, RunDiscovery, VarSelectors, VariableCapability, VariableConstraints,
    VariableKind,
};
use std::collections::HashMap;

pub fn target_fhs_for(model_id: &str, cycle_hour: u32) -> Vec<u32> {
    match model_id {
        "hrrr" => {
            if matches!(cycle_hour, 0 | 6 | 12 | 18) {
                (0..=48).collect()
            } else {
                (0..=18).collect()
            }
        }
        "gfs" | "nbm" => (0..=120).step_by(6).collect(),
        _ => Vec::new(),
    }
}

fn selectors(search: &[&str], filter_by_keys: &[(&str, &str)], hints: &[(&str, &str)]) -> VarSelectors {
    VarSelectors {
        search: search.iter().map(|s| s.to_string()).collect(),
        filter_by_keys: filter_by_keys.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        hints: hints.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    }
}

fn var(
    key: &str,
    name: &str,
    kind: VariableKind,
    sel: VarSelectors,
    primary: bool,
    derived: bool,
    derive: Option<&str>,
    color_map_id: Option<&str>,
    conversion_id: Option<&str>,
    units: Option<&str>,
) -> (String, VariableCapability) {
    (
        key.to_string(),
        VariableCapability {
            var_key: key.to_string(),
            display_name: name.to_string(),
            kind,
            units: units.map(str::to_string),
            conversion_id: conversion_id.map(str::to_string),
            color_map_id: color_map_id.map(str::to_string),
            derive_strategy_id: derive.map(str::to_string),
            selectors: sel,
            primary,
            derived,
            default_fh: None,
            order: None,
            constraints: VariableConstraints::default(),
            aliases: Vec::new(),
        },
    )
}

pub fn hrrr() -> ModelCapability {
    let mut catalog: HashMap<String, VariableCapability> = HashMap::new();

    let (k, mut v) = var(
        "tmp2m",
        "2m Temp",
        VariableKind::Continuous,
        selectors(
            &[":TMP:2 m above ground:"],
            &[("shortName", "2t"), ("typeOfLevel", "heightAboveGround"), ("level", "2")],
            &[("upstream_var", "t2m"), ("hover_value_downsample_factor", "2")],
        ),
        true,
        false,
        None,
        Some("tmp2m"),
        Some("c_to_f"),
        Some("F"),
    );
    v.aliases = vec!["t2m".into(), "2t".into()];
    catalog.insert(k, v);

    let (k, v) = var(
        "10u",
        "10m U Wind",
        VariableKind::Continuous,
        selectors(&[":UGRD:10 m above ground:"], &[("shortName", "10u"), ("typeOfLevel", "heightAboveGround"), ("level", "10")], &[("upstream_var", "10u")]),
        false,
        false,
        None,
        None,
        None,
        Some("m/s"),
    );
    catalog.insert(k, v);

    let (k, v) = var(
        "10v",
        "10m V Wind",
        VariableKind::Continuous,
        selectors(&[":VGRD:10 m above ground:"], &[("shortName", "10v"), ("typeOfLevel", "heightAboveGround"), ("level", "10")], &[("upstream_var", "10v")]),
        false,
        false,
        None,
        None,
        None,
        Some("m/s"),
    );
    catalog.insert(k, v);

    let (k, mut v) = var(
        "wspd10m",
        "10m Wind Speed",
        VariableKind::Continuous,
        selectors(&[], &[], &[("u_component", "10u"), ("v_component", "10v")]),
        false,
        true,
        Some("wspd10m"),
        Some("wspd10m"),
        Some("ms_to_mph"),
        Some("mph"),
    );
    v.aliases = vec!["wind10m".into()];
    catalog.insert(k, v);

    let (k, v) = var(
        "refc",
        "Composite Reflectivity",
        VariableKind::Discrete,
        selectors(&[":REFC:"], &[("shortName", "refc")], &[("upstream_var", "refc")]),
        false,
        false,
        None,
        Some("refc"),
        None,
        Some("dBZ"),
    );
    catalog.insert(k, v);

    for (key, search, name) in [
        ("crain", ":CRAIN:surface:", "Categorical Rain"),
        ("csnow", ":CSNOW:surface:", "Categorical Snow"),
        ("cicep", ":CICEP:surface:", "Categorical Sleet"),
        ("cfrzr", ":CFRZR:surface:", "Categorical Freezing Rain"),
    ] {
        let short = key.to_string();
        let (k, v) = var(
            key,
            name,
            VariableKind::Indexed,
            selectors(&[search], &[("shortName", &short), ("typeOfLevel", "surface")], &[("upstream_var", key)]),
            false,
            false,
            None,
            None,
            None,
            None,
        );
        catalog.insert(k, v);
    }

    let (k, v) = var(
        "radar_ptype",
        "Composite Reflectivity + P-Type",
        VariableKind::Indexed,
        selectors(
            &[],
            &[],
            &[
                ("refl_component", "refc"),
                ("rain_component", "crain"),
                ("snow_component", "csnow"),
                ("sleet_component", "cicep"),
                ("frzr_component", "cfrzr"),
                ("min_visible_dbz", "10.0"),
            ],
        ),
        false,
        true,
        Some("radar_ptype_combo"),
        Some("radar_ptype"),
        None,
        Some("dBZ"),
    );
    catalog.insert(k, v);

    ModelCapability {
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
        ui_defaults: [
            ("default_var_key".to_string(), "tmp2m".to_string()),
            ("default_run".to_string(), "latest".to_string()),
        ]
        .into_iter()
        .collect(),
        variable_catalog: catalog,
    }
}

pub fn gfs() -> ModelCapability {
    let mut catalog: HashMap<String, VariableCapability> = HashMap::new();

    let (k, v) = var(
        "tmp2m",
        "2m Temp",
        VariableKind::Continuous,
        selectors(&[":TMP:2 m above ground:"], &[("typeOfLevel", "heightAboveGround"), ("level", "2")], &[("upstream_var", "t2m"), ("cf_var", "t2m"), ("short_name", "2t")]),
        true,
        false,
        None,
        Some("tmp2m"),
        Some("c_to_f"),
        Some("F"),
    );
    catalog.insert(k, v);

    let (k, v) = var(
        "10u",
        "10m U Wind",
        VariableKind::Continuous,
        selectors(&[":UGRD:10 m above ground:"], &[("typeOfLevel", "heightAboveGround"), ("level", "10")], &[("upstream_var", "10u"), ("cf_var", "u10"), ("short_name", "10u")]),
        false,
        false,
        None,
        None,
        None,
        Some("m/s"),
    );
    catalog.insert(k, v);

    let (k, v) = var(
        "10v",
        "10m V Wind",
        VariableKind::Continuous,
        selectors(&[":VGRD:10 m above ground:"], &[("typeOfLevel", "heightAboveGround"), ("level", "10")], &[("upstream_var", "10v"), ("cf_var", "v10"), ("short_name", "10v")]),
        false,
        false,
        None,
        None,
        None,
        Some("m/s"),
    );
    catalog.insert(k, v);

    let (k, v) = var(
        "wspd10m",
        "10m Wind Speed",
        VariableKind::Continuous,
        selectors(&[], &[], &[("u_component", "10u"), ("v_component", "10v")]),
        false,
        true,
        Some("wspd10m"),
        Some("wspd10m"),
        Some("ms_to_mph"),
        Some("mph"),
    );
    catalog.insert(k, v);

    let (k, v) = var(
        "refc",
        "Composite Reflectivity",
        VariableKind::Discrete,
        selectors(&[":REFC:"], &[("shortName", "refc")], &[("upstream_var", "refc"), ("cf_var", "refc"), ("short_name", "refc")]),
        false,
        false,
        None,
        Some("refc"),
        None,
        Some("dBZ"),
    );
    catalog.insert(k, v);

    let (k, v) = var(
        "precip_ptype",
        "Precipitation Intensity + Type",
        VariableKind::Indexed,
        selectors(
            &[":PRATE:surface:"],
            &[("typeOfLevel", "surface"), ("shortName", "prate")],
            &[
                ("upstream_var", "prate"),
                ("prate_component", "precip_ptype"),
                ("rain_component", "crain"),
                ("snow_component", "csnow"),
                ("sleet_component", "cicep"),
                ("frzr_component", "cfrzr"),
            ],
        ),
        true,
        true,
        Some("precip_ptype_blend"),
        Some("precip_ptype"),
        None,
        Some("mm/hr"),
    );
    catalog.insert(k, v);

    for (key, search, name) in [
        ("crain", ":CRAIN:surface:", "Categorical Rain"),
        ("csnow", ":CSNOW:surface:", "Categorical Snow"),
        ("cicep", ":CICEP:surface:", "Categorical Sleet"),
        ("cfrzr", ":CFRZR:surface:", "Categorical Freezing Rain"),
    ] {
        let short = key.to_string();
        let (k, v) = var(
            key,
            name,
            VariableKind::Indexed,
            selectors(&[search], &[("typeOfLevel", "surface"), ("shortName", &short)], &[("upstream_var", key), ("short_name", key)]),
            false,
            false,
            None,
            None,
            None,
            None,
        );
        catalog.insert(k, v);
    }

    let (k, mut v) = var(
        "qpf6h",
        "6-hr Precip",
        VariableKind::Continuous,
        selectors(&[":APCP:surface:"], &[], &[("kind", "apcp_rolling_6h"), ("apcp_window_hours", "6")]),
        true,
        false,
        None,
        Some("qpf6h"),
        Some("kgm2_to_in"),
        Some("in"),
    );
    // APCP is a 6-hour accumulation bucket; fh<6 has no complete bucket yet.
    v.constraints.min_fh = Some(6);
    v.constraints.allow_dry_frame = true;
    catalog.insert(k, v);

    let (k, mut v) = var(
        "precip_total",
        "Total Precipitation",
        VariableKind::Discrete,
        selectors(&[], &[], &[("apcp_component", "qpf6h"), ("step_hours", "6"), ("min_step_lwe_kgm2", "0.01")]),
        false,
        true,
        Some("precip_total_cumulative"),
        Some("precip_total"),
        Some("kgm2_to_in"),
        Some("in"),
    );
    v.constraints.min_fh = Some(6);
    v.constraints.allow_dry_frame = true;
    catalog.insert(k, v);

    let (k, mut v) = var(
        "snowfall_total",
        "Total Snowfall (10:1)",
        VariableKind::Discrete,
        selectors(
            &[],
            &[],
            &[
                ("apcp_component", "qpf6h"),
                ("snow_component", "csnow"),
                ("step_hours", "6"),
                ("snow_mask_threshold", "0.5"),
                ("min_step_lwe_kgm2", "0.01"),
                ("slr", "10"),
            ],
        ),
        false,
        true,
        Some("snowfall_total_10to1_cumulative"),
        Some("snowfall_total"),
        None,
        Some("in"),
    );
    v.constraints.min_fh = Some(6);
    v.constraints.allow_dry_frame = true;
    catalog.insert(k, v);

    ModelCapability {
        model_id: "gfs".to_string(),
        display_name: "GFS".to_string(),
        product_code: "pgrb2.0p25".to_string(),
        canonical_region: "conus".to_string(),
        grid_meters_by_region: [("conus".to_string(), 25000.0)].into_iter().collect(),
        run_discovery: RunDiscovery {
            probe_var_key: "tmp2m".to_string(),
            probe_enabled: true,
            probe_attempts: 4,
            cycle_cadence_hours: 6,
            fallback_lag_hours: 5,
        },
        ui_defaults: [
            ("default_var_key".to_string(), "tmp2m".to_string()),
            ("default_run".to_string(), "latest".to_string()),
        ]
        .into_iter()
        .collect(),
        variable_catalog: catalog,
    }
}

pub fn nbm() -> ModelCapability {
    let mut catalog: HashMap<String, VariableCapability> = HashMap::new();

    let (k, mut v) = var(
        "tmp2m",
        "Surface Temp",
        VariableKind::Continuous,
        selectors(&[":TMP:2 m above ground:"], &[("typeOfLevel", "heightAboveGround"), ("level", "2")], &[("upstream_var", "t2m"), ("cf_var", "t2m"), ("short_name", "2t")]),
        true,
        false,
        None,
        Some("tmp2m"),
        Some("c_to_f"),
        Some("F"),
    );
    v.order = Some(1);
    catalog.insert(k, v);

    let (k, v) = var(
        "10u",
        "10m U Wind",
        VariableKind::Continuous,
        selectors(&[":UGRD:10 m above ground:"], &[("typeOfLevel", "heightAboveGround"), ("level", "10")], &[("upstream_var", "10u"), ("cf_var", "u10"), ("short_name", "10u")]),
        false,
        false,
        None,
        None,
        None,
        Some("m/s"),
    );
    catalog.insert(k, v);

    let (k, v) = var(
        "10v",
        "10m V Wind",
        VariableKind::Continuous,
        selectors(&[":VGRD:10 m above ground:"], &[("typeOfLevel", "heightAboveGround"), ("level", "10")], &[("upstream_var", "10v"), ("cf_var", "v10"), ("short_name", "10v")]),
        false,
        false,
        None,
        None,
        None,
        Some("m/s"),
    );
    catalog.insert(k, v);

    let (k, v) = var(
        "10si",
        "10m Wind Speed (direct)",
        VariableKind::Continuous,
        selectors(&[":WIND:10 m above ground:", ":WIND:10 m above ground"], &[("typeOfLevel", "heightAboveGround"), ("level", "10")], &[("upstream_var", "10si"), ("cf_var", "si10"), ("short_name", "10si")]),
        false,
        false,
        None,
        None,
        None,
        Some("m/s"),
    );
    catalog.insert(k, v);

    let (k, mut v) = var(
        "wspd10m",
        "10m Wind Speed",
        VariableKind::Continuous,
        selectors(&[], &[], &[("u_component", "10u"), ("v_component", "10v"), ("speed_component", "10si")]),
        false,
        true,
        Some("wspd10m"),
        Some("wspd10m"),
        Some("ms_to_mph"),
        Some("mph"),
    );
    v.order = Some(2);
    catalog.insert(k, v);

    ModelCapability {
        model_id: "nbm".to_string(),
        display_name: "NBM".to_string(),
        product_code: "co".to_string(),
        canonical_region: "conus".to_string(),
        grid_meters_by_region: [("conus".to_string(), 13_000.0), ("pnw".to_string(), 13_000.0)]
            .into_iter()
            .collect(),
        run_discovery: RunDiscovery {
            probe_var_key: "tmp2m".to_string(),
            probe_enabled: true,
            probe_attempts: 4,
            cycle_cadence_hours: 6,
            fallback_lag_hours: 5,
        },
        ui_defaults: [
            ("default_var_key".to_string(), "tmp2m".to_string()),
            ("default_run".to_string(), "latest".to_string()),
        ]
        .into_iter()
        .collect(),
        variable_catalog: catalog,
    }
}

pub fn default_models() -> Vec<ModelCapability> {
    vec![hrrr(), gfs(), nbm()]
}
