//! Compiled-in default color-map catalog, keyed by `color_map_id`. Color
//! maps are cataloged independently of variables so several variables can
//! share one map.

use crate::palette::{
    build_precip_ptype_flat_palette, build_radar_ptype_flat_palette, precip_ptype_range,
    RADAR_RAIN_LEVELS,
};
use crate::types::ColorMapSpec;
use std::collections::HashMap;

fn hexes(colors: &[&str]) -> Vec<String> {
    colors.iter().map(|s| s.to_string()).collect()
}

fn anchor_list(pairs: &[(f64, &str)]) -> Vec<(f64, String)> {
    pairs.iter().map(|(v, c)| (*v, c.to_string())).collect()
}

pub fn default_color_maps() -> HashMap<String, ColorMapSpec> {
    let mut m = HashMap::new();

    // Anchors are deliberately non-uniform: the ramp spends most of its
    // resolution around the freezing line and the warm band people read
    // most closely.
    m.insert(
        "tmp2m".to_string(),
        ColorMapSpec::Continuous {
            range_min: -40.0,
            range_max: 120.0,
            colors: Vec::new(),
            anchors: anchor_list(&[
                (-40.0, "#7b2cbf"),
                (-10.0, "#2d6cdf"),
                (10.0, "#1e9edb"),
                (32.0, "#36c98e"),
                (50.0, "#9fd84a"),
                (68.0, "#f7e74b"),
                (80.0, "#f79a3b"),
                (95.0, "#e5492d"),
                (120.0, "#a5102a"),
            ]),
            transparent_below_min: false,
        },
    );

    m.insert(
        "wspd10m".to_string(),
        ColorMapSpec::Continuous {
            range_min: 0.0,
            range_max: 80.0,
            colors: hexes(&["#ffffff", "#8fd3e8", "#40a4d8", "#2e6da4", "#f4b400", "#d9480f"]),
            anchors: Vec::new(),
            transparent_below_min: true,
        },
    );

    let refc_breaks: Vec<f64> = RADAR_RAIN_LEVELS.to_vec();
    m.insert(
        "refc".to_string(),
        ColorMapSpec::Discrete {
            breaks: refc_breaks,
            colors: hexes(crate::palette::RADAR_RAIN_COLORS),
            transparent_below_min: true,
        },
    );

    m.insert(
        "qpf6h".to_string(),
        ColorMapSpec::Continuous {
            range_min: 0.0,
            range_max: 24.0,
            colors: hexes(crate::palette::RAIN_COLORS),
            anchors: Vec::new(),
            transparent_below_min: true,
        },
    );

    m.insert(
        "precip_total".to_string(),
        ColorMapSpec::Discrete {
            breaks: crate::palette::RAIN_LEVELS.to_vec(),
            colors: hexes(crate::palette::RAIN_COLORS),
            transparent_below_min: true,
        },
    );

    m.insert(
        "snowfall_total".to_string(),
        ColorMapSpec::Discrete {
            breaks: crate::palette::SNOW_LEVELS.to_vec(),
            colors: hexes(crate::palette::SNOW_COLORS),
            transparent_below_min: true,
        },
    );

    let (_, ptype_max) = precip_ptype_range();
    let _ = ptype_max; // normalization range carried by the pipeline's sample encoding, not the spec itself
    let precip = build_precip_ptype_flat_palette();
    m.insert(
        "precip_ptype".to_string(),
        ColorMapSpec::Indexed {
            colors: precip
                .colors
                .iter()
                .map(|c| format!("#{:02x}{:02x}{:02x}", c.0, c.1, c.2))
                .collect(),
            transparent_zero: true,
        },
    );

    let radar = build_radar_ptype_flat_palette();
    m.insert(
        "radar_ptype".to_string(),
        ColorMapSpec::Indexed {
            colors: radar
                .colors
                .iter()
                .map(|c| format!("#{:02x}{:02x}{:02x}", c.0, c.1, c.2))
                .collect(),
            transparent_zero: true,
        },
    );

    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp2m_uses_value_positioned_anchors() {
        let maps = default_color_maps();
        match &maps["tmp2m"] {
            ColorMapSpec::Continuous { anchors, colors, .. } => {
                assert!(!anchors.is_empty());
                assert!(colors.is_empty());
                assert!(anchors.iter().any(|(v, _)| *v == 32.0), "freezing-line anchor missing");
            }
            other => panic!("tmp2m should be continuous, got {other:?}"),
        }
    }

    #[test]
    fn default_catalog_covers_all_referenced_color_map_ids() {
        let maps = default_color_maps();
        for id in [
            "tmp2m",
            "wspd10m",
            "refc",
            "qpf6h",
            "precip_total",
            "snowfall_total",
            "precip_ptype",
            "radar_ptype",
        ] {
            assert!(maps.contains_key(id), "missing color map: {id}");
        }
    }
}
