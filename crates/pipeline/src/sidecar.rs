//! Sidecar metadata JSON written alongside each frame's COGs: units,
//! legend, value range, and the indexed-palette layout tables the client
//! needs to decode ptype pixels.

use chrono::{DateTime, Duration, Utc};
use colormap::palette::PtypeFlatPalette;
use colormap::ColorMapSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distinct from `capabilities::registry::CONTRACT_VERSION` (the
/// `GET /capabilities` document's contract); this versions the per-frame
/// sidecar artifact, which evolves on its own schedule.
pub const CONTRACT_VERSION: &str = "3.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Legend {
    Gradient { stops: Vec<(f64, String)> },
    Discrete { stops: Vec<(f64, String)> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContourRef {
    pub format: String,
    pub path: String,
    pub srs: String,
    pub level: f64,
}

/// Per-type contiguous bin range within a flattened indexed ptype palette.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PtypeBreakDoc {
    pub offset: usize,
    pub count: usize,
}

/// `#[serde(deny_unknown_fields)]` is deliberately omitted: the Scheduler
/// reads these back off disk with `Deserialize` to build run manifests, and
/// a sidecar written by a newer Build Pipeline should still parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    pub contract_version: String,
    pub model: String,
    pub run: String,
    pub var: String,
    pub fh: u32,
    pub valid_time: String,
    pub units: String,
    pub kind: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub legend: Legend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_value_downsample_factor: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptype_order: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptype_breaks: Option<BTreeMap<String, PtypeBreakDoc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptype_levels: Option<BTreeMap<String, Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contours: Option<BTreeMap<String, ContourRef>>,
}

fn format_units(units: &str) -> String {
    match units {
        "F" => "°F".to_string(),
        "C" => "°C".to_string(),
        other => other.to_string(),
    }
}

fn build_legend(spec: &ColorMapSpec) -> Legend {
    match spec {
        ColorMapSpec::Continuous { range_min, range_max, colors, anchors, .. } => {
            // Anchored maps report their stops at the anchored values;
            // plain ramps spread the colors evenly across the range.
            if !anchors.is_empty() {
                let stops = anchors
                    .iter()
                    .map(|(val, color)| ((val * 10.0).round() / 10.0, color.clone()))
                    .collect();
                return Legend::Gradient { stops };
            }
            let n = colors.len().max(1);
            let stops = colors
                .iter()
                .enumerate()
                .map(|(i, color)| {
                    let frac = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
                    let val = range_min + (range_max - range_min) * frac;
                    ((val * 10.0).round() / 10.0, color.clone())
                })
                .collect();
            Legend::Gradient { stops }
        }
        ColorMapSpec::Discrete { breaks, colors, .. } => {
            let n = breaks.len().min(colors.len());
            let stops = (0..n).map(|i| (breaks[i], colors[i].clone())).collect();
            Legend::Discrete { stops }
        }
        ColorMapSpec::Indexed { colors, .. } => {
            let stops = colors.iter().enumerate().map(|(i, c)| (i as f64, c.clone())).collect();
            Legend::Discrete { stops }
        }
    }
}

/// The per-type palette layout tables for an indexed ptype frame, shaped for
/// the sidecar's `ptype_order`/`ptype_breaks`/`ptype_levels` fields.
pub struct PtypeTables {
    pub order: Vec<String>,
    pub breaks: BTreeMap<String, PtypeBreakDoc>,
    pub levels: BTreeMap<String, Vec<f64>>,
}

impl From<&PtypeFlatPalette> for PtypeTables {
    fn from(palette: &PtypeFlatPalette) -> Self {
        let breaks = palette
            .breaks
            .iter()
            .map(|(k, b)| (k.clone(), PtypeBreakDoc { offset: b.offset, count: b.count }))
            .collect();
        let levels = palette.levels.iter().map(|(k, l)| (k.clone(), l.clone())).collect();
        Self { order: palette.order.clone(), breaks, levels }
    }
}

pub struct SidecarInput<'a> {
    pub model: &'a str,
    pub run_id: &'a str,
    pub var_id: &'a str,
    pub fh: u32,
    pub run_time: DateTime<Utc>,
    pub kind: &'a str,
    pub units: &'a str,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub color_map: &'a ColorMapSpec,
    pub hover_value_downsample_factor: Option<u32>,
    pub ptype: Option<PtypeTables>,
    pub contours: Option<BTreeMap<String, ContourRef>>,
}

pub fn build_sidecar_json(input: SidecarInput) -> Sidecar {
    let valid_time = input.run_time + Duration::hours(input.fh as i64);
    let (ptype_order, ptype_breaks, ptype_levels) = match input.ptype {
        Some(tables) => (Some(tables.order), Some(tables.breaks), Some(tables.levels)),
        None => (None, None, None),
    };
    Sidecar {
        contract_version: CONTRACT_VERSION.to_string(),
        model: input.model.to_string(),
        run: input.run_id.to_string(),
        var: input.var_id.to_string(),
        fh: input.fh,
        valid_time: valid_time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        units: format_units(input.units),
        kind: input.kind.to_string(),
        min: input.min,
        max: input.max,
        legend: build_legend(input.color_map),
        hover_value_downsample_factor: input.hover_value_downsample_factor,
        ptype_order,
        ptype_breaks,
        ptype_levels,
        contours: input.contours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn continuous_legend_spans_range_evenly() {
        let spec = ColorMapSpec::Continuous {
            range_min: 0.0,
            range_max: 100.0,
            colors: vec!["#000000".into(), "#808080".into(), "#ffffff".into()],
            anchors: Vec::new(),
            transparent_below_min: false,
        };
        let legend = build_legend(&spec);
        match legend {
            Legend::Gradient { stops } => {
                assert_eq!(stops.len(), 3);
                assert_eq!(stops[0].0, 0.0);
                assert_eq!(stops[2].0, 100.0);
            }
            _ => panic!("expected gradient legend"),
        }
    }

    #[test]
    fn anchored_legend_keeps_the_anchor_values() {
        let spec = ColorMapSpec::Continuous {
            range_min: -40.0,
            range_max: 120.0,
            colors: Vec::new(),
            anchors: vec![(-40.0, "#7b2cbf".into()), (32.0, "#36c98e".into()), (120.0, "#a5102a".into())],
            transparent_below_min: false,
        };
        match build_legend(&spec) {
            Legend::Gradient { stops } => {
                assert_eq!(stops.len(), 3);
                assert_eq!(stops[1], (32.0, "#36c98e".to_string()));
            }
            _ => panic!("expected gradient legend"),
        }
    }

    #[test]
    fn valid_time_adds_forecast_hours() {
        let run_time = Utc.with_ymd_and_hms(2026, 2, 17, 6, 0, 0).unwrap();
        let spec = ColorMapSpec::Indexed { colors: vec!["#ffffff".into()], transparent_zero: false };
        let sidecar = build_sidecar_json(SidecarInput {
            model: "hrrr",
            run_id: "20260217_06z",
            var_id: "tmp2m",
            fh: 3,
            run_time,
            kind: "continuous",
            units: "F",
            min: Some(10.0),
            max: Some(90.0),
            color_map: &spec,
            hover_value_downsample_factor: None,
            ptype: None,
            contours: None,
        });
        assert_eq!(sidecar.valid_time, "2026-02-17T09:00:00Z");
        assert_eq!(sidecar.units, "°F");
        assert_eq!(sidecar.contract_version, "3.0");
    }

    #[test]
    fn ptype_tables_survive_serialization_only_when_present() {
        let run_time = Utc.with_ymd_and_hms(2026, 2, 17, 6, 0, 0).unwrap();
        let spec = ColorMapSpec::Indexed { colors: vec!["#ffffff".into()], transparent_zero: true };
        let palette = colormap::palette::build_radar_ptype_flat_palette();
        let sidecar = build_sidecar_json(SidecarInput {
            model: "hrrr",
            run_id: "20260217_06z",
            var_id: "radar_ptype",
            fh: 0,
            run_time,
            kind: "indexed",
            units: "dBZ",
            min: Some(0.0),
            max: Some(63.0),
            color_map: &spec,
            hover_value_downsample_factor: Some(2),
            ptype: Some(PtypeTables::from(&palette)),
            contours: None,
        });

        let json = serde_json::to_value(&sidecar).unwrap();
        assert_eq!(json["hover_value_downsample_factor"], 2);
        assert_eq!(json["ptype_order"][0], "rain");
        assert!(json["ptype_breaks"]["snow"]["count"].as_u64().unwrap() > 0);
        assert!(json["ptype_levels"]["rain"].as_array().unwrap().len() > 1);

        // A continuous sidecar serializes without any ptype keys at all.
        let plain = build_sidecar_json(SidecarInput {
            model: "hrrr",
            run_id: "20260217_06z",
            var_id: "tmp2m",
            fh: 0,
            run_time,
            kind: "continuous",
            units: "F",
            min: None,
            max: None,
            color_map: &spec,
            hover_value_downsample_factor: None,
            ptype: None,
            contours: None,
        });
        let plain_json = serde_json::to_value(&plain).unwrap();
        assert!(plain_json.get("ptype_order").is_none());
        assert!(plain_json.get("hover_value_downsample_factor").is_none());
    }
}
