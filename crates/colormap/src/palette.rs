//! Concrete palette data for the precipitation-type and radar-reflectivity
//! indexed color maps: per-category level tables, hex ramps, and the
//! flattened palettes that lay the categories out end to end.

use crate::hex::{expand_ramp, parse_hex, Rgb};

pub const RAIN_LEVELS: &[f64] = &[0.01, 0.1, 0.25, 0.5, 1.0, 1.5, 2.5, 4.0, 6.0, 10.0, 16.0, 24.0];
pub const SNOW_LEVELS: &[f64] = &[
    0.1, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 5.0, 6.0, 8.0, 10.0, 12.0, 14.0,
];
pub const WINTER_LEVELS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 3.0, 4.0, 6.0, 10.0, 14.0];

pub const RAIN_COLORS: &[&str] = &[
    "#90ee90", "#66dd66", "#33cc33", "#00bb00", "#009900", "#007700", "#005500", "#ffff00",
    "#ffb300", "#ff6600", "#ff0000", "#ff00ff",
];
pub const FRZR_COLORS: &[&str] = &[
    "#ffc0cb", "#ff69b4", "#ff1493", "#c71585", "#931040", "#b03060", "#d20000", "#ff2400",
    "#ff4500",
];
pub const SLEET_COLORS: &[&str] = &[
    "#e0ffff", "#add8e6", "#9370db", "#8a2be2", "#9400d3", "#800080", "#4b0082", "#8b008b",
    "#b22222",
];
pub const SNOW_COLORS: &[&str] = &[
    "#c0ffff", "#55ffff", "#4feaff", "#48d3ff", "#42bfff", "#3caaff", "#3693ff", "#2a69f1",
    "#1d42ca", "#1b18dc", "#161fb8", "#130495", "#130495", "#550a87", "#550a87", "#af068e",
    "#ea0081",
];

pub const PRECIP_PTYPE_ORDER: [&str; 4] = ["frzr", "sleet", "snow", "rain"];
pub const PRECIP_PTYPE_BINS_PER_TYPE: usize = 64;

pub const RADAR_RAIN_LEVELS: &[f64] = &[
    0.0, 10.0, 15.0, 20.0, 23.0, 25.0, 28.0, 30.0, 33.0, 35.0, 38.0, 40.0, 43.0, 45.0, 48.0, 50.0,
    53.0, 55.0, 58.0, 60.0, 70.0,
];
pub const RADAR_RAIN_COLORS: &[&str] = &[
    "#ffffff", "#4efb4c", "#46e444", "#3ecd3d", "#36b536", "#2d9e2e", "#258528", "#1d6e1f",
    "#155719", "#feff50", "#fad248", "#f8a442", "#f6763c", "#f5253a", "#de0a35", "#c21230",
    "#9c0045", "#bc0f9c", "#e300c1", "#f600dc",
];
pub const RADAR_WINTER_LEVELS: &[f64] = &[
    0.0, 4.0, 8.0, 12.0, 16.0, 20.0, 24.0, 28.0, 32.0, 36.0, 40.0, 44.0, 48.0, 52.0, 56.0, 60.0,
    70.0,
];
pub const RADAR_FRZR_COLORS: &[&str] = &[
    "#ffffff", "#fbcad0", "#f893ba", "#e96c9f", "#dd88a5", "#dc4f8b", "#d03a80", "#c62773",
    "#bd1366", "#b00145", "#c21230", "#da2d0d", "#e33403", "#f53c00", "#f53c00", "#f54603",
];
pub const RADAR_SLEET_COLORS: &[&str] = &[
    "#ffffff", "#b49dff", "#b788ff", "#c56cff", "#c54ef9", "#c54ef9", "#b730e7", "#a913d3",
    "#a913d3", "#9b02b4", "#bc0f9c", "#a50085", "#c52c7b", "#cf346f", "#d83c64", "#e24556",
];
pub const RADAR_SNOW_COLORS: &[&str] = &[
    "#ffffff", "#55ffff", "#4feaff", "#48d3ff", "#42bfff", "#3caaff", "#3693ff", "#2a6aee",
    "#1e40d0", "#110ba7", "#2a009a", "#0c276f", "#540093", "#bc0f9c", "#d30085", "#f5007f",
];

pub const RADAR_PTYPE_ORDER: [&str; 4] = ["rain", "snow", "sleet", "frzr"];

fn parse_all(hexes: &[&str]) -> Vec<Rgb> {
    hexes.iter().map(|h| parse_hex(h).expect("builtin palette is valid hex")).collect()
}

fn precip_type_config(key: &str) -> (&'static [f64], &'static [&'static str]) {
    match key {
        "rain" => (RAIN_LEVELS, RAIN_COLORS),
        "frzr" => (WINTER_LEVELS, FRZR_COLORS),
        "sleet" => (WINTER_LEVELS, SLEET_COLORS),
        "snow" => (SNOW_LEVELS, SNOW_COLORS),
        other => panic!("unknown precip ptype key: {other}"),
    }
}

fn radar_type_config(key: &str) -> (&'static [f64], &'static [&'static str]) {
    match key {
        "rain" => (RADAR_RAIN_LEVELS, RADAR_RAIN_COLORS),
        "frzr" => (RADAR_WINTER_LEVELS, RADAR_FRZR_COLORS),
        "sleet" => (RADAR_WINTER_LEVELS, RADAR_SLEET_COLORS),
        "snow" => (RADAR_WINTER_LEVELS, RADAR_SNOW_COLORS),
        other => panic!("unknown radar ptype key: {other}"),
    }
}

/// Per-type contiguous bin range within a flattened indexed palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtypeBreak {
    pub offset: usize,
    pub count: usize,
}

/// A flattened indexed palette built from several per-category ramps laid
/// out end to end, each occupying its own `PtypeBreak` range. `levels`
/// carries each category's physical level table so sidecars can report the
/// value each bin represents.
pub struct PtypeFlatPalette {
    pub order: Vec<String>,
    pub colors: Vec<Rgb>,
    pub breaks: std::collections::HashMap<String, PtypeBreak>,
    pub levels: std::collections::HashMap<String, Vec<f64>>,
}

/// Builds the 4×64-entry precipitation-rate-by-type palette: each of
/// frzr/sleet/snow/rain is expanded to 64 ramp stops and concatenated.
pub fn build_precip_ptype_flat_palette() -> PtypeFlatPalette {
    let mut colors = Vec::new();
    let mut breaks = std::collections::HashMap::new();
    let mut levels = std::collections::HashMap::new();
    for (idx, key) in PRECIP_PTYPE_ORDER.iter().enumerate() {
        let (type_levels, type_colors) = precip_type_config(key);
        let anchors = parse_all(type_colors);
        let expanded = expand_ramp(&anchors, PRECIP_PTYPE_BINS_PER_TYPE);
        let offset = idx * PRECIP_PTYPE_BINS_PER_TYPE;
        colors.extend(expanded);
        breaks.insert(
            key.to_string(),
            PtypeBreak { offset, count: PRECIP_PTYPE_BINS_PER_TYPE },
        );
        levels.insert(key.to_string(), type_levels.to_vec());
    }
    PtypeFlatPalette {
        order: PRECIP_PTYPE_ORDER.iter().map(|s| s.to_string()).collect(),
        colors,
        breaks,
        levels,
    }
}

/// Precipitation ptype rate normalization range: `[0, max level across all
/// four categories]`.
pub fn precip_ptype_range() -> (f64, f64) {
    let max_of = |levels: &[f64]| levels.iter().cloned().fold(f64::MIN, f64::max);
    let max_all = [RAIN_LEVELS, SNOW_LEVELS, WINTER_LEVELS]
        .iter()
        .map(|l| max_of(l))
        .fold(f64::MIN, f64::max);
    (0.0, max_all)
}

/// Builds the radar reflectivity-by-type palette: per-type ramps are
/// concatenated unexpanded (their native level/color counts already match).
pub fn build_radar_ptype_flat_palette() -> PtypeFlatPalette {
    let mut colors = Vec::new();
    let mut breaks = std::collections::HashMap::new();
    let mut levels = std::collections::HashMap::new();
    let mut offset = 0usize;
    for key in RADAR_PTYPE_ORDER.iter() {
        let (type_levels, type_colors) = radar_type_config(key);
        let expanded = parse_all(type_colors);
        let count = expanded.len();
        colors.extend(expanded);
        breaks.insert(key.to_string(), PtypeBreak { offset, count });
        levels.insert(key.to_string(), type_levels.to_vec());
        offset += count;
    }
    PtypeFlatPalette {
        order: RADAR_PTYPE_ORDER.iter().map(|s| s.to_string()).collect(),
        colors,
        breaks,
        levels,
    }
}

/// Minimum reflectivity treated as "visible" echo for `radar_ptype_combo`,
/// the fallback when a variable's hints don't carry `min_visible_dbz`.
pub const DEFAULT_MIN_VISIBLE_DBZ: f64 = 10.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precip_ptype_palette_has_256_entries() {
        let p = build_precip_ptype_flat_palette();
        assert_eq!(p.colors.len(), 4 * PRECIP_PTYPE_BINS_PER_TYPE);
        assert_eq!(p.breaks["rain"].offset, 3 * PRECIP_PTYPE_BINS_PER_TYPE);
        assert_eq!(p.breaks["frzr"].offset, 0);
    }

    #[test]
    fn radar_ptype_palette_breaks_are_contiguous() {
        let p = build_radar_ptype_flat_palette();
        let mut expected_offset = 0;
        for key in RADAR_PTYPE_ORDER.iter() {
            let b = p.breaks[*key];
            assert_eq!(b.offset, expected_offset);
            expected_offset += b.count;
        }
        assert_eq!(expected_offset, p.colors.len());
    }

    #[test]
    fn precip_ptype_range_matches_max_level() {
        let (lo, hi) = precip_ptype_range();
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 24.0); // max(RAIN_LEVELS) == 24.0, the largest of the three tables
    }
}
