//! Unit conversion registry, applied after fetch and before warp. GDAL's
//! GRIB driver normalizes temperatures to °C and wind speeds to m/s
//! (`GRIB_NORMALIZE_UNITS=YES`), so these are the only conversions a GRIB
//! field ever needs on the way to display units.

const CELSIUS_TO_FAHRENHEIT_SCALE: f32 = 9.0 / 5.0;
const CELSIUS_TO_FAHRENHEIT_OFFSET: f32 = 32.0;
pub const MS_TO_MPH: f32 = 2.23694;
pub const M_TO_IN: f32 = 39.37007874015748;
pub const KGM2_TO_IN: f32 = 0.03937007874015748;

/// Applies the conversion named by `conversion_id` to every finite cell,
/// preserving `NaN`. Returns the data unchanged if `conversion_id` is `None`
/// or unrecognized; `convert_units`'s "variable needs no conversion" path.
pub fn convert_units(data: &[f32], conversion_id: Option<&str>) -> Vec<f32> {
    let Some(id) = conversion_id else {
        return data.to_vec();
    };
    let f: fn(f32) -> f32 = match id {
        "c_to_f" => celsius_to_fahrenheit,
        "ms_to_mph" => ms_to_mph,
        "m_to_in" => m_to_in,
        "kgm2_to_in" => kgm2_to_in,
        _ => return data.to_vec(),
    };
    data.iter().map(|&v| if v.is_finite() { f(v) } else { v }).collect()
}

fn celsius_to_fahrenheit(v: f32) -> f32 {
    v * CELSIUS_TO_FAHRENHEIT_SCALE + CELSIUS_TO_FAHRENHEIT_OFFSET
}

fn ms_to_mph(v: f32) -> f32 {
    v * MS_TO_MPH
}

fn m_to_in(v: f32) -> f32 {
    v * M_TO_IN
}

fn kgm2_to_in(v: f32) -> f32 {
    v * KGM2_TO_IN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn celsius_freezing_and_boiling_points() {
        let out = convert_units(&[0.0, 100.0], Some("c_to_f"));
        assert_eq!(out, vec![32.0, 212.0]);
    }

    #[test]
    fn nan_is_preserved_through_conversion() {
        let out = convert_units(&[f32::NAN], Some("ms_to_mph"));
        assert!(out[0].is_nan());
    }

    #[test]
    fn unknown_conversion_id_is_a_no_op() {
        let out = convert_units(&[1.0, 2.0], Some("nope"));
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn no_conversion_id_is_a_no_op() {
        let out = convert_units(&[1.0, 2.0], None);
        assert_eq!(out, vec![1.0, 2.0]);
    }
}
