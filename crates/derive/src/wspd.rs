//! `wspd10m`: `hypot(u, v)` converted m/s → mph.

use crate::error::DeriveResult;
use crate::grid::Grid;

pub const MS_TO_MPH: f32 = 2.23694;

/// Converts a directly-fetched wind-speed field (m/s) to mph, for models
/// whose catalog carries a `speed_component` (e.g. NBM's `10si`) instead of
/// requiring the u/v hypot.
pub fn convert_speed_to_mph(speed: &Grid) -> Grid {
    Grid {
        data: speed.data.iter().map(|&v| v * MS_TO_MPH).collect(),
        width: speed.width,
        height: speed.height,
    }
}

pub fn derive_wspd10m(u: &Grid, v: &Grid) -> DeriveResult<Grid> {
    u.check_same_shape(v)?;
    let data = u
        .data
        .iter()
        .zip(&v.data)
        .map(|(&uu, &vv)| uu.hypot(vv) * MS_TO_MPH)
        .collect();
    Ok(Grid { data, width: u.width, height: u.height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_components_and_converts_to_mph() {
        let u = Grid { data: vec![3.0], width: 1, height: 1 };
        let v = Grid { data: vec![4.0], width: 1, height: 1 };
        let out = derive_wspd10m(&u, &v).unwrap();
        assert!((out.data[0] - 5.0 * MS_TO_MPH).abs() < 1e-4);
    }

    #[test]
    fn nan_component_propagates() {
        let u = Grid { data: vec![f32::NAN], width: 1, height: 1 };
        let v = Grid { data: vec![4.0], width: 1, height: 1 };
        let out = derive_wspd10m(&u, &v).unwrap();
        assert!(out.data[0].is_nan());
    }
}
