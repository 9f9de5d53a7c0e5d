//! Minimal row-major float grid shared by derive strategies, independent
//! of any particular raster-geometry crate (derive strategies only need
//! elementwise/neighbor-free math over aligned component fields).

use crate::error::{DeriveError, DeriveResult};

#[derive(Debug, Clone)]
pub struct Grid {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl Grid {
    pub fn check_same_shape(&self, other: &Grid) -> DeriveResult<()> {
        if self.width != other.width || self.height != other.height {
            return Err(DeriveError::ShapeMismatch {
                a_w: self.width,
                a_h: self.height,
                b_w: other.width,
                b_h: other.height,
            });
        }
        Ok(())
    }
}
