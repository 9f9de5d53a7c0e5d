//! Errors for derive strategies.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("component grids have mismatched shapes: {a_w}x{a_h} vs {b_w}x{b_h}")]
    ShapeMismatch { a_w: usize, a_h: usize, b_w: usize, b_h: usize },
}

pub type DeriveResult<T> = Result<T, DeriveError>;
