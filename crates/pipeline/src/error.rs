//! Errors the Build Pipeline can surface. Fetch/derive/raster-io errors are
//! wrapped rather than flattened so callers can still match on the inner
//! taxonomy (e.g. distinguish a transient fetch failure from a hard one).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capabilities(#[from] capabilities::CapabilitiesError),

    #[error(transparent)]
    Fetch(#[from] fetch::FetchError),

    #[error(transparent)]
    Derive(#[from] derive::DeriveError),

    #[error(transparent)]
    RasterIo(#[from] raster_io::RasterIoError),

    #[error("unknown color map id: {0}")]
    UnknownColorMap(String),

    #[error("unsupported derive strategy: {0}")]
    UnsupportedDeriveStrategy(String),

    #[error("variable {var} has no color map configured")]
    MissingColorMap { var: String },

    #[error("model {model} has no grid resolution configured for region {region}")]
    NoGridMetersForRegion { model: String, region: String },

    #[error("io error writing {path}: {detail}")]
    Io { path: String, detail: String },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
