//! Errors surfaced by the capabilities registry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapabilitiesError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("unknown variable {var} for model {model}")]
    UnknownVariable { model: String, var: String },

    #[error("unknown region {region} for model {model}")]
    UnknownRegion { model: String, region: String },

    #[error("variable {var} on model {model} has neither primary nor derive_strategy_id set")]
    NotBuildable { model: String, var: String },

    #[error("failed to read model catalog directory {path}: {source}")]
    CatalogIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model catalog file {path}: {source}")]
    CatalogParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type CapabilitiesResult<T> = Result<T, CapabilitiesError>;
