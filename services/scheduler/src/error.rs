//! Scheduler-scoped errors: bad CLI input or an unresolvable model is a
//! configuration error, distinct from the per-frame failures the build
//! pipeline already reports.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("model {model} does not define canonical region {region}")]
    MissingCanonicalRegion { model: String, region: String },

    #[error("no schedulable variables resolved for model {0}")]
    NoSchedulableVars(String),

    #[error("invalid run id {0:?}: expected YYYYMMDD_HHz")]
    InvalidRunArg(String),

    #[error(transparent)]
    Capabilities(#[from] capabilities::CapabilitiesError),

    #[error(transparent)]
    Pipeline(#[from] pipeline::PipelineError),

    #[error("io error at {path}: {detail}")]
    Io { path: String, detail: String },
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
