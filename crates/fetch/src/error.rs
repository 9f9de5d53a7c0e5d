//! Fetch-adapter error taxonomy: the build pipeline retries
//! `TransientUnavailable` across forecast-hour rounds and quarantines on
//! `HardFailure` immediately.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream index/subset not yet published, download returned empty,
    /// or the file disappeared before decode; worth retrying later.
    #[error("{model} fh{fh:03} {search_pattern}: transiently unavailable after trying mirrors {mirrors:?}")]
    TransientUnavailable { model: String, fh: u32, search_pattern: String, mirrors: Vec<String> },

    /// Network error, decode error, or shape mismatch; not expected to
    /// resolve by retrying the same run/fh.
    #[error("{model} fh{fh:03} {search_pattern}: hard failure: {reason}")]
    HardFailure { model: String, fh: u32, search_pattern: String, reason: String },
}

pub type FetchResult<T> = Result<T, FetchError>;
