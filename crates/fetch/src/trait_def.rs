//! The `VariableFetcher` seam: produces one `(array, crs, affine)` triple
//! per call from an upstream mirror.

use crate::error::FetchResult;
use crate::types::{FetchRequest, RawGrid};
use async_trait::async_trait;

#[async_trait]
pub trait VariableFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult<RawGrid>;
}

/// Decodes a downloaded GRIB subset's first band into a `RawGrid`.
///
/// Kept as a separate seam from `VariableFetcher` so the retry/mirror
/// policy (this crate's actual job) is testable without a real GRIB
/// decoder wired in; `HttpFetcher` delegates to whatever `GribDecoder`
/// it is constructed with.
pub trait GribDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<RawGrid, String>;
}
