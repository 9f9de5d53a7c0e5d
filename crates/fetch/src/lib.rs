//! The fetch adapter: produces one `(array, crs, affine)` triple per call
//! from an upstream mirror, distinguishing transient unavailability from
//! hard failures.

pub mod error;
pub mod http;
pub mod null_fetcher;
pub mod presets;
pub mod trait_def;
pub mod types;
pub mod units;

pub use error::{FetchError, FetchResult};
pub use http::{HttpFetcher, HttpFetcherConfig, MirrorTemplate};
pub use null_fetcher::NullFetcher;
pub use presets::{build_http_fetcher, FetchTuning};
pub use trait_def::{GribDecoder, VariableFetcher};
pub use types::{FetchRequest, RawGrid};
pub use units::convert_units;
