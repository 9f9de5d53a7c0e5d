//! The capabilities registry: typed model/variable/color-map catalog,
//! constructed once at startup and shared read-only thereafter.

pub mod catalog;
pub mod error;
pub mod model_config;
pub mod regions;
pub mod registry;
pub mod types;

pub use error::{CapabilitiesError, CapabilitiesResult};
pub use regions::by_id as region_by_id;
pub use registry::{CapabilitiesDoc, ModelAvailability, Registry};
pub use types::{
    ColorMapCatalog, ModelCapability, RegionSpec, RunDiscovery, VarSelectors, VariableCapability,
    VariableConstraints, VariableKind,
};
