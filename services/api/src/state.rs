//! Shared application state: the capabilities registry, runtime config,
//! and the read path's process-local caches and rate limiter, built once at
//! startup and shared behind an `Arc`.

use crate::cache::{JsonContentCache, RasterHandleCache, SampleCache, SingleFlight};
use crate::error::{ApiError, ApiResult};
use crate::ratelimit::RateLimiter;
use capabilities::{RegionSpec, Registry};
use raster_io::webp::WebpTier;
use std::path::PathBuf;
use std::time::Duration;

pub const RASTER_HANDLE_CACHE_CAPACITY: usize = 16;
pub const SAMPLE_CACHE_CAPACITY: usize = 4096;

/// Runtime knobs, populated from env/CLI in `main` and defaulted here for
/// tests.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub data_root: PathBuf,
    /// Separate root for the loop WebP cache; defaults to
    /// `{data_root}/loop_cache` when unset.
    pub loop_cache_root: Option<PathBuf>,
    pub sample_cache_ttl: Duration,
    pub sample_single_flight_wait: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_budget: u32,
    pub json_cache_recheck: Duration,
    pub loop_tier0: WebpTier,
    pub loop_tier1: WebpTier,
}

impl ApiConfig {
    pub fn new(data_root: PathBuf) -> Self {
        Self {
            data_root,
            loop_cache_root: None,
            sample_cache_ttl: Duration::from_secs(10),
            sample_single_flight_wait: Duration::from_millis(200),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_budget: 120,
            json_cache_recheck: Duration::from_secs(5),
            loop_tier0: raster_io::webp::DEFAULT_TIER0,
            loop_tier1: raster_io::webp::DEFAULT_TIER1,
        }
    }
}

pub struct AppState {
    pub registry: Registry,
    pub config: ApiConfig,
    pub raster_handles: RasterHandleCache,
    pub json_content: JsonContentCache,
    pub sample_cache: SampleCache,
    pub sample_single_flight: SingleFlight,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(registry: Registry, config: ApiConfig) -> Self {
        Self {
            registry,
            raster_handles: RasterHandleCache::new(RASTER_HANDLE_CACHE_CAPACITY),
            json_content: JsonContentCache::new(config.json_cache_recheck),
            sample_cache: SampleCache::new(SAMPLE_CACHE_CAPACITY, config.sample_cache_ttl),
            sample_single_flight: SingleFlight::new(),
            rate_limiter: RateLimiter::new(config.rate_limit_window, config.rate_limit_budget),
            config,
        }
    }

    pub fn published_root(&self) -> PathBuf {
        self.config.data_root.join("published")
    }
    pub fn manifests_root(&self) -> PathBuf {
        self.config.data_root.join("manifests")
    }
    pub fn loop_cache_root(&self) -> PathBuf {
        self.config.loop_cache_root.clone().unwrap_or_else(|| self.config.data_root.join("loop_cache"))
    }

    pub fn loop_tier(&self, tier: u8) -> WebpTier {
        match tier {
            0 => self.config.loop_tier0,
            _ => self.config.loop_tier1,
        }
    }

    pub fn canonical_region(&self, model_id: &str) -> ApiResult<RegionSpec> {
        let model = self.registry.get_model(model_id)?;
        capabilities::region_by_id(&model.canonical_region).ok_or_else(|| ApiError::UnknownModel(model_id.to_string()))
    }

    /// The fixed grid geometry every published raster for this model
    /// shares; pure math over the registry, so it's safe to derive without
    /// opening the raster itself.
    pub fn grid_handle(&self, model_id: &str) -> ApiResult<crate::cache::RasterHandle> {
        let region = self.canonical_region(model_id)?;
        let model = self.registry.get_model(model_id)?;
        let meters = *model
            .grid_meters_by_region
            .get(&region.id)
            .ok_or_else(|| ApiError::UnknownModel(model_id.to_string()))?;
        let bbox_3857 = wx_common::project_bbox(&region.bbox_wgs84, wx_common::Crs::Epsg4326, wx_common::Crs::Epsg3857);
        let (affine, height, width) = wx_common::affine_and_shape(&wx_common::TargetGrid { bbox_3857, meters });
        // The snapped affine's extent, not the raw region bbox; the raster
        // on disk covers the snapped grid.
        let (min_x, max_y) = affine.pixel_to_coord(0.0, 0.0);
        let (max_x, min_y) = affine.pixel_to_coord(width as f64, height as f64);
        Ok(crate::cache::RasterHandle {
            bbox_3857: wx_common::BoundingBox::new(min_x, min_y, max_x, max_y),
            affine,
            width,
            height,
        })
    }
}
