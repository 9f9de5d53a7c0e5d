//! `NullFetcher`: an in-memory test double so pipeline/derive tests don't
//! need network access. Fixtures and failure injections are registered per
//! request key.

use crate::error::FetchError;
use crate::trait_def::VariableFetcher;
use crate::types::{FetchRequest, RawGrid};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct NullFetcher {
    fixtures: Mutex<HashMap<String, RawGrid>>,
    fail_transient: Mutex<Vec<String>>,
}

fn key(req: &FetchRequest) -> String {
    format!("{}:{}:{}:{}", req.model_id, req.run_time.to_rfc3339(), req.fh, req.search_pattern)
}

impl NullFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixture(self, req: &FetchRequest, grid: RawGrid) -> Self {
        self.fixtures.lock().unwrap().insert(key(req), grid);
        self
    }

    pub fn with_transient_failure(self, req: &FetchRequest) -> Self {
        self.fail_transient.lock().unwrap().push(key(req));
        self
    }
}

#[async_trait]
impl VariableFetcher for NullFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<RawGrid, FetchError> {
        let k = key(req);
        if self.fail_transient.lock().unwrap().contains(&k) {
            return Err(FetchError::TransientUnavailable {
                model: req.model_id.clone(),
                fh: req.fh,
                search_pattern: req.search_pattern.clone(),
                mirrors: vec!["null".to_string()],
            });
        }
        self.fixtures.lock().unwrap().get(&k).cloned().ok_or_else(|| FetchError::HardFailure {
            model: req.model_id.clone(),
            fh: req.fh,
            search_pattern: req.search_pattern.clone(),
            reason: "no fixture registered".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wx_common::{Affine, Crs};

    fn sample_request() -> FetchRequest {
        FetchRequest {
            model_id: "hrrr".to_string(),
            product: "sfc".to_string(),
            search_pattern: ":TMP:2 m above ground:".to_string(),
            run_time: chrono::Utc.with_ymd_and_hms(2026, 2, 17, 6, 0, 0).unwrap(),
            fh: 0,
        }
    }

    #[tokio::test]
    async fn returns_registered_fixture() {
        let req = sample_request();
        let grid = RawGrid {
            data: vec![1.0, 2.0, 3.0, 4.0],
            width: 2,
            height: 2,
            crs: Crs::Epsg4326,
            affine: Affine::from_origin(-125.0, 50.0, 0.25, 0.25),
        };
        let fetcher = NullFetcher::new().with_fixture(&req, grid.clone());
        let out = fetcher.fetch(&req).await.unwrap();
        assert_eq!(out.data, grid.data);
    }

    #[tokio::test]
    async fn missing_fixture_is_hard_failure() {
        let req = sample_request();
        let fetcher = NullFetcher::new();
        assert!(matches!(fetcher.fetch(&req).await, Err(FetchError::HardFailure { .. })));
    }

    #[tokio::test]
    async fn registered_transient_failure_is_reported() {
        let req = sample_request();
        let fetcher = NullFetcher::new().with_transient_failure(&req);
        assert!(matches!(fetcher.fetch(&req).await, Err(FetchError::TransientUnavailable { .. })));
    }
}
