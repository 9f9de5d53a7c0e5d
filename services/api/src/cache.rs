//! Process-local caches backing the read path: raster geometry, parsed
//! JSON, and sampled points, each an async-lock-guarded map with lazy TTL
//! or mtime revalidation, plus a single-flight map that coalesces
//! concurrent identical sample reads.

use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::{watch, Mutex};
use wx_common::{Affine, BoundingBox};

/// Precomputed grid geometry for one published (model, region) raster,
/// cached so repeat `/sample` and `/tiles` requests against the same run
/// skip recomputing the affine transform.
#[derive(Debug, Clone)]
pub struct RasterHandle {
    pub bbox_3857: BoundingBox,
    pub affine: Affine,
    pub width: usize,
    pub height: usize,
}

pub struct RasterHandleCache {
    entries: Mutex<lru::LruCache<PathBuf, RasterHandle>>,
}

impl RasterHandleCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("capacity > 0");
        Self { entries: Mutex::new(lru::LruCache::new(cap)) }
    }

    /// Returns the cached handle for `path`, computing and inserting it via
    /// `build` on a miss.
    pub async fn get_or_insert_with<F>(&self, path: &Path, build: F) -> RasterHandle
    where
        F: FnOnce() -> RasterHandle,
    {
        let mut entries = self.entries.lock().await;
        if let Some(handle) = entries.get(path) {
            return handle.clone();
        }
        let handle = build();
        entries.put(path.to_path_buf(), handle.clone());
        handle
    }

    /// Fallible variant: a failed `build` is not cached, so the next request
    /// retries it.
    pub async fn try_get_or_insert_with<F, E>(&self, path: &Path, build: F) -> Result<RasterHandle, E>
    where
        F: FnOnce() -> Result<RasterHandle, E>,
    {
        let mut entries = self.entries.lock().await;
        if let Some(handle) = entries.get(path) {
            return Ok(handle.clone());
        }
        let handle = build()?;
        entries.put(path.to_path_buf(), handle.clone());
        Ok(handle)
    }
}

struct JsonEntry {
    value: Value,
    mtime: SystemTime,
    last_checked: Instant,
}

/// Caches parsed JSON file contents (sidecars, manifests) keyed by path,
/// revalidated against the file's mtime no more than once per
/// `recheck_interval`; a sidecar never changes after a run is promoted, so
/// this mostly just avoids re-parsing the same bytes on every request.
pub struct JsonContentCache {
    entries: Mutex<HashMap<PathBuf, JsonEntry>>,
    recheck_interval: Duration,
}

impl JsonContentCache {
    pub fn new(recheck_interval: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), recheck_interval }
    }

    pub async fn read(&self, path: &Path) -> std::io::Result<Value> {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get(path) {
            if entry.last_checked.elapsed() < self.recheck_interval {
                return Ok(entry.value.clone());
            }
            let mtime = tokio::fs::metadata(path).await?.modified()?;
            if mtime == entry.mtime {
                let value = entry.value.clone();
                entries.insert(path.to_path_buf(), JsonEntry { value: value.clone(), mtime, last_checked: Instant::now() });
                return Ok(value);
            }
        }

        let body = tokio::fs::read_to_string(path).await?;
        let value: Value = serde_json::from_str(&body).map_err(std::io::Error::other)?;
        let mtime = tokio::fs::metadata(path).await?.modified()?;
        entries.insert(path.to_path_buf(), JsonEntry { value: value.clone(), mtime, last_checked: Instant::now() });
        Ok(value)
    }
}

/// Serialized straight into the `/sample` response body, so field names
/// follow that endpoint's wire contract (`noData`, `validTime`).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResult {
    pub no_data: bool,
    pub value: Option<f64>,
    pub units: Option<String>,
    pub valid_time: Option<String>,
}

struct SampleEntry {
    result: SampleResult,
    inserted_at: Instant,
}

/// Short-TTL cache of resolved `/sample` queries, keyed by
/// `(model, run, var, fh, row, col)` joined into one string; the same
/// point re-requested inside the TTL window skips the raster read entirely.
pub struct SampleCache {
    entries: Mutex<lru::LruCache<String, SampleEntry>>,
    ttl: Duration,
}

impl SampleCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("capacity > 0");
        Self { entries: Mutex::new(lru::LruCache::new(cap)), ttl }
    }

    pub async fn get(&self, key: &str) -> Option<SampleResult> {
        let mut entries = self.entries.lock().await;
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            entries.pop(key);
            return None;
        }
        Some(entry.result.clone())
    }

    pub async fn set(&self, key: &str, result: SampleResult) {
        let mut entries = self.entries.lock().await;
        entries.put(key.to_string(), SampleEntry { result, inserted_at: Instant::now() });
    }
}

enum FlightRole {
    Leader(watch::Sender<Option<SampleResult>>),
    Follower(watch::Receiver<Option<SampleResult>>),
}

/// Coalesces concurrent requests for the same sample key: the first caller
/// becomes the leader and runs `compute`; later callers for the same key
/// wait on the leader's result up to `wait_bound`, falling back to running
/// `compute` themselves if the leader doesn't finish in time.
pub struct SingleFlight {
    inflight: Mutex<HashMap<String, watch::Sender<Option<SampleResult>>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self { inflight: Mutex::new(HashMap::new()) }
    }

    pub async fn run<F, Fut>(&self, key: &str, wait_bound: Duration, compute: F) -> SampleResult
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = SampleResult>,
    {
        let role = {
            let mut inflight = self.inflight.lock().await;
            match inflight.get(key) {
                Some(tx) => FlightRole::Follower(tx.subscribe()),
                None => {
                    let (tx, _rx) = watch::channel(None);
                    inflight.insert(key.to_string(), tx.clone());
                    FlightRole::Leader(tx)
                }
            }
        };

        match role {
            FlightRole::Leader(tx) => {
                let result = compute().await;
                let _ = tx.send(Some(result.clone()));
                self.inflight.lock().await.remove(key);
                result
            }
            FlightRole::Follower(mut rx) => {
                let fallback = SampleResult { no_data: true, value: None, units: None, valid_time: None };
                let wait = tokio::time::timeout(wait_bound, async {
                    loop {
                        if let Some(result) = rx.borrow().clone() {
                            return result;
                        }
                        if rx.changed().await.is_err() {
                            return fallback.clone();
                        }
                    }
                })
                .await;

                match wait {
                    Ok(result) => result,
                    Err(_) => compute().await,
                }
            }
        }
    }
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn handle(n: f64) -> RasterHandle {
        RasterHandle { bbox_3857: BoundingBox::new(0.0, 0.0, n, n), affine: Affine::from_origin(0.0, n, 1.0, 1.0), width: 10, height: 10 }
    }

    #[tokio::test]
    async fn raster_handle_cache_reuses_built_handle() {
        let cache = RasterHandleCache::new(2);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let h1 = cache
            .get_or_insert_with(Path::new("/data/a.tif"), || {
                calls2.fetch_add(1, Ordering::SeqCst);
                handle(100.0)
            })
            .await;
        let h2 = cache.get_or_insert_with(Path::new("/data/a.tif"), || handle(999.0)).await;
        assert_eq!(h1.bbox_3857.max_x, h2.bbox_3857.max_x);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn json_content_cache_reparses_after_mtime_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sidecar.json");
        std::fs::write(&path, r#"{"fh":0}"#).unwrap();

        let cache = JsonContentCache::new(Duration::from_millis(0));
        let first = cache.read(&path).await.unwrap();
        assert_eq!(first["fh"], 0);

        tokio::time::sleep(Duration::from_millis(10)).await;
        std::fs::write(&path, r#"{"fh":3}"#).unwrap();
        let second = cache.read(&path).await.unwrap();
        assert_eq!(second["fh"], 3);
    }

    #[tokio::test]
    async fn sample_cache_expires_after_ttl() {
        let cache = SampleCache::new(4, Duration::from_millis(20));
        let result = SampleResult { no_data: false, value: Some(72.0), units: Some("F".to_string()), valid_time: None };
        cache.set("k", result.clone()).await;
        assert!(cache.get("k").await.is_some());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn single_flight_runs_compute_once_for_concurrent_callers() {
        let flight = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let flight = flight.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .run("k", Duration::from_secs(1), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        SampleResult { no_data: false, value: Some(1.0), units: None, valid_time: None }
                    })
                    .await
            }));
        }

        for h in handles {
            let result = h.await.unwrap();
            assert_eq!(result.value, Some(1.0));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
