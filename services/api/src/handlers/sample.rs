//! Single-pixel point queries against the value COG: rate limit → pixel
//! resolution → result cache → single-flight → `gdallocationinfo` read.

use crate::cache::SampleResult;
use crate::error::{ApiError, ApiResult};
use crate::etag::{json_response, CacheClass};
use crate::paths;
use crate::run_resolution::resolve_run;
use crate::state::AppState;
use axum::extract::Query;
use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::Extension;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use wx_common::Crs;

#[derive(Debug, Deserialize)]
pub struct SampleQuery {
    pub model: String,
    pub run: String,
    pub var: String,
    pub fh: u32,
    pub lat: f64,
    pub lon: f64,
}

/// Best-available client identity for the rate-limit window: the first
/// `X-Forwarded-For` hop when a proxy supplies one, else one shared bucket.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get(header::HeaderName::from_static("x-forwarded-for"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "direct".to_string())
}

fn no_data() -> SampleResult {
    SampleResult { no_data: true, value: None, units: None, valid_time: None }
}

async fn sidecar_fields(state: &AppState, run_dir: &Path, var_key: &str, fh: u32) -> (Option<String>, Option<String>) {
    match state.json_content.read(&paths::sidecar_path(run_dir, var_key, fh)).await {
        Ok(v) => (
            v.get("units").and_then(Value::as_str).map(str::to_string),
            v.get("valid_time").and_then(Value::as_str).map(str::to_string),
        ),
        Err(_) => (None, None),
    }
}

fn respond(headers: &HeaderMap, result: &SampleResult) -> Response {
    let class = if result.no_data { CacheClass::SamplePrivateShort } else { CacheClass::SamplePrivateResolved };
    json_response(class, headers, result)
}

pub async fn sample(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SampleQuery>,
) -> ApiResult<Response> {
    if let Err(retry_after_sec) = state.rate_limiter.check(&client_key(&headers)).await {
        return Err(ApiError::RateLimited { retry_after_sec });
    }

    let var_key = state.registry.normalize_var_key(&query.model, &query.var)?;
    let run_id = resolve_run(&state.published_root(), &state.manifests_root(), &query.model, &query.run)?;
    let run_dir = paths::published_run_dir(&state.published_root(), &query.model, &run_id);

    let value_cog = paths::value_cog_path(&run_dir, &var_key, query.fh);
    if !value_cog.is_file() {
        return Err(ApiError::FrameNotFound { model: query.model, run: run_id.as_str().to_string(), var: var_key, fh: query.fh });
    }

    // Project once up front so out-of-domain points short-circuit without
    // touching the raster, and so the cache key is pixel-aligned (nearby
    // requests inside one pixel share an entry).
    let (x, y) = Crs::Epsg4326.to_epsg3857(query.lon, query.lat);
    let grid = state.grid_handle(&query.model)?;
    let (col, row) = grid.affine.coord_to_pixel(x, y);
    let (col, row) = (col.floor() as i64, row.floor() as i64);
    if col < 0 || row < 0 || col >= grid.width as i64 || row >= grid.height as i64 {
        return Ok(respond(&headers, &no_data()));
    }

    let cache_key = format!("{}:{}:{}:{}:{}:{}", query.model, run_id.as_str(), var_key, query.fh, row, col);
    if let Some(cached) = state.sample_cache.get(&cache_key).await {
        return Ok(respond(&headers, &cached));
    }

    let result = state
        .sample_single_flight
        .run(&cache_key, state.config.sample_single_flight_wait, || {
            let state = state.clone();
            let run_dir = run_dir.clone();
            let var_key = var_key.clone();
            let value_cog = value_cog.clone();
            let fh = query.fh;
            async move {
                let (units, valid_time) = sidecar_fields(&state, &run_dir, &var_key, fh).await;
                match raster_io::sample_point(&value_cog, x, y).await {
                    Ok(Some(v)) => SampleResult {
                        no_data: false,
                        value: Some((v as f64 * 10.0).round() / 10.0),
                        units,
                        valid_time,
                    },
                    Ok(None) => no_data(),
                    Err(e) => {
                        tracing::warn!(path = %value_cog.display(), error = %e, "sample read failed");
                        no_data()
                    }
                }
            }
        })
        .await;

    state.sample_cache.set(&cache_key, result.clone()).await;
    Ok(respond(&headers, &result))
}
