//! Binary artifact endpoints: loop WebP frames, contour GeoJSON, and PNG
//! map tiles.

use crate::error::{ApiError, ApiResult};
use crate::etag::{bytes_response, CacheClass};
use crate::paths;
use crate::run_resolution::resolve_run;
use crate::state::AppState;
use crate::tilemath::{tile_bbox_3857, TILE_SIZE_PX};
use axum::extract::{Path, Query};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Extension;
use raster_io::webp::convert_rgba_cog_to_loop_webp;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Tile PNGs and loop WebPs are immutable for an explicit run; the `latest`
/// alias re-resolves, so it gets the short lifetime.
fn artifact_cache_class(run_token: &str) -> CacheClass {
    if run_token == "latest" {
        CacheClass::LiveArtifact
    } else {
        CacheClass::ImmutableArtifact
    }
}

async fn read_bytes(path: &PathBuf) -> ApiResult<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::Io { path: path.display().to_string(), detail: e.to_string() })
}

async fn sidecar_kind(state: &AppState, run_dir: &std::path::Path, var_key: &str, fh: u32) -> String {
    match state.json_content.read(&paths::sidecar_path(run_dir, var_key, fh)).await {
        Ok(v) => v.get("kind").and_then(Value::as_str).unwrap_or("continuous").to_string(),
        Err(_) => "continuous".to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoopQuery {
    #[serde(default)]
    tier: u8,
}

/// Serves the cached loop WebP if the scheduler already pregenerated it,
/// else renders it into the cache on the fly. A tier-1 render failure falls
/// back to tier 0 rather than 500ing the animation.
pub async fn loop_webp(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path((model_id, run_token, var_token, fh)): Path<(String, String, String, u32)>,
    Query(query): Query<LoopQuery>,
) -> ApiResult<Response> {
    let var_key = state.registry.normalize_var_key(&model_id, &var_token)?;
    let run_id = resolve_run(&state.published_root(), &state.manifests_root(), &model_id, &run_token)?;
    let run_dir = paths::published_run_dir(&state.published_root(), &model_id, &run_id);
    let loop_run_dir = paths::loop_cache_run_dir(&state.loop_cache_root(), &model_id, &run_id);
    let tier = query.tier.min(1);

    let class = artifact_cache_class(&run_token);
    let serve = |body: Vec<u8>| bytes_response(class, &headers, "image/webp", body);

    let cached = paths::loop_webp_path(&loop_run_dir, &var_key, fh, tier);
    if cached.is_file() {
        return Ok(serve(read_bytes(&cached).await?));
    }

    let rgba = paths::rgba_cog_path(&run_dir, &var_key, fh);
    if !rgba.is_file() {
        return Err(ApiError::FrameNotFound { model: model_id, run: run_id.as_str().to_string(), var: var_key, fh });
    }
    let kind = sidecar_kind(&state, &run_dir, &var_key, fh).await;

    match convert_rgba_cog_to_loop_webp(&rgba, &cached, &kind, state.loop_tier(tier)).await {
        Ok(()) => Ok(serve(read_bytes(&cached).await?)),
        Err(e) if tier == 1 => {
            tracing::warn!(error = %e, var = %var_key, fh, "tier-1 loop render failed, falling back to tier 0");
            let tier0 = paths::loop_webp_path(&loop_run_dir, &var_key, fh, 0);
            if !tier0.is_file() {
                convert_rgba_cog_to_loop_webp(&rgba, &tier0, &kind, state.loop_tier(0)).await?;
            }
            Ok(serve(read_bytes(&tier0).await?))
        }
        Err(e) => Err(e.into()),
    }
}

/// Looks up `contours[key].path` in the frame's sidecar and serves that
/// GeoJSON file. The recorded path is relative to the variable directory.
pub async fn contours(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path((model_id, run_token, var_token, fh, key)): Path<(String, String, String, u32, String)>,
) -> ApiResult<Response> {
    let var_key = state.registry.normalize_var_key(&model_id, &var_token)?;
    let run_id = resolve_run(&state.published_root(), &state.manifests_root(), &model_id, &run_token)?;
    let run_dir = paths::published_run_dir(&state.published_root(), &model_id, &run_id);

    let not_found = || ApiError::ContourNotFound {
        model: model_id.clone(),
        run: run_id.as_str().to_string(),
        var: var_key.clone(),
        fh,
        key: key.clone(),
    };

    let sidecar = state
        .json_content
        .read(&paths::sidecar_path(&run_dir, &var_key, fh))
        .await
        .map_err(|_| ApiError::FrameNotFound { model: model_id.clone(), run: run_id.as_str().to_string(), var: var_key.clone(), fh })?;

    let rel_path = sidecar
        .pointer(&format!("/contours/{key}/path"))
        .and_then(Value::as_str)
        .ok_or_else(&not_found)?;

    let file_path = run_dir.join(&var_key).join(rel_path);
    if !file_path.is_file() {
        return Err(not_found());
    }
    let body = read_bytes(&file_path).await?;
    Ok(bytes_response(artifact_cache_class(&run_token), &headers, "application/geo+json", body))
}

/// Extracts one 512-pixel PNG tile from the published RGBA raster. Fully
/// out-of-coverage tiles come back fully transparent rather than 404 so map
/// clients don't special-case the domain edge.
pub async fn tile(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path((model_id, run_token, var_token, fh, z, x, y_png)): Path<(String, String, String, u32, u8, u32, String)>,
) -> ApiResult<Response> {
    let var_key = state.registry.normalize_var_key(&model_id, &var_token)?;
    let run_id = resolve_run(&state.published_root(), &state.manifests_root(), &model_id, &run_token)?;
    let run_dir = paths::published_run_dir(&state.published_root(), &model_id, &run_id);

    let y: u32 = y_png
        .strip_suffix(".png")
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ApiError::FrameNotFound { model: model_id.clone(), run: run_id.as_str().to_string(), var: var_key.clone(), fh })?;

    let rgba = paths::rgba_cog_path(&run_dir, &var_key, fh);
    if !rgba.is_file() {
        return Err(ApiError::FrameNotFound { model: model_id, run: run_id.as_str().to_string(), var: var_key, fh });
    }

    let class = artifact_cache_class(&run_token);
    let tmp = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .map_err(|e| ApiError::Io { path: "tile tmp".to_string(), detail: e.to_string() })?;

    match tile_bbox_3857(z, x, y) {
        Some(tile_bbox) => {
            let handle = state.raster_handles.try_get_or_insert_with(&rgba, || state.grid_handle(&model_id)).await?;
            raster_io::render_tile_png(&rgba, &handle.bbox_3857, &tile_bbox, TILE_SIZE_PX, tmp.path()).await?;
        }
        None => {
            raster_io::read::write_transparent_png(TILE_SIZE_PX, tmp.path())?;
        }
    }

    let body = tokio::fs::read(tmp.path())
        .await
        .map_err(|e| ApiError::Io { path: tmp.path().display().to_string(), detail: e.to_string() })?;
    Ok(bytes_response(class, &headers, "image/png", body))
}
