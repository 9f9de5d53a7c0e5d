//! Frame listing and the loop-animation manifest.

use crate::error::ApiResult;
use crate::etag::{json_response, CacheClass};
use crate::handlers::API_PREFIX;
use crate::manifests;
use crate::paths;
use crate::run_resolution::resolve_run;
use crate::state::AppState;
use axum::extract::Path;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Extension;
use serde_json::{json, Value};
use std::sync::Arc;
use wx_common::{project_bbox, Crs, RunId};

/// The frames list is immutable only for an explicit, fully-built run;
/// `latest` (and any still-filling run) stays on the short lifetime so
/// clients see new frames as the scheduler lands them.
pub(crate) async fn frames_cache_class(state: &AppState, model_id: &str, run_token: &str, run_id: &RunId) -> CacheClass {
    if run_token == "latest" {
        return CacheClass::FramesListLive;
    }
    match manifests::read_manifest(state, model_id, run_id).await {
        Ok(manifest) if manifests::run_is_complete(&manifest) => CacheClass::FramesListHistorical,
        _ => CacheClass::FramesListLive,
    }
}

/// Forecast hours with a published RGBA raster, ascending.
pub(crate) fn list_frame_fhs(run_dir: &std::path::Path, var_key: &str) -> Vec<u32> {
    let var_dir = run_dir.join(var_key);
    let Ok(entries) = std::fs::read_dir(&var_dir) else {
        return Vec::new();
    };
    let mut fhs: Vec<u32> = entries
        .filter_map(Result::ok)
        .filter_map(|e| paths::parse_rgba_fh(e.file_name().to_str()?))
        .collect();
    fhs.sort_unstable();
    fhs.dedup();
    fhs
}

fn loop_webp_url(model_id: &str, run_id: &RunId, var_key: &str, fh: u32, tier: u8) -> String {
    format!("{API_PREFIX}/{model_id}/{}/{var_key}/{fh}/loop.webp?tier={tier}", run_id.as_str())
}

pub async fn frames(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path((model_id, run_token, var_token)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let var_key = state.registry.normalize_var_key(&model_id, &var_token)?;
    let run_id = resolve_run(&state.published_root(), &state.manifests_root(), &model_id, &run_token)?;
    let run_dir = paths::published_run_dir(&state.published_root(), &model_id, &run_id);
    let loop_run_dir = paths::loop_cache_run_dir(&state.loop_cache_root(), &model_id, &run_id);

    let mut items: Vec<Value> = Vec::new();
    for fh in list_frame_fhs(&run_dir, &var_key) {
        let sidecar = match state.json_content.read(&paths::sidecar_path(&run_dir, &var_key, fh)).await {
            Ok(v) => v,
            Err(_) => Value::Null,
        };

        let mut item = json!({
            "fh": fh,
            "has_cog": true,
            "run": run_id.as_str(),
            "meta": { "meta": sidecar },
        });
        for tier in [0u8, 1u8] {
            if paths::loop_webp_path(&loop_run_dir, &var_key, fh, tier).is_file() {
                let url = loop_webp_url(&model_id, &run_id, &var_key, fh, tier);
                if tier == 0 {
                    item["loop_webp_url"] = json!(url.clone());
                }
                item[format!("loop_webp_tier{tier}_url")] = json!(url);
            }
        }
        items.push(item);
    }

    let class = frames_cache_class(&state, &model_id, &run_token, &run_id).await;
    Ok(json_response(class, &headers, &items))
}

/// Everything a client needs to start the animation loop in one request:
/// geographic extent, projection, and the per-tier frame URL lists.
pub async fn loop_manifest(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path((model_id, run_token, var_token)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let var_key = state.registry.normalize_var_key(&model_id, &var_token)?;
    let run_id = resolve_run(&state.published_root(), &state.manifests_root(), &model_id, &run_token)?;
    let run_dir = paths::published_run_dir(&state.published_root(), &model_id, &run_id);

    let region = state.canonical_region(&model_id)?;
    let bbox_3857 = project_bbox(&region.bbox_wgs84, Crs::Epsg4326, Crs::Epsg3857);

    let fhs = list_frame_fhs(&run_dir, &var_key);
    let tier_urls = |tier: u8| -> Vec<String> {
        fhs.iter().map(|&fh| loop_webp_url(&model_id, &run_id, &var_key, fh, tier)).collect()
    };
    let tier0 = tier_urls(0);
    let tier1 = tier_urls(1);
    let class = frames_cache_class(&state, &model_id, &run_token, &run_id).await;

    let body = json!({
        "model": model_id,
        "run": run_id.as_str(),
        "var": var_key,
        "projection": "EPSG:3857",
        "bbox_wgs84": region.bbox_wgs84,
        "bbox_3857": bbox_3857,
        "fhs": fhs,
        "tiers": {
            "tier0": tier0,
            "tier1": tier1,
        },
    });

    Ok(json_response(class, &headers, &body))
}
