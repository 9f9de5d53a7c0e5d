//! Discovery endpoints: health, regions, capabilities, models, runs,
//! manifest, vars. Each handler extracts, resolves against the registry and
//! the published tree, and shapes the response by hand with the shared
//! ETag/Cache-Control helper.

use crate::error::ApiResult;
use crate::etag::{json_response, CacheClass};
use crate::manifests;
use crate::run_resolution::{list_published_runs, resolve_run};
use crate::state::AppState;
use axum::extract::Path;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Extension;
use capabilities::ModelAvailability;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub async fn health(Extension(state): Extension<Arc<AppState>>, headers: HeaderMap) -> Response {
    let body = json!({ "ok": true, "data_root": state.config.data_root.display().to_string() });
    json_response(CacheClass::ModelsManifestsVarsDiscovery, &headers, &body)
}

pub async fn regions(headers: HeaderMap) -> Response {
    json_response(CacheClass::RegionPresets, &headers, &capabilities::regions::all())
}

fn availability_for(state: &AppState, model_id: &str) -> ModelAvailability {
    let published = state.published_root();
    let manifests = state.manifests_root();
    let runs = list_published_runs(&published, &manifests, model_id);
    let latest = resolve_run(&published, &manifests, model_id, "latest").ok();
    ModelAvailability {
        latest_run: latest.map(|r| r.as_str().to_string()),
        published_runs: runs.iter().map(|r| r.as_str().to_string()).collect(),
    }
}

pub async fn capabilities(Extension(state): Extension<Arc<AppState>>, headers: HeaderMap) -> Response {
    let mut availability = HashMap::new();
    for model in state.registry.list_models() {
        availability.insert(model.model_id.clone(), availability_for(&state, &model.model_id));
    }
    let doc = state.registry.to_capabilities_json(&availability);
    json_response(CacheClass::ModelsManifestsVarsDiscovery, &headers, &doc)
}

pub async fn models(Extension(state): Extension<Arc<AppState>>, headers: HeaderMap) -> Response {
    let models: Vec<_> = state
        .registry
        .list_models()
        .into_iter()
        .map(|model| {
            let availability = availability_for(&state, &model.model_id);
            json!({
                "id": model.model_id,
                "name": model.display_name,
                "latest_run": availability.latest_run,
                "published_runs": availability.published_runs,
            })
        })
        .collect();
    json_response(CacheClass::ModelsManifestsVarsDiscovery, &headers, &models)
}

pub async fn runs(Extension(state): Extension<Arc<AppState>>, headers: HeaderMap, Path(model_id): Path<String>) -> ApiResult<Response> {
    state.registry.get_model(&model_id)?;
    let runs: Vec<String> = list_published_runs(&state.published_root(), &state.manifests_root(), &model_id)
        .iter()
        .map(|r| r.as_str().to_string())
        .collect();
    let body = json!({ "model": model_id, "runs": runs });
    Ok(json_response(CacheClass::ModelsManifestsVarsDiscovery, &headers, &body))
}

pub async fn manifest(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path((model_id, run_token)): Path<(String, String)>,
) -> ApiResult<Response> {
    state.registry.get_model(&model_id)?;
    let run_id = resolve_run(&state.published_root(), &state.manifests_root(), &model_id, &run_token)?;
    let manifest = manifests::read_manifest(&state, &model_id, &run_id).await?;
    Ok(json_response(CacheClass::ModelsManifestsVarsDiscovery, &headers, &manifest))
}

/// Variables present in the run directory, in registry display order
/// (`order` ascending, then key).
pub async fn vars(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path((model_id, run_token)): Path<(String, String)>,
) -> ApiResult<Response> {
    let model = state.registry.get_model(&model_id)?.clone();
    let run_id = resolve_run(&state.published_root(), &state.manifests_root(), &model_id, &run_token)?;
    let run_dir = crate::paths::published_run_dir(&state.published_root(), &model_id, &run_id);

    let mut entries: Vec<_> = model
        .variable_catalog
        .values()
        .filter(|var| run_dir.join(&var.var_key).is_dir())
        .collect();
    entries.sort_by(|a, b| {
        let ka = (a.order.unwrap_or(u32::MAX), a.var_key.as_str());
        let kb = (b.order.unwrap_or(u32::MAX), b.var_key.as_str());
        ka.cmp(&kb)
    });

    let body: Vec<_> = entries
        .into_iter()
        .map(|var| {
            json!({
                "key": var.var_key,
                "display_name": var.display_name,
                "kind": format!("{:?}", var.kind).to_ascii_lowercase(),
                "units": var.units,
                "default_fh": var.default_fh,
            })
        })
        .collect();
    Ok(json_response(CacheClass::ModelsManifestsVarsDiscovery, &headers, &body))
}
