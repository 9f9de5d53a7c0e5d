//! HTTP surface wiring: one `Router` built at startup, state via
//! `Extension<Arc<AppState>>`, CORS wide open for read-only GETs.

pub mod discovery;
pub mod frames;
pub mod media;
pub mod sample;

use crate::state::AppState;
use axum::http::Method;
use axum::routing::get;
use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Versioned URL prefix all routes are nested under.
pub const API_PREFIX: &str = "/api/v4";

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(discovery::health))
        .route("/capabilities", get(discovery::capabilities))
        .route("/models", get(discovery::models))
        .route("/regions", get(discovery::regions))
        .route("/sample", get(sample::sample))
        .route("/tiles/:model/:run/:var/:fh/:z/:x/:y", get(media::tile))
        .route("/:model/runs", get(discovery::runs))
        .route("/:model/:run/manifest", get(discovery::manifest))
        .route("/:model/:run/vars", get(discovery::vars))
        .route("/:model/:run/:var/frames", get(frames::frames))
        .route("/:model/:run/:var/loop-manifest", get(frames::loop_manifest))
        .route("/:model/:run/:var/:fh/loop.webp", get(media::loop_webp))
        .route("/:model/:run/:var/:fh/contours/:key", get(media::contours));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods([Method::GET]).allow_headers(Any);

    Router::new()
        .nest(API_PREFIX, api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ApiConfig;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use capabilities::Registry;
    use serde_json::Value;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Fixture {
        _dir: TempDir,
        router: Router,
    }

    fn write_manifest(manifests: &Path, model: &str, run: &str, expected: u64, available: u64) {
        let dir = manifests.join(model);
        std::fs::create_dir_all(&dir).unwrap();
        let body = serde_json::json!({
            "contract_version": "3.0",
            "model": model,
            "run": run,
            "variables": {
                "tmp2m": {
                    "kind": "continuous",
                    "units": "°F",
                    "expected_frames": expected,
                    "available_frames": available,
                    "frames": (0..available).map(|fh| serde_json::json!({"fh": fh})).collect::<Vec<_>>(),
                }
            },
            "last_updated": "2026-02-24T15:00:00Z",
        });
        std::fs::write(dir.join(format!("{run}.json")), serde_json::to_vec(&body).unwrap()).unwrap();
    }

    fn publish_frames(published: &Path, model: &str, run: &str, var: &str, fhs: &[u32]) {
        for &fh in fhs {
            let var_dir = published.join(model).join(run).join(var);
            std::fs::create_dir_all(&var_dir).unwrap();
            std::fs::write(var_dir.join(format!("fh{fh:03}.rgba.cog.tif")), b"tif").unwrap();
            std::fs::write(var_dir.join(format!("fh{fh:03}.val.cog.tif")), b"tif").unwrap();
            let sidecar = serde_json::json!({
                "contract_version": "3.0",
                "model": model,
                "run": run,
                "var": var,
                "fh": fh,
                "valid_time": format!("2026-02-24T{:02}:00:00Z", 14 + fh),
                "units": "°F",
                "kind": "continuous",
                "min": 10.0,
                "max": 90.0,
                "legend": {"type": "gradient", "stops": [[10.0, "#000000"], [90.0, "#ffffff"]]},
            });
            std::fs::write(var_dir.join(format!("fh{fh:03}.json")), serde_json::to_vec(&sidecar).unwrap()).unwrap();
        }
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let data_root = dir.path().to_path_buf();
        let published = data_root.join("published");
        let manifests = data_root.join("manifests");

        // Complete historical run, incomplete newer run, latest pointer at
        // the complete one. A staged-only run must stay invisible.
        publish_frames(&published, "hrrr", "20260224_12z", "tmp2m", &[0, 1]);
        write_manifest(&manifests, "hrrr", "20260224_12z", 2, 2);
        publish_frames(&published, "hrrr", "20260224_14z", "tmp2m", &[0]);
        write_manifest(&manifests, "hrrr", "20260224_14z", 2, 1);
        std::fs::write(
            published.join("hrrr").join("LATEST.json"),
            r#"{"run_id":"20260224_14z","cycle_utc":"2026-02-24T14:00:00Z","updated_utc":"2026-02-24T15:00:00Z","source":"scheduler"}"#,
        )
        .unwrap();
        std::fs::create_dir_all(data_root.join("staging").join("hrrr").join("20260224_15z")).unwrap();

        let state = Arc::new(AppState::new(Registry::with_defaults(), ApiConfig::new(data_root)));
        Fixture { _dir: dir, router: router(state) }
    }

    async fn get_response(router: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
        let resp = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, headers, body)
    }

    #[tokio::test]
    async fn health_reports_data_root() {
        let f = fixture();
        let (status, _, body) = get_response(&f.router, "/api/v4/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert!(body["data_root"].as_str().unwrap().len() > 1);
    }

    #[tokio::test]
    async fn capabilities_carries_catalog_and_availability() {
        let f = fixture();
        let (status, _, body) = get_response(&f.router, "/api/v4/capabilities").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["supported_models"], serde_json::json!(["gfs", "hrrr", "nbm"]));
        let tmp2m = &body["model_catalog"]["hrrr"]["variables"]["tmp2m"];
        assert_eq!(tmp2m["buildable"], true);
        assert_eq!(tmp2m["kind"], "continuous");
        assert_eq!(body["availability"]["hrrr"]["latest_run"], "20260224_14z");
        assert_eq!(
            body["model_catalog"]["hrrr"]["variables"]["radar_ptype"]["derive_strategy_id"],
            "radar_ptype_combo"
        );
    }

    #[tokio::test]
    async fn latest_resolves_via_pointer_not_staging() {
        let f = fixture();
        let (status, _, body) = get_response(&f.router, "/api/v4/hrrr/latest/manifest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["run"], "20260224_14z");
    }

    #[tokio::test]
    async fn frames_cache_control_tracks_run_completeness() {
        let f = fixture();

        let (status, headers, body) = get_response(&f.router, "/api/v4/hrrr/20260224_12z/tmp2m/frames").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=31536000, immutable");
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["fh"], 0);
        assert_eq!(body[0]["has_cog"], true);
        assert_eq!(body[0]["meta"]["meta"]["units"], "°F");

        let (_, headers, _) = get_response(&f.router, "/api/v4/hrrr/20260224_14z/tmp2m/frames").await;
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=60");

        let (_, headers, _) = get_response(&f.router, "/api/v4/hrrr/latest/tmp2m/frames").await;
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=60");
    }

    #[tokio::test]
    async fn regions_use_the_preset_cache_lifetime() {
        let f = fixture();
        let (status, headers, body) = get_response(&f.router, "/api/v4/regions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=300");
        assert_eq!(body[0]["id"], "conus");
    }

    #[tokio::test]
    async fn etag_round_trip_yields_304() {
        let f = fixture();
        let (_, headers, _) = get_response(&f.router, "/api/v4/models").await;
        let etag = headers[header::ETAG].to_str().unwrap().to_string();

        let resp = f
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v4/models")
                    .header(header::IF_NONE_MATCH, &etag)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(resp.headers()[header::ETAG].to_str().unwrap(), etag);
    }

    #[tokio::test]
    async fn unknown_model_and_malformed_run_are_client_errors() {
        let f = fixture();
        let (status, _, _) = get_response(&f.router, "/api/v4/ecmwf/runs").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = get_response(&f.router, "/api/v4/hrrr/2026-02-24/manifest").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = get_response(&f.router, "/api/v4/hrrr/20991231_00z/manifest").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn runs_listing_is_newest_first() {
        let f = fixture();
        let (status, _, body) = get_response(&f.router, "/api/v4/hrrr/runs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["runs"], serde_json::json!(["20260224_14z", "20260224_12z"]));
    }

    #[tokio::test]
    async fn vars_lists_only_directories_present_in_the_run() {
        let f = fixture();
        let (status, _, body) = get_response(&f.router, "/api/v4/hrrr/20260224_12z/vars").await;
        assert_eq!(status, StatusCode::OK);
        let keys: Vec<&str> = body.as_array().unwrap().iter().map(|v| v["key"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["tmp2m"]);
    }

    #[tokio::test]
    async fn sample_out_of_domain_is_no_data_with_private_short_cache() {
        let f = fixture();
        // Mid-Atlantic: far outside CONUS coverage.
        let (status, headers, body) =
            get_response(&f.router, "/api/v4/sample?model=hrrr&run=20260224_12z&var=tmp2m&fh=0&lat=30.0&lon=-40.0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["noData"], true);
        assert_eq!(body["value"], Value::Null);
        assert_eq!(headers[header::CACHE_CONTROL], "private, max-age=300");
    }

    #[tokio::test]
    async fn sample_missing_frame_is_404() {
        let f = fixture();
        let (status, _, _) =
            get_response(&f.router, "/api/v4/sample?model=hrrr&run=20260224_12z&var=tmp2m&fh=42&lat=40.0&lon=-100.0").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn loop_manifest_reports_projection_and_tier_urls() {
        let f = fixture();
        let (status, _, body) = get_response(&f.router, "/api/v4/hrrr/20260224_12z/tmp2m/loop-manifest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["projection"], "EPSG:3857");
        assert_eq!(body["fhs"], serde_json::json!([0, 1]));
        let tier0 = body["tiers"]["tier0"].as_array().unwrap();
        assert_eq!(tier0.len(), 2);
        assert!(tier0[0].as_str().unwrap().contains("/hrrr/20260224_12z/tmp2m/0/loop.webp?tier=0"));
        let tier1 = body["tiers"]["tier1"].as_array().unwrap();
        assert!(tier1[1].as_str().unwrap().ends_with("tier=1"));
    }

    #[tokio::test]
    async fn contours_404_when_sidecar_has_no_such_key() {
        let f = fixture();
        let (status, _, _) = get_response(&f.router, "/api/v4/hrrr/20260224_12z/tmp2m/0/contours/iso32").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
