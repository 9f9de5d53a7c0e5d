//! ETag + Cache-Control response shaping.
//!
//! Kept as a small helper beside the handlers rather than a generic tower
//! layer; each endpoint already knows which `CacheClass` it belongs to.

use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Resource classes, each with its own Cache-Control lifetime.
#[derive(Debug, Clone, Copy)]
pub enum CacheClass {
    RegionPresets,
    ModelsManifestsVarsDiscovery,
    FramesListLive,
    FramesListHistorical,
    ImmutableArtifact,
    LiveArtifact,
    SamplePrivateShort,
    SamplePrivateResolved,
}

impl CacheClass {
    pub fn cache_control(self) -> &'static str {
        match self {
            CacheClass::RegionPresets => "public, max-age=300",
            CacheClass::ModelsManifestsVarsDiscovery => "public, max-age=60",
            CacheClass::FramesListLive => "public, max-age=60",
            CacheClass::FramesListHistorical => "public, max-age=31536000, immutable",
            CacheClass::ImmutableArtifact => "public, max-age=31536000, immutable",
            CacheClass::LiveArtifact => "public, max-age=15",
            CacheClass::SamplePrivateShort => "private, max-age=300",
            CacheClass::SamplePrivateResolved => "private, max-age=86400",
        }
    }
}

fn short_hash(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    value.split(',').map(str::trim).any(|candidate| candidate == "*" || candidate == etag)
}

fn wrap(class: CacheClass, etag: &str, request_headers: &HeaderMap, content_type: &str, body: Vec<u8>) -> Response {
    if if_none_match_matches(request_headers, etag) {
        return Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::ETAG, etag)
            .header(header::CACHE_CONTROL, class.cache_control())
            .body(Body::empty())
            .expect("static headers are valid");
    }
    Response::builder()
        .status(StatusCode::OK)
        .header(header::ETAG, etag)
        .header(header::CACHE_CONTROL, class.cache_control())
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("static headers are valid")
}

/// Serializes `value` to JSON and wraps it with a strong ETag + the
/// `class`'s Cache-Control, honoring `If-None-Match` with a 304.
pub fn json_response<T: Serialize>(class: CacheClass, request_headers: &HeaderMap, value: &T) -> Response {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"null".to_vec());
    let etag = format!("\"{}\"", short_hash(&body));
    wrap(class, &etag, request_headers, "application/json", body)
}

/// Wraps an arbitrary byte payload (PNG/WebP/GeoJSON) the same way.
pub fn bytes_response(class: CacheClass, request_headers: &HeaderMap, content_type: &str, body: Vec<u8>) -> Response {
    let etag = format!("\"{}\"", short_hash(&body));
    wrap(class, &etag, request_headers, content_type, body)
}
