//! Manifest reads and the run-completeness rule that drives frame-list
//! cache lifetimes.

use crate::error::{ApiError, ApiResult};
use crate::paths;
use crate::state::AppState;
use serde_json::Value;
use wx_common::RunId;

/// Reads a run's manifest through the process-wide JSON content cache.
pub async fn read_manifest(state: &AppState, model_id: &str, run_id: &RunId) -> ApiResult<Value> {
    let path = paths::manifest_path(&state.manifests_root(), model_id, run_id);
    state.json_content.read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::RunNotFound { model: model_id.to_string(), run: run_id.as_str().to_string() }
        } else {
            ApiError::Io { path: path.display().to_string(), detail: e.to_string() }
        }
    })
}

/// A run is complete iff every variable reports
/// `available_frames >= expected_frames >= 1` and there is at least one
/// variable. Incomplete or unparseable manifests get the short cache
/// lifetime so clients re-poll while the scheduler catches up.
pub fn run_is_complete(manifest: &Value) -> bool {
    let Some(variables) = manifest.get("variables").and_then(Value::as_object) else {
        return false;
    };
    if variables.is_empty() {
        return false;
    }
    variables.values().all(|var| {
        let expected = var.get("expected_frames").and_then(Value::as_u64).unwrap_or(0);
        let available = var.get("available_frames").and_then(Value::as_u64).unwrap_or(0);
        expected >= 1 && available >= expected
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn complete_when_every_variable_is_filled() {
        let manifest = json!({"variables": {
            "tmp2m": {"expected_frames": 2, "available_frames": 2},
            "refc": {"expected_frames": 3, "available_frames": 3},
        }});
        assert!(run_is_complete(&manifest));
    }

    #[test]
    fn incomplete_when_any_variable_lags() {
        let manifest = json!({"variables": {
            "tmp2m": {"expected_frames": 2, "available_frames": 2},
            "refc": {"expected_frames": 3, "available_frames": 1},
        }});
        assert!(!run_is_complete(&manifest));
    }

    #[test]
    fn zero_expected_frames_is_never_complete() {
        let manifest = json!({"variables": {"tmp2m": {"expected_frames": 0, "available_frames": 0}}});
        assert!(!run_is_complete(&manifest));
    }

    #[test]
    fn empty_or_malformed_manifests_are_incomplete() {
        assert!(!run_is_complete(&json!({"variables": {}})));
        assert!(!run_is_complete(&json!({})));
        assert!(!run_is_complete(&json!(null)));
    }
}
