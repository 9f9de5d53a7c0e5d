//! Run-token resolution: turns `latest` or an explicit run id into one
//! concrete on-disk run. `latest` resolves via the model's `LATEST.json` if
//! it names a well-formed, fully-published run, else falls back to the
//! newest manifest with an existing published directory; an explicit run
//! must independently have both.

use crate::error::{ApiError, ApiResult};
use crate::paths;
use serde::Deserialize;
use std::path::Path;
use wx_common::RunId;

#[derive(Debug, Deserialize)]
struct LatestPointer {
    run_id: String,
}

fn run_is_published(published_root: &Path, manifests_root: &Path, model_id: &str, run_id: &RunId) -> bool {
    paths::published_run_dir(published_root, model_id, run_id).is_dir()
        && paths::manifest_path(manifests_root, model_id, run_id).is_file()
}

/// Every run with both a manifest and a published directory, newest first.
/// Backs `GET /{model}/runs` and the capabilities availability map.
pub fn list_published_runs(published_root: &Path, manifests_root: &Path, model_id: &str) -> Vec<RunId> {
    let dir = manifests_root.join(model_id);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut runs: Vec<RunId> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let stem = entry.path().file_stem()?.to_str()?.to_string();
            RunId::parse(&stem).ok()
        })
        .filter(|run_id| run_is_published(published_root, manifests_root, model_id, run_id))
        .collect();

    runs.sort_by(|a, b| b.cmp(a));
    runs
}

/// Resolves `"latest"` or an explicit `YYYYMMDD_HHz` token into a `RunId`
/// that's confirmed to have both a published directory and a manifest.
pub fn resolve_run(published_root: &Path, manifests_root: &Path, model_id: &str, run_token: &str) -> ApiResult<RunId> {
    if run_token == "latest" {
        let pointer_path = paths::latest_pointer_path(published_root, model_id);
        if let Ok(body) = std::fs::read_to_string(&pointer_path) {
            if let Ok(pointer) = serde_json::from_str::<LatestPointer>(&body) {
                if let Ok(run_id) = RunId::parse(&pointer.run_id) {
                    if run_is_published(published_root, manifests_root, model_id, &run_id) {
                        return Ok(run_id);
                    }
                }
            }
        }
        return list_published_runs(published_root, manifests_root, model_id)
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NoLatestRun(model_id.to_string()));
    }

    let run_id = RunId::parse(run_token).map_err(|_| ApiError::MalformedRunId(run_token.to_string()))?;
    if !run_is_published(published_root, manifests_root, model_id, &run_id) {
        return Err(ApiError::RunNotFound { model: model_id.to_string(), run: run_token.to_string() });
    }
    Ok(run_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch_run(published_root: &Path, manifests_root: &Path, model_id: &str, run: &str) {
        fs::create_dir_all(paths::published_run_dir(published_root, model_id, &RunId::parse(run).unwrap())).unwrap();
        let manifest_path = paths::manifest_path(manifests_root, model_id, &RunId::parse(run).unwrap());
        fs::create_dir_all(manifest_path.parent().unwrap()).unwrap();
        fs::write(manifest_path, "{}").unwrap();
    }

    #[test]
    fn latest_pointer_wins_when_well_formed_and_published() {
        let dir = tempdir().unwrap();
        let published = dir.path().join("published");
        let manifests = dir.path().join("manifests");
        touch_run(&published, &manifests, "hrrr", "20260224_14z");
        touch_run(&published, &manifests, "hrrr", "20260224_00z");

        let pointer_path = paths::latest_pointer_path(&published, "hrrr");
        fs::write(&pointer_path, r#"{"run_id":"20260224_14z"}"#).unwrap();

        let resolved = resolve_run(&published, &manifests, "hrrr", "latest").unwrap();
        assert_eq!(resolved.as_str(), "20260224_14z");
    }

    #[test]
    fn falls_back_to_newest_manifest_when_pointer_is_stale() {
        let dir = tempdir().unwrap();
        let published = dir.path().join("published");
        let manifests = dir.path().join("manifests");
        touch_run(&published, &manifests, "hrrr", "20260217_00z");
        touch_run(&published, &manifests, "hrrr", "20260217_06z");

        let pointer_path = paths::latest_pointer_path(&published, "hrrr");
        fs::write(&pointer_path, r#"{"run_id":"20260217_99z"}"#).unwrap();

        let resolved = resolve_run(&published, &manifests, "hrrr", "latest").unwrap();
        assert_eq!(resolved.as_str(), "20260217_06z");
    }

    #[test]
    fn staged_only_runs_are_invisible_to_latest() {
        // A newer run that exists only under staging/ (no manifest, no
        // published dir) must not win over the pointer's published run.
        let dir = tempdir().unwrap();
        let published = dir.path().join("published");
        let manifests = dir.path().join("manifests");
        touch_run(&published, &manifests, "hrrr", "20260224_14z");
        fs::create_dir_all(dir.path().join("staging").join("hrrr").join("20260224_15z")).unwrap();

        let pointer_path = paths::latest_pointer_path(&published, "hrrr");
        fs::write(&pointer_path, r#"{"run_id":"20260224_14z"}"#).unwrap();

        let resolved = resolve_run(&published, &manifests, "hrrr", "latest").unwrap();
        assert_eq!(resolved.as_str(), "20260224_14z");
    }

    #[test]
    fn explicit_run_requires_both_directory_and_manifest() {
        let dir = tempdir().unwrap();
        let published = dir.path().join("published");
        let manifests = dir.path().join("manifests");
        fs::create_dir_all(paths::published_run_dir(&published, "hrrr", &RunId::parse("20260217_06z").unwrap())).unwrap();

        let err = resolve_run(&published, &manifests, "hrrr", "20260217_06z").unwrap_err();
        assert!(matches!(err, ApiError::RunNotFound { .. }));
    }

    #[test]
    fn malformed_run_token_is_rejected() {
        let dir = tempdir().unwrap();
        let err = resolve_run(dir.path(), dir.path(), "hrrr", "not-a-run").unwrap_err();
        assert!(matches!(err, ApiError::MalformedRunId(_)));
    }

    #[test]
    fn no_latest_run_when_nothing_is_published() {
        let dir = tempdir().unwrap();
        let err = resolve_run(dir.path(), dir.path(), "hrrr", "latest").unwrap_err();
        assert!(matches!(err, ApiError::NoLatestRun(_)));
    }

    #[test]
    fn published_runs_list_newest_first() {
        let dir = tempdir().unwrap();
        let published = dir.path().join("published");
        let manifests = dir.path().join("manifests");
        for run in ["20260217_00z", "20260217_12z", "20260217_06z"] {
            touch_run(&published, &manifests, "hrrr", run);
        }
        let runs: Vec<String> = list_published_runs(&published, &manifests, "hrrr").iter().map(|r| r.as_str().to_string()).collect();
        assert_eq!(runs, vec!["20260217_12z", "20260217_06z", "20260217_00z"]);
    }
}
