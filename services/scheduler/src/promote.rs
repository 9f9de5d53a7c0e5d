//! Promotion: staging → published, the run manifest, and the `LATEST.json`
//! pointer.

use crate::atomic::write_json_atomic;
use crate::paths::{latest_pointer_path, manifest_path, published_run_dir, staging_run_dir};
use chrono::{DateTime, Utc};
use pipeline::frame_paths;
use pipeline::sidecar::Sidecar;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use wx_common::RunId;

/// A run is promotable once any primary variable has all three of its
/// earliest frames built.
pub const PROMOTION_FHS: [u32; 3] = [0, 1, 2];

pub fn should_promote(staging_root: &Path, model_id: &str, run_id: &RunId, primary_vars: &[String]) -> bool {
    primary_vars.iter().any(|var| {
        PROMOTION_FHS
            .iter()
            .all(|&fh| frame_paths(staging_root, model_id, run_id, var, fh).all_exist())
    })
}

async fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dst).await?;
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            tokio::fs::create_dir_all(&target).await?;
        } else {
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(entry.path(), &target).await?;
        }
    }
    Ok(())
}

/// Copies the staging run directory into `published`, replacing any prior
/// copy of this run atomically: build into a sibling `.tmp-{run_id}` dir,
/// remove the old published run dir if present, then rename into place.
pub async fn promote_run(staging_root: &Path, published_root: &Path, model_id: &str, run_id: &RunId) -> io::Result<()> {
    let src = staging_run_dir(staging_root, model_id, run_id);
    let dst = published_run_dir(published_root, model_id, run_id);
    let tmp_dst = dst.with_file_name(format!(".tmp-{}", run_id.as_str()));

    if tmp_dst.exists() {
        tokio::fs::remove_dir_all(&tmp_dst).await?;
    }
    copy_dir_recursive(&src, &tmp_dst).await?;

    if dst.exists() {
        tokio::fs::remove_dir_all(&dst).await?;
    }
    tokio::fs::rename(&tmp_dst, &dst).await
}

#[derive(Debug, Serialize)]
struct ManifestFrame {
    fh: u32,
    valid_time: String,
}

#[derive(Debug, Serialize)]
struct ManifestVariable {
    kind: String,
    units: String,
    expected_frames: usize,
    available_frames: usize,
    frames: Vec<ManifestFrame>,
}

#[derive(Debug, Serialize)]
struct RunManifest {
    contract_version: String,
    model: String,
    run: String,
    variables: BTreeMap<String, ManifestVariable>,
    last_updated: String,
}

/// Rebuilds the per-run manifest by reading back each built frame's
/// sidecar. Reads from staging, which already holds every frame this poll
/// has built regardless of whether the run was promoted.
pub async fn write_run_manifest(
    staging_root: &Path,
    manifests_root: &Path,
    model_id: &str,
    run_id: &RunId,
    targets: &[(String, u32)],
    now: DateTime<Utc>,
) -> io::Result<()> {
    let mut expected_by_var: BTreeMap<String, usize> = BTreeMap::new();
    for (var, _) in targets {
        *expected_by_var.entry(var.clone()).or_default() += 1;
    }

    let mut variables: BTreeMap<String, ManifestVariable> = BTreeMap::new();
    for (var, fh) in targets {
        let paths = frame_paths(staging_root, model_id, run_id, var, *fh);
        if !paths.sidecar_path.exists() {
            continue;
        }
        let body = tokio::fs::read(&paths.sidecar_path).await?;
        let sidecar: Sidecar = serde_json::from_slice(&body)?;

        let entry = variables.entry(var.clone()).or_insert_with(|| ManifestVariable {
            kind: sidecar.kind.clone(),
            units: sidecar.units.clone(),
            expected_frames: expected_by_var.get(var).copied().unwrap_or(0),
            available_frames: 0,
            frames: Vec::new(),
        });
        entry.available_frames += 1;
        entry.frames.push(ManifestFrame { fh: *fh, valid_time: sidecar.valid_time });
    }
    for entry in variables.values_mut() {
        entry.frames.sort_by_key(|f| f.fh);
    }

    let manifest = RunManifest {
        contract_version: pipeline::sidecar::CONTRACT_VERSION.to_string(),
        model: model_id.to_string(),
        run: run_id.as_str().to_string(),
        variables,
        last_updated: now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    };
    write_json_atomic(&manifest_path(manifests_root, model_id, run_id), &manifest).await
}

#[derive(Debug, Serialize)]
struct LatestPointer {
    run_id: String,
    cycle_utc: String,
    updated_utc: String,
    source: String,
}

/// Writes the pointer clients poll to discover a model's newest published
/// run without listing the directory.
pub async fn write_latest_pointer(published_root: &Path, model_id: &str, run_id: &RunId, updated_utc: DateTime<Utc>) -> io::Result<()> {
    let pointer = LatestPointer {
        run_id: run_id.as_str().to_string(),
        cycle_utc: run_id.cycle_utc().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        updated_utc: updated_utc.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        source: "scheduler".to_string(),
    };
    write_json_atomic(&latest_pointer_path(published_root, model_id), &pointer).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, model: &str, run: &str, var: &str, name: &str) {
        let p = dir.join(model).join(run).join(var).join(name);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, b"x").unwrap();
    }

    fn write_all_artifacts(dir: &Path, model: &str, run: &str, var: &str, fh: u32) {
        touch(dir, model, run, var, &format!("fh{fh:03}.rgba.cog.tif"));
        touch(dir, model, run, var, &format!("fh{fh:03}.val.cog.tif"));
        touch(dir, model, run, var, &format!("fh{fh:03}.json"));
    }

    #[test]
    fn should_promote_true_when_all_promotion_fhs_present() {
        let dir = tempdir().unwrap();
        let run_id = RunId::parse("20260217_06z").unwrap();
        for fh in PROMOTION_FHS {
            write_all_artifacts(dir.path(), "hrrr", run_id.as_str(), "tmp2m", fh);
        }
        assert!(should_promote(dir.path(), "hrrr", &run_id, &["tmp2m".to_string()]));
    }

    #[test]
    fn should_promote_false_when_fh2_missing() {
        let dir = tempdir().unwrap();
        let run_id = RunId::parse("20260217_06z").unwrap();
        write_all_artifacts(dir.path(), "hrrr", run_id.as_str(), "tmp2m", 0);
        write_all_artifacts(dir.path(), "hrrr", run_id.as_str(), "tmp2m", 1);
        assert!(!should_promote(dir.path(), "hrrr", &run_id, &["tmp2m".to_string()]));
    }

    #[tokio::test]
    async fn promote_run_copies_staging_tree_into_published() {
        let staging = tempdir().unwrap();
        let published = tempdir().unwrap();
        let run_id = RunId::parse("20260217_06z").unwrap();
        write_all_artifacts(staging.path(), "hrrr", run_id.as_str(), "tmp2m", 0);

        promote_run(staging.path(), published.path(), "hrrr", &run_id).await.unwrap();

        let dst = published_run_dir(published.path(), "hrrr", &run_id);
        assert!(dst.join("tmp2m").join("fh000.json").exists());
    }

    #[tokio::test]
    async fn promote_run_replaces_a_prior_copy_of_the_same_run() {
        let staging = tempdir().unwrap();
        let published = tempdir().unwrap();
        let run_id = RunId::parse("20260217_06z").unwrap();
        write_all_artifacts(staging.path(), "hrrr", run_id.as_str(), "tmp2m", 0);
        promote_run(staging.path(), published.path(), "hrrr", &run_id).await.unwrap();

        std::fs::remove_dir_all(staging.path().join("hrrr").join(run_id.as_str())).unwrap();
        write_all_artifacts(staging.path(), "hrrr", run_id.as_str(), "wspd10m", 0);
        promote_run(staging.path(), published.path(), "hrrr", &run_id).await.unwrap();

        let dst = published_run_dir(published.path(), "hrrr", &run_id);
        assert!(dst.join("wspd10m").join("fh000.json").exists());
        assert!(!dst.join("tmp2m").exists());
    }

    #[tokio::test]
    async fn write_latest_pointer_round_trips() {
        let published = tempdir().unwrap();
        let run_id = RunId::parse("20260217_06z").unwrap();
        let now = run_id.cycle_utc() + chrono::Duration::minutes(5);
        write_latest_pointer(published.path(), "hrrr", &run_id, now).await.unwrap();

        let body = std::fs::read(latest_pointer_path(published.path(), "hrrr")).unwrap();
        let pointer: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(pointer["run_id"], "20260217_06z");
        assert_eq!(pointer["source"], "scheduler");
    }
}
