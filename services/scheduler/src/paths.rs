//! Staging/published/manifest/loop-cache directory layout: run directories
//! sit directly under the model directory, with the model's canonical
//! coverage implicit in the model itself (a model declares exactly one
//! canonical region for the life of a run).

use std::path::{Path, PathBuf};
use wx_common::RunId;

pub fn staging_run_dir(staging_root: &Path, model_id: &str, run_id: &RunId) -> PathBuf {
    staging_root.join(model_id).join(run_id.as_str())
}

pub fn published_model_dir(published_root: &Path, model_id: &str) -> PathBuf {
    published_root.join(model_id)
}

pub fn published_run_dir(published_root: &Path, model_id: &str, run_id: &RunId) -> PathBuf {
    published_model_dir(published_root, model_id).join(run_id.as_str())
}

pub fn latest_pointer_path(published_root: &Path, model_id: &str) -> PathBuf {
    published_model_dir(published_root, model_id).join("LATEST.json")
}

pub fn manifest_path(manifests_root: &Path, model_id: &str, run_id: &RunId) -> PathBuf {
    manifests_root.join(model_id).join(format!("{}.json", run_id.as_str()))
}

pub fn loop_cache_model_dir(loop_cache_root: &Path, model_id: &str) -> PathBuf {
    loop_cache_root.join(model_id)
}

pub fn loop_cache_run_dir(loop_cache_root: &Path, model_id: &str, run_id: &RunId) -> PathBuf {
    loop_cache_model_dir(loop_cache_root, model_id).join(run_id.as_str())
}

/// `{loop_cache}/{model}/{run}/{var}/tier{0|1}/fhNNN.loop.webp`
pub fn loop_webp_path(loop_cache_run_dir: &Path, var_id: &str, fh: u32, tier: u8) -> PathBuf {
    loop_cache_run_dir.join(var_id).join(format!("tier{tier}")).join(format!("fh{fh:03}.loop.webp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_directory_invariant() {
        let run_id = RunId::parse("20260217_06z").unwrap();
        assert_eq!(
            published_run_dir(Path::new("/data/published"), "hrrr", &run_id),
            Path::new("/data/published/hrrr/20260217_06z")
        );
        assert_eq!(latest_pointer_path(Path::new("/data/published"), "hrrr"), Path::new("/data/published/hrrr/LATEST.json"));
        assert_eq!(
            manifest_path(Path::new("/data/manifests"), "hrrr", &run_id),
            Path::new("/data/manifests/hrrr/20260217_06z.json")
        );
    }

    #[test]
    fn loop_webp_path_is_tiered() {
        let run_id = RunId::parse("20260217_06z").unwrap();
        let run_dir = loop_cache_run_dir(Path::new("/cache"), "hrrr", &run_id);
        assert_eq!(
            loop_webp_path(&run_dir, "tmp2m", 7, 1),
            Path::new("/cache/hrrr/20260217_06z/tmp2m/tier1/fh007.loop.webp")
        );
    }
}
