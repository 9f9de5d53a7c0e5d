//! Read-side view of the `published/{model}/{run}/{var}/fhNNN.*` tree the
//! Scheduler writes (`scheduler::paths`) and the per-frame file naming the
//! Build Pipeline writes (`pipeline::build_frame::frame_paths`). The API
//! never writes into `published/` or `manifests/`; only the loop cache,
//! for WebP frames rendered on demand after a pregeneration miss.

use std::path::{Path, PathBuf};
use wx_common::RunId;

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

pub fn loop_cache_run_dir(loop_cache_root: &Path, model_id: &str, run_id: &RunId) -> PathBuf {
    loop_cache_root.join(model_id).join(run_id.as_str())
}

pub fn rgba_cog_path(published_run_dir: &Path, var_id: &str, fh: u32) -> PathBuf {
    published_run_dir.join(var_id).join(format!("fh{fh:03}.rgba.cog.tif"))
}

pub fn value_cog_path(published_run_dir: &Path, var_id: &str, fh: u32) -> PathBuf {
    published_run_dir.join(var_id).join(format!("fh{fh:03}.val.cog.tif"))
}

pub fn sidecar_path(published_run_dir: &Path, var_id: &str, fh: u32) -> PathBuf {
    published_run_dir.join(var_id).join(format!("fh{fh:03}.json"))
}

pub fn loop_webp_path(loop_cache_run_dir: &Path, var_id: &str, fh: u32, tier: u8) -> PathBuf {
    loop_cache_run_dir.join(var_id).join(format!("tier{tier}")).join(format!("fh{fh:03}.loop.webp"))
}

/// Parses `fhNNN.rgba.cog.tif` back to its forecast hour; the frames
/// listing walks the published variable directory rather than trusting the
/// manifest, so a frame is listed iff its raster actually exists.
pub fn parse_rgba_fh(file_name: &str) -> Option<u32> {
    file_name.strip_prefix("fh")?.strip_suffix(".rgba.cog.tif")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_paths_match_pipeline_naming_convention() {
        let run_id = RunId::parse("20260217_06z").unwrap();
        let run_dir = published_run_dir(Path::new("/data/published"), "hrrr", &run_id);
        assert_eq!(rgba_cog_path(&run_dir, "tmp2m", 3), Path::new("/data/published/hrrr/20260217_06z/tmp2m/fh003.rgba.cog.tif"));
        assert_eq!(value_cog_path(&run_dir, "tmp2m", 3), Path::new("/data/published/hrrr/20260217_06z/tmp2m/fh003.val.cog.tif"));
        assert_eq!(sidecar_path(&run_dir, "tmp2m", 3), Path::new("/data/published/hrrr/20260217_06z/tmp2m/fh003.json"));
    }

    #[test]
    fn latest_pointer_lives_at_model_root() {
        let p = latest_pointer_path(Path::new("/data/published"), "gfs");
        assert_eq!(p, Path::new("/data/published/gfs/LATEST.json"));
    }

    #[test]
    fn loop_webp_path_is_tiered() {
        let run_id = RunId::parse("20260217_06z").unwrap();
        let run_dir = loop_cache_run_dir(Path::new("/cache"), "hrrr", &run_id);
        assert_eq!(loop_webp_path(&run_dir, "refc", 12, 0), Path::new("/cache/hrrr/20260217_06z/refc/tier0/fh012.loop.webp"));
    }

    #[test]
    fn rgba_fh_round_trips() {
        assert_eq!(parse_rgba_fh("fh000.rgba.cog.tif"), Some(0));
        assert_eq!(parse_rgba_fh("fh048.rgba.cog.tif"), Some(48));
        assert_eq!(parse_rgba_fh("fh048.val.cog.tif"), None);
        assert_eq!(parse_rgba_fh("LATEST.json"), None);
    }
}
