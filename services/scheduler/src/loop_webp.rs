//! Loop WebP pregeneration: downsamples each newly published RGBA COG and
//! re-encodes it as a pair of quality-tiered lossy WebPs the frontend's
//! animation loop can fetch cheaply, rather than the full-resolution COG.
//! The COG→WebP conversion itself lives in `raster_io::webp` so the read
//! API can render a missed frame on demand with the identical code path.

use crate::paths::loop_webp_path;
use raster_io::webp::{convert_rgba_cog_to_loop_webp, WebpTier};
use std::path::{Path, PathBuf};

/// The two cache tiers, index-addressable by the `tier=0|1` query parameter.
#[derive(Debug, Clone, Copy)]
pub struct LoopTiers {
    pub tier0: WebpTier,
    pub tier1: WebpTier,
}

impl Default for LoopTiers {
    fn default() -> Self {
        Self { tier0: raster_io::webp::DEFAULT_TIER0, tier1: raster_io::webp::DEFAULT_TIER1 }
    }
}

impl LoopTiers {
    pub fn get(&self, tier: u8) -> WebpTier {
        match tier {
            0 => self.tier0,
            _ => self.tier1,
        }
    }
}

struct FrameRef {
    rgba_path: PathBuf,
    var_id: String,
    fh: u32,
    kind: String,
}

fn parse_fh(file_name: &str) -> Option<u32> {
    file_name.strip_prefix("fh")?.strip_suffix(".rgba.cog.tif")?.parse().ok()
}

fn sidecar_kind(rgba_path: &Path) -> String {
    let sidecar = rgba_path.with_file_name(match rgba_path.file_name().and_then(|n| n.to_str()).and_then(|n| n.strip_suffix(".rgba.cog.tif")) {
        Some(stem) => format!("{stem}.json"),
        None => return "continuous".to_string(),
    });
    std::fs::read_to_string(sidecar)
        .ok()
        .and_then(|body| serde_json::from_str::<serde_json::Value>(&body).ok())
        .and_then(|v| v.get("kind").and_then(|k| k.as_str()).map(str::to_string))
        .unwrap_or_else(|| "continuous".to_string())
}

/// Lists every published RGBA frame under a run directory as
/// `(var, fh, kind)` refs, reading each frame's sidecar for its kind.
fn list_rgba_frames(published_run_dir: &Path) -> Vec<FrameRef> {
    let mut frames = Vec::new();
    for entry in walkdir::WalkDir::new(published_run_dir).min_depth(2).max_depth(2).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else { continue };
        let Some(fh) = parse_fh(name) else { continue };
        let Some(var_id) = entry.path().parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()) else { continue };
        frames.push(FrameRef {
            rgba_path: entry.path().to_path_buf(),
            var_id: var_id.to_string(),
            fh,
            kind: sidecar_kind(entry.path()),
        });
    }
    frames
}

#[derive(Debug, Default)]
pub struct LoopWebpSummary {
    pub converted: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

/// Converts every published RGBA frame that doesn't already have a cached
/// loop WebP, both tiers, bounded to `workers` concurrent conversions.
pub async fn pregenerate_loop_webp_for_run(
    published_run_dir: &Path,
    loop_cache_run_dir: &Path,
    workers: usize,
    tiers: LoopTiers,
) -> LoopWebpSummary {
    use futures::stream::{self, StreamExt};

    let mut jobs: Vec<(PathBuf, PathBuf, String, WebpTier)> = Vec::new();
    let mut skipped = 0usize;

    for frame in list_rgba_frames(published_run_dir) {
        for tier in [0u8, 1u8] {
            let dest = loop_webp_path(loop_cache_run_dir, &frame.var_id, frame.fh, tier);
            if dest.exists() {
                skipped += 1;
                continue;
            }
            jobs.push((frame.rgba_path.clone(), dest, frame.kind.clone(), tiers.get(tier)));
        }
    }

    let results: Vec<bool> = stream::iter(jobs)
        .map(|(src, dest, kind, tier)| async move {
            match convert_rgba_cog_to_loop_webp(&src, &dest, &kind, tier).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(src = %src.display(), error = %e, "loop webp conversion failed");
                    false
                }
            }
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    let converted = results.iter().filter(|ok| **ok).count();
    let failed = results.len() - converted;
    LoopWebpSummary { converted, skipped_existing: skipped, failed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_forecast_hour_from_artifact_name() {
        assert_eq!(parse_fh("fh003.rgba.cog.tif"), Some(3));
        assert_eq!(parse_fh("fh120.rgba.cog.tif"), Some(120));
        assert_eq!(parse_fh("fh003.val.cog.tif"), None);
        assert_eq!(parse_fh("fh003.json"), None);
    }

    #[test]
    fn lists_frames_with_kind_from_sidecar() {
        let dir = tempdir().unwrap();
        let var_dir = dir.path().join("refc");
        std::fs::create_dir_all(&var_dir).unwrap();
        std::fs::write(var_dir.join("fh002.rgba.cog.tif"), b"x").unwrap();
        std::fs::write(var_dir.join("fh002.json"), r#"{"kind":"discrete"}"#).unwrap();

        let frames = list_rgba_frames(dir.path());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].var_id, "refc");
        assert_eq!(frames[0].fh, 2);
        assert_eq!(frames[0].kind, "discrete");
    }

    #[test]
    fn missing_sidecar_defaults_to_continuous() {
        let dir = tempdir().unwrap();
        let var_dir = dir.path().join("tmp2m");
        std::fs::create_dir_all(&var_dir).unwrap();
        std::fs::write(var_dir.join("fh000.rgba.cog.tif"), b"x").unwrap();

        let frames = list_rgba_frames(dir.path());
        assert_eq!(frames[0].kind, "continuous");
    }

    #[test]
    fn tier_lookup_defaults_out_of_range_to_tier1() {
        let tiers = LoopTiers::default();
        assert_eq!(tiers.get(0).max_dim, tiers.tier0.max_dim);
        assert_eq!(tiers.get(1).max_dim, tiers.tier1.max_dim);
        assert_eq!(tiers.get(9).max_dim, tiers.tier1.max_dim);
    }
}
