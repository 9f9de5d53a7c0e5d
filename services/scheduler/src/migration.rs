//! One-shot layout migration: older deployments wrote runs under a region
//! segment (`{model}/{region}/{run}`, with `pnw` from the initial rollout
//! and `conus` after it). The current layout is `{model}/{run}`; this
//! flattens any leftover regioned tree so those runs stay servable.

use std::io;
use std::path::Path;
use wx_common::runid;

const LEGACY_REGIONS: [&str; 3] = ["conus", "pnw", "north_central"];

fn run_shaped(name: &str, is_dir: bool) -> bool {
    if is_dir {
        return runid::is_well_formed(name);
    }
    // Manifest trees hold `{run}.json` files instead of run directories.
    name.strip_suffix(".json").is_some_and(runid::is_well_formed)
}

/// Moves every run directory (or `{run}.json` manifest) found under
/// `{model_dir}/{region}/` up to `{model_dir}/`, returning how many
/// entries moved. An entry that already exists at the flat location wins;
/// the regioned copy is removed. Empty region directories are cleaned up
/// afterwards.
pub fn migrate_regioned_to_canonical(model_dir: &Path) -> io::Result<usize> {
    let mut moved = 0usize;

    for region in LEGACY_REGIONS {
        let region_dir = model_dir.join(region);
        if !region_dir.is_dir() {
            continue;
        }

        for entry in std::fs::read_dir(&region_dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else { continue };
            let is_dir = entry.file_type()?.is_dir();
            if !run_shaped(&name, is_dir) {
                continue;
            }
            let target = model_dir.join(&name);
            if target.exists() {
                if is_dir {
                    std::fs::remove_dir_all(entry.path())?;
                } else {
                    std::fs::remove_file(entry.path())?;
                }
                continue;
            }
            std::fs::rename(entry.path(), &target)?;
            moved += 1;
        }

        if std::fs::read_dir(&region_dir)?.next().is_none() {
            std::fs::remove_dir(&region_dir)?;
        }
    }

    Ok(moved)
}

/// Runs the flatten over every model directory under a tree root
/// (staging, published, or the loop cache).
pub fn migrate_tree(root: &Path) -> io::Result<usize> {
    if !root.is_dir() {
        return Ok(0);
    }
    let mut moved = 0usize;
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            moved += migrate_regioned_to_canonical(&entry.path())?;
        }
    }
    Ok(moved)
}
