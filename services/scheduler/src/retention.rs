//! Run retention: keep the newest `keep_runs` run directories under a
//! model's tree and delete the rest (`_enforce_run_retention`).

use std::io;
use std::path::Path;
use wx_common::RunId;

/// Lists `RunId`-shaped subdirectories of `dir`, newest first.
fn list_runs_descending(dir: &Path) -> io::Result<Vec<(RunId, std::path::PathBuf)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut runs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Ok(run_id) = RunId::parse(name) {
            runs.push((run_id, entry.path()));
        }
    }
    runs.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(runs)
}

/// Removes every run directory under a model's directory beyond the newest
/// `keep_runs`, returning the removed run ids. Applied independently to the
/// staging, published, and loop-cache trees (`_process_run`'s three
/// `_enforce_run_retention` calls). Non-run entries (`LATEST.json`, tmp
/// siblings) are never touched.
pub fn enforce_run_retention(model_dir: &Path, keep_runs: usize) -> io::Result<Vec<RunId>> {
    let runs = list_runs_descending(model_dir)?;
    let mut removed = Vec::new();
    for (run_id, path) in runs.into_iter().skip(keep_runs) {
        std::fs::remove_dir_all(&path)?;
        removed.push(run_id);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_run_dir(root: &Path, run: &str) {
        std::fs::create_dir_all(root.join(run)).unwrap();
    }

    #[test]
    fn keeps_only_the_newest_n_runs() {
        let dir = tempdir().unwrap();
        for run in ["20260217_00z", "20260217_06z", "20260217_12z", "20260217_18z"] {
            make_run_dir(dir.path(), run);
        }
        let removed = enforce_run_retention(dir.path(), 2).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(dir.path().join("20260217_18z").exists());
        assert!(dir.path().join("20260217_12z").exists());
        assert!(!dir.path().join("20260217_06z").exists());
        assert!(!dir.path().join("20260217_00z").exists());
    }

    #[test]
    fn non_run_shaped_entries_are_left_alone() {
        let dir = tempdir().unwrap();
        make_run_dir(dir.path(), "20260217_00z");
        make_run_dir(dir.path(), "scratch");
        let removed = enforce_run_retention(dir.path(), 1).unwrap();
        assert!(removed.is_empty());
        assert!(dir.path().join("scratch").exists());
    }

    #[test]
    fn missing_directory_is_a_no_op() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let removed = enforce_run_retention(&missing, 3).unwrap();
        assert!(removed.is_empty());
    }
}
