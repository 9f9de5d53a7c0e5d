//! Sequential per-variable catch-up: round after round, each unblocked
//! variable offers its next missing forecast hour to the worker pool, until
//! every variable has either completed its schedule or gone blocked, or a
//! round makes no progress. A failed build blocks its variable for the rest
//! of the poll; the next poll retries.

use capabilities::{RegionSpec, Registry};
use chrono::{DateTime, Utc};
use fetch::VariableFetcher;
use futures::stream::{self, StreamExt};
use pipeline::{build_frame, frame_paths, BuildFrameRequest};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use wx_common::RunId;

pub struct CatchUpOutcome {
    pub available: usize,
    pub total: usize,
    pub blocked_vars: BTreeSet<String>,
    pub rounds: u32,
}

/// Picks this round's candidates: the first not-yet-completed forecast hour
/// for each variable that isn't already blocked. Pulled out of the async
/// loop below so it can be exercised without needing a real fetcher/GDAL.
fn next_round_candidates(
    fhs_by_var: &HashMap<String, Vec<u32>>,
    completed: &BTreeSet<(String, u32)>,
    blocked: &BTreeSet<String>,
) -> Vec<(String, u32)> {
    let mut candidates = Vec::new();
    let mut vars: Vec<&String> = fhs_by_var.keys().collect();
    vars.sort();
    for var in vars {
        if blocked.contains(var) {
            continue;
        }
        if let Some(&fh) = fhs_by_var[var].iter().find(|fh| !completed.contains(&(var.clone(), **fh))) {
            candidates.push((var.clone(), fh));
        }
    }
    candidates
}

#[allow(clippy::too_many_arguments)]
pub async fn run_catch_up(
    registry: &Registry,
    fetcher: &dyn VariableFetcher,
    model_id: &str,
    region: &RegionSpec,
    run_time: DateTime<Utc>,
    staging_root: &Path,
    targets: &[(String, u32)],
    workers: usize,
) -> CatchUpOutcome {
    let run_id = RunId::from_cycle(run_time);
    let total = targets.len();

    let mut fhs_by_var: HashMap<String, Vec<u32>> = HashMap::new();
    for (var, fh) in targets {
        fhs_by_var.entry(var.clone()).or_default().push(*fh);
    }
    for fhs in fhs_by_var.values_mut() {
        fhs.sort_unstable();
        fhs.dedup();
    }

    let mut completed: BTreeSet<(String, u32)> = BTreeSet::new();
    for (var, fh) in targets {
        let paths = frame_paths(staging_root, model_id, &run_id, var, *fh);
        if paths.all_exist() {
            completed.insert((var.clone(), *fh));
        }
    }

    let mut blocked: BTreeSet<String> = BTreeSet::new();
    let mut round = 0u32;

    loop {
        round += 1;
        let candidates = next_round_candidates(&fhs_by_var, &completed, &blocked);
        if candidates.is_empty() {
            break;
        }

        tracing::info!(model = model_id, run = %run_id, round, candidates = candidates.len(), "catch-up round");

        let results: Vec<((String, u32), bool)> = stream::iter(candidates)
            .map(|(var, fh)| async move {
                let req = BuildFrameRequest { registry, fetcher, model_id, region, var_id: &var, run_time, fh, staging_root };
                let ok = match build_frame(req).await {
                    Ok(Some(_)) => true,
                    Ok(None) => false,
                    Err(e) => {
                        tracing::warn!(model = model_id, var = %var, fh, error = %e, "build failed");
                        false
                    }
                };
                ((var, fh), ok)
            })
            .buffer_unordered(workers.max(1))
            .collect()
            .await;

        let mut progressed = false;
        for ((var, fh), ok) in results {
            if ok {
                completed.insert((var.clone(), fh));
                progressed = true;
                tracing::info!(model = model_id, run = %run_id, var = %var, fh, "build success");
            } else {
                blocked.insert(var.clone());
                tracing::warn!(model = model_id, run = %run_id, var = %var, fh, "build blocked for this poll");
            }
        }

        // Every submitted candidate completes or blocks its variable, so a
        // round always shrinks the active set; this guards the pathological
        // case anyway rather than relying on that invariant to hold forever.
        if !progressed && blocked.is_empty() {
            break;
        }
    }

    CatchUpOutcome { available: completed.len(), total, blocked_vars: blocked, rounds: round }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule(pairs: &[(&str, &[u32])]) -> HashMap<String, Vec<u32>> {
        pairs.iter().map(|(v, fhs)| (v.to_string(), fhs.to_vec())).collect()
    }

    #[tokio::test]
    async fn failed_build_blocks_the_variable_for_this_poll() {
        // A fetcher with no fixtures fails every frame, so the variable's
        // first forecast hour blocks it and later hours are never attempted.
        let registry = Registry::with_defaults();
        let fetcher = fetch::NullFetcher::new();
        let region = capabilities::region_by_id("conus").unwrap();
        let staging = tempfile::tempdir().unwrap();
        let run_time = chrono::Utc.with_ymd_and_hms(2026, 2, 17, 6, 0, 0).unwrap();
        let targets: Vec<(String, u32)> = (0..5).map(|fh| ("tmp2m".to_string(), fh)).collect();

        let outcome = run_catch_up(&registry, &fetcher, "hrrr", &region, run_time, staging.path(), &targets, 2).await;

        assert_eq!(outcome.available, 0);
        assert_eq!(outcome.total, 5);
        assert!(outcome.blocked_vars.contains("tmp2m"));
    }

    #[test]
    fn first_round_offers_each_variables_earliest_fh() {
        let fhs_by_var = schedule(&[("tmp2m", &[0, 1, 2]), ("wspd10m", &[0, 1])]);
        let completed = BTreeSet::new();
        let blocked = BTreeSet::new();
        let mut candidates = next_round_candidates(&fhs_by_var, &completed, &blocked);
        candidates.sort();
        assert_eq!(candidates, vec![("tmp2m".to_string(), 0), ("wspd10m".to_string(), 0)]);
    }

    #[test]
    fn completed_fh_is_skipped_in_favor_of_the_next_one() {
        let fhs_by_var = schedule(&[("tmp2m", &[0, 1, 2])]);
        let mut completed = BTreeSet::new();
        completed.insert(("tmp2m".to_string(), 0));
        let blocked = BTreeSet::new();
        let candidates = next_round_candidates(&fhs_by_var, &completed, &blocked);
        assert_eq!(candidates, vec![("tmp2m".to_string(), 1)]);
    }

    #[test]
    fn blocked_variable_is_excluded_entirely() {
        let fhs_by_var = schedule(&[("tmp2m", &[0, 1]), ("wspd10m", &[0, 1])]);
        let completed = BTreeSet::new();
        let mut blocked = BTreeSet::new();
        blocked.insert("wspd10m".to_string());
        let candidates = next_round_candidates(&fhs_by_var, &completed, &blocked);
        assert_eq!(candidates, vec![("tmp2m".to_string(), 0)]);
    }

    #[test]
    fn fully_completed_variable_stops_offering_candidates() {
        let fhs_by_var = schedule(&[("tmp2m", &[0, 1])]);
        let mut completed = BTreeSet::new();
        completed.insert(("tmp2m".to_string(), 0));
        completed.insert(("tmp2m".to_string(), 1));
        let blocked = BTreeSet::new();
        assert!(next_round_candidates(&fhs_by_var, &completed, &blocked).is_empty());
    }
}
