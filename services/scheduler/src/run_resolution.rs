//! Resolves the target run cycle for a poll iteration, driven entirely by
//! the capability's `run_discovery` record; adding a model needs a catalog
//! entry, not a new branch.

use crate::error::SchedulerError;
use capabilities::{ModelCapability, Registry};
use chrono::{DateTime, Duration, Timelike, Utc};
use fetch::{FetchError, FetchRequest, VariableFetcher};
use wx_common::RunId;

fn snap_to_cadence(t: DateTime<Utc>, cadence_hours: u32) -> DateTime<Utc> {
    let cadence_hours = cadence_hours.max(1);
    let floored_hour = (t.hour() / cadence_hours) * cadence_hours;
    t.with_hour(floored_hour)
        .unwrap_or(t)
        .with_minute(0)
        .unwrap_or(t)
        .with_second(0)
        .unwrap_or(t)
        .with_nanosecond(0)
        .unwrap_or(t)
}

/// Parses an explicit `--run YYYYMMDD_HHz` argument into its cycle instant.
pub fn parse_run_arg(run_arg: &str) -> Result<DateTime<Utc>, SchedulerError> {
    RunId::parse(run_arg).map(|r| r.cycle_utc()).map_err(|_| SchedulerError::InvalidRunArg(run_arg.to_string()))
}

/// Probes one candidate cycle by attempting to fetch the probe variable at
/// `fh=0`. `TransientUnavailable` means "not published yet"; the caller
/// walks one cadence step further back and tries again. Any other error
/// (including success) stops the walk.
async fn probe_cycle(
    registry: &Registry,
    fetcher: &dyn VariableFetcher,
    model: &ModelCapability,
    probe_var: &str,
    candidate: DateTime<Utc>,
) -> bool {
    let pattern = match registry.probe_pattern(&model.model_id, probe_var) {
        Ok(p) => p,
        Err(_) => return false,
    };
    let req = FetchRequest {
        model_id: model.model_id.clone(),
        product: model.product_code.clone(),
        search_pattern: pattern,
        run_time: candidate,
        fh: 0,
    };
    match fetcher.fetch(&req).await {
        Ok(_) => true,
        Err(FetchError::TransientUnavailable { .. }) => false,
        // A hard failure on the probe itself isn't evidence the run exists,
        // but it isn't evidence it doesn't either; treat it like a miss so
        // the walk keeps going rather than wedging the scheduler.
        Err(FetchError::HardFailure { .. }) => false,
    }
}

/// Walks backward up to `probe_attempts` cadence steps from `now`, returning
/// the first cycle that probes successfully, or the `fallback_lag_hours`
/// heuristic if every attempt misses (or probing is disabled for this
/// model).
pub async fn resolve_latest_run(
    registry: &Registry,
    fetcher: &dyn VariableFetcher,
    model: &ModelCapability,
    probe_var_override: Option<&str>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let discovery = &model.run_discovery;
    let base = snap_to_cadence(now, discovery.cycle_cadence_hours);
    let probe_var = probe_var_override.unwrap_or(&discovery.probe_var_key);

    if discovery.probe_enabled {
        for attempt in 0..discovery.probe_attempts {
            let candidate = base - Duration::hours((attempt * discovery.cycle_cadence_hours) as i64);
            if probe_cycle(registry, fetcher, model, probe_var, candidate).await {
                tracing::info!(model = %model.model_id, run = %RunId::from_cycle(candidate), attempt, "run probe success");
                return candidate;
            }
        }
        tracing::warn!(model = %model.model_id, attempts = discovery.probe_attempts, "run probe exhausted, falling back to lag heuristic");
    }

    snap_to_cadence(now - Duration::hours(discovery.fallback_lag_hours as i64), discovery.cycle_cadence_hours)
}

/// An explicit run argument wins outright; otherwise delegate to probing.
pub async fn resolve_run_dt(
    registry: &Registry,
    fetcher: &dyn VariableFetcher,
    model: &ModelCapability,
    run_arg: Option<&str>,
    probe_var_override: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, SchedulerError> {
    if let Some(run_arg) = run_arg {
        return parse_run_arg(run_arg);
    }
    Ok(resolve_latest_run(registry, fetcher, model, probe_var_override, now).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn snaps_to_six_hour_cadence() {
        let t = Utc.with_ymd_and_hms(2026, 2, 17, 14, 37, 0).unwrap();
        assert_eq!(snap_to_cadence(t, 6), Utc.with_ymd_and_hms(2026, 2, 17, 12, 0, 0).unwrap());
    }

    #[test]
    fn snaps_to_one_hour_cadence() {
        let t = Utc.with_ymd_and_hms(2026, 2, 17, 14, 37, 0).unwrap();
        assert_eq!(snap_to_cadence(t, 1), Utc.with_ymd_and_hms(2026, 2, 17, 14, 0, 0).unwrap());
    }

    #[test]
    fn parses_well_formed_run_arg() {
        let dt = parse_run_arg("20260217_06z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 2, 17, 6, 0, 0).unwrap());
    }

    #[test]
    fn rejects_malformed_run_arg() {
        assert!(parse_run_arg("not-a-run").is_err());
    }
}
