//! Top-level per-model poll loop: resolve the target cycle, catch up its
//! frames, promote, pregenerate loop frames, and enforce retention.

use crate::catch_up::run_catch_up;
use crate::error::{SchedulerError, SchedulerResult};
use crate::loop_webp::{self, LoopTiers, LoopWebpSummary};
use crate::paths;
use crate::promote::{promote_run, should_promote, write_latest_pointer, write_run_manifest};
use crate::retention::enforce_run_retention;
use crate::run_resolution::resolve_run_dt;
use crate::targets::{resolve_primary_vars, resolve_vars_to_schedule, scheduled_targets_for_cycle};
use capabilities::{RegionSpec, Registry};
use chrono::{DateTime, Timelike, Utc};
use fetch::VariableFetcher;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use wx_common::RunId;

pub const DEFAULT_POLL_SECONDS: u64 = 300;
pub const INCOMPLETE_RUN_POLL_SECONDS: u64 = 60;

pub struct SchedulerConfig {
    pub model_id: String,
    pub requested_vars: Vec<String>,
    pub requested_primary_vars: Vec<String>,
    pub data_root: PathBuf,
    /// Separate root for the loop WebP cache; defaults to
    /// `{data_root}/loop_cache` when unset.
    pub loop_cache_root: Option<PathBuf>,
    pub workers: usize,
    pub keep_runs: usize,
    pub poll_seconds: u64,
    pub incomplete_run_poll_seconds: u64,
    pub run_arg: Option<String>,
    /// Overrides the capability's `run_discovery.probe_var_key`.
    pub probe_var: Option<String>,
    pub once: bool,
    pub loop_pregenerate_enabled: bool,
    pub loop_tiers: LoopTiers,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            requested_vars: Vec::new(),
            requested_primary_vars: Vec::new(),
            data_root: PathBuf::from("/var/lib/wxraster"),
            loop_cache_root: None,
            workers: 4,
            keep_runs: 6,
            poll_seconds: DEFAULT_POLL_SECONDS,
            incomplete_run_poll_seconds: INCOMPLETE_RUN_POLL_SECONDS,
            run_arg: None,
            probe_var: None,
            once: false,
            loop_pregenerate_enabled: true,
            loop_tiers: LoopTiers::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub available: usize,
    pub total: usize,
    pub blocked_vars: BTreeSet<String>,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.available >= self.total
    }
}

pub struct Scheduler {
    registry: Registry,
    fetcher: Box<dyn VariableFetcher>,
    config: SchedulerConfig,
    region: RegionSpec,
    vars_to_build: Vec<String>,
    primary_vars: Vec<String>,
}

impl Scheduler {
    pub fn new(registry: Registry, fetcher: Box<dyn VariableFetcher>, config: SchedulerConfig) -> SchedulerResult<Self> {
        let model = registry.get_model(&config.model_id)?;
        let region = capabilities::region_by_id(&model.canonical_region).ok_or_else(|| SchedulerError::MissingCanonicalRegion {
            model: config.model_id.clone(),
            region: model.canonical_region.clone(),
        })?;

        let vars_to_build = resolve_vars_to_schedule(&registry, model, &config.requested_vars);
        if vars_to_build.is_empty() {
            return Err(SchedulerError::NoSchedulableVars(config.model_id.clone()));
        }
        let primary_vars = resolve_primary_vars(model, &config.requested_primary_vars, &vars_to_build);

        Ok(Self { registry, fetcher, config, region, vars_to_build, primary_vars })
    }

    fn staging_root(&self) -> PathBuf {
        self.config.data_root.join("staging")
    }
    fn published_root(&self) -> PathBuf {
        self.config.data_root.join("published")
    }
    fn manifests_root(&self) -> PathBuf {
        self.config.data_root.join("manifests")
    }
    fn loop_cache_root(&self) -> PathBuf {
        self.config.loop_cache_root.clone().unwrap_or_else(|| self.config.data_root.join("loop_cache"))
    }

    /// `_process_run`: plan this cycle's targets, run the catch-up rounds,
    /// promote/manifest/latest-pointer/pregenerate if promotable, then
    /// enforce retention across staging, published, and the loop cache.
    #[tracing::instrument(skip(self), fields(model = %self.config.model_id))]
    pub async fn process_run(&self, run_time: DateTime<Utc>) -> SchedulerResult<RunOutcome> {
        let run_id = RunId::from_cycle(run_time);
        let targets = scheduled_targets_for_cycle(self.registry.get_model(&self.config.model_id)?, &self.vars_to_build, run_time.hour());

        let outcome = run_catch_up(
            &self.registry,
            self.fetcher.as_ref(),
            &self.config.model_id,
            &self.region,
            run_time,
            &self.staging_root(),
            &targets,
            self.config.workers,
        )
        .await;

        tracing::info!(
            run = %run_id, available = outcome.available, total = outcome.total,
            rounds = outcome.rounds, blocked = outcome.blocked_vars.len(), "catch-up complete"
        );

        if should_promote(&self.staging_root(), &self.config.model_id, &run_id, &self.primary_vars) {
            promote_run(&self.staging_root(), &self.published_root(), &self.config.model_id, &run_id)
                .await
                .map_err(|e| SchedulerError::Io { path: "promote".to_string(), detail: e.to_string() })?;

            write_run_manifest(&self.staging_root(), &self.manifests_root(), &self.config.model_id, &run_id, &targets, Utc::now())
                .await
                .map_err(|e| SchedulerError::Io { path: "manifest".to_string(), detail: e.to_string() })?;

            write_latest_pointer(&self.published_root(), &self.config.model_id, &run_id, Utc::now())
                .await
                .map_err(|e| SchedulerError::Io { path: "latest-pointer".to_string(), detail: e.to_string() })?;

            if self.config.loop_pregenerate_enabled {
                let published_run_dir = paths::published_run_dir(&self.published_root(), &self.config.model_id, &run_id);
                let loop_cache_run_dir = paths::loop_cache_run_dir(&self.loop_cache_root(), &self.config.model_id, &run_id);
                let summary: LoopWebpSummary = loop_webp::pregenerate_loop_webp_for_run(
                    &published_run_dir,
                    &loop_cache_run_dir,
                    self.config.workers,
                    self.config.loop_tiers,
                )
                .await;
                tracing::info!(
                    converted = summary.converted, skipped = summary.skipped_existing, failed = summary.failed,
                    "loop webp pregeneration complete"
                );
            }
        }

        for root in [
            self.staging_root().join(&self.config.model_id),
            self.published_root().join(&self.config.model_id),
            self.loop_cache_root().join(&self.config.model_id),
        ] {
            if let Err(e) = enforce_run_retention(&root, self.config.keep_runs) {
                tracing::warn!(root = %root.display(), error = %e, "retention sweep failed");
            }
        }

        Ok(RunOutcome { run_id, available: outcome.available, total: outcome.total, blocked_vars: outcome.blocked_vars })
    }

    async fn resolve_run_time(&self, now: DateTime<Utc>) -> SchedulerResult<DateTime<Utc>> {
        let model = self.registry.get_model(&self.config.model_id)?;
        resolve_run_dt(
            &self.registry,
            self.fetcher.as_ref(),
            model,
            self.config.run_arg.as_deref(),
            self.config.probe_var.as_deref(),
            now,
        )
        .await
    }

    pub async fn run_once(&self) -> SchedulerResult<RunOutcome> {
        let run_time = self.resolve_run_time(Utc::now()).await?;
        self.process_run(run_time).await
    }

    /// `run_scheduler`'s infinite loop: skip re-processing a run that's
    /// already complete and wasn't explicitly pinned, otherwise process it
    /// and sleep `poll_seconds` (complete) or `incomplete_run_poll_seconds`
    /// (still catching up) before the next iteration.
    pub async fn run_forever(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) -> SchedulerResult<()> {
        let mut last: Option<RunOutcome> = None;

        loop {
            let run_time = self.resolve_run_time(Utc::now()).await?;
            let run_id = RunId::from_cycle(run_time);

            let skip = match &last {
                Some(prev) => prev.run_id == run_id && self.config.run_arg.is_none() && prev.is_complete(),
                None => false,
            };

            let complete = if skip {
                tracing::debug!(run = %run_id, "run already complete, skipping re-processing");
                true
            } else {
                let outcome = self.process_run(run_time).await?;
                tracing::info!(run = %outcome.run_id, available = outcome.available, total = outcome.total, "poll cycle complete");
                let complete = outcome.is_complete();
                last = Some(outcome);
                complete
            };

            if self.config.once || self.config.run_arg.is_some() {
                return Ok(());
            }

            let sleep_secs = if complete { self.config.poll_seconds } else { self.config.incomplete_run_poll_seconds };
            tokio::select! {
                _ = shutdown.recv() => return Ok(()),
                _ = tokio::time::sleep(Duration::from_secs(sleep_secs)) => {}
            }
        }
    }
}
