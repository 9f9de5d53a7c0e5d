//! Build-and-publish scheduler: one polling control loop per model,
//! building missing frames and promoting completed runs.

mod atomic;
mod catch_up;
mod error;
mod loop_webp;
mod migration;
mod paths;
mod promote;
mod retention;
mod run_resolution;
mod scheduler;
mod targets;

use anyhow::Result;
use capabilities::Registry;
use clap::Parser;
use fetch::FetchTuning;
use loop_webp::LoopTiers;
use raster_io::webp::{WebpTier, DEFAULT_TIER0, DEFAULT_TIER1};
use scheduler::{Scheduler, SchedulerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "scheduler")]
#[command(about = "Builds and publishes model frames on a polling schedule")]
struct Args {
    /// Model id to schedule (hrrr, gfs, nbm)
    #[arg(short, long)]
    model: String,

    /// Comma-separated variable keys to build (default: every buildable variable)
    #[arg(long, value_delimiter = ',')]
    vars: Vec<String>,

    /// Comma-separated variables that gate promotion (default: tmp2m or the first schedulable var)
    #[arg(long, value_delimiter = ',')]
    primary_vars: Vec<String>,

    /// Root directory for staging/published/manifests
    #[arg(long, env = "DATA_ROOT", default_value = "/var/lib/wxraster")]
    data_root: PathBuf,

    /// Root directory for the loop WebP cache (default: {data_root}/loop_cache)
    #[arg(long, env = "LOOP_CACHE_ROOT")]
    loop_cache_root: Option<PathBuf>,

    /// Concurrent build workers
    #[arg(long, env = "WORKERS", default_value = "4")]
    workers: usize,

    /// Number of recent runs to retain per model
    #[arg(long, env = "KEEP_RUNS", default_value = "6")]
    keep_runs: usize,

    /// Poll interval once a run is fully built
    #[arg(long, env = "POLL_SECONDS", default_value_t = scheduler::DEFAULT_POLL_SECONDS)]
    poll_seconds: u64,

    /// Poll interval while a run is still catching up
    #[arg(long, env = "INCOMPLETE_RUN_POLL_SECONDS", default_value_t = scheduler::INCOMPLETE_RUN_POLL_SECONDS)]
    incomplete_run_poll_seconds: u64,

    /// Variable used to probe upstream cycles (default: the model's run_discovery probe variable)
    #[arg(long, env = "PROBE_VAR")]
    probe_var: Option<String>,

    /// Ordered comma-separated upstream mirror names
    #[arg(long, env = "UPSTREAM_PRIORITY", value_delimiter = ',')]
    upstream_priority: Vec<String>,

    /// Download retry budget per mirror
    #[arg(long, env = "SUBSET_RETRIES", default_value = "2")]
    subset_retries: u32,

    /// Sleep between download retries, in seconds
    #[arg(long, env = "RETRY_SLEEP_SECONDS", default_value = "0.6")]
    retry_sleep_seconds: f64,

    /// Explicit run id (YYYYMMDD_HHz) to build instead of the latest discovered cycle
    #[arg(long)]
    run: Option<String>,

    /// Process one cycle and exit
    #[arg(long)]
    once: bool,

    /// Flatten any legacy region-segmented data trees before starting
    #[arg(long)]
    migrate_layout: bool,

    /// Disable loop WebP pregeneration after promotion
    #[arg(long, env = "LOOP_PREGENERATE_DISABLED")]
    no_loop_pregenerate: bool,

    /// Tier-0 loop WebP quality (0-100)
    #[arg(long, env = "LOOP_WEBP_TIER0_QUALITY", default_value_t = DEFAULT_TIER0.quality)]
    loop_webp_tier0_quality: f32,

    /// Tier-0 loop WebP max dimension in pixels before downsampling
    #[arg(long, env = "LOOP_WEBP_TIER0_MAX_DIM", default_value_t = DEFAULT_TIER0.max_dim)]
    loop_webp_tier0_max_dim: u32,

    /// Tier-1 loop WebP quality (0-100)
    #[arg(long, env = "LOOP_WEBP_TIER1_QUALITY", default_value_t = DEFAULT_TIER1.quality)]
    loop_webp_tier1_quality: f32,

    /// Tier-1 loop WebP max dimension in pixels before downsampling
    #[arg(long, env = "LOOP_WEBP_TIER1_MAX_DIM", default_value_t = DEFAULT_TIER1.max_dim)]
    loop_webp_tier1_max_dim: u32,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(true).with_thread_ids(true).json().finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    info!(model = %args.model, "starting scheduler");

    tokio::fs::create_dir_all(&args.data_root).await?;

    if args.migrate_layout {
        let loop_cache_root = args.loop_cache_root.clone().unwrap_or_else(|| args.data_root.join("loop_cache"));
        for root in [
            args.data_root.join("staging"),
            args.data_root.join("published"),
            args.data_root.join("manifests"),
            loop_cache_root,
        ] {
            let moved = migration::migrate_tree(&root)?;
            if moved > 0 {
                info!(root = %root.display(), moved, "flattened legacy regioned layout");
            }
        }
    }

    let registry = Registry::with_defaults();
    let tuning = FetchTuning {
        mirror_priority: if args.upstream_priority.is_empty() { None } else { Some(args.upstream_priority.clone()) },
        retries_per_mirror: args.subset_retries,
        retry_sleep: Duration::from_secs_f64(args.retry_sleep_seconds.max(0.0)),
    };
    let http_fetcher = fetch::build_http_fetcher(&args.model, &tuning);

    let config = SchedulerConfig {
        model_id: args.model.clone(),
        requested_vars: args.vars,
        requested_primary_vars: args.primary_vars,
        data_root: args.data_root,
        loop_cache_root: args.loop_cache_root,
        workers: args.workers,
        keep_runs: args.keep_runs,
        poll_seconds: args.poll_seconds,
        incomplete_run_poll_seconds: args.incomplete_run_poll_seconds,
        run_arg: args.run,
        probe_var: args.probe_var,
        once: args.once,
        loop_pregenerate_enabled: !args.no_loop_pregenerate,
        loop_tiers: LoopTiers {
            tier0: WebpTier { quality: args.loop_webp_tier0_quality, max_dim: args.loop_webp_tier0_max_dim },
            tier1: WebpTier { quality: args.loop_webp_tier1_quality, max_dim: args.loop_webp_tier1_max_dim },
        },
    };

    let scheduler = Scheduler::new(registry, Box::new(http_fetcher), config)?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    if args.once {
        info!("running a single poll cycle");
        let outcome = scheduler.run_once().await?;
        info!(run = %outcome.run_id, available = outcome.available, total = outcome.total, "poll cycle complete");
    } else {
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("received shutdown signal");
            shutdown_tx_clone.send(()).ok();
        });

        scheduler.run_forever(shutdown_tx.subscribe()).await?;
    }

    Ok(())
}
