//! Single-frame build CLI, the diagnostic entry point around
//! `pipeline::build_frame`: build one (model, run, var, fh) into staging
//! and exit. Exit status 0 means both COGs passed validation; anything else
//! is a configuration error, a fetch failure, or a gate rejection.

use anyhow::{bail, Context, Result};
use capabilities::Registry;
use clap::Parser;
use fetch::FetchTuning;
use pipeline::{build_frame, BuildFrameRequest};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use wx_common::RunId;

#[derive(Parser, Debug)]
#[command(name = "build-frame")]
#[command(about = "Builds one forecast frame (two COGs + sidecar) into staging")]
struct Args {
    /// Model id (hrrr, gfs, nbm)
    #[arg(short, long)]
    model: String,

    /// Run id, YYYYMMDD_HHz
    #[arg(long)]
    run: String,

    /// Variable key (aliases accepted)
    #[arg(long)]
    var: String,

    /// Forecast hour
    #[arg(long)]
    fh: u32,

    /// Root directory for staging/published/manifests
    #[arg(long, env = "DATA_ROOT", default_value = "/var/lib/wxraster")]
    data_root: PathBuf,

    /// Ordered comma-separated upstream mirror names
    #[arg(long, env = "UPSTREAM_PRIORITY", value_delimiter = ',')]
    upstream_priority: Vec<String>,

    /// Download retry budget per mirror
    #[arg(long, env = "SUBSET_RETRIES", default_value = "2")]
    subset_retries: u32,

    /// Sleep between download retries, in seconds
    #[arg(long, env = "RETRY_SLEEP_SECONDS", default_value = "0.6")]
    retry_sleep_seconds: f64,

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
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(true).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let registry = Registry::with_defaults();
    let model = registry.get_model(&args.model).context("unknown model")?.clone();
    let region = capabilities::region_by_id(&model.canonical_region)
        .with_context(|| format!("model {} names unknown region {}", args.model, model.canonical_region))?;

    let run_id = RunId::parse(&args.run).map_err(|e| anyhow::anyhow!("{e}"))?;
    let run_time = run_id.cycle_utc();

    let tuning = FetchTuning {
        mirror_priority: if args.upstream_priority.is_empty() { None } else { Some(args.upstream_priority.clone()) },
        retries_per_mirror: args.subset_retries,
        retry_sleep: Duration::from_secs_f64(args.retry_sleep_seconds.max(0.0)),
    };
    let fetcher = fetch::build_http_fetcher(&args.model, &tuning);

    let staging_root = args.data_root.join("staging");
    tokio::fs::create_dir_all(&staging_root).await?;

    info!(model = %args.model, run = %run_id, var = %args.var, fh = args.fh, "building frame");
    let request = BuildFrameRequest {
        registry: &registry,
        fetcher: &fetcher,
        model_id: &args.model,
        region: &region,
        var_id: &args.var,
        run_time,
        fh: args.fh,
        staging_root: &staging_root,
    };

    match build_frame(request).await? {
        Some(artifacts) => {
            info!(
                rgba = %artifacts.rgba_cog_path.display(),
                value = %artifacts.value_cog_path.display(),
                sidecar = %artifacts.sidecar_path.display(),
                "frame built"
            );
            Ok(())
        }
        None => {
            warn!(model = %args.model, run = %run_id, var = %args.var, fh = args.fh, "frame rejected by validation");
            bail!("frame rejected by validation gates");
        }
    }
}
