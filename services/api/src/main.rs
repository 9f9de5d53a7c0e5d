//! Read API service: the HTTP surface over the published tree.

mod cache;
mod error;
mod etag;
mod handlers;
mod manifests;
mod paths;
mod ratelimit;
mod run_resolution;
mod state;
mod tilemath;

use anyhow::Result;
use capabilities::Registry;
use clap::Parser;
use raster_io::webp::{WebpTier, DEFAULT_TIER0, DEFAULT_TIER1};
use state::{ApiConfig, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "api")]
#[command(about = "Read-only HTTP API over the published weather raster tree")]
struct Args {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Root directory containing published/ and manifests/
    #[arg(long, env = "DATA_ROOT", default_value = "/var/lib/wxraster")]
    data_root: PathBuf,

    /// Root directory for the loop WebP cache (default: {data_root}/loop_cache)
    #[arg(long, env = "LOOP_CACHE_ROOT")]
    loop_cache_root: Option<PathBuf>,

    /// TTL for cached sample results, in seconds
    #[arg(long, env = "SAMPLE_CACHE_TTL_SECONDS", default_value = "10")]
    sample_cache_ttl_seconds: f64,

    /// How long a coalesced sample request waits for the leader
    #[arg(long, env = "SAMPLE_INFLIGHT_WAIT_SECONDS", default_value = "0.2")]
    sample_inflight_wait_seconds: f64,

    /// Sample rate-limit window, in seconds
    #[arg(long, env = "SAMPLE_RATE_LIMIT_WINDOW_SECONDS", default_value = "60")]
    sample_rate_limit_window_seconds: u64,

    /// Sample requests allowed per client per window
    #[arg(long, env = "SAMPLE_RATE_LIMIT_MAX_REQUESTS", default_value = "120")]
    sample_rate_limit_max_requests: u32,

    /// How often cached JSON files are revalidated against their mtime
    #[arg(long, env = "JSON_CACHE_RECHECK_SECONDS", default_value = "5")]
    json_cache_recheck_seconds: f64,

    /// Tier-0 loop WebP quality used for on-demand renders
    #[arg(long, env = "LOOP_WEBP_TIER0_QUALITY", default_value_t = DEFAULT_TIER0.quality)]
    loop_webp_tier0_quality: f32,

    /// Tier-0 loop WebP max dimension
    #[arg(long, env = "LOOP_WEBP_TIER0_MAX_DIM", default_value_t = DEFAULT_TIER0.max_dim)]
    loop_webp_tier0_max_dim: u32,

    /// Tier-1 loop WebP quality used for on-demand renders
    #[arg(long, env = "LOOP_WEBP_TIER1_QUALITY", default_value_t = DEFAULT_TIER1.quality)]
    loop_webp_tier1_quality: f32,

    /// Tier-1 loop WebP max dimension
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
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(true).json().finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let config = ApiConfig {
        data_root: args.data_root.clone(),
        loop_cache_root: args.loop_cache_root,
        sample_cache_ttl: Duration::from_secs_f64(args.sample_cache_ttl_seconds.max(0.0)),
        sample_single_flight_wait: Duration::from_secs_f64(args.sample_inflight_wait_seconds.max(0.0)),
        rate_limit_window: Duration::from_secs(args.sample_rate_limit_window_seconds.max(1)),
        rate_limit_budget: args.sample_rate_limit_max_requests.max(1),
        json_cache_recheck: Duration::from_secs_f64(args.json_cache_recheck_seconds.max(0.0)),
        loop_tier0: WebpTier { quality: args.loop_webp_tier0_quality, max_dim: args.loop_webp_tier0_max_dim },
        loop_tier1: WebpTier { quality: args.loop_webp_tier1_quality, max_dim: args.loop_webp_tier1_max_dim },
    };

    let state = Arc::new(AppState::new(Registry::with_defaults(), config));
    let app = handlers::router(state);

    info!(listen = %args.listen, data_root = %args.data_root.display(), "starting read api");
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
