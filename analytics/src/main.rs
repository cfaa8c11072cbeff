//! Command line entry point
//!
//! Loads configuration, wires a snapshot provider into the analytics runtime
//! and prints the dashboard as JSON. With `--watch` it keeps the runtime
//! alive, refreshing in the background until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;

use farmstats_analytics::types::AnalysisParams;
use farmstats_analytics::{
    AnalyticsRuntime, FileSnapshotProvider, SnapshotProvider, SyntheticSnapshotProvider,
};
use farmstats_shared::{component_info, component_warn, logging, AnalyticsConfig, Component};

/// Farm statistics analytics
#[derive(Parser)]
#[command(name = "farmstats")]
#[command(about = "Trend, benchmark and dashboard analysis for farm statistics")]
pub struct Args {
    /// JSON configuration file; defaults are used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Snapshot JSON exported by the game adapter
    #[arg(long, conflicts_with = "days")]
    pub snapshot: Option<PathBuf>,

    /// Generate a synthetic farm with this many days of history
    #[arg(long, default_value = "28")]
    pub days: u32,

    /// Benchmark profile for an extra overall comparison
    #[arg(long)]
    pub profile: Option<String>,

    /// Keep running and print a fresh dashboard every N seconds
    #[arg(long)]
    pub watch: Option<u64>,

    /// Print the effective configuration (file plus environment) and exit
    #[arg(long)]
    pub print_config: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AnalyticsConfig> {
    let mut config = match path {
        Some(path) => AnalyticsConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => AnalyticsConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("invalid FARMSTATS_* environment override")?;
    Ok(config)
}

async fn run<P>(provider: Arc<P>, config: &AnalyticsConfig, args: &Args) -> anyhow::Result<()>
where
    P: SnapshotProvider + 'static,
{
    let mut runtime = AnalyticsRuntime::new(provider, config).context("failed to build analytics runtime")?;
    let orchestrator = runtime.orchestrator();

    let dashboard = orchestrator.get_dashboard().await;
    println!("{}", serde_json::to_string_pretty(dashboard.as_ref())?);

    if let Some(profile) = &args.profile {
        let params = AnalysisParams::new().with_profile(profile);
        let comparison = orchestrator
            .get_comparison(farmstats_analytics::types::ComparisonKind::Overall, &params)
            .await;
        if comparison.is_unavailable() {
            component_warn!(Component::Runtime, profile = %profile, "⚠️ Comparison unavailable");
        }
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    }

    let Some(every) = args.watch else {
        return Ok(());
    };

    runtime.start();
    let mut ticker = tokio::time::interval(Duration::from_secs(every.max(1)));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                runtime.snapshot_changed().await;
                // Give the scheduler a tick to rebuild before reading
                tokio::time::sleep(config.scheduler.tick_interval() * 2).await;
                let dashboard = orchestrator.get_dashboard().await;
                println!("{}", serde_json::to_string_pretty(dashboard.as_ref())?);
                let stats = orchestrator.performance_stats();
                component_info!(
                    Component::Runtime,
                    requests = stats.total_requests,
                    hit_rate = stats.cache_hit_rate,
                    "📈 Avg analysis time {:.2}ms",
                    stats.avg_analysis_time_ms
                );
            }
            _ = signal::ctrl_c() => {
                component_info!(Component::Runtime, "Ctrl-C received");
                break;
            }
        }
    }

    runtime.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    logging::init_tracing_with_level(Some(&args.log_level));
    logging::log_startup(Component::Runtime, "farmstats analytics");

    let config = load_config(args.config.as_ref())?;
    if args.print_config {
        println!("{}", config.to_json_pretty().context("failed to render configuration")?);
        return Ok(());
    }

    match &args.snapshot {
        Some(path) => {
            let provider = FileSnapshotProvider::new(path);
            component_info!(Component::Runtime, "📂 Reading snapshots from {}", provider.path().display());
            run(Arc::new(provider), &config, &args).await
        }
        None => run(Arc::new(SyntheticSnapshotProvider::new(args.days)), &config, &args).await,
    }
}
