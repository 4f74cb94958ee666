use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use taktvakt_config::TaktvaktConfig;
use taktvakt_core::Shutdown;
use taktvakt_engine::{RunSummary, Runtime};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run on live traffic (pcap capture, needs the `live` feature)
    Run(RunArgs),
    /// Run on seeded synthetic traffic
    Simulate(SimulateArgs),
    /// Print the effective configuration as YAML and exit
    Config(CommonArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Configuration file; defaults to config/taktvakt.yaml plus environment
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Stop automatically after this many seconds
    #[arg(short, long)]
    pub duration: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Capture interface, overriding the configuration
    #[arg(short, long)]
    pub interface: Option<String>,
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long)]
    pub seed: Option<u64>,
    /// Fraction of generated frames that are threats (0.0 - 1.0)
    #[arg(long)]
    pub threat_ratio: Option<f64>,
    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            let config = apply_run_args(load_config(&args.common)?, &args)?;
            run_pipeline(config, args.common.duration).await
        }
        Commands::Simulate(args) => {
            let config = apply_simulate_args(load_config(&args.common)?, &args)?;
            run_pipeline(config, args.common.duration).await
        }
        Commands::Config(args) => {
            let config = load_config(&args)?;
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}

/// Command-line overrides go through the same validation as the file.
fn apply_run_args(mut config: TaktvaktConfig, args: &RunArgs) -> anyhow::Result<TaktvaktConfig> {
    config.capture.mode = "live".into();
    if let Some(interface) = &args.interface {
        config.capture.interface = interface.clone();
    }
    config.check().context("invalid command-line override")?;
    Ok(config)
}

fn apply_simulate_args(
    mut config: TaktvaktConfig,
    args: &SimulateArgs,
) -> anyhow::Result<TaktvaktConfig> {
    config.capture.mode = "simulated".into();
    if let Some(seed) = args.seed {
        config.capture.generator.seed = seed;
    }
    if let Some(ratio) = args.threat_ratio {
        anyhow::ensure!(
            (0.0..=1.0).contains(&ratio),
            "--threat-ratio must be within 0.0..=1.0, got {ratio}"
        );
        config.capture.generator.threat_ratio = ratio;
    }
    config.check().context("invalid command-line override")?;
    Ok(config)
}

fn load_config(args: &CommonArgs) -> anyhow::Result<TaktvaktConfig> {
    let config = match &args.config {
        Some(path) => TaktvaktConfig::load_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TaktvaktConfig::load().context("loading configuration")?,
    };
    Ok(config)
}

async fn run_pipeline(config: TaktvaktConfig, duration: Option<u64>) -> anyhow::Result<()> {
    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Shutdown requested");
            shutdown.trigger();
        })
        .context("installing signal handler")?;
    }

    let duration = duration.map(Duration::from_secs);
    let summary = tokio::task::spawn_blocking(move || -> anyhow::Result<RunSummary> {
        let mut runtime = Runtime::from_config(config, shutdown)?;
        Ok(runtime.run(duration)?)
    })
    .await
    .context("pipeline thread panicked")?
    .inspect_err(|e| error!(error = %e, "Pipeline failed"))?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "received {} | rx dropped {} | pool exhausted {} | detect dropped {} | logged {}",
        summary.received,
        summary.rx_dropped,
        summary.pool_exhausted,
        summary.detect_dropped,
        summary.logged
    );
    for report in summary.reports.iter().filter(|r| r.period.is_periodic()) {
        println!(
            "{:<8} runs {:>8} | exec avg {:>9.2} us max {:>9.2} us | jitter max {:>9.2} us | misses {}",
            report.name,
            report.invocations,
            report.exec_us.avg,
            report.exec_us.max,
            report.jitter_us.max,
            report.deadline_misses
        );
    }
}
