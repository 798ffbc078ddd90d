use anyhow::{Context, Result};
use config_manager::SystemConfig;
use job_orchestrator::{PipelineOrchestrator, Stage};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Usage: wallet_analyzer <stage>");
    eprintln!();
    eprintln!("Stages:");
    eprintln!("  top-gainers       crawl the token leaderboard (stage A)");
    eprintln!("  top-traders       crawl top traders per token (stage B)");
    eprintln!("  wallet-seven-day  screen wallets on the 7-day PnL dashboard (stage C)");
    eprintln!("  wallet-full       screen wallets on the realized/unrealized dashboard (stage C)");
    eprintln!("  pipeline          run all stages in order");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(stage_arg) = std::env::args().nth(1) else {
        print_usage();
        std::process::exit(2);
    };

    let config = SystemConfig::load().context("loading configuration")?;
    let orchestrator = PipelineOrchestrator::new(config)?;

    if stage_arg == "pipeline" {
        let reports = orchestrator.run_pipeline().await?;
        info!("🏁 Pipeline finished: {} stages", reports.len());
        return Ok(());
    }

    let Some(stage) = Stage::parse(&stage_arg) else {
        eprintln!("Unknown stage: {}", stage_arg);
        print_usage();
        std::process::exit(2);
    };

    let report = orchestrator.run_stage(stage).await?;
    info!(
        "🏁 {}: {} records written to {}",
        report.stage.name(),
        report.records_written,
        report.output_path.display()
    );
    Ok(())
}
