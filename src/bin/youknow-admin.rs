use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use youknow::collector::CollectionScheduler;
use youknow::config::Config;

#[derive(Parser)]
#[command(name = "youknow-admin")]
#[command(about = "youknow collection and storage maintenance CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one collection cycle into the configured store
    Collect,
    /// Check that a history file can be found and read
    Probe,
    /// Delete stored visit points older than the retention window
    Prune {
        /// Retention in days (defaults to RETENTION_DAYS)
        #[arg(long)]
        days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let scheduler = CollectionScheduler::from_config(&config);

    match cli.command {
        Commands::Collect => {
            if !scheduler.store().connect().await {
                println!(
                    "⚠ {} backend not connected, points will not outlive this run",
                    config.store.backend.as_str()
                );
            }
            let report = scheduler
                .force_refresh()
                .await
                .context("collection cycle panicked")?;
            match report.collected_at {
                Some(at) => println!(
                    "✓ Collected {} visits at {} (stored: {}, pruned: {})",
                    report.extracted, at, report.written, report.removed
                ),
                None => println!("⚠ No history records found in the collection window"),
            }
        }
        Commands::Probe => {
            let probe = scheduler.reader().probe().await;
            let info = scheduler.reader().history_info(None).await;
            match probe {
                Ok(probe) => {
                    println!("✓ History file: {}", probe.path.display());
                    println!("  URLs: {}", probe.total_urls);
                    println!("  Visits in the last day: {}", info.sample_count);
                    if !info.sample_domains.is_empty() {
                        println!("  Sample domains: {}", info.sample_domains.join(", "));
                    }
                }
                Err(e) => {
                    println!("✗ History not readable: {}", e);
                    println!("  Checked {} locations:", scheduler.reader().candidates().len());
                    for path in scheduler.reader().candidates() {
                        println!("    {}", path.display());
                    }
                }
            }
        }
        Commands::Prune { days } => {
            if !scheduler.store().connect().await {
                bail!(
                    "could not connect to the {} metrics backend",
                    config.store.backend.as_str()
                );
            }
            let days = days.unwrap_or(config.collection.retention_days);
            let removed = scheduler.store().cleanup(days).await;
            println!("✓ Removed {} visit points older than {} days", removed, days);
        }
    }

    scheduler.stop().await;
    Ok(())
}
