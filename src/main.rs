//! Data Transfer Tool
//!
//! Pulls the production database and data folders into a local environment

// datatransfer/src/main.rs
mod config;
mod database;
mod errors;
mod fetch;
mod files;
mod remote;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use config::AppConfig;
use fetch::{FetchReport, FetchScope, StepResult};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use utils::process::ProcessRunner;
use utils::progress::ConsoleProgress;

/// Fetch remote database and files from configured system.
#[derive(Debug, Parser)]
#[command(name = "data-transfer:fetch", version, about)]
struct Cli {
    /// Only transfer the database, not the files.
    #[arg(long)]
    db_only: bool,

    /// Only transfer the files, not the database.
    #[arg(long)]
    files_only: bool,
}

/// Main entry point for the fetch command
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    match run_app(cli).await {
        Ok(report) if !report.has_failures() => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Ok(_) => {
            eprintln!("❌ Operation completed with errors.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

// Diagnostics go to stderr so they never mix with the progress dots.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_app(cli: Cli) -> Result<FetchReport> {
    let config_path = AppConfig::default_path();
    let app_config = AppConfig::load_from_json(&config_path)
        .context(format!(
            "Failed to load application configuration from {}",
            config_path.display()
        ))?;

    let scope = FetchScope {
        db_only: cli.db_only,
        files_only: cli.files_only,
    };
    if scope.db_only && scope.files_only {
        println!("⚠️ Both --db-only and --files-only given; nothing will be transferred.");
    }

    println!(
        "🚀 Fetching from {}@{}:{}",
        app_config.transfer.remote_user,
        app_config.transfer.remote_host,
        app_config.transfer.remote_dir
    );
    let report = fetch::run_fetch_flow(&app_config, scope, &ProcessRunner, &ConsoleProgress).await;
    print_summary(&report);
    Ok(report)
}

fn print_summary(report: &FetchReport) {
    for (step, result) in [("Database", &report.database), ("Files", &report.files)] {
        match result {
            Some(StepResult::Ok) => println!("✓ {}: done", step),
            Some(StepResult::Failed(_)) => println!("✗ {}: failed", step),
            None => println!("- {}: skipped", step),
        }
    }
}
