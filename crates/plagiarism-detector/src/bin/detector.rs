//! Command-line plagiarism analysis: one job, run to completion

use anyhow::Result;
use clap::Parser;
use plagiarism_detector::{init_default_logging, init_development_logging};
use tracing::info;

mod analyze;

use analyze::{Args, Commands, run_analyze};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        init_development_logging()?;
    } else {
        init_default_logging()?;
    }

    info!("🚀 Starting plagiarism detector v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Commands::Analyze(analyze_args) => run_analyze(analyze_args).await,
    }
}
