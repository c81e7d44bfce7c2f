use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use plagiarism_detector::{
    GitRepositorySource, Orchestrator, SimilarityEngine, embedder_for, report,
};
use plagiarism_domain::JobStatus;
use plagiarism_services::InMemoryJobStore;
use tracing::{error, info};

use super::cli::AnalyzeArgs;
use super::config::{job_request_from_args, load_config_from_args};

/// Run one analysis and write its report
pub async fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = match load_config_from_args(&args) {
        Ok(config) => {
            info!("✅ Configuration loaded");
            config
        }
        Err(e) => {
            error!("❌ Configuration failed: {}", e);
            return Err(e);
        }
    };

    info!(
        "⚙️  Candidate: {}, references: {}, language: {}, threshold: {}",
        args.candidate.id(),
        args.references.len(),
        args.language,
        args.threshold
    );

    let embedder = embedder_for(&config.similarity)?;
    let engine = SimilarityEngine::new(&config.similarity, embedder);
    let source =
        GitRepositorySource::from_config(&config.sampling, config.commit_diff.max_commits);
    let orchestrator = Orchestrator::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(source),
        engine,
        config,
    );

    let job = orchestrator.run_to_completion(job_request_from_args(&args)).await?;
    if job.status != JobStatus::Completed {
        let reason = job.error.unwrap_or_else(|| format!("job ended as {}", job.status));
        error!("❌ Analysis failed: {}", reason);
        return Err(anyhow!("Analysis failed: {reason}"));
    }
    let result = job.result.ok_or_else(|| anyhow!("Completed job has no report"))?;

    for warning in &result.warnings {
        info!("⚠️  {}", warning);
    }

    let out = File::create(&args.out)
        .with_context(|| format!("Failed to create {}", args.out.display()))?;
    report::write_json(&result, BufWriter::new(out))?;
    info!("📄 Report written to {}", args.out.display());

    if let Some(csv_path) = &args.csv {
        let csv = File::create(csv_path)
            .with_context(|| format!("Failed to create {}", csv_path.display()))?;
        report::write_pairs_csv(&result, BufWriter::new(csv))?;
        info!("📄 Flagged pairs written to {}", csv_path.display());
    }

    info!("📊 Summary:");
    info!("   References compared: {}", result.summary.total_references);
    info!("   Skipped references: {}", result.summary.skipped_references);
    info!("   File pairs compared: {}", result.summary.total_file_pairs_compared);
    info!("   Suspicious comparisons: {}", result.summary.suspicious_pairs);
    for comparison in result.suspicious() {
        info!(
            "   🔎 {} → {} ({:.3}, confidence {:.2})",
            comparison.reference_id, comparison.verdict, comparison.repo_score, comparison.confidence
        );
    }

    Ok(())
}
