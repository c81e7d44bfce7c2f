use anyhow::Result;
use plagiarism_detector::load_analysis_config;
use plagiarism_domain::{AnalysisConfig, BackendKind, JobRequest};

use super::cli::{AnalyzeArgs, BackendArg};

/// Load layered configuration and apply command-line overrides
pub fn load_config_from_args(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut config = load_analysis_config(args.config.as_deref())?;

    if let Some(backend) = args.backend {
        config.similarity.backend = match backend {
            BackendArg::Lexical => BackendKind::Lexical,
            BackendArg::Semantic => BackendKind::Semantic,
        };
    }
    config.thresholds.file = args.threshold;

    Ok(config)
}

pub fn job_request_from_args(args: &AnalyzeArgs) -> JobRequest {
    JobRequest::new(
        args.candidate.clone(),
        args.references.clone(),
        args.language.clone(),
        args.threshold,
    )
}
