//! The immutable result attached to a completed job

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::comparison::ComparisonResult;
use crate::job::JobId;
use crate::language::Language;
use crate::similarity::SimilarityScore;

/// Request parameters echoed into the report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportParameters {
    pub candidate_repo: String,
    pub reference_repos: Vec<String>,
    pub language: Language,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSummary {
    /// References that were successfully compared
    pub total_references: usize,
    /// Comparisons whose verdict is above clean
    pub suspicious_pairs: usize,
    pub total_file_pairs_compared: usize,
    pub skipped_references: usize,
}

/// Repo-level scores, candidate first; unscored cells are `0.0`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryMatrix {
    pub repos: Vec<String>,
    pub similarities: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub job_id: JobId,
    pub generated_at: DateTime<Utc>,
    pub parameters: ReportParameters,
    pub summary: ReportSummary,
    pub repository_matrix: RepositoryMatrix,
    pub comparisons: Vec<ComparisonResult>,
    /// Every comparison flattened to per-granularity scores
    #[serde(default)]
    pub scores: Vec<SimilarityScore>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl AnalysisReport {
    /// Comparisons with a verdict above clean, strongest first
    pub fn suspicious(&self) -> Vec<&ComparisonResult> {
        let mut flagged: Vec<_> =
            self.comparisons.iter().filter(|c| c.verdict.is_suspicious()).collect();
        flagged.sort_by(|a, b| b.repo_score.total_cmp(&a.repo_score));
        flagged
    }
}
