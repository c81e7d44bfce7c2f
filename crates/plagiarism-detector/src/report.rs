//! Report assembly and export

use std::io::Write;

use chrono::Utc;
use plagiarism_domain::{
    AnalysisReport, ComparisonResult, DiffLine, DiffTag, JobId, ReportParameters, ReportSummary,
    RepositoryMatrix,
};
use similar::{ChangeTag, TextDiff};

use crate::errors::{DetectorError, Result};

/// Build the immutable report for a finished job.
///
/// Pure apart from the generation timestamp: the matrix lists the candidate
/// first, then each compared reference, with the candidate row and column
/// holding repository scores and the diagonal set to `1.0`.
pub fn assemble(
    job_id: JobId,
    parameters: ReportParameters,
    comparisons: Vec<ComparisonResult>,
    warnings: Vec<String>,
) -> AnalysisReport {
    let skipped_references = parameters.reference_repos.len().saturating_sub(comparisons.len());
    let summary = ReportSummary {
        total_references: comparisons.len(),
        suspicious_pairs: comparisons.iter().filter(|c| c.verdict.is_suspicious()).count(),
        total_file_pairs_compared: comparisons.iter().map(|c| c.files_compared).sum(),
        skipped_references,
    };

    AnalysisReport {
        job_id,
        generated_at: Utc::now(),
        repository_matrix: repository_matrix(&parameters.candidate_repo, &comparisons),
        parameters,
        summary,
        scores: comparisons.iter().flat_map(ComparisonResult::scores).collect(),
        comparisons,
        warnings,
    }
}

fn repository_matrix(candidate: &str, comparisons: &[ComparisonResult]) -> RepositoryMatrix {
    let mut repos = vec![candidate.to_string()];
    repos.extend(comparisons.iter().map(|c| c.reference_id.clone()));

    let size = repos.len();
    let mut similarities = vec![vec![0.0; size]; size];
    for (i, row) in similarities.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    for (offset, comparison) in comparisons.iter().enumerate() {
        similarities[0][offset + 1] = comparison.repo_score;
        similarities[offset + 1][0] = comparison.repo_score;
    }

    RepositoryMatrix { repos, similarities }
}

/// Line diff of two files, capped at `max_lines` entries
pub fn line_diff(old: &str, new: &str, max_lines: usize) -> Vec<DiffLine> {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .take(max_lines)
        .map(|change| DiffLine {
            tag: match change.tag() {
                ChangeTag::Equal => DiffTag::Equal,
                ChangeTag::Delete => DiffTag::Delete,
                ChangeTag::Insert => DiffTag::Insert,
            },
            text: change.value().trim_end_matches(['\r', '\n']).to_string(),
        })
        .collect()
}

/// Pretty-printed JSON, serialized verbatim
pub fn write_json<W: Write>(report: &AnalysisReport, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, report)
        .map_err(|e| DetectorError::internal_error(format!("Failed to write JSON report: {e}")))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One row per flagged file pair across all comparisons
pub fn write_pairs_csv<W: Write>(report: &AnalysisReport, mut writer: W) -> Result<()> {
    let io_error =
        |e: std::io::Error| DetectorError::internal_error(format!("Failed to write CSV: {e}"));

    writeln!(writer, "reference,candidate_file,reference_file,similarity,verdict")
        .map_err(io_error)?;
    for comparison in &report.comparisons {
        for pair in &comparison.file_pairs {
            writeln!(
                writer,
                "{},{},{},{:.4},{}",
                csv_field(&comparison.reference_id),
                csv_field(&pair.file_a),
                csv_field(&pair.file_b),
                pair.value,
                pair.verdict
            )
            .map_err(io_error)?;
        }
    }
    Ok(())
}
