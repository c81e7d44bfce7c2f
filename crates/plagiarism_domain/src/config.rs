//! Analysis configuration
//!
//! Every threshold, cap and table the pipeline consults lives here rather
//! than at call sites. All sections deserialize with defaults so partial
//! configuration layers (files, environment) can be merged on top.

use std::collections::BTreeSet;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

use crate::comparison::Verdict;

/// Top-level configuration for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize, Setters, PartialEq)]
#[setters(strip_option, into)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sampling: SamplingConfig,
    pub normalization: NormalizationConfig,
    pub similarity: SimilarityConfig,
    pub thresholds: ThresholdConfig,
    pub commit_filter: CommitFilterConfig,
    pub commit_diff: CommitDiffConfig,
    pub verdicts: VerdictTable,
    pub repo_aggregation: RepoAggregation,
    /// Number of flagged file pairs listed in explanations
    pub explanation_top_n: usize,
    /// Candidate commits touching more lines than this are flagged
    pub large_commit_lines: u32,
    /// Lines kept from the side-by-side diff of the strongest pair
    pub max_diff_lines: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            normalization: NormalizationConfig::default(),
            similarity: SimilarityConfig::default(),
            thresholds: ThresholdConfig::default(),
            commit_filter: CommitFilterConfig::default(),
            commit_diff: CommitDiffConfig::default(),
            verdicts: VerdictTable::default(),
            repo_aggregation: RepoAggregation::default(),
            explanation_top_n: 10,
            large_commit_lines: 300,
            max_diff_lines: 200,
        }
    }
}

/// Bounds on what is extracted from each repository
#[derive(Debug, Clone, Serialize, Deserialize, Setters, PartialEq)]
#[setters(strip_option, into)]
#[serde(default)]
pub struct SamplingConfig {
    pub max_files_per_repo: usize,
    pub max_file_size_kb: u64,
    pub max_commits: usize,
    /// Directory names never descended into
    pub skip_dirs: BTreeSet<String>,
    /// Upper bound on fetching one repository
    pub fetch_timeout_secs: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_files_per_repo: 50,
            max_file_size_kb: 200,
            max_commits: 200,
            skip_dirs: [
                "venv",
                "node_modules",
                "dist",
                "build",
                "__pycache__",
                ".git",
                "target",
                "vendor",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            fetch_timeout_secs: 120,
        }
    }
}

impl SamplingConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_kb * 1024
    }

    /// Whether a file at a `/`-separated relative path may be sampled
    pub fn admits(&self, path: &str, size_bytes: u64) -> bool {
        size_bytes <= self.max_file_size_bytes()
            && !path.split('/').any(|part| self.skip_dirs.contains(part))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Setters, PartialEq)]
#[setters(strip_option, into)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Replace literals and identifiers with placeholder tokens
    pub aggressive: bool,
    /// Files shorter than this after normalization are not compared
    pub min_normalized_length: usize,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self { aggressive: true, min_normalized_length: 30 }
    }
}

/// Which backend produces file-level similarity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Lexical,
    Semantic,
}

/// Weighted sum of token overlap and backend similarity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BlendWeights {
    pub token_overlap: f64,
    pub backend: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self { token_overlap: 0.6, backend: 0.4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Setters, PartialEq)]
#[setters(strip_option, into)]
#[serde(default)]
pub struct SimilarityConfig {
    pub backend: BackendKind,
    /// Vocabulary bound for the lexical backend
    pub max_features: usize,
    /// Line window for semantic chunking
    pub chunk_lines: usize,
    /// Most chunks sent to the embedder in one request
    pub embed_batch_size: usize,
    pub blend: Option<BlendWeights>,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Lexical,
            max_features: 4000,
            chunk_lines: 60,
            embed_batch_size: 64,
            blend: None,
        }
    }
}

/// Per-granularity thresholds
#[derive(Debug, Clone, Serialize, Deserialize, Setters, PartialEq)]
#[setters(strip_option, into)]
#[serde(default)]
pub struct ThresholdConfig {
    /// File-pair threshold; overridden by the job request
    pub file: f64,
    /// Repo score at which a pair counts as suspicious
    pub repo: f64,
    pub commit_message: f64,
    pub commit_diff: f64,
    /// `>=` when true, `>` when false
    pub inclusive: bool,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self { file: 0.75, repo: 0.75, commit_message: 0.8, commit_diff: 0.88, inclusive: true }
    }
}

impl ThresholdConfig {
    pub fn passes(&self, value: f64, threshold: f64) -> bool {
        if self.inclusive { value >= threshold } else { value > threshold }
    }
}

/// How noise keywords are matched against a lowercased commit message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMatch {
    /// Keyword appears anywhere in the message
    Substring,
    /// Message starts with the keyword
    Prefix,
    /// Keyword equals one of the message's alphanumeric tokens
    #[default]
    Token,
}

#[derive(Debug, Clone, Serialize, Deserialize, Setters, PartialEq)]
#[setters(strip_option, into)]
#[serde(default)]
pub struct CommitFilterConfig {
    pub min_tokens: usize,
    pub keywords: Vec<String>,
    pub match_mode: KeywordMatch,
}

impl Default for CommitFilterConfig {
    fn default() -> Self {
        Self {
            min_tokens: 3,
            keywords: ["merge", "bump ", "dependabot", "bot", "release", "changelog", "version", "ci"]
                .into_iter()
                .map(String::from)
                .collect(),
            match_mode: KeywordMatch::Token,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Setters, PartialEq)]
#[setters(strip_option, into)]
#[serde(default)]
pub struct CommitDiffConfig {
    pub enabled: bool,
    /// Most recent commits per repository whose diffs are embedded
    pub max_commits: usize,
    /// Changed lines kept per diff
    pub max_lines: usize,
}

impl Default for CommitDiffConfig {
    fn default() -> Self {
        Self { enabled: true, max_commits: 20, max_lines: 100 }
    }
}

/// Reduction of a file-level matrix into one repository score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepoAggregation {
    /// Mean over candidate files of their best reference match
    #[default]
    MeanOfMax,
    /// Median over candidate files of their best reference match
    MedianOfMax,
    /// Average of both directional means
    SymmetricMean,
}

/// One row of the verdict table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerdictBand {
    pub min_score: f64,
    pub verdict: Verdict,
    pub confidence: f64,
}

/// Score → verdict mapping; bands are matched highest `min_score` first
#[derive(Debug, Clone, Serialize, Deserialize, Setters, PartialEq)]
#[setters(strip_option, into)]
#[serde(default)]
pub struct VerdictTable {
    pub bands: Vec<VerdictBand>,
    /// Confidence reported for scores below every band
    pub clean_confidence: f64,
}

impl Default for VerdictTable {
    fn default() -> Self {
        Self {
            bands: vec![
                VerdictBand {
                    min_score: 0.95,
                    verdict: Verdict::PlagiarismConfirmed,
                    confidence: 0.95,
                },
                VerdictBand {
                    min_score: 0.85,
                    verdict: Verdict::PlagiarismLikely,
                    confidence: 0.75,
                },
                VerdictBand { min_score: 0.75, verdict: Verdict::Suspicious, confidence: 0.6 },
            ],
            clean_confidence: 0.85,
        }
    }
}
