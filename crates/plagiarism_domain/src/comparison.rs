//! Repo-pair comparison results and verdicts

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::similarity::{Granularity, SimilarityScore};

/// Categorical plagiarism judgement, ordered from least to most severe
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Verdict {
    Clean,
    Suspicious,
    PlagiarismLikely,
    PlagiarismConfirmed,
}

impl Verdict {
    /// Anything above `Clean` warrants a human look
    pub fn is_suspicious(&self) -> bool {
        *self > Verdict::Clean
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Verdict::PlagiarismConfirmed => "Near-verbatim copy detected; escalate for review",
            Verdict::PlagiarismLikely => "Likely plagiarism; recommend manual review",
            Verdict::Suspicious => "Possible plagiarism or shared libraries; review flagged files",
            Verdict::Clean => "Similarity within acceptable range",
        }
    }
}

/// A candidate/reference file pair at or above the file threshold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilePair {
    pub file_a: String,
    pub file_b: String,
    pub value: f64,
    pub verdict: Verdict,
}

/// Commit-level evidence attached to a comparison
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommitFlag {
    /// Lexically similar messages at or above the commit threshold
    SimilarMessage {
        candidate_message: String,
        reference_message: String,
        value: f64,
    },
    /// The same normalized message appears in both repositories
    IdenticalMessage { message: String, confidence: f64 },
    /// Added/removed lines embed close to each other
    SimilarDiff {
        candidate_hash: String,
        reference_hash: String,
        value: f64,
        confidence: f64,
    },
    /// A candidate commit touching an unusually large number of lines
    LargeCommit { hash: String, total_lines: u32 },
}

impl CommitFlag {
    /// Strength of the flag on the classifier's score scale, if it is one
    pub fn signal(&self) -> Option<f64> {
        match self {
            CommitFlag::SimilarMessage { value, .. } => Some(*value),
            CommitFlag::IdenticalMessage { confidence, .. } => Some(*confidence),
            CommitFlag::SimilarDiff { value, .. } => Some(*value),
            CommitFlag::LargeCommit { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiffTag {
    Equal,
    Delete,
    Insert,
}

/// One line of the side-by-side diff of the strongest file pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffLine {
    pub tag: DiffTag,
    pub text: String,
}

/// Result of comparing the candidate against one reference repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub candidate_id: String,
    pub reference_id: String,
    /// Flagged pairs, strongest first
    pub file_pairs: Vec<FilePair>,
    /// Number of `(a, b)` file combinations scored
    pub files_compared: usize,
    pub repo_score: f64,
    pub commit_flags: Vec<CommitFlag>,
    pub verdict: Verdict,
    pub confidence: f64,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_pair_diff: Vec<DiffLine>,
}

impl ComparisonResult {
    /// Flat per-granularity scores: the repository pair, each flagged file
    /// pair, then commit evidence. Large-commit flags carry no score.
    pub fn scores(&self) -> Vec<SimilarityScore> {
        let (candidate, reference) = (&self.candidate_id, &self.reference_id);
        let mut scores =
            vec![SimilarityScore::new(Granularity::Repo, candidate, reference, self.repo_score)];

        scores.extend(self.file_pairs.iter().map(|pair| {
            SimilarityScore::new(Granularity::File, &pair.file_a, &pair.file_b, pair.value)
                .with_repos(candidate, reference)
        }));

        scores.extend(self.commit_flags.iter().filter_map(|flag| {
            let score = match flag {
                CommitFlag::SimilarMessage { candidate_message, reference_message, value } => {
                    SimilarityScore::new(
                        Granularity::CommitMessage,
                        candidate_message,
                        reference_message,
                        *value,
                    )
                }
                CommitFlag::IdenticalMessage { message, .. } => {
                    SimilarityScore::new(Granularity::CommitMessage, message, message, 1.0)
                }
                CommitFlag::SimilarDiff { candidate_hash, reference_hash, value, .. } => {
                    SimilarityScore::new(
                        Granularity::CommitDiff,
                        candidate_hash,
                        reference_hash,
                        *value,
                    )
                }
                CommitFlag::LargeCommit { .. } => return None,
            };
            Some(score.with_repos(candidate, reference))
        }));

        scores
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_verdict_ordering() {
        assert!(Verdict::PlagiarismConfirmed > Verdict::PlagiarismLikely);
        assert!(Verdict::PlagiarismLikely > Verdict::Suspicious);
        assert!(Verdict::Suspicious > Verdict::Clean);
        assert!(!Verdict::Clean.is_suspicious());
    }

    #[test]
    fn test_verdict_string_forms() {
        let actual = Verdict::PlagiarismLikely.to_string();
        assert_eq!(actual, "plagiarism-likely");

        let parsed = Verdict::from_str("plagiarism-confirmed").unwrap();
        assert_eq!(parsed, Verdict::PlagiarismConfirmed);

        let json = serde_json::to_string(&Verdict::Suspicious).unwrap();
        assert_eq!(json, "\"suspicious\"");
    }

    #[test]
    fn test_commit_flag_signal() {
        let large = CommitFlag::LargeCommit { hash: "abc".to_string(), total_lines: 900 };
        let identical =
            CommitFlag::IdenticalMessage { message: "fix parser".to_string(), confidence: 0.8 };

        assert_eq!(large.signal(), None);
        assert_eq!(identical.signal(), Some(0.8));
    }

    #[test]
    fn test_scores_cover_every_granularity() {
        let fixture = ComparisonResult {
            candidate_id: "cand@main".to_string(),
            reference_id: "ref@main".to_string(),
            file_pairs: vec![FilePair {
                file_a: "a.py".to_string(),
                file_b: "b.py".to_string(),
                value: 0.91,
                verdict: Verdict::PlagiarismLikely,
            }],
            files_compared: 4,
            repo_score: 0.6,
            commit_flags: vec![
                CommitFlag::IdenticalMessage {
                    message: "add parser tests".to_string(),
                    confidence: 0.8,
                },
                CommitFlag::SimilarDiff {
                    candidate_hash: "c1".to_string(),
                    reference_hash: "r1".to_string(),
                    value: 0.97,
                    confidence: 0.9,
                },
                CommitFlag::LargeCommit { hash: "c2".to_string(), total_lines: 5000 },
            ],
            verdict: Verdict::PlagiarismLikely,
            confidence: 0.8,
            explanation: String::new(),
            top_pair_diff: Vec::new(),
        };

        let actual: Vec<_> = fixture
            .scores()
            .into_iter()
            .map(|s| (s.granularity, s.a_id, s.b_id, s.value, s.a_repo))
            .collect();
        let in_pair = Some("cand@main".to_string());
        let expected: Vec<(Granularity, String, String, f64, Option<String>)> = vec![
            (Granularity::Repo, "cand@main".into(), "ref@main".into(), 0.6, None),
            (Granularity::File, "a.py".into(), "b.py".into(), 0.91, in_pair.clone()),
            (
                Granularity::CommitMessage,
                "add parser tests".into(),
                "add parser tests".into(),
                1.0,
                in_pair.clone(),
            ),
            (Granularity::CommitDiff, "c1".into(), "r1".into(), 0.97, in_pair),
        ];

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_commit_flag_is_tagged() {
        let fixture = CommitFlag::LargeCommit { hash: "abc".to_string(), total_lines: 10 };

        let actual = serde_json::to_value(&fixture).unwrap();
        let expected = serde_json::json!({"kind": "large_commit", "hash": "abc", "total_lines": 10});

        assert_eq!(actual, expected);
    }
}
