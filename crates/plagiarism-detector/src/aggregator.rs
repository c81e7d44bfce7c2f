//! Roll file-level scores up into repository scores and commit evidence

use std::collections::HashSet;

use plagiarism_domain::{
    Commit, CommitDiffConfig, CommitFilterConfig, CommitFlag, FilePair, KeywordMatch,
    RepoAggregation, SimilarityMatrix, SourceFile, ThresholdConfig, VerdictTable,
};
use similar::TextDiff;
use tracing::debug;

use crate::classifier;
use crate::errors::DetectorError;

/// Confidence attached to a message appearing verbatim in both histories
pub const IDENTICAL_MESSAGE_CONFIDENCE: f64 = 0.8;

/// Candidate-by-reference block of a matrix built over `candidate ++ reference`
pub fn cross_block(matrix: &SimilarityMatrix, candidate_len: usize) -> Vec<Vec<f64>> {
    let size = matrix.len();
    let candidate_len = candidate_len.min(size);
    (0..candidate_len)
        .map(|row| (candidate_len..size).map(|col| matrix.get(row, col)).collect())
        .collect()
}

/// Every `(candidate, reference)` pair passing `threshold`, strongest first
pub fn flagged_pairs(
    block: &[Vec<f64>],
    candidate_files: &[SourceFile],
    reference_files: &[SourceFile],
    threshold: f64,
    thresholds: &ThresholdConfig,
    verdicts: &VerdictTable,
) -> Vec<FilePair> {
    let mut pairs: Vec<FilePair> = block
        .iter()
        .zip(candidate_files)
        .flat_map(|(row, file_a)| {
            row.iter().zip(reference_files).filter_map(move |(&value, file_b)| {
                thresholds.passes(value, threshold).then(|| FilePair {
                    file_a: file_a.path.clone(),
                    file_b: file_b.path.clone(),
                    value,
                    verdict: classifier::classify(verdicts, value).0,
                })
            })
        })
        .collect();

    pairs.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.file_a.cmp(&b.file_a))
            .then_with(|| a.file_b.cmp(&b.file_b))
    });
    pairs
}

fn row_maxima(block: &[Vec<f64>]) -> Vec<f64> {
    block.iter().map(|row| row.iter().copied().fold(0.0, f64::max)).collect()
}

fn column_maxima(block: &[Vec<f64>]) -> Vec<f64> {
    let width = block.first().map(Vec::len).unwrap_or(0);
    (0..width).map(|col| block.iter().map(|row| row[col]).fold(0.0, f64::max)).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() { 0.0 } else { values.iter().sum::<f64>() / values.len() as f64 }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] }
}

/// Reduce a candidate-by-reference block to one score; `0.0` for an empty side
pub fn repo_score(block: &[Vec<f64>], aggregation: RepoAggregation) -> f64 {
    if block.is_empty() || block.iter().all(Vec::is_empty) {
        debug!(error = %DetectorError::empty_corpus("no comparable files on one side"), "Repository score defaults to zero");
        return 0.0;
    }

    let score = match aggregation {
        RepoAggregation::MeanOfMax => mean(&row_maxima(block)),
        RepoAggregation::MedianOfMax => median(&row_maxima(block)),
        RepoAggregation::SymmetricMean => {
            (mean(&row_maxima(block)) + mean(&column_maxima(block))) / 2.0
        }
    };
    plagiarism_domain::clamp_score(score)
}

/// Lowercased, whitespace-collapsed message
pub fn normalize_message(message: &str) -> String {
    message.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Whether a commit message is too short or machine-generated to compare
pub fn is_noise_message(message: &str, config: &CommitFilterConfig) -> bool {
    let normalized = normalize_message(message);
    if normalized.split(' ').filter(|t| !t.is_empty()).count() < config.min_tokens {
        return true;
    }

    let tokens: Vec<&str> =
        normalized.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).collect();

    config.keywords.iter().any(|keyword| {
        let keyword = keyword.to_lowercase();
        match config.match_mode {
            KeywordMatch::Substring => normalized.contains(&keyword),
            KeywordMatch::Prefix => normalized.starts_with(&keyword),
            KeywordMatch::Token => {
                let trimmed = keyword.trim();
                if trimmed.chars().all(char::is_alphanumeric) {
                    tokens.contains(&trimmed)
                } else {
                    normalized.contains(trimmed)
                }
            }
        }
    })
}

fn meaningful_messages(commits: &[Commit], config: &CommitFilterConfig) -> Vec<String> {
    let mut seen = HashSet::new();
    commits
        .iter()
        .filter(|commit| !is_noise_message(&commit.message, config))
        .map(|commit| normalize_message(&commit.message))
        .filter(|message| seen.insert(message.clone()))
        .collect()
}

/// Character-level similarity ratio of two messages in `[0, 1]`
pub fn message_similarity(a: &str, b: &str) -> f64 {
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Identical messages first, then every candidate/reference message pair
/// at or above the commit-message threshold, strongest first
pub fn message_flags(
    candidate: &[Commit],
    reference: &[Commit],
    filter: &CommitFilterConfig,
    thresholds: &ThresholdConfig,
) -> Vec<CommitFlag> {
    let candidate_messages = meaningful_messages(candidate, filter);
    let reference_messages = meaningful_messages(reference, filter);
    let reference_set: HashSet<&str> = reference_messages.iter().map(String::as_str).collect();

    let mut identical = Vec::new();
    let mut similar = Vec::new();

    for message in &candidate_messages {
        if reference_set.contains(message.as_str()) {
            identical.push(CommitFlag::IdenticalMessage {
                message: message.clone(),
                confidence: IDENTICAL_MESSAGE_CONFIDENCE,
            });
            continue;
        }

        for other in &reference_messages {
            let value = message_similarity(message, other);
            if thresholds.passes(value, thresholds.commit_message) {
                similar.push(CommitFlag::SimilarMessage {
                    candidate_message: message.clone(),
                    reference_message: other.clone(),
                    value,
                });
            }
        }
    }

    similar.sort_by(|a, b| {
        b.signal().unwrap_or(0.0).total_cmp(&a.signal().unwrap_or(0.0))
    });
    identical.extend(similar);
    identical
}

/// Changed-line text of the most recent commits, skipping empty diffs
pub fn diff_documents(commits: &[Commit], config: &CommitDiffConfig) -> Vec<(String, String)> {
    commits
        .iter()
        .take(config.max_commits)
        .filter_map(|commit| {
            let lines = commit.changed_lines(config.max_lines);
            (!lines.is_empty()).then(|| (commit.hash.clone(), lines.join("\n")))
        })
        .collect()
}

/// Confidence of a diff match: above 0.9 → 0.85, above 0.8 → 0.7, else 0.5
pub fn commit_diff_confidence(value: f64) -> f64 {
    if value > 0.9 {
        0.85
    } else if value > 0.8 {
        0.7
    } else {
        0.5
    }
}

/// Diff pairs at or above the commit-diff bar, strongest first
pub fn diff_flags(
    block: &[Vec<f64>],
    candidate_hashes: &[String],
    reference_hashes: &[String],
    thresholds: &ThresholdConfig,
) -> Vec<CommitFlag> {
    let mut flags: Vec<(f64, CommitFlag)> = Vec::new();
    for (row, candidate_hash) in block.iter().zip(candidate_hashes) {
        for (&value, reference_hash) in row.iter().zip(reference_hashes) {
            if thresholds.passes(value, thresholds.commit_diff) {
                flags.push((
                    value,
                    CommitFlag::SimilarDiff {
                        candidate_hash: candidate_hash.clone(),
                        reference_hash: reference_hash.clone(),
                        value,
                        confidence: commit_diff_confidence(value),
                    },
                ));
            }
        }
    }
    flags.sort_by(|a, b| b.0.total_cmp(&a.0));
    flags.into_iter().map(|(_, flag)| flag).collect()
}

/// Candidate commits touching more than `limit` lines
pub fn large_commit_flags(commits: &[Commit], limit: u32) -> Vec<CommitFlag> {
    commits
        .iter()
        .filter(|commit| commit.stats.total_lines() > limit)
        .map(|commit| CommitFlag::LargeCommit {
            hash: commit.hash.clone(),
            total_lines: commit.stats.total_lines(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use plagiarism_domain::{CommitStats, Verdict};
    use pretty_assertions::assert_eq;

    use super::*;

    fn commit(hash: &str, message: &str) -> Commit {
        Commit::new(hash, "dev", message, Utc::now())
    }

    fn files(paths: &[&str]) -> Vec<SourceFile> {
        paths.iter().map(|p| SourceFile::new(*p, "")).collect()
    }

    #[test]
    fn test_repo_score_mean_of_max() {
        // a1 → b1 = 0.9, a2 → b1 = 0.3
        let fixture = vec![vec![0.9], vec![0.3]];

        let actual = repo_score(&fixture, RepoAggregation::MeanOfMax);

        assert!((actual - 0.6).abs() < 1e-12, "{actual}");
    }

    #[test]
    fn test_repo_score_alternatives() {
        let fixture = vec![vec![0.9, 0.1], vec![0.3, 0.2], vec![0.5, 0.4]];

        let median = repo_score(&fixture, RepoAggregation::MedianOfMax);
        let symmetric = repo_score(&fixture, RepoAggregation::SymmetricMean);

        assert_eq!(median, 0.5);
        // rows: (0.9 + 0.3 + 0.5) / 3, columns: (0.9 + 0.4) / 2
        let expected = ((0.9 + 0.3 + 0.5) / 3.0 + (0.9 + 0.4) / 2.0) / 2.0;
        assert!((symmetric - expected).abs() < 1e-12);
    }

    #[test]
    fn test_repo_score_empty_corpus() {
        assert_eq!(repo_score(&[], RepoAggregation::MeanOfMax), 0.0);
        assert_eq!(repo_score(&[vec![], vec![]], RepoAggregation::MeanOfMax), 0.0);
    }

    #[test]
    fn test_cross_block() {
        let mut fixture = SimilarityMatrix::identity(3);
        fixture.set(0, 2, 0.4);
        fixture.set(1, 2, 0.8);

        let actual = cross_block(&fixture, 2);
        let expected = vec![vec![0.4], vec![0.8]];

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_flagged_pairs_inclusive_and_sorted() {
        let block = vec![vec![0.7, 0.69], vec![0.96, 0.1]];
        let candidate = files(&["a1.py", "a2.py"]);
        let reference = files(&["b1.py", "b2.py"]);

        let actual = flagged_pairs(
            &block,
            &candidate,
            &reference,
            0.7,
            &ThresholdConfig::default(),
            &VerdictTable::default(),
        );
        let expected = vec![
            FilePair {
                file_a: "a2.py".to_string(),
                file_b: "b1.py".to_string(),
                value: 0.96,
                verdict: Verdict::PlagiarismConfirmed,
            },
            FilePair {
                file_a: "a1.py".to_string(),
                file_b: "b1.py".to_string(),
                value: 0.7,
                verdict: Verdict::Clean,
            },
        ];

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_noise_filter() {
        let config = CommitFilterConfig::default();
        let fixtures = vec![
            ("Merge branch 'main'", true),
            ("bump version to 1.2.3", true),
            ("dependabot: update x", true),
            ("wip", true),
            ("fix off-by-one in parser", false),
            ("add circuit breaker to client", false),
        ];

        for (message, expected) in fixtures {
            let actual = is_noise_message(message, &config);
            assert_eq!(actual, expected, "Input: {}", message);
        }
    }

    #[test]
    fn test_substring_mode_is_broader() {
        let config = CommitFilterConfig::default().match_mode(KeywordMatch::Substring);

        let actual = is_noise_message("add circuit breaker to client", &config);

        assert!(actual);
    }

    #[test]
    fn test_message_flags() {
        let candidate = vec![
            commit("c1", "fix off-by-one in parser"),
            commit("c2", "add retry logic to http client"),
            commit("c3", "Merge branch 'main'"),
        ];
        let reference = vec![
            commit("r1", "Fix off-by-one in  parser"),
            commit("r2", "add retry logic to the http client"),
            commit("r3", "Merge branch 'main'"),
            commit("r4", "add retry logic to http clients"),
        ];

        let actual = message_flags(
            &candidate,
            &reference,
            &CommitFilterConfig::default(),
            &ThresholdConfig::default(),
        );

        assert_eq!(actual.len(), 3);
        assert_eq!(
            actual[0],
            CommitFlag::IdenticalMessage {
                message: "fix off-by-one in parser".to_string(),
                confidence: 0.8,
            }
        );
        let matched: Vec<&str> = actual[1..]
            .iter()
            .filter_map(|flag| match flag {
                CommitFlag::SimilarMessage { candidate_message, reference_message, value }
                    if candidate_message == "add retry logic to http client" && *value >= 0.8 =>
                {
                    Some(reference_message.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            matched,
            vec!["add retry logic to http clients", "add retry logic to the http client"]
        );
    }

    #[test]
    fn test_diff_documents_and_flags() {
        let commits = vec![
            commit("c1", "m").diff_text("+++ b/x.py\n+a = 1\n-b = 2\n"),
            commit("c2", "m"),
        ];

        let actual = diff_documents(&commits, &CommitDiffConfig::default());
        let expected = vec![("c1".to_string(), "+a = 1\n-b = 2".to_string())];
        assert_eq!(actual, expected);

        let flags = diff_flags(
            &[vec![0.95, 0.5]],
            &["c1".to_string()],
            &["r1".to_string(), "r2".to_string()],
            &ThresholdConfig::default(),
        );
        assert_eq!(
            flags,
            vec![CommitFlag::SimilarDiff {
                candidate_hash: "c1".to_string(),
                reference_hash: "r1".to_string(),
                value: 0.95,
                confidence: 0.85,
            }]
        );
    }

    #[test]
    fn test_large_commit_flags() {
        let fixture = vec![
            commit("big", "import vendor code")
                .stats(CommitStats { files_changed: 40, insertions: 900, deletions: 0 }),
            commit("small", "tweak")
                .stats(CommitStats { files_changed: 1, insertions: 3, deletions: 1 }),
        ];

        let actual = large_commit_flags(&fixture, 300);
        let expected = vec![CommitFlag::LargeCommit { hash: "big".to_string(), total_lines: 900 }];

        assert_eq!(actual, expected);
    }
}
