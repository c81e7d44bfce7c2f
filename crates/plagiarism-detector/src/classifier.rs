//! Table-driven verdicts and explanation text

use std::fmt::Write as _;

use plagiarism_domain::{CommitFlag, FilePair, Verdict, VerdictTable};

/// Verdict and confidence of the highest band `score` reaches
pub fn classify(table: &VerdictTable, score: f64) -> (Verdict, f64) {
    let mut bands: Vec<_> = table.bands.iter().collect();
    bands.sort_by(|a, b| b.min_score.total_cmp(&a.min_score));

    bands
        .into_iter()
        .find(|band| score >= band.min_score)
        .map(|band| (band.verdict, band.confidence))
        .unwrap_or((Verdict::Clean, table.clean_confidence))
}

/// Everything the classifier looks at for one repository pair
#[derive(Debug, Clone, Copy)]
pub struct Evidence<'a> {
    pub candidate_id: &'a str,
    pub reference_id: &'a str,
    pub repo_score: f64,
    /// Flagged pairs, strongest first
    pub file_pairs: &'a [FilePair],
    pub commit_flags: &'a [CommitFlag],
}

impl Evidence<'_> {
    /// Strongest value across file, repository and commit signals
    pub fn strongest_signal(&self) -> f64 {
        let file = self.file_pairs.iter().map(|pair| pair.value).fold(0.0, f64::max);
        let commit = self.commit_flags.iter().filter_map(CommitFlag::signal).fold(0.0, f64::max);
        self.repo_score.max(file).max(commit)
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    table: VerdictTable,
    top_n: usize,
}

impl Classifier {
    pub fn new(table: VerdictTable, top_n: usize) -> Self {
        Self { table, top_n }
    }

    pub fn table(&self) -> &VerdictTable {
        &self.table
    }

    /// Overall verdict, confidence and explanation for a repository pair
    pub fn judge(&self, evidence: &Evidence<'_>) -> (Verdict, f64, String) {
        let (verdict, confidence) = classify(&self.table, evidence.strongest_signal());
        let explanation = self.explain(evidence, verdict, confidence);
        (verdict, confidence, explanation)
    }

    fn explain(&self, evidence: &Evidence<'_>, verdict: Verdict, confidence: f64) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "Comparison: {} vs {}", evidence.candidate_id, evidence.reference_id);
        let _ = writeln!(text, "Repository similarity: {:.3}", evidence.repo_score);

        let pairs = evidence.file_pairs;
        let _ = writeln!(text, "Flagged file pairs: {}", pairs.len());
        for (rank, pair) in pairs.iter().take(self.top_n).enumerate() {
            let _ = writeln!(
                text,
                "  {}. {} <-> {}: {:.3} ({})",
                rank + 1,
                pair.file_a,
                pair.file_b,
                pair.value,
                pair.verdict
            );
        }
        if pairs.len() > self.top_n {
            let _ = writeln!(text, "  ... and {} more similar pairs", pairs.len() - self.top_n);
        }

        if !evidence.commit_flags.is_empty() {
            let _ = writeln!(text, "Commit evidence:");
            for flag in evidence.commit_flags {
                let _ = writeln!(text, "  - {}", describe_flag(flag));
            }
        }

        let _ = write!(
            text,
            "Verdict: {verdict} (confidence {confidence:.2}). {}",
            verdict.recommendation()
        );
        text
    }
}

fn describe_flag(flag: &CommitFlag) -> String {
    match flag {
        CommitFlag::SimilarMessage { candidate_message, reference_message, value } => {
            format!("similar messages ({value:.3}): \"{candidate_message}\" / \"{reference_message}\"")
        }
        CommitFlag::IdenticalMessage { message, .. } => {
            format!("identical message: \"{message}\"")
        }
        CommitFlag::SimilarDiff { candidate_hash, reference_hash, value, confidence } => format!(
            "similar diffs {candidate_hash} / {reference_hash} ({value:.3}, confidence {confidence:.2})"
        ),
        CommitFlag::LargeCommit { hash, total_lines } => {
            format!("large commit {hash} touching {total_lines} lines")
        }
    }
}

#[cfg(test)]
mod tests {
    use plagiarism_domain::VerdictBand;
    use pretty_assertions::assert_eq;

    use super::*;

    fn pair(file_a: &str, file_b: &str, value: f64) -> FilePair {
        FilePair {
            file_a: file_a.to_string(),
            file_b: file_b.to_string(),
            value,
            verdict: classify(&VerdictTable::default(), value).0,
        }
    }

    #[test]
    fn test_classify_bands() {
        let table = VerdictTable::default();
        let fixtures = vec![
            (1.0, (Verdict::PlagiarismConfirmed, 0.95)),
            (0.95, (Verdict::PlagiarismConfirmed, 0.95)),
            (0.9, (Verdict::PlagiarismLikely, 0.75)),
            (0.85, (Verdict::PlagiarismLikely, 0.75)),
            (0.75, (Verdict::Suspicious, 0.6)),
            (0.7499, (Verdict::Clean, 0.85)),
            (0.0, (Verdict::Clean, 0.85)),
        ];

        for (score, expected) in fixtures {
            let actual = classify(&table, score);
            assert_eq!(actual, expected, "Score: {}", score);
        }
    }

    #[test]
    fn test_classify_unordered_custom_table() {
        let table = VerdictTable::default().bands(vec![
            VerdictBand { min_score: 0.5, verdict: Verdict::Suspicious, confidence: 0.4 },
            VerdictBand { min_score: 0.9, verdict: Verdict::PlagiarismLikely, confidence: 0.9 },
        ]);

        assert_eq!(classify(&table, 0.95), (Verdict::PlagiarismLikely, 0.9));
        assert_eq!(classify(&table, 0.6), (Verdict::Suspicious, 0.4));
    }

    #[test]
    fn test_judge_uses_strongest_signal() {
        let pairs = vec![pair("a.py", "b.py", 0.96)];
        let fixture = Evidence {
            candidate_id: "cand@main",
            reference_id: "ref@main",
            repo_score: 0.4,
            file_pairs: &pairs,
            commit_flags: &[],
        };
        let classifier = Classifier::new(VerdictTable::default(), 10);

        let (verdict, confidence, explanation) = classifier.judge(&fixture);

        assert_eq!(verdict, Verdict::PlagiarismConfirmed);
        assert_eq!(confidence, 0.95);
        assert!(explanation.contains("cand@main vs ref@main"));
        assert!(explanation.contains("1. a.py <-> b.py: 0.960 (plagiarism-confirmed)"));
    }

    #[test]
    fn test_commit_flags_raise_verdict() {
        let flags = vec![CommitFlag::IdenticalMessage {
            message: "fix off-by-one in parser".to_string(),
            confidence: 0.8,
        }];
        let fixture = Evidence {
            candidate_id: "c",
            reference_id: "r",
            repo_score: 0.2,
            file_pairs: &[],
            commit_flags: &flags,
        };

        let (verdict, _, explanation) = Classifier::new(VerdictTable::default(), 10).judge(&fixture);

        assert_eq!(verdict, Verdict::Suspicious);
        assert!(explanation.contains("identical message: \"fix off-by-one in parser\""));
    }

    #[test]
    fn test_explanation_truncates_to_top_n() {
        let pairs: Vec<FilePair> =
            (0..5).map(|i| pair(&format!("a{i}.py"), &format!("b{i}.py"), 0.8)).collect();
        let fixture = Evidence {
            candidate_id: "c",
            reference_id: "r",
            repo_score: 0.8,
            file_pairs: &pairs,
            commit_flags: &[],
        };

        let (_, _, actual) = Classifier::new(VerdictTable::default(), 2).judge(&fixture);

        assert!(actual.contains("Flagged file pairs: 5"));
        assert!(actual.contains("2. a1.py <-> b1.py"));
        assert!(!actual.contains("3. a2.py"));
        assert!(actual.contains("... and 3 more similar pairs"));
        assert!(actual.ends_with(Verdict::Suspicious.recommendation()));
    }
}
