use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use plagiarism_detector::{Orchestrator, SimilarityEngine};
use plagiarism_domain::{
    AnalysisConfig, AnalysisReport, Commit, CommitFlag, ComparisonResult, Job, JobRequest,
    JobStatus, RepoSpec, RepositorySnapshot, SimilarityConfig, SourceFile, Verdict,
};
use plagiarism_services::{InMemoryJobStore, InMemoryRepositorySource};
use pretty_assertions::assert_eq;

const CANDIDATE: &str = "https://example.com/candidate";
const REFERENCE_A: &str = "https://example.com/reference-a";
const REFERENCE_B: &str = "https://example.com/reference-b";

const COPIED: &str = "\
def mean(values):
    total = 0
    for value in values:
        total += value
    return total / len(values)


def spread(values):
    low = min(values)
    high = max(values)
    return high - low
";

const UNRELATED: &str = "\
class Inventory:
    def __init__(self):
        self.items = {}

    def add(self, name, count):
        self.items[name] = self.items.get(name, 0) + count
        print(\"added\", name)
";

fn fixture_snapshot(url: &str, files: Vec<SourceFile>) -> RepositorySnapshot {
    RepositorySnapshot::new(RepoSpec::new(url, "main")).with_files(files)
}

fn fixture_source() -> InMemoryRepositorySource {
    let file = |path: &str, body: &str| vec![SourceFile::new(path, body)];
    InMemoryRepositorySource::new()
        .with_snapshot(fixture_snapshot(CANDIDATE, file("src/analytics.py", COPIED)))
        .with_snapshot(fixture_snapshot(REFERENCE_A, file("lib/helpers.py", COPIED)))
        .with_snapshot(fixture_snapshot(REFERENCE_B, file("app/inventory.py", UNRELATED)))
}

const SPREAD_DIFF: &str = "\
+++ b/analytics.py
+def spread(values):
+    low = min(values)
+    high = max(values)
+    return high - low
";

const MEAN_DIFF: &str = "\
+++ b/analytics.py
+def mean(values):
+    total = 0
+    for value in values:
+        total += value
+    return total / len(values)
";

fn fixture_commit(hash: &str, message: &str, diff: &str, age_hours: i64) -> Commit {
    let timestamp = DateTime::from_timestamp(1_714_550_400 - age_hours * 3600, 0).unwrap();
    Commit::new(hash, "dev", message, timestamp).diff_text(diff)
}

fn candidate_history() -> Vec<Commit> {
    vec![
        fixture_commit("c1", "add spread helper for value ranges", SPREAD_DIFF, 1),
        fixture_commit("c2", "compute mean of sample values", MEAN_DIFF, 2),
    ]
}

/// Reference A copies the candidate's files and history; reference B shares
/// one diff but neither files nor messages
fn history_source(reference_b_history: Vec<Commit>) -> InMemoryRepositorySource {
    let file = |path: &str, body: &str| vec![SourceFile::new(path, body)];
    InMemoryRepositorySource::new()
        .with_snapshot(
            fixture_snapshot(CANDIDATE, file("src/analytics.py", COPIED))
                .with_commits(candidate_history()),
        )
        .with_snapshot(
            fixture_snapshot(REFERENCE_A, file("lib/helpers.py", COPIED)).with_commits(vec![
                fixture_commit("r1", "add spread helper for value ranges", SPREAD_DIFF, 5),
                fixture_commit("r2", "compute the mean of sample values", MEAN_DIFF, 6),
            ]),
        )
        .with_snapshot(
            fixture_snapshot(REFERENCE_B, file("app/inventory.py", UNRELATED))
                .with_commits(reference_b_history),
        )
}

fn comparison_for<'a>(report: &'a AnalysisReport, url: &str) -> &'a ComparisonResult {
    let id = format!("{url}@main");
    report.comparisons.iter().find(|c| c.reference_id == id).unwrap()
}

fn diff_pairs(comparison: &ComparisonResult) -> Vec<(String, String)> {
    comparison
        .commit_flags
        .iter()
        .filter_map(|flag| match flag {
            CommitFlag::SimilarDiff { candidate_hash, reference_hash, .. } => {
                Some((candidate_hash.clone(), reference_hash.clone()))
            }
            _ => None,
        })
        .collect()
}

fn fixture_orchestrator(source: Arc<InMemoryRepositorySource>) -> Orchestrator {
    Orchestrator::new(
        Arc::new(InMemoryJobStore::new()),
        source,
        SimilarityEngine::new(&SimilarityConfig::default(), None),
        AnalysisConfig::default(),
    )
}

fn fixture_request() -> JobRequest {
    JobRequest::new(
        RepoSpec::new(CANDIDATE, "main"),
        vec![RepoSpec::new(REFERENCE_A, "main"), RepoSpec::new(REFERENCE_B, "main")],
        "python",
        0.75,
    )
}

#[tokio::test]
async fn test_copied_file_is_flagged() {
    let source = Arc::new(fixture_source());
    let orchestrator = fixture_orchestrator(source.clone());

    let actual = orchestrator.run_to_completion(fixture_request()).await.unwrap();

    assert_eq!(actual.status, JobStatus::Completed);
    assert_eq!(actual.progress, 100);
    let report = actual.result.unwrap();
    assert_eq!(report.comparisons.len(), 2);
    assert_eq!(report.summary.total_references, 2);
    assert_eq!(report.summary.skipped_references, 0);

    let copied = report
        .comparisons
        .iter()
        .find(|c| c.reference_id == format!("{REFERENCE_A}@main"))
        .unwrap();
    let top = copied.file_pairs.first().unwrap();
    assert_eq!(top.file_a, "src/analytics.py");
    assert_eq!(top.file_b, "lib/helpers.py");
    assert_eq!(top.value, 1.0);
    assert_eq!(copied.repo_score, 1.0);
    assert!(copied.verdict.is_suspicious());
    assert_eq!(report.repository_matrix.repos[0], format!("{CANDIDATE}@main"));
}

#[tokio::test]
async fn test_failing_reference_is_skipped_with_warning() {
    let source = Arc::new(fixture_source().with_failure(REFERENCE_B));
    let orchestrator = fixture_orchestrator(source.clone());

    let actual = orchestrator.run_to_completion(fixture_request()).await.unwrap();

    assert_eq!(actual.status, JobStatus::Completed);
    assert_eq!(actual.warnings.len(), 1);
    assert!(actual.warnings[0].contains(REFERENCE_B));

    let report = actual.result.unwrap();
    let compared: Vec<_> = report.comparisons.iter().map(|c| c.reference_id.clone()).collect();
    assert_eq!(compared, vec![format!("{REFERENCE_A}@main")]);
    assert_eq!(report.summary.skipped_references, 1);
    assert_eq!(report.warnings, actual.warnings);
}

#[tokio::test]
async fn test_every_checkout_is_released() {
    let fixtures = vec![
        fixture_source(),
        fixture_source().with_failure(REFERENCE_A),
        fixture_source().with_failure(CANDIDATE),
    ];

    for fixture in fixtures {
        let source = Arc::new(fixture);
        let orchestrator = fixture_orchestrator(source.clone());

        orchestrator.run_to_completion(fixture_request()).await.unwrap();

        assert_eq!(source.release_count(), source.fetch_count());
    }
}

#[tokio::test]
async fn test_candidate_failure_fails_job() {
    let source = Arc::new(fixture_source().with_failure(CANDIDATE));
    let orchestrator = fixture_orchestrator(source.clone());

    let actual = orchestrator.run_to_completion(fixture_request()).await.unwrap();

    assert_eq!(actual.status, JobStatus::Failed);
    assert!(actual.error.unwrap().contains(CANDIDATE));
    assert_eq!(actual.result, None);
}

#[tokio::test]
async fn test_invalid_request_creates_no_job() {
    let orchestrator = fixture_orchestrator(Arc::new(fixture_source()));
    let mut fixture = fixture_request();
    fixture.reference_repos.truncate(1);

    let actual = orchestrator.run_to_completion(fixture).await.unwrap_err();

    assert_eq!(actual.error_code(), "VALIDATION_ERROR");
    assert!(orchestrator.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_candidate_without_sources_is_clean() {
    let source = Arc::new(fixture_source().with_snapshot(fixture_snapshot(
        CANDIDATE,
        vec![SourceFile::new("README.md", "# nothing to compare")],
    )));
    let orchestrator = fixture_orchestrator(source);

    let actual = orchestrator.run_to_completion(fixture_request()).await.unwrap();

    assert_eq!(actual.status, JobStatus::Completed);
    let report = actual.result.unwrap();
    for comparison in &report.comparisons {
        assert_eq!(comparison.repo_score, 0.0);
        assert!(comparison.file_pairs.is_empty());
        assert_eq!(comparison.verdict, Verdict::Clean);
    }
    assert_eq!(report.summary.total_file_pairs_compared, 0);
    assert_eq!(report.summary.suspicious_pairs, 0);
}

#[tokio::test]
async fn test_progress_is_monotone_and_terminal_state_is_stable() {
    let source = Arc::new(fixture_source().with_delay(Duration::from_millis(30)));
    let orchestrator = fixture_orchestrator(source);

    let id = orchestrator.submit(fixture_request()).await.unwrap();

    let mut observed = Vec::new();
    let mut last: Option<Job> = None;
    for _ in 0..500 {
        let job = orchestrator.get(&id).await.unwrap();
        observed.push(job.progress);
        let done = job.status.is_terminal();
        last = Some(job);
        if done {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let last = last.unwrap();
    assert_eq!(last.status, JobStatus::Completed);
    assert!(observed.windows(2).all(|w| w[0] <= w[1]), "Progress: {:?}", observed);
    assert_eq!(observed.last(), Some(&100));

    let repolled = orchestrator.get(&id).await.unwrap();
    assert_eq!(repolled, last);
}

#[tokio::test]
async fn test_commit_history_evidence() {
    let reference_b_history =
        vec![fixture_commit("b1", "track inventory counts per item", SPREAD_DIFF, 3)];
    let orchestrator = fixture_orchestrator(Arc::new(history_source(reference_b_history)));

    let actual = orchestrator.run_to_completion(fixture_request()).await.unwrap();

    let report = actual.result.unwrap();
    let copied = comparison_for(&report, REFERENCE_A);
    let pairs = diff_pairs(copied);
    assert!(pairs.contains(&("c1".to_string(), "r1".to_string())), "Pairs: {:?}", pairs);
    assert!(pairs.contains(&("c2".to_string(), "r2".to_string())), "Pairs: {:?}", pairs);
    assert!(copied.commit_flags.contains(&CommitFlag::IdenticalMessage {
        message: "add spread helper for value ranges".to_string(),
        confidence: 0.8,
    }));
    assert!(copied.commit_flags.iter().any(|flag| matches!(
        flag,
        CommitFlag::SimilarMessage { reference_message, .. }
            if reference_message == "compute the mean of sample values"
    )));

    let clean = comparison_for(&report, REFERENCE_B);
    assert_eq!(diff_pairs(clean), Vec::<(String, String)>::new());
    assert!(clean.commit_flags.is_empty(), "Flags: {:?}", clean.commit_flags);
    assert_eq!(clean.verdict, Verdict::Clean);
}

#[tokio::test]
async fn test_identical_message_raises_verdict() {
    let reference_b_history =
        vec![fixture_commit("b1", "compute mean of sample values", SPREAD_DIFF, 3)];
    let orchestrator = fixture_orchestrator(Arc::new(history_source(reference_b_history)));

    let actual = orchestrator.run_to_completion(fixture_request()).await.unwrap();

    let report = actual.result.unwrap();
    let flagged = comparison_for(&report, REFERENCE_B);
    let expected = vec![CommitFlag::IdenticalMessage {
        message: "compute mean of sample values".to_string(),
        confidence: 0.8,
    }];
    assert_eq!(flagged.commit_flags, expected);
    assert!(flagged.file_pairs.is_empty());
    assert_eq!(flagged.verdict, Verdict::Suspicious);
    assert!(report.suspicious().iter().any(|c| c.reference_id == flagged.reference_id));
}
