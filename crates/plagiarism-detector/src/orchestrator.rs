//! Job orchestration: runs the analysis pipeline for each submitted job
//!
//! Each job runs in its own task through sequential stages, reporting
//! progress to the job store as it goes:
//!
//! | stage                     | progress |
//! |---------------------------|----------|
//! | fetch repositories        | 0 – 20   |
//! | extract files and commits | 20 – 40  |
//! | normalize sources         | 40 – 60  |
//! | score file pairs          | 60 – 75  |
//! | commits and verdicts      | 75 – 95  |
//! | assemble report           | 95 – 100 |
//!
//! A reference repository that cannot be fetched or extracted is skipped
//! with a warning. A failing candidate fails the job. Every checkout is
//! released once extraction is over, whatever its outcome.

use std::sync::Arc;
use std::time::Instant;

use plagiarism_domain::{
    AnalysisConfig, AnalysisReport, Checkout, CommitFlag, ComparisonResult, FilePair, Job, JobId,
    JobRequest, JobStore, JobSummary, JobUpdate, Language, RepoSpec, RepositorySnapshot,
    RepositorySource, ReportParameters, SourceFile,
};
use tracing::{error, info, warn};

use crate::aggregator;
use crate::classifier::{Classifier, Evidence};
use crate::errors::{DetectorError, Result};
use crate::normalizer;
use crate::report;
use crate::similarity::SimilarityEngine;
use crate::{log_stage_error, log_stage_start, log_stage_success};

/// Progress at the end of each stage
mod progress {
    pub const FETCHED: u8 = 20;
    pub const EXTRACTED: u8 = 40;
    pub const NORMALIZED: u8 = 60;
    pub const SCORED: u8 = 75;
    pub const JUDGED: u8 = 95;

    /// `start + (end - start) * done / total`
    pub fn within(start: u8, end: u8, done: usize, total: usize) -> u8 {
        if total == 0 {
            return end;
        }
        let span = usize::from(end - start);
        start + (span * done.min(total) / total) as u8
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    source: Arc<dyn RepositorySource>,
    engine: Arc<SimilarityEngine>,
    config: Arc<AnalysisConfig>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        source: Arc<dyn RepositorySource>,
        engine: SimilarityEngine,
        config: AnalysisConfig,
    ) -> Self {
        Self { store, source, engine: Arc::new(engine), config: Arc::new(config) }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.engine.backend_name()
    }

    /// Validate and enqueue a job, then run it in the background
    pub async fn submit(&self, request: JobRequest) -> Result<JobId> {
        let id = self.enqueue(request).await?;

        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.run(id).await });

        Ok(id)
    }

    /// Validate, enqueue and run a job on the current task
    pub async fn run_to_completion(&self, request: JobRequest) -> Result<Job> {
        let id = self.enqueue(request).await?;
        self.run(id).await;
        self.get(&id).await
    }

    pub async fn get(&self, id: &JobId) -> Result<Job> {
        self.store.get(id).await?.ok_or_else(|| DetectorError::job_not_found(id))
    }

    pub async fn list(&self) -> Result<Vec<JobSummary>> {
        Ok(self.store.list().await?)
    }

    async fn enqueue(&self, request: JobRequest) -> Result<JobId> {
        request.validate()?;

        let job = Job::new(request);
        let id = job.id;
        self.store.insert(job).await?;

        metrics::counter!("detector_jobs_submitted_total").increment(1);
        info!(job_id = %id, "📝 Job queued");
        Ok(id)
    }

    /// Drive one job to a terminal state; never panics the caller
    async fn run(&self, id: JobId) {
        let started = Instant::now();

        let update = match self.execute(id).await {
            Ok(report) => {
                metrics::counter!("detector_jobs_completed_total").increment(1);
                info!(
                    job_id = %id,
                    comparisons = report.comparisons.len(),
                    suspicious = report.summary.suspicious_pairs,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "✅ Job completed"
                );
                JobUpdate::Complete(Box::new(report))
            }
            Err(e) => {
                metrics::counter!("detector_jobs_failed_total").increment(1);
                error!(job_id = %id, error = %e, code = e.error_code(), "❌ Job failed");
                JobUpdate::Fail(e.to_string())
            }
        };

        if let Err(e) = self.store.update(&id, update).await {
            error!(job_id = %id, error = %e, "Failed to record job outcome");
        }
    }

    async fn apply(&self, id: JobId, update: JobUpdate) -> Result<()> {
        self.store
            .update(&id, update)
            .await?
            .map(|_| ())
            .ok_or_else(|| DetectorError::job_not_found(id))
    }

    async fn progress(&self, id: JobId, value: u8) -> Result<()> {
        self.apply(id, JobUpdate::Progress(value)).await
    }

    async fn skip_reference(&self, id: JobId, spec: &RepoSpec, error: &anyhow::Error) -> Result<()> {
        let message = format!("Skipped reference {}: {error:#}", spec.id());
        warn!(job_id = %id, repo = %spec.id(), error = %error, "⚠️  Skipping reference repository");
        metrics::counter!("detector_references_skipped_total").increment(1);
        self.apply(id, JobUpdate::Warn(message)).await
    }

    async fn execute(&self, id: JobId) -> Result<AnalysisReport> {
        let job = self.get(&id).await?;
        self.apply(id, JobUpdate::Start).await?;

        let request = job.request;
        let (candidate, language) = request.validate()?;
        let candidate = candidate.clone();

        let checkouts = self.fetch_all(id, &candidate, &request.reference_repos).await?;
        let extracted = self.extract_all(id, &checkouts, language).await;
        self.release_all(id, checkouts).await;
        let mut snapshots = extracted?;

        let stage = Instant::now();
        log_stage_start!("normalize", id);
        let total = snapshots.len();
        for (done, snapshot) in snapshots.iter_mut().enumerate() {
            let files = std::mem::take(&mut snapshot.files);
            snapshot.files = normalizer::prepare_files(files, language, &self.config.normalization);
            self.progress(
                id,
                progress::within(progress::EXTRACTED, progress::NORMALIZED, done + 1, total),
            )
            .await?;
        }
        log_stage_success!("normalize", id, stage.elapsed());

        if snapshots.is_empty() {
            return Err(DetectorError::internal_error("Candidate snapshot missing"));
        }
        let references = snapshots.split_off(1);
        let candidate_snapshot = snapshots.remove(0);

        let comparisons =
            self.compare_all(id, &candidate_snapshot, &references, request.threshold).await?;

        let parameters = ReportParameters {
            candidate_repo: candidate.id(),
            reference_repos: request.reference_repos.iter().map(RepoSpec::id).collect(),
            language,
            threshold: request.threshold,
        };
        let warnings = self.get(&id).await?.warnings;
        let report = report::assemble(id, parameters, comparisons, warnings);
        self.progress(id, progress::JUDGED).await?;

        Ok(report)
    }

    /// Fetch the candidate, then every reference, skipping references that fail
    async fn fetch_all(
        &self,
        id: JobId,
        candidate: &RepoSpec,
        references: &[RepoSpec],
    ) -> Result<Vec<Checkout>> {
        let stage = Instant::now();
        log_stage_start!("fetch", id, repos = references.len() + 1);

        let candidate_checkout = match self.source.fetch(candidate).await {
            Ok(checkout) => checkout,
            Err(e) => {
                log_stage_error!("fetch", id, e, repo = candidate.id());
                return Err(DetectorError::ingestion_error_with_source(candidate.id(), e));
            }
        };
        let mut checkouts = vec![candidate_checkout];

        if let Err(e) = self.fetch_references(id, references, &mut checkouts).await {
            self.release_all(id, checkouts).await;
            return Err(e);
        }

        log_stage_success!("fetch", id, stage.elapsed(), fetched = checkouts.len());
        Ok(checkouts)
    }

    async fn fetch_references(
        &self,
        id: JobId,
        references: &[RepoSpec],
        checkouts: &mut Vec<Checkout>,
    ) -> Result<()> {
        let total = references.len() + 1;
        self.progress(id, progress::within(0, progress::FETCHED, 1, total)).await?;

        for (index, spec) in references.iter().enumerate() {
            match self.source.fetch(spec).await {
                Ok(checkout) => checkouts.push(checkout),
                Err(e) => self.skip_reference(id, spec, &e).await?,
            }
            self.progress(id, progress::within(0, progress::FETCHED, index + 2, total)).await?;
        }
        Ok(())
    }

    /// Extract every checkout; the first entry is the candidate
    async fn extract_all(
        &self,
        id: JobId,
        checkouts: &[Checkout],
        language: Language,
    ) -> Result<Vec<RepositorySnapshot>> {
        let stage = Instant::now();
        log_stage_start!("extract", id, repos = checkouts.len());
        let total = checkouts.len();
        let mut extracted = Vec::with_capacity(total);

        for (index, checkout) in checkouts.iter().enumerate() {
            match self.source.extract(checkout, language, &self.config.sampling).await {
                Ok(snapshot) => extracted.push(snapshot),
                Err(e) if index == 0 => {
                    log_stage_error!("extract", id, e, repo = checkout.spec.id());
                    return Err(DetectorError::ingestion_error_with_source(checkout.spec.id(), e));
                }
                Err(e) => self.skip_reference(id, &checkout.spec, &e).await?,
            }
            self.progress(
                id,
                progress::within(progress::FETCHED, progress::EXTRACTED, index + 1, total),
            )
            .await?;
        }

        log_stage_success!("extract", id, stage.elapsed(), extracted = extracted.len());
        Ok(extracted)
    }

    async fn release_all(&self, id: JobId, checkouts: Vec<Checkout>) {
        let releases = checkouts.into_iter().map(|checkout| async move {
            let repo = checkout.spec.id();
            (repo, self.source.release(checkout).await)
        });

        for (repo, outcome) in futures::future::join_all(releases).await {
            if let Err(e) = outcome {
                warn!(job_id = %id, repo = %repo, error = %e, "Failed to release checkout");
            }
        }
    }

    async fn compare_all(
        &self,
        id: JobId,
        candidate: &RepositorySnapshot,
        references: &[RepositorySnapshot],
        threshold: f64,
    ) -> Result<Vec<ComparisonResult>> {
        let stage = Instant::now();
        log_stage_start!(
            "compare",
            id,
            references = references.len(),
            backend = self.engine.backend_name()
        );
        let total = references.len();

        let mut scored = Vec::with_capacity(total);
        for (index, reference) in references.iter().enumerate() {
            scored.push(self.score_files(candidate, reference, threshold).await);
            self.progress(
                id,
                progress::within(progress::NORMALIZED, progress::SCORED, index + 1, total),
            )
            .await?;
        }

        let classifier = Classifier::new(self.config.verdicts.clone(), self.config.explanation_top_n);
        let mut comparisons = Vec::with_capacity(total);
        for (index, (reference, files)) in references.iter().zip(scored).enumerate() {
            comparisons.push(self.judge(&classifier, candidate, reference, files).await);
            self.progress(
                id,
                progress::within(progress::SCORED, progress::JUDGED, index + 1, total),
            )
            .await?;
        }

        log_stage_success!("compare", id, stage.elapsed(), comparisons = comparisons.len());
        Ok(comparisons)
    }

    async fn score_files(
        &self,
        candidate: &RepositorySnapshot,
        reference: &RepositorySnapshot,
        threshold: f64,
    ) -> FileScores {
        let documents: Vec<String> = candidate
            .files
            .iter()
            .chain(&reference.files)
            .map(|file| file.normalized_text.clone())
            .collect();

        let matrix = self.engine.compute_matrix(&documents).await;
        let block = aggregator::cross_block(&matrix, candidate.files.len());

        FileScores {
            pairs: aggregator::flagged_pairs(
                &block,
                &candidate.files,
                &reference.files,
                threshold,
                &self.config.thresholds,
                &self.config.verdicts,
            ),
            repo_score: aggregator::repo_score(&block, self.config.repo_aggregation),
            files_compared: candidate.files.len() * reference.files.len(),
        }
    }

    async fn judge(
        &self,
        classifier: &Classifier,
        candidate: &RepositorySnapshot,
        reference: &RepositorySnapshot,
        files: FileScores,
    ) -> ComparisonResult {
        let thresholds = &self.config.thresholds;

        let mut commit_flags = aggregator::message_flags(
            &candidate.commits,
            &reference.commits,
            &self.config.commit_filter,
            thresholds,
        );

        let already_suspicious = thresholds.passes(files.repo_score, thresholds.repo)
            || files.pairs.iter().any(|pair| pair.verdict.is_suspicious());
        if self.config.commit_diff.enabled && already_suspicious {
            commit_flags.extend(self.diff_flags(candidate, reference).await);
        }
        commit_flags.extend(aggregator::large_commit_flags(
            &candidate.commits,
            self.config.large_commit_lines,
        ));

        let candidate_id = candidate.id();
        let reference_id = reference.id();
        let (verdict, confidence, explanation) = classifier.judge(&Evidence {
            candidate_id: &candidate_id,
            reference_id: &reference_id,
            repo_score: files.repo_score,
            file_pairs: &files.pairs,
            commit_flags: &commit_flags,
        });

        let top_pair_diff = files
            .pairs
            .first()
            .and_then(|pair| {
                let a = find_file(&candidate.files, &pair.file_a)?;
                let b = find_file(&reference.files, &pair.file_b)?;
                Some(report::line_diff(&a.raw_text, &b.raw_text, self.config.max_diff_lines))
            })
            .unwrap_or_default();

        ComparisonResult {
            candidate_id,
            reference_id,
            file_pairs: files.pairs,
            files_compared: files.files_compared,
            repo_score: files.repo_score,
            commit_flags,
            verdict,
            confidence,
            explanation,
            top_pair_diff,
        }
    }

    async fn diff_flags(
        &self,
        candidate: &RepositorySnapshot,
        reference: &RepositorySnapshot,
    ) -> Vec<CommitFlag> {
        let candidate_diffs = aggregator::diff_documents(&candidate.commits, &self.config.commit_diff);
        let reference_diffs = aggregator::diff_documents(&reference.commits, &self.config.commit_diff);
        if candidate_diffs.is_empty() || reference_diffs.is_empty() {
            return Vec::new();
        }

        let documents: Vec<String> = candidate_diffs
            .iter()
            .chain(&reference_diffs)
            .map(|(_, text)| text.clone())
            .collect();
        let matrix = self.engine.compute_matrix(&documents).await;
        let block = aggregator::cross_block(&matrix, candidate_diffs.len());

        let hashes = |diffs: &[(String, String)]| diffs.iter().map(|(h, _)| h.clone()).collect::<Vec<_>>();
        aggregator::diff_flags(
            &block,
            &hashes(&candidate_diffs),
            &hashes(&reference_diffs),
            &self.config.thresholds,
        )
    }
}

struct FileScores {
    pairs: Vec<FilePair>,
    repo_score: f64,
    files_compared: usize,
}

fn find_file<'a>(files: &'a [SourceFile], path: &str) -> Option<&'a SourceFile> {
    files.iter().find(|file| file.path == path)
}
