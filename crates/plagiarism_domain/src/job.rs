//! Analysis jobs and their state machine

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;
use uuid::Uuid;

use crate::language::Language;
use crate::report::AnalysisReport;
use crate::repository::RepoSpec;

/// Smallest and largest number of reference repositories per job
pub const MIN_REFERENCES: usize = 2;
pub const MAX_REFERENCES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A submitted analysis request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRequest {
    #[serde(alias = "candidateRepo")]
    pub candidate_repo: Option<RepoSpec>,
    #[serde(alias = "referenceRepos", default)]
    pub reference_repos: Vec<RepoSpec>,
    pub language: String,
    pub threshold: f64,
}

/// A malformed request, rejected before a job exists
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid {field}: {message}")]
pub struct RequestValidationError {
    pub field: &'static str,
    pub message: String,
}

impl JobRequest {
    pub fn new(
        candidate: RepoSpec,
        references: Vec<RepoSpec>,
        language: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self {
            candidate_repo: Some(candidate),
            reference_repos: references,
            language: language.into(),
            threshold,
        }
    }

    /// Check the request and return the parsed candidate and language
    pub fn validate(&self) -> Result<(&RepoSpec, Language), RequestValidationError> {
        let candidate = self
            .candidate_repo
            .as_ref()
            .filter(|spec| !spec.url.trim().is_empty())
            .ok_or_else(|| RequestValidationError {
                field: "candidate_repo",
                message: "a candidate repository is required".to_string(),
            })?;

        let count = self.reference_repos.len();
        if !(MIN_REFERENCES..=MAX_REFERENCES).contains(&count) {
            return Err(RequestValidationError {
                field: "reference_repos",
                message: format!(
                    "expected between {MIN_REFERENCES} and {MAX_REFERENCES} references, got {count}"
                ),
            });
        }
        if let Some(blank) = self.reference_repos.iter().position(|r| r.url.trim().is_empty()) {
            return Err(RequestValidationError {
                field: "reference_repos",
                message: format!("reference {blank} has an empty url"),
            });
        }

        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(RequestValidationError {
                field: "threshold",
                message: format!("must be within [0, 1], got {}", self.threshold),
            });
        }

        let language = Language::from_str(&self.language).map_err(|_| RequestValidationError {
            field: "language",
            message: format!("unsupported language '{}'", self.language),
        })?;

        Ok((candidate, language))
    }
}

/// A mutation the orchestrator applies to a job record
#[derive(Debug, Clone)]
pub enum JobUpdate {
    Start,
    Progress(u8),
    Warn(String),
    Complete(Box<AnalysisReport>),
    Fail(String),
}

impl JobUpdate {
    fn target(&self) -> &'static str {
        match self {
            JobUpdate::Start => "running",
            JobUpdate::Progress(_) => "progress",
            JobUpdate::Warn(_) => "warning",
            JobUpdate::Complete(_) => "completed",
            JobUpdate::Fail(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("job {job_id} cannot apply '{update}' while {status}")]
pub struct JobTransitionError {
    pub job_id: JobId,
    pub status: JobStatus,
    pub update: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// 0..=100, non-decreasing until terminal
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub request: JobRequest,
    pub result: Option<AnalysisReport>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl Job {
    pub fn new(request: JobRequest) -> Self {
        Self {
            id: JobId::generate(),
            status: JobStatus::Queued,
            progress: 0,
            created_at: Utc::now(),
            request,
            result: None,
            error: None,
            warnings: Vec::new(),
        }
    }

    /// Apply an update, enforcing the queued → running → terminal order
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), JobTransitionError> {
        let rejected = JobTransitionError {
            job_id: self.id,
            status: self.status,
            update: update.target(),
        };

        match (self.status, update) {
            (JobStatus::Queued, JobUpdate::Start) => {
                self.status = JobStatus::Running;
            }
            (JobStatus::Running, JobUpdate::Progress(progress)) => {
                // regressions are ignored to keep progress monotonic
                self.progress = self.progress.max(progress.min(100));
            }
            (JobStatus::Running, JobUpdate::Warn(message)) => {
                self.warnings.push(message);
            }
            (JobStatus::Running, JobUpdate::Complete(report)) => {
                self.status = JobStatus::Completed;
                self.progress = 100;
                self.result = Some(*report);
            }
            (JobStatus::Queued | JobStatus::Running, JobUpdate::Fail(message)) => {
                self.status = JobStatus::Failed;
                self.error = Some(message);
            }
            _ => return Err(rejected),
        }

        Ok(())
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            status: self.status,
            progress: self.progress,
            created_at: self.created_at,
            candidate: self.request.candidate_repo.as_ref().map(RepoSpec::id),
        }
    }
}

/// Lightweight listing entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub candidate: Option<String>,
}
