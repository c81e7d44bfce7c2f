//! Job registry collaborator

use anyhow::Result;
use async_trait::async_trait;

use crate::job::{Job, JobId, JobSummary, JobUpdate};

/// Registry of analysis jobs with atomic per-id updates
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: Job) -> Result<()>;

    async fn get(&self, id: &JobId) -> Result<Option<Job>>;

    /// Apply `update` to one job under the store's lock.
    ///
    /// Returns `Ok(None)` when the id is unknown and an error wrapping
    /// [`crate::JobTransitionError`] when the transition is illegal.
    async fn update(&self, id: &JobId, update: JobUpdate) -> Result<Option<Job>>;

    /// All jobs, newest first
    async fn list(&self) -> Result<Vec<JobSummary>>;
}
