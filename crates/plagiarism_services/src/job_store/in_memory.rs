//! In-memory job registry

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use plagiarism_domain::{Job, JobId, JobStore, JobSummary, JobUpdate};
use tokio::sync::RwLock;
use tracing::debug;

/// Job store backed by a map behind a single async lock
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(anyhow::anyhow!("Job {} already exists", job.id));
        }
        debug!(job_id = %job.id, "Registered job");
        jobs.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: &JobId) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn update(&self, id: &JobId, update: JobUpdate) -> Result<Option<Job>> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(id) else {
            return Ok(None);
        };
        job.apply(update)?;
        Ok(Some(job.clone()))
    }

    async fn list(&self) -> Result<Vec<JobSummary>> {
        let jobs = self.jobs.read().await;
        let mut summaries: Vec<_> = jobs.values().map(Job::summary).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use plagiarism_domain::{JobRequest, JobStatus, JobTransitionError, RepoSpec};
    use pretty_assertions::assert_eq;

    use super::*;

    fn fixture_job() -> Job {
        Job::new(JobRequest::new(
            RepoSpec::new("https://example.com/cand", "main"),
            vec![
                RepoSpec::new("https://example.com/a", "main"),
                RepoSpec::new("https://example.com/b", "main"),
            ],
            "python",
            0.7,
        ))
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryJobStore::new();
        let fixture = fixture_job();
        let id = fixture.id;

        store.insert(fixture.clone()).await.unwrap();

        let actual = store.get(&id).await.unwrap();
        let expected = Some(fixture);
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = InMemoryJobStore::new();
        let fixture = fixture_job();

        store.insert(fixture.clone()).await.unwrap();
        let actual = store.insert(fixture).await;

        assert!(actual.is_err());
    }

    #[tokio::test]
    async fn test_update_applies_transition() {
        let store = InMemoryJobStore::new();
        let fixture = fixture_job();
        let id = fixture.id;
        store.insert(fixture).await.unwrap();

        store.update(&id, JobUpdate::Start).await.unwrap();
        let actual = store.update(&id, JobUpdate::Progress(35)).await.unwrap().unwrap();

        assert_eq!(actual.status, JobStatus::Running);
        assert_eq!(actual.progress, 35);
    }

    #[tokio::test]
    async fn test_update_unknown_job() {
        let store = InMemoryJobStore::new();

        let actual = store.update(&JobId::generate(), JobUpdate::Start).await.unwrap();

        assert_eq!(actual, None);
    }

    #[tokio::test]
    async fn test_illegal_transition_keeps_record() {
        let store = InMemoryJobStore::new();
        let fixture = fixture_job();
        let id = fixture.id;
        store.insert(fixture).await.unwrap();
        store.update(&id, JobUpdate::Fail("clone failed".to_string())).await.unwrap();
        let before = store.get(&id).await.unwrap();

        let actual = store.update(&id, JobUpdate::Start).await.unwrap_err();

        assert!(actual.downcast_ref::<JobTransitionError>().is_some());
        assert_eq!(store.get(&id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_list_returns_summaries() {
        let store = InMemoryJobStore::new();
        store.insert(fixture_job()).await.unwrap();
        store.insert(fixture_job()).await.unwrap();

        let actual = store.list().await.unwrap();

        assert_eq!(actual.len(), 2);
        assert!(actual.iter().all(|s| s.status == JobStatus::Queued));
    }
}
