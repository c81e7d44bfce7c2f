//! Repository source serving preloaded snapshots

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use plagiarism_domain::{
    Checkout, Language, RepoSpec, RepositorySnapshot, RepositorySource, SamplingConfig,
};
use tracing::debug;

/// Serves snapshots registered up front, applying the same sampling
/// bounds a real source would.
///
/// Fetches of unknown urls (or urls marked failing) return an error.
/// Every fetch and release is counted so callers can check cleanup.
#[derive(Default)]
pub struct InMemoryRepositorySource {
    snapshots: RwLock<HashMap<String, RepositorySnapshot>>,
    failing: RwLock<HashSet<String>>,
    delay: Option<Duration>,
    fetched: AtomicUsize,
    released: AtomicUsize,
}

impl InMemoryRepositorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a snapshot under its spec's url
    pub fn with_snapshot(self, snapshot: RepositorySnapshot) -> Self {
        if let Ok(mut snapshots) = self.snapshots.write() {
            snapshots.insert(snapshot.spec.url.clone(), snapshot);
        }
        self
    }

    /// Make every fetch of `url` fail
    pub fn with_failure(self, url: impl Into<String>) -> Self {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(url.into());
        }
        self
    }

    /// Sleep before serving each fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn is_failing(&self, url: &str) -> bool {
        self.failing.read().map(|f| f.contains(url)).unwrap_or(false)
    }
}

#[async_trait]
impl RepositorySource for InMemoryRepositorySource {
    async fn fetch(&self, spec: &RepoSpec) -> Result<Checkout> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.is_failing(&spec.url) {
            return Err(anyhow::anyhow!("Repository {} is unreachable", spec.url));
        }

        let known = self
            .snapshots
            .read()
            .map_err(|_| anyhow::anyhow!("Snapshot registry poisoned"))?
            .contains_key(&spec.url);
        if !known {
            return Err(anyhow::anyhow!("Repository {} not found", spec.url));
        }

        self.fetched.fetch_add(1, Ordering::SeqCst);
        debug!(repo = %spec.id(), "Served in-memory checkout");
        Ok(Checkout {
            spec: spec.clone(),
            branch: spec.branch.clone(),
            location: PathBuf::from(format!("memory://{}", spec.display_name())),
        })
    }

    async fn extract(
        &self,
        checkout: &Checkout,
        language: Language,
        sampling: &SamplingConfig,
    ) -> Result<RepositorySnapshot> {
        let snapshot = self
            .snapshots
            .read()
            .map_err(|_| anyhow::anyhow!("Snapshot registry poisoned"))?
            .get(&checkout.spec.url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Repository {} not found", checkout.spec.url))?;

        let files = snapshot
            .files
            .into_iter()
            .filter(|file| language.matches_path(&file.path))
            .filter(|file| sampling.admits(&file.path, file.size_bytes))
            .take(sampling.max_files_per_repo)
            .collect();

        let mut commits = snapshot.commits;
        commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        commits.truncate(sampling.max_commits);

        Ok(RepositorySnapshot::new(checkout.spec.clone())
            .with_files(files)
            .with_commits(commits))
    }

    async fn release(&self, checkout: Checkout) -> Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        debug!(location = %checkout.location.display(), "Released in-memory checkout");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use plagiarism_domain::{Commit, SourceFile};
    use pretty_assertions::assert_eq;

    use super::*;

    fn fixture_spec() -> RepoSpec {
        RepoSpec::new("https://example.com/repo", "main")
    }

    #[tokio::test]
    async fn test_extract_applies_sampling() {
        let files = (0..80)
            .map(|i| SourceFile::new(format!("src/m{i}.py"), "x = 1\n"))
            .chain([
                SourceFile::new("node_modules/lib.py", "x = 1\n"),
                SourceFile::new("README.md", "docs"),
            ])
            .collect();
        let source = InMemoryRepositorySource::new()
            .with_snapshot(RepositorySnapshot::new(fixture_spec()).with_files(files));
        let checkout = source.fetch(&fixture_spec()).await.unwrap();

        let actual = source
            .extract(&checkout, Language::Python, &SamplingConfig::default())
            .await
            .unwrap();

        assert_eq!(actual.files.len(), 50);
        assert!(actual.files.iter().all(|f| f.path.starts_with("src/")));
    }

    #[tokio::test]
    async fn test_extract_orders_and_caps_commits() {
        let now = Utc::now();
        let commits = (0..5)
            .map(|i| Commit::new(format!("c{i}"), "dev", "msg", now - ChronoDuration::hours(i)))
            .rev()
            .collect();
        let source = InMemoryRepositorySource::new()
            .with_snapshot(RepositorySnapshot::new(fixture_spec()).with_commits(commits));
        let checkout = source.fetch(&fixture_spec()).await.unwrap();
        let sampling = SamplingConfig::default().max_commits(3usize);

        let actual: Vec<_> = source
            .extract(&checkout, Language::Python, &sampling)
            .await
            .unwrap()
            .commits
            .into_iter()
            .map(|c| c.hash)
            .collect();
        let expected = vec!["c0", "c1", "c2"];

        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_failing_and_unknown_repositories() {
        let source = InMemoryRepositorySource::new()
            .with_snapshot(RepositorySnapshot::new(fixture_spec()))
            .with_failure("https://example.com/repo");

        assert!(source.fetch(&fixture_spec()).await.is_err());
        assert!(source.fetch(&RepoSpec::new("https://example.com/other", "main")).await.is_err());
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_release_is_counted() {
        let source = InMemoryRepositorySource::new()
            .with_snapshot(RepositorySnapshot::new(fixture_spec()));
        let checkout = source.fetch(&fixture_spec()).await.unwrap();

        source.release(checkout).await.unwrap();

        assert_eq!(source.fetch_count(), 1);
        assert_eq!(source.release_count(), 1);
    }
}
