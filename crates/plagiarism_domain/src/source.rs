//! Repository access collaborator

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::SamplingConfig;
use crate::language::Language;
use crate::repository::{RepoSpec, RepositorySnapshot};

/// A fetched repository held by its source until released
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checkout {
    pub spec: RepoSpec,
    /// Branch actually checked out, after any fallback
    pub branch: String,
    pub location: PathBuf,
}

/// Fetches repositories and extracts bounded snapshots from them
///
/// Every successful `fetch` must be paired with exactly one `release`,
/// which frees whatever the checkout holds (temporary directories,
/// cached clones).
#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn fetch(&self, spec: &RepoSpec) -> Result<Checkout>;

    /// Sample files for `language` and read commits, most recent first
    async fn extract(
        &self,
        checkout: &Checkout,
        language: Language,
        sampling: &SamplingConfig,
    ) -> Result<RepositorySnapshot>;

    async fn release(&self, checkout: Checkout) -> Result<()>;
}
