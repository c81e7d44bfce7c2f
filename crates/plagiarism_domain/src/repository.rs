//! Repository snapshots: the files and commits extracted for one job

use chrono::{DateTime, Utc};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// Location of a repository to analyze
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RepoSpec {
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

impl RepoSpec {
    pub fn new(url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self { url: url.into(), branch: branch.into() }
    }

    /// Identifier used throughout reports: `url@branch`
    pub fn id(&self) -> String {
        format!("{}@{}", self.url, self.branch)
    }

    /// Short display name (last path segment without `.git`)
    pub fn display_name(&self) -> String {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.url)
            .trim_end_matches(".git")
            .to_string()
    }
}

/// A source file sampled from a repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Setters)]
#[setters(strip_option, into)]
pub struct SourceFile {
    /// Path relative to the repository root
    pub path: String,
    pub raw_text: String,
    /// Filled in by the preprocessing stage
    pub normalized_text: String,
    pub size_bytes: u64,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let size_bytes = raw_text.len() as u64;
        Self { path: path.into(), raw_text, normalized_text: String::new(), size_bytes }
    }
}

/// Line statistics of a single commit
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitStats {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

impl CommitStats {
    pub fn total_lines(&self) -> u32 {
        self.insertions + self.deletions
    }
}

/// A commit extracted once per job; the single canonical commit shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Setters)]
#[setters(strip_option, into)]
pub struct Commit {
    pub hash: String,
    pub author: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Unified diff text, only present when the source extracted patches
    pub diff_text: Option<String>,
    pub stats: CommitStats,
}

impl Commit {
    pub fn new(
        hash: impl Into<String>,
        author: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            hash: hash.into(),
            author: author.into(),
            message: message.into(),
            timestamp,
            diff_text: None,
            stats: CommitStats::default(),
        }
    }

    /// Added and removed lines of the diff, without the `+++`/`---` headers
    pub fn changed_lines(&self, max_lines: usize) -> Vec<&str> {
        self.diff_text
            .as_deref()
            .map(|diff| {
                diff.lines()
                    .filter(|line| {
                        (line.starts_with('+') || line.starts_with('-'))
                            && !line.starts_with("+++")
                            && !line.starts_with("---")
                    })
                    .take(max_lines)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Files and commits of one repository, bounded by the sampling config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositorySnapshot {
    pub spec: RepoSpec,
    pub files: Vec<SourceFile>,
    /// Most recent first
    pub commits: Vec<Commit>,
}

impl RepositorySnapshot {
    pub fn new(spec: RepoSpec) -> Self {
        Self { spec, files: Vec::new(), commits: Vec::new() }
    }

    pub fn id(&self) -> String {
        self.spec.id()
    }

    pub fn with_files(mut self, files: Vec<SourceFile>) -> Self {
        self.files = files;
        self
    }

    pub fn with_commits(mut self, commits: Vec<Commit>) -> Self {
        self.commits = commits;
        self
    }
}
