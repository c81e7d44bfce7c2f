//! Git-backed repository source
//!
//! Clones into temporary directories owned by the source until `release`,
//! samples files with the `ignore` walker and reads history with `git log`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use plagiarism_domain::{
    Checkout, Commit, CommitStats, Language, RepoSpec, RepositorySnapshot, RepositorySource,
    SamplingConfig, SourceFile,
};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

const RECORD_SEPARATOR: char = '\x1e';
const FIELD_SEPARATOR: char = '\x1f';
const FALLBACK_BRANCH: &str = "master";

/// Shallow-clones repositories with the system `git` binary
pub struct GitRepositorySource {
    clone_depth: usize,
    fetch_timeout: Duration,
    /// Most recent commits whose patch text is read
    patch_commits: usize,
    checkouts: Mutex<HashMap<PathBuf, TempDir>>,
}

impl GitRepositorySource {
    pub fn new(clone_depth: usize, fetch_timeout: Duration, patch_commits: usize) -> Self {
        Self {
            clone_depth: clone_depth.max(1),
            fetch_timeout,
            patch_commits,
            checkouts: Mutex::new(HashMap::new()),
        }
    }

    /// Depth and timeout from the sampling section
    pub fn from_config(sampling: &SamplingConfig, patch_commits: usize) -> Self {
        Self::new(
            sampling.max_commits,
            Duration::from_secs(sampling.fetch_timeout_secs),
            patch_commits,
        )
    }

    /// Checkouts fetched and not yet released
    pub fn active_checkouts(&self) -> usize {
        self.checkouts.lock().map(|c| c.len()).unwrap_or(0)
    }

    async fn clone_branch(&self, url: &str, branch: &str, target: &Path) -> Result<()> {
        let depth = format!("--depth={}", self.clone_depth);
        let target = target.to_string_lossy();
        let args: [&str; 8] =
            ["clone", "--quiet", "--single-branch", &depth, "--branch", branch, url, &target];

        run_git(None, &args).await.map(|_| ())
    }

    /// Clone the requested branch, retrying once with `master`; returns the
    /// branch that was checked out
    async fn clone_with_fallback(&self, spec: &RepoSpec, location: &Path) -> Result<String> {
        match self.clone_branch(&spec.url, &spec.branch, location).await {
            Ok(()) => Ok(spec.branch.clone()),
            Err(error) if spec.branch != FALLBACK_BRANCH => {
                warn!(repo = %spec.url, branch = %spec.branch, error = %error, "Clone failed, retrying with {FALLBACK_BRANCH}");
                if let Err(error) = tokio::fs::remove_dir_all(location).await {
                    if error.kind() != std::io::ErrorKind::NotFound {
                        debug!(path = %location.display(), error = %error, "Could not clear partial clone");
                    }
                }
                self.clone_branch(&spec.url, FALLBACK_BRANCH, location)
                    .await
                    .with_context(|| format!("Failed to clone {}", spec.url))?;
                Ok(FALLBACK_BRANCH.to_string())
            }
            Err(error) => Err(error.context(format!("Failed to clone {}", spec.url))),
        }
    }
}

impl Default for GitRepositorySource {
    fn default() -> Self {
        Self::from_config(&SamplingConfig::default(), 20)
    }
}

async fn run_git(dir: Option<&Path>, args: &[&str]) -> Result<String> {
    let mut command = Command::new("git");
    if let Some(dir) = dir {
        command.arg("-C").arg(dir);
    }
    let output = command
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .context("Failed to run git")?;

    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.first().unwrap_or(&""),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait]
impl RepositorySource for GitRepositorySource {
    async fn fetch(&self, spec: &RepoSpec) -> Result<Checkout> {
        let dir = tempfile::Builder::new()
            .prefix("plagiarism-")
            .tempdir()
            .context("Failed to create checkout directory")?;
        let location = dir.path().join("repo");

        info!("📥 Cloning {} ({})", spec.url, spec.branch);
        let branch =
            tokio::time::timeout(self.fetch_timeout, self.clone_with_fallback(spec, &location))
                .await
                .map_err(|_| {
                    anyhow!("git clone of {} timed out after {:?}", spec.url, self.fetch_timeout)
                })??;

        self.checkouts
            .lock()
            .map_err(|_| anyhow!("Checkout registry poisoned"))?
            .insert(location.clone(), dir);

        Ok(Checkout { spec: spec.clone(), branch, location })
    }

    async fn extract(
        &self,
        checkout: &Checkout,
        language: Language,
        sampling: &SamplingConfig,
    ) -> Result<RepositorySnapshot> {
        let root = checkout.location.clone();
        let walk_sampling = sampling.clone();
        let files =
            tokio::task::spawn_blocking(move || sample_files(&root, language, &walk_sampling))
                .await
                .context("File sampling task panicked")??;

        let commits = match read_commits(&checkout.location, sampling.max_commits, self.patch_commits)
            .await
        {
            Ok(commits) => commits,
            Err(error) => {
                warn!(repo = %checkout.spec.id(), error = %error, "Could not read commit history");
                Vec::new()
            }
        };

        debug!(
            repo = %checkout.spec.id(),
            files = files.len(),
            commits = commits.len(),
            "Extracted repository snapshot"
        );
        Ok(RepositorySnapshot::new(checkout.spec.clone()).with_files(files).with_commits(commits))
    }

    async fn release(&self, checkout: Checkout) -> Result<()> {
        let dir = self
            .checkouts
            .lock()
            .map_err(|_| anyhow!("Checkout registry poisoned"))?
            .remove(&checkout.location)
            .ok_or_else(|| anyhow!("Unknown checkout {}", checkout.location.display()))?;

        dir.close()
            .with_context(|| format!("Failed to remove checkout of {}", checkout.spec.id()))
    }
}

/// Walk `root` and read up to `max_files_per_repo` admissible source files,
/// in path order
pub fn sample_files(
    root: &Path,
    language: Language,
    sampling: &SamplingConfig,
) -> Result<Vec<SourceFile>> {
    let skip_dirs = sampling.skip_dirs.clone();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            entry.depth() == 0
                || entry.file_name().to_str().map(|name| !skip_dirs.contains(name)).unwrap_or(true)
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        if files.len() >= sampling.max_files_per_repo {
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                debug!(error = %error, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let relative = relative_path(root, entry.path());
        if !language.matches_path(&relative) {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX);
        if !sampling.admits(&relative, size) {
            debug!("🚫 Ignoring {} ({} bytes)", relative, size);
            continue;
        }

        match std::fs::read_to_string(entry.path()) {
            Ok(text) => files.push(SourceFile::new(relative, text)),
            Err(error) => debug!(path = %relative, error = %error, "Skipping non-text file"),
        }
    }

    Ok(files)
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

async fn read_commits(
    location: &Path,
    max_commits: usize,
    patch_commits: usize,
) -> Result<Vec<Commit>> {
    if max_commits == 0 {
        return Ok(Vec::new());
    }

    let limit = format!("--max-count={max_commits}");
    let format = format!(
        "--pretty=format:{RECORD_SEPARATOR}%H{FIELD_SEPARATOR}%an{FIELD_SEPARATOR}%aI{FIELD_SEPARATOR}%s"
    );
    let log = run_git(Some(location), &["log", limit.as_str(), format.as_str(), "--numstat"]).await?;
    let mut commits = parse_numstat_log(&log);

    let patch_commits = patch_commits.min(max_commits);
    if patch_commits > 0 {
        let limit = format!("--max-count={patch_commits}");
        let format = format!("--pretty=format:{RECORD_SEPARATOR}%H");
        let patches = run_git(Some(location), &["log", limit.as_str(), format.as_str(), "--patch"]).await?;
        let mut patches = parse_patch_log(&patches);
        for commit in &mut commits {
            commit.diff_text = patches.remove(&commit.hash);
        }
    }

    Ok(commits)
}

/// Parse `git log --numstat` records into commits, keeping git's order
pub fn parse_numstat_log(log: &str) -> Vec<Commit> {
    log.split(RECORD_SEPARATOR)
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let mut lines = record.lines();
            let header: Vec<&str> = lines.next()?.split(FIELD_SEPARATOR).collect();
            let [hash, author, date, subject] = header.as_slice() else {
                return None;
            };

            let timestamp = DateTime::parse_from_rfc3339(date)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_default();

            let mut stats = CommitStats::default();
            for line in lines {
                let mut parts = line.splitn(3, '\t');
                let (Some(added), Some(removed), Some(_)) = (parts.next(), parts.next(), parts.next())
                else {
                    continue;
                };
                stats.files_changed += 1;
                stats.insertions += added.parse::<u32>().unwrap_or(0);
                stats.deletions += removed.parse::<u32>().unwrap_or(0);
            }

            Some(Commit::new(*hash, *author, *subject, timestamp).stats(stats))
        })
        .collect()
}

/// Parse `git log --patch` records into `hash → diff text`
pub fn parse_patch_log(log: &str) -> HashMap<String, String> {
    log.split(RECORD_SEPARATOR)
        .filter_map(|record| {
            let (hash, diff) = record.split_once('\n').unwrap_or((record, ""));
            let hash = hash.trim();
            (!hash.is_empty()).then(|| (hash.to_string(), diff.trim_start().to_string()))
        })
        .collect()
}
