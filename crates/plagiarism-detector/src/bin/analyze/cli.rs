use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use plagiarism_domain::RepoSpec;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug-level, pretty logs with source locations
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub enum Commands {
    /// Compare a candidate repository against reference repositories
    Analyze(AnalyzeArgs),
}

/// Similarity backend selectable from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Lexical,
    Semantic,
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Candidate repository, as URL or URL@BRANCH
    #[arg(long, value_parser = parse_repo)]
    pub candidate: RepoSpec,

    /// Reference repository, as URL or URL@BRANCH (2 to 10)
    #[arg(long = "reference", value_parser = parse_repo, required = true)]
    pub references: Vec<RepoSpec>,

    /// Source language to compare
    #[arg(long, default_value = "python")]
    pub language: String,

    /// File-pair similarity threshold in [0, 1]
    #[arg(long, default_value_t = 0.75)]
    pub threshold: f64,

    /// Where to write the JSON report
    #[arg(long, default_value = "report.json")]
    pub out: PathBuf,

    /// Also write flagged file pairs as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Configuration file layered under DETECTOR_* environment variables
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the configured similarity backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,
}

/// Split `URL@BRANCH`; an `@` inside the host part (`git@host:org/repo`)
/// is not a branch separator
pub fn parse_repo(value: &str) -> Result<RepoSpec, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("repository url must not be empty".to_string());
    }

    match value.rsplit_once('@') {
        Some((url, branch))
            if !url.is_empty() && !branch.is_empty() && !branch.contains([':', '/']) =>
        {
            Ok(RepoSpec::new(url, branch))
        }
        _ => Ok(RepoSpec::new(value, "main")),
    }
}
