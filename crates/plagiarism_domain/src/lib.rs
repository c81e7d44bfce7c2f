//! Domain model for repository plagiarism analysis
//!
//! Data types, configuration, and the collaborator traits (embedding,
//! job storage, repository access) shared by the detector and its default
//! service implementations.

mod comparison;
mod config;
pub mod embedding;
mod job;
mod language;
mod report;
mod repository;
mod similarity;
mod source;
mod store;

pub use comparison::*;
pub use config::*;
pub use embedding::Embedder;
pub use job::*;
pub use language::*;
pub use report::*;
pub use repository::*;
pub use similarity::*;
pub use source::*;
pub use store::*;
