//! Default collaborator implementations for the plagiarism detector

pub mod embedding;
pub mod job_store;
pub mod source;

pub use embedding::HashEmbedder;
pub use job_store::InMemoryJobStore;
pub use source::InMemoryRepositorySource;
