//! Plagiarism Detector - repository similarity analysis service

pub mod aggregator;
pub mod classifier;
pub mod embedder;
pub mod errors;
pub mod ingest;
pub mod logging;
pub mod normalizer;
pub mod orchestrator;
pub mod report;
pub mod settings;
pub mod similarity;

pub use classifier::Classifier;
pub use embedder::{HttpEmbedder, HttpEmbedderConfig, embedder_for};
pub use errors::{DetectorError, Result};
pub use ingest::GitRepositorySource;
pub use logging::{
    LogFormat, LoggingConfig, init_default_logging, init_development_logging,
    init_production_logging,
};
pub use orchestrator::Orchestrator;
pub use settings::load_analysis_config;
pub use similarity::{SimilarityBackend, SimilarityEngine};
