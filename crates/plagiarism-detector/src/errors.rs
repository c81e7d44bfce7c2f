//! Error handling for the plagiarism detector

use thiserror::Error;

/// Main error type for detector operations
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Ingestion failed for repository: {repository}")]
    Ingestion {
        repository: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Similarity backend unavailable: {backend}")]
    BackendUnavailable {
        backend: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Empty corpus: {context}")]
    EmptyCorpus { context: String },

    #[error("Configuration error: {field}")]
    Configuration {
        field: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Report for job {job_id} is not available while {status}")]
    ReportNotReady { job_id: String, status: String },

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition { job_id: String, from: String, to: String },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DetectorError {
    /// Create a new validation error
    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create a new ingestion error
    pub fn ingestion_error(repository: impl Into<String>) -> Self {
        Self::Ingestion { repository: repository.into(), source: None }
    }

    /// Create a new ingestion error with source
    pub fn ingestion_error_with_source(
        repository: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Ingestion { repository: repository.into(), source: Some(source.into()) }
    }

    /// Create a new backend unavailable error with source
    pub fn backend_unavailable_with_source(
        backend: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::BackendUnavailable { backend: backend.into(), source: Some(source.into()) }
    }

    pub fn empty_corpus(context: impl Into<String>) -> Self {
        Self::EmptyCorpus { context: context.into() }
    }

    /// Create a new configuration error with source
    pub fn configuration_error_with_source(
        field: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Configuration { field: field.into(), source: Some(Box::new(source)) }
    }

    pub fn job_not_found(job_id: impl ToString) -> Self {
        Self::JobNotFound { job_id: job_id.to_string() }
    }

    pub fn report_not_ready(job_id: impl ToString, status: impl ToString) -> Self {
        Self::ReportNotReady { job_id: job_id.to_string(), status: status.to_string() }
    }

    /// Create a new internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Get the error code for HTTP responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Ingestion { .. } => "INGESTION_ERROR",
            Self::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            Self::EmptyCorpus { .. } => "EMPTY_CORPUS",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::JobNotFound { .. } => "JOB_NOT_FOUND",
            Self::ReportNotReady { .. } => "REPORT_NOT_READY",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Configuration { .. } => 400,
            Self::JobNotFound { .. } => 404,
            Self::ReportNotReady { .. } => 404,
            Self::InvalidTransition { .. } => 409,
            Self::EmptyCorpus { .. } => 422,
            Self::Ingestion { .. } => 502,
            Self::BackendUnavailable { .. } => 503,
            Self::Internal { .. } => 500,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ingestion { .. } => true, // network or remote may recover
            Self::BackendUnavailable { .. } => true,
            Self::Validation { .. } => false,
            Self::Configuration { .. } => false,
            Self::EmptyCorpus { .. } => false,
            Self::JobNotFound { .. } => false,
            Self::ReportNotReady { .. } => true,
            Self::InvalidTransition { .. } => false,
            Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for detector operations
pub type Result<T> = std::result::Result<T, DetectorError>;

/// Convert anyhow::Error to DetectorError, keeping job transition errors typed
impl From<anyhow::Error> for DetectorError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(transition) = err.downcast_ref::<plagiarism_domain::JobTransitionError>() {
            return Self::InvalidTransition {
                job_id: transition.job_id.to_string(),
                from: transition.status.to_string(),
                to: transition.update.to_string(),
            };
        }
        Self::Internal { message: format!("{err:#}"), source: None }
    }
}

impl From<plagiarism_domain::RequestValidationError> for DetectorError {
    fn from(err: plagiarism_domain::RequestValidationError) -> Self {
        Self::Validation { field: err.field.to_string(), message: err.message }
    }
}
