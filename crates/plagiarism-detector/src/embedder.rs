//! HTTP embedder for OpenAI-compatible `/v1/embeddings` endpoints

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use plagiarism_domain::{BackendKind, Embedder, SimilarityConfig};
use plagiarism_services::HashEmbedder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub timeout: Duration,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            dimension: 1536,
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpEmbedderConfig {
    /// Read `EMBEDDING_API_URL`, `EMBEDDING_API_KEY` (or `OPENAI_API_KEY`),
    /// `EMBEDDING_MODEL` and `EMBEDDING_DIMENSION`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("EMBEDDING_API_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("EMBEDDING_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok(),
            model: std::env::var("EMBEDDING_MODEL").unwrap_or(defaults.model),
            dimension: std::env::var("EMBEDDING_DIMENSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.dimension),
            timeout: defaults.timeout,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    config: HttpEmbedderConfig,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/embeddings", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), model = %self.config.model, "Requesting embeddings");

        let mut request = self
            .client
            .post(self.endpoint())
            .json(&EmbeddingRequest { input: texts, model: &self.config.model });
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.context("Embedding request failed")?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Embedding API returned {status}: {error_text}"));
        }

        let mut body: EmbeddingResponse =
            response.json().await.context("Invalid embedding response")?;
        if body.data.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Embedding API returned {} vectors for {} inputs",
                body.data.len(),
                texts.len()
            ));
        }
        body.data.sort_by_key(|item| item.index);

        info!(count = body.data.len(), "Received embeddings");
        Ok(body.data.into_iter().map(|item| item.embedding).collect())
    }

    fn embedding_dimension(&self) -> usize {
        self.config.dimension
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Embedder for the configured backend: HTTP when an API key is set,
/// the offline hash embedder otherwise, none for lexical scoring
pub fn embedder_for(config: &SimilarityConfig) -> Result<Option<Arc<dyn Embedder>>> {
    if config.backend != BackendKind::Semantic {
        return Ok(None);
    }

    let http = HttpEmbedderConfig::from_env();
    if http.api_key.is_some() {
        info!("🔗 Using HTTP embedder ({})", http.model);
        return Ok(Some(Arc::new(HttpEmbedder::new(http)?)));
    }

    info!("🧮 No embedding API key set, using hash embedder");
    Ok(Some(Arc::new(HashEmbedder::default())))
}
