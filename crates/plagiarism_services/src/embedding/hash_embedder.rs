//! Deterministic feature-hashing embedder for offline runs and tests

use anyhow::Result;
use async_trait::async_trait;
use plagiarism_domain::Embedder;
use plagiarism_domain::embedding::preprocessing::{hashed_token_embedding, is_valid_vector};

/// Embeds text as a signed, hashed bag of tokens
pub struct HashEmbedder {
    dimension: usize,
    seed: Option<u64>,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, seed: None }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = hashed_token_embedding(text, self.dimension, self.seed);

        if !is_valid_vector(&embedding) {
            return Err(anyhow::anyhow!("Generated invalid vector"));
        }

        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_text(text).await?);
        }
        Ok(embeddings)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash"
    }
}
