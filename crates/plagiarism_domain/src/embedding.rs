//! Domain interface for text embedding and vector helpers

use anyhow::Result;
use async_trait::async_trait;

/// Trait for turning text into dense vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch.pop().ok_or_else(|| anyhow::anyhow!("No embedding returned"))
    }

    /// Generate embeddings for multiple texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the dimension of embeddings produced by this embedder
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this embedder
    fn name(&self) -> &str;
}

/// Vector utilities shared by embedders and the semantic backend
pub mod preprocessing {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    /// Feature-hashed bag of whitespace tokens, normalized to unit length
    ///
    /// Texts sharing tokens land close together, identical texts produce
    /// identical vectors. Empty text yields the zero vector.
    pub fn hashed_token_embedding(text: &str, dimension: usize, seed: Option<u64>) -> Vec<f32> {
        let mut embedding = vec![0.0f32; dimension];
        if dimension == 0 {
            return embedding;
        }

        for token in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            if let Some(seed_val) = seed {
                seed_val.hash(&mut hasher);
            }
            let hash = hasher.finish();

            let index = (hash % dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            embedding[index] += sign;
        }

        normalize_vector(&mut embedding);
        embedding
    }

    /// Normalize a vector to unit length
    pub fn normalize_vector(vector: &mut [f32]) {
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
    }

    /// Check if a vector is valid (no NaN, infinity, etc.)
    pub fn is_valid_vector(vector: &[f32]) -> bool {
        vector.iter().all(|&x| x.is_finite())
    }

    /// Element-wise mean; `None` for an empty set or mismatched lengths
    pub fn mean_pool(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
        let first = vectors.first()?;
        let dimension = first.len();
        if vectors.iter().any(|v| v.len() != dimension) {
            return None;
        }

        let mut pooled = vec![0.0f32; dimension];
        for vector in vectors {
            pooled.iter_mut().zip(vector).for_each(|(acc, x)| *acc += x);
        }
        let count = vectors.len() as f32;
        pooled.iter_mut().for_each(|x| *x /= count);
        Some(pooled)
    }

    /// Cosine similarity clamped to `[0, 1]`; `0.0` when either norm is zero
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
        if a.len() != b.len() || !is_valid_vector(a) || !is_valid_vector(b) {
            return 0.0;
        }

        let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
        for (x, y) in a.iter().zip(b) {
            let (x, y) = (f64::from(*x), f64::from(*y));
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        crate::clamp_score(dot / (norm_a.sqrt() * norm_b.sqrt()))
    }
}
