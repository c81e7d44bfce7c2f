//! Embedding backend: chunk, embed, mean-pool, cosine

use std::sync::Arc;

use async_trait::async_trait;
use plagiarism_domain::embedding::preprocessing::{cosine_similarity, is_valid_vector, mean_pool};
use plagiarism_domain::{Embedder, SimilarityMatrix};
use tracing::debug;

use super::{SimilarityBackend, snap_score};
use crate::errors::{DetectorError, Result};

/// Split a document into windows of `chunk_lines` lines
pub fn chunk_document(text: &str, chunk_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    lines.chunks(chunk_lines.max(1)).map(|chunk| chunk.join("\n")).collect()
}

pub struct SemanticBackend {
    embedder: Arc<dyn Embedder>,
    chunk_lines: usize,
    batch_size: usize,
}

impl SemanticBackend {
    pub fn new(embedder: Arc<dyn Embedder>, chunk_lines: usize, batch_size: usize) -> Self {
        Self { embedder, chunk_lines, batch_size: batch_size.max(1) }
    }

    fn unavailable(&self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> DetectorError {
        DetectorError::backend_unavailable_with_source(self.embedder.name(), source)
    }

    /// One pooled vector per document; `None` for documents without text
    pub async fn document_vectors(&self, documents: &[String]) -> Result<Vec<Option<Vec<f32>>>> {
        let chunked: Vec<Vec<String>> =
            documents.iter().map(|doc| chunk_document(doc, self.chunk_lines)).collect();
        let batch: Vec<String> = chunked.iter().flatten().cloned().collect();

        debug!(
            documents = documents.len(),
            chunks = batch.len(),
            batch_size = self.batch_size,
            embedder = self.embedder.name(),
            "Embedding document chunks"
        );

        let mut embeddings = Vec::with_capacity(batch.len());
        for request in batch.chunks(self.batch_size) {
            let vectors =
                self.embedder.embed_batch(request).await.map_err(|e| self.unavailable(e))?;
            embeddings.extend(vectors);
        }

        if embeddings.len() != batch.len() {
            return Err(self.unavailable(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }
        if let Some(bad) = embeddings.iter().position(|v| !is_valid_vector(v)) {
            return Err(self.unavailable(format!("embedding {bad} contains non-finite values")));
        }

        let mut remaining = embeddings.into_iter();
        Ok(chunked
            .iter()
            .map(|chunks| {
                let vectors: Vec<Vec<f32>> = remaining.by_ref().take(chunks.len()).collect();
                mean_pool(&vectors)
            })
            .collect())
    }
}

#[async_trait]
impl SimilarityBackend for SemanticBackend {
    fn name(&self) -> &'static str {
        "semantic"
    }

    async fn matrix(&self, documents: &[String]) -> Result<SimilarityMatrix> {
        let vectors = self.document_vectors(documents).await?;
        let mut matrix = SimilarityMatrix::zeros(documents.len());

        for (i, a) in vectors.iter().enumerate() {
            let Some(a) = a else { continue };
            if a.iter().any(|x| *x != 0.0) {
                matrix.set(i, i, 1.0);
            }
            for (j, b) in vectors.iter().enumerate().skip(i + 1) {
                if let Some(b) = b {
                    matrix.set(i, j, snap_score(cosine_similarity(a, b)));
                }
            }
        }

        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use plagiarism_services::HashEmbedder;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Delegates to a hash embedder and records every request size
    #[derive(Default)]
    struct RecordingEmbedder {
        requests: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Embedder for RecordingEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.requests.lock().unwrap().push(texts.len());
            HashEmbedder::new(16).embed_batch(texts).await
        }

        fn embedding_dimension(&self) -> usize {
            16
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Err(anyhow::anyhow!("model not loaded"))
        }

        fn embedding_dimension(&self) -> usize {
            8
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_chunk_document() {
        let fixture = "a\nb\nc\nd\ne";

        let actual = chunk_document(fixture, 2);
        let expected = vec!["a\nb", "c\nd", "e"];

        assert_eq!(actual, expected);
        assert!(chunk_document("", 2).is_empty());
    }

    #[tokio::test]
    async fn test_identical_documents_score_one() {
        let backend = SemanticBackend::new(Arc::new(HashEmbedder::new(128)), 2, 64);
        let text = "def f ( x ) :\nreturn x + 1\nprint ( f ( 2 ) )".to_string();
        let fixture = vec![text.clone(), text, "while true : pass".to_string()];

        let actual = backend.matrix(&fixture).await.unwrap();

        assert_eq!(actual.get(0, 1), 1.0);
        assert!(actual.get(0, 2) < 1.0);
    }

    #[tokio::test]
    async fn test_long_documents_are_chunked_not_truncated() {
        let backend = SemanticBackend::new(Arc::new(HashEmbedder::new(64)), 1, 64);
        let fixture = vec!["alpha\nbeta\ngamma".to_string(), "delta".to_string()];

        let actual = backend.document_vectors(&fixture).await.unwrap();

        assert_eq!(actual.len(), 2);
        assert!(actual.iter().all(Option::is_some));
    }

    #[tokio::test]
    async fn test_requests_respect_batch_size() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let backend = SemanticBackend::new(embedder.clone(), 60, 64);
        let document = vec!["let x = 1;"; 3000].join("\n");
        let fixture = vec![document; 100];

        let actual = backend.document_vectors(&fixture).await.unwrap();

        let requests = embedder.requests.lock().unwrap().clone();
        assert_eq!(actual.len(), 100);
        assert!(actual.iter().all(Option::is_some));
        assert_eq!(requests.iter().sum::<usize>(), 5000);
        assert!(requests.iter().all(|n| *n <= 64), "Requests: {:?}", requests);
        assert_eq!(requests.len(), 79);
    }

    #[tokio::test]
    async fn test_empty_document_yields_zero_row() {
        let backend = SemanticBackend::new(Arc::new(HashEmbedder::new(64)), 10, 64);
        let fixture = vec![String::new(), "x y z".to_string()];

        let actual = backend.matrix(&fixture).await.unwrap();

        assert_eq!(actual.get(0, 0), 0.0);
        assert_eq!(actual.get(0, 1), 0.0);
        assert_eq!(actual.get(1, 1), 1.0);
    }

    #[tokio::test]
    async fn test_embedder_failure_is_backend_unavailable() {
        let backend = SemanticBackend::new(Arc::new(BrokenEmbedder), 10, 64);

        let actual = backend.matrix(&["text".to_string()]).await.unwrap_err();

        assert_eq!(actual.error_code(), "BACKEND_UNAVAILABLE");
    }
}
