//! Similarity engine: pairwise document scores in `[0, 1]`

mod lexical;
mod overlap;
mod semantic;

use std::sync::Arc;

use async_trait::async_trait;
pub use lexical::{LexicalBackend, tokenize};
pub use overlap::{overlap_matrix, token_jaccard};
use plagiarism_domain::{
    BackendKind, BlendWeights, Embedder, SimilarityConfig, SimilarityMatrix, clamp_score,
};
pub use semantic::{SemanticBackend, chunk_document};
use tracing::warn;

use crate::errors::Result;

/// Clamp into `[0, 1]` and absorb floating error just below `1.0`
pub(crate) fn snap_score(value: f64) -> f64 {
    let value = clamp_score(value);
    if value > 1.0 - 1e-9 { 1.0 } else { value }
}

/// Produces a symmetric document similarity matrix
#[async_trait]
pub trait SimilarityBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn matrix(&self, documents: &[String]) -> Result<SimilarityMatrix>;
}

/// Runs the configured backend, falling back to lexical scoring when it is
/// unavailable, and applies the optional token-overlap blend
pub struct SimilarityEngine {
    primary: Box<dyn SimilarityBackend>,
    fallback: LexicalBackend,
    blend: Option<BlendWeights>,
}

impl SimilarityEngine {
    pub fn new(config: &SimilarityConfig, embedder: Option<Arc<dyn Embedder>>) -> Self {
        let fallback = LexicalBackend::new(config.max_features);
        let primary: Box<dyn SimilarityBackend> = match (config.backend, embedder) {
            (BackendKind::Semantic, Some(embedder)) => {
                Box::new(SemanticBackend::new(
                    embedder,
                    config.chunk_lines,
                    config.embed_batch_size,
                ))
            }
            (BackendKind::Semantic, None) => {
                warn!("Semantic backend requested without an embedder, using lexical");
                Box::new(fallback.clone())
            }
            (BackendKind::Lexical, _) => Box::new(fallback.clone()),
        };

        Self { primary, fallback, blend: config.blend }
    }

    /// Engine with a caller-supplied primary backend
    pub fn with_backend(
        primary: Box<dyn SimilarityBackend>,
        max_features: usize,
        blend: Option<BlendWeights>,
    ) -> Self {
        Self { primary, fallback: LexicalBackend::new(max_features), blend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.primary.name()
    }

    /// Never fails: a failing primary backend degrades to lexical scoring
    pub async fn compute_matrix(&self, documents: &[String]) -> SimilarityMatrix {
        let matrix = match self.primary.matrix(documents).await {
            Ok(matrix) => matrix,
            Err(error) => {
                warn!(
                    backend = self.primary.name(),
                    error = %error,
                    "Similarity backend unavailable, falling back to lexical"
                );
                metrics::counter!("detector_backend_fallbacks_total").increment(1);
                self.fallback.compute(documents)
            }
        };

        match self.blend {
            Some(weights) => blend(&matrix, &overlap_matrix(documents), weights),
            None => matrix,
        }
    }
}

/// `token_overlap * overlap + backend * score`, clamped
fn blend(
    backend: &SimilarityMatrix,
    overlap: &SimilarityMatrix,
    weights: BlendWeights,
) -> SimilarityMatrix {
    let mut blended = SimilarityMatrix::zeros(backend.len());
    for i in 0..backend.len() {
        for j in i..backend.len() {
            let value =
                weights.token_overlap * overlap.get(i, j) + weights.backend * backend.get(i, j);
            blended.set(i, j, snap_score(value));
        }
    }
    blended
}
