//! Token-set overlap

use std::collections::HashSet;

use plagiarism_domain::SimilarityMatrix;

/// Jaccard index of whitespace token sets; `0.0` when both are empty
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

pub fn overlap_matrix(documents: &[String]) -> SimilarityMatrix {
    let mut matrix = SimilarityMatrix::zeros(documents.len());
    for i in 0..documents.len() {
        for j in i..documents.len() {
            matrix.set(i, j, token_jaccard(&documents[i], &documents[j]));
        }
    }
    matrix
}
