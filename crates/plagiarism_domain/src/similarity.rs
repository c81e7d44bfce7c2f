//! Similarity scores and matrices

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Level at which two artifacts were compared
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Granularity {
    File,
    Repo,
    CommitMessage,
    CommitDiff,
}

/// Clamp a raw score into `[0, 1]`, mapping NaN and infinities to `0.0`
pub fn clamp_score(value: f64) -> f64 {
    if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 }
}

/// One comparison between two artifacts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityScore {
    pub granularity: Granularity,
    pub a_id: String,
    pub b_id: String,
    /// Repository ids, present for file and commit granularities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a_repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b_repo: Option<String>,
    pub value: f64,
}

impl SimilarityScore {
    pub fn new(
        granularity: Granularity,
        a_id: impl Into<String>,
        b_id: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            granularity,
            a_id: a_id.into(),
            b_id: b_id.into(),
            a_repo: None,
            b_repo: None,
            value: clamp_score(value),
        }
    }

    pub fn with_repos(mut self, a_repo: impl Into<String>, b_repo: impl Into<String>) -> Self {
        self.a_repo = Some(a_repo.into());
        self.b_repo = Some(b_repo.into());
        self
    }
}

/// Square, symmetric matrix of scores in `[0, 1]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    /// All-zero matrix
    pub fn zeros(size: usize) -> Self {
        Self { size, values: vec![0.0; size * size] }
    }

    /// Zero off-diagonal, one on the diagonal
    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::zeros(size);
        for i in 0..size {
            matrix.set(i, i, 1.0);
        }
        matrix
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.size + col]
    }

    /// Set both `(row, col)` and `(col, row)`; the value is clamped
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let value = clamp_score(value);
        self.values[row * self.size + col] = value;
        self.values[col * self.size + row] = value;
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values.chunks(self.size.max(1)).map(<[f64]>::to_vec).take(self.size).collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_clamp_score() {
        let fixtures = vec![
            (0.5, 0.5),
            (-0.2, 0.0),
            (1.0000001, 1.0),
            (f64::NAN, 0.0),
            (f64::INFINITY, 0.0),
        ];

        for (input, expected) in fixtures {
            let actual = clamp_score(input);
            assert_eq!(actual, expected, "Input: {}", input);
        }
    }

    #[test]
    fn test_matrix_set_is_symmetric() {
        let mut fixture = SimilarityMatrix::zeros(3);
        fixture.set(0, 2, 0.7);

        assert_eq!(fixture.get(0, 2), 0.7);
        assert_eq!(fixture.get(2, 0), 0.7);
        assert_eq!(fixture.get(1, 1), 0.0);
    }

    #[test]
    fn test_matrix_rows() {
        let fixture = SimilarityMatrix::identity(2);

        let actual = fixture.rows();
        let expected = vec![vec![1.0, 0.0], vec![0.0, 1.0]];

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_empty_matrix_rows() {
        let fixture = SimilarityMatrix::zeros(0);
        assert!(fixture.is_empty());
        assert_eq!(fixture.rows(), Vec::<Vec<f64>>::new());
    }
}
