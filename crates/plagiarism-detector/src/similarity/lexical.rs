//! TF-IDF vector-space backend

use std::collections::HashMap;

use async_trait::async_trait;
use lazy_static::lazy_static;
use plagiarism_domain::SimilarityMatrix;
use regex::Regex;

use super::{SimilarityBackend, snap_score};
use crate::errors::Result;

lazy_static! {
    static ref TERM: Regex = Regex::new(r"\b\w\w+\b").unwrap();
}

/// Lowercased terms of two or more word characters
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    TERM.find_iter(text).map(|m| m.as_str().to_lowercase())
}

/// TF-IDF with a vocabulary local to each call, bounded to the
/// `max_features` most frequent terms
#[derive(Debug, Clone)]
pub struct LexicalBackend {
    max_features: usize,
}

impl LexicalBackend {
    pub fn new(max_features: usize) -> Self {
        Self { max_features: max_features.max(1) }
    }

    /// Top-K vocabulary by corpus frequency; ties broken alphabetically
    fn vocabulary(&self, tokenized: &[Vec<String>]) -> HashMap<String, usize> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for terms in tokenized {
            for term in terms {
                *counts.entry(term.as_str()).or_default() += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.max_features);
        ranked.sort_by(|a, b| a.0.cmp(b.0));

        ranked.into_iter().enumerate().map(|(index, (term, _))| (term.to_string(), index)).collect()
    }

    /// L2-normalized TF-IDF vectors with smoothed idf `ln((1+n)/(1+df)) + 1`
    pub fn vectorize(&self, documents: &[String]) -> Vec<Vec<f64>> {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d).collect()).collect();
        let vocabulary = self.vocabulary(&tokenized);
        let width = vocabulary.len();

        let mut doc_freq = vec![0usize; width];
        let mut term_freqs: Vec<Vec<f64>> = Vec::with_capacity(documents.len());
        for terms in &tokenized {
            let mut tf = vec![0.0; width];
            for term in terms {
                if let Some(&index) = vocabulary.get(term) {
                    tf[index] += 1.0;
                }
            }
            tf.iter().enumerate().filter(|(_, count)| **count > 0.0).for_each(|(index, _)| {
                doc_freq[index] += 1;
            });
            term_freqs.push(tf);
        }

        let n = documents.len() as f64;
        let idf: Vec<f64> =
            doc_freq.iter().map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0).collect();

        term_freqs
            .into_iter()
            .map(|mut vector| {
                vector.iter_mut().zip(&idf).for_each(|(x, w)| *x *= w);
                let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm > 0.0 {
                    vector.iter_mut().for_each(|x| *x /= norm);
                }
                vector
            })
            .collect()
    }

    pub fn compute(&self, documents: &[String]) -> SimilarityMatrix {
        let vectors = self.vectorize(documents);
        let mut matrix = SimilarityMatrix::zeros(documents.len());

        for i in 0..vectors.len() {
            let self_norm: f64 = vectors[i].iter().map(|x| x * x).sum();
            if self_norm > 0.0 {
                matrix.set(i, i, 1.0);
            }
            for j in (i + 1)..vectors.len() {
                // vectors are unit length or zero, so the dot product is the cosine
                let dot: f64 = vectors[i].iter().zip(&vectors[j]).map(|(a, b)| a * b).sum();
                matrix.set(i, j, snap_score(dot));
            }
        }

        matrix
    }
}

#[async_trait]
impl SimilarityBackend for LexicalBackend {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn matrix(&self, documents: &[String]) -> Result<SimilarityMatrix> {
        Ok(self.compute(documents))
    }
}
