//! Feature-hashing embedder.
//!
//! Maps lower-cased word unigrams and bigrams into a fixed number of signed buckets
//! with FNV-1a. Texts sharing vocabulary land close together under L2 distance,
//! which is enough for smoke tests and offline demos. It is not a semantic model.

use crate::config::EmbedConfig;
use crate::error::Result;
use crate::provider::{EmbeddingProvider, EmbeddingResult, Vector, normalize};
use async_trait::async_trait;
use fnv::FnvHasher;
use std::hash::Hasher;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    normalize: bool,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            normalize: true,
        }
    }

    pub fn from_config(config: &EmbedConfig) -> Self {
        Self {
            dimension: config.dimension.max(1),
            normalize: config.normalize,
        }
    }

    /// Embed one text synchronously. The empty string maps to the zero vector.
    pub fn embed_one(&self, text: &str) -> Vector {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        for token in &tokens {
            self.accumulate(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, bigram.as_bytes(), 0.5);
        }

        if self.normalize {
            normalize(&mut vector);
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let mut hasher = FnvHasher::default();
        hasher.write(feature);
        let hash = hasher.finish();
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        let embeddings = texts.iter().map(|t| self.embed_one(t)).collect();
        Ok(EmbeddingResult {
            embeddings,
            dimension: self.dimension,
        })
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    #[test]
    fn test_deterministic() {
        let embedder = HashingEmbedder::new(64);
        assert_eq!(
            embedder.embed_one("Printer offline after driver update"),
            embedder.embed_one("Printer offline after driver update")
        );
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(32);
        let v = embedder.embed_one("");
        assert_eq!(v.len(), 32);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_shared_vocabulary_is_closer() {
        let embedder = HashingEmbedder::new(256);
        let query = embedder.embed_one("password reset link expired");
        let near = embedder.embed_one("the password reset link has expired");
        let far = embedder.embed_one("invoice shows duplicate tax line");
        assert!(l2(&query, &near) < l2(&query, &far));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let embedder = HashingEmbedder::new(16);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let result = embedder.embed_texts(&texts).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.dimension, 16);
        assert_eq!(result.embeddings[1], embedder.embed_one("beta"));
    }
}
