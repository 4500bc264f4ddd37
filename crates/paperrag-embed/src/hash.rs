//! Deterministic hashing embedder.
//!
//! Maps text to a bag-of-words vector using the hashing trick: each
//! lowercased word is hashed with blake3 into one of `dimension` buckets.
//! Texts sharing words get similar vectors, which is enough for offline
//! retrieval and makes tests reproducible without a network.

use async_trait::async_trait;
use paperrag_core::{Embedder, Embedding, ProviderError};

/// Default vector dimension.
pub const DEFAULT_DIMENSION: usize = 384;

/// Embedder producing normalized word-hash vectors.
///
/// # Example
///
/// ```rust
/// use paperrag_embed::HashEmbedder;
/// use paperrag_core::Embedder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let embedder = HashEmbedder::new();
/// let vectors = embedder.embed_text(&["attention is all you need"]).await?;
/// assert_eq!(vectors[0].len(), 384);
/// # Ok(())
/// # }
/// ```
pub struct HashEmbedder {
    dimension: usize,
    model: String,
}

impl HashEmbedder {
    /// Create a hash embedder with the default dimension (384).
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIMENSION)
    }

    /// Create a hash embedder with a custom dimension (at least 1).
    ///
    /// The dimension is part of the model name, so indices built at another
    /// dimension are not mistaken for current ones.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model: format!("blake3-hash-{dimension}"),
        }
    }

    /// Vector dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_one(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = blake3::hash(word.to_lowercase().as_bytes());
            let bytes = digest.as_bytes();
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&bytes[..8]);
            let idx = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<Embedding>, ProviderError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}
