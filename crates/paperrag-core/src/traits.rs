//! Core traits for paperrag components.
//!
//! - [`DocumentLoader`]: Turn a file into page records
//! - [`Chunker`]: Split pages into chunks
//! - [`Embedder`]: Generate vector embeddings (external service)
//! - [`Generator`]: Generate text from a prompt (external service)
//! - [`VectorStore`]: Store and search vectors
//!
//! `Embedder` and `Generator` each have a single required method so that a
//! backend is swapped by passing a different implementation, not by name.

use async_trait::async_trait;
use std::path::Path;

use crate::error::{ConfigError, IndexError, LoadError, ProviderError};
use crate::types::{
    Chunk, ChunkConfig, EmbeddedChunk, Embedding, PageRecord, RetrievedChunk, SearchQuery,
    StoreStats,
};

// ============================================================================
// Document Loading
// ============================================================================

/// Trait for reading a document into ordered pages.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// File extensions this loader handles (lowercase, without dot).
    fn extensions(&self) -> &[&str];

    /// Check if this loader can handle the given file.
    fn can_load(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions()
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }

    /// Load the document, returning its pages in page order.
    async fn load(&self, path: &Path) -> Result<Vec<PageRecord>, LoadError>;
}

// ============================================================================
// Chunking
// ============================================================================

/// Trait for splitting pages into chunks.
pub trait Chunker: Send + Sync {
    /// Name of this chunking strategy.
    fn name(&self) -> &str;

    /// Chunk the pages. Deterministic for identical input.
    fn chunk(&self, pages: &[PageRecord], config: &ChunkConfig)
        -> Result<Vec<Chunk>, ConfigError>;
}

// ============================================================================
// Embedding
// ============================================================================

/// Capability: map text to fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; one vector per input, in input order.
    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<Embedding>, ProviderError>;

    /// Model name/identifier recorded in the index manifest.
    fn model_name(&self) -> &str {
        "unknown"
    }

    /// Embed a single query.
    async fn embed_query(&self, query: &str) -> Result<Embedding, ProviderError> {
        self.embed_text(&[query])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("empty embedding result".to_string()))
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Capability: produce text from a prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Send the prompt to the model and return its reply.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Model name/identifier, for logging.
    fn model_name(&self) -> &str {
        "unknown"
    }
}

// ============================================================================
// Vector Storage
// ============================================================================

/// Trait for vector storage and search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace chunks (keyed by chunk id).
    async fn upsert_chunks(&self, chunks: &[EmbeddedChunk]) -> Result<(), IndexError>;

    /// Search for the closest chunks.
    async fn search(&self, query: SearchQuery) -> Result<Vec<RetrievedChunk>, IndexError>;

    /// All stored chunks, in original chunk order.
    async fn all_chunks(&self) -> Result<Vec<EmbeddedChunk>, IndexError>;

    /// Get store statistics.
    async fn stats(&self) -> Result<StoreStats, IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubLoader;

    #[async_trait]
    impl DocumentLoader for StubLoader {
        fn extensions(&self) -> &[&str] {
            &["pdf"]
        }

        async fn load(&self, _path: &Path) -> Result<Vec<PageRecord>, LoadError> {
            Ok(vec![PageRecord::new(0, "page")])
        }
    }

    struct CountingEmbedder;

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed_text(&self, texts: &[&str]) -> Result<Vec<Embedding>, ProviderError> {
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
    }

    struct EmptyEmbedder;

    #[async_trait]
    impl Embedder for EmptyEmbedder {
        async fn embed_text(&self, _texts: &[&str]) -> Result<Vec<Embedding>, ProviderError> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_can_load_by_extension_case_insensitive() {
        let loader = StubLoader;
        assert!(loader.can_load(Path::new("paper.pdf")));
        assert!(loader.can_load(Path::new("PAPER.PDF")));
        assert!(!loader.can_load(Path::new("paper.docx")));
        assert!(!loader.can_load(Path::new("paper")));
    }

    #[tokio::test]
    async fn test_embed_query_default_uses_embed_text() {
        let embedder = CountingEmbedder;
        let vector = embedder.embed_query("four").await.unwrap();
        assert_eq!(vector, vec![4.0]);
        assert_eq!(embedder.model_name(), "unknown");
    }

    #[tokio::test]
    async fn test_embed_query_empty_result_is_malformed() {
        let err = EmptyEmbedder.embed_query("q").await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}
