//! In-memory vector store with exact search.

use async_trait::async_trait;
use chrono::Utc;
use paperrag_core::{
    EmbeddedChunk, IndexError, RetrievedChunk, SearchQuery, StoreStats, VectorStore,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// In-memory vector store.
///
/// Every vector must have the dimension given at construction. Search scores
/// all stored chunks and returns the best `limit`, ordered by descending
/// score; equal scores keep the original chunk order `(page, chunk_index)`.
///
/// # Example
///
/// ```rust
/// use paperrag_store::MemoryStore;
/// use paperrag_core::VectorStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new(384);
/// let stats = store.stats().await?;
/// assert_eq!(stats.total_chunks, 0);
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    dimension: usize,
    chunks: Arc<RwLock<HashMap<Uuid, EmbeddedChunk>>>,
    last_updated: Arc<RwLock<Option<chrono::DateTime<Utc>>>>,
}

impl MemoryStore {
    /// Create a new in-memory store with the given embedding dimension.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            chunks: Arc::new(RwLock::new(HashMap::new())),
            last_updated: Arc::new(RwLock::new(None)),
        }
    }

    /// Embedding dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, actual: usize) -> Result<(), IndexError> {
        if actual == self.dimension {
            Ok(())
        } else {
            Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual,
            })
        }
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert_chunks(&self, chunks: &[EmbeddedChunk]) -> Result<(), IndexError> {
        for chunk in chunks {
            self.check_dimension(chunk.vector.len())?;
        }

        let mut store = self.chunks.write().await;
        for chunk in chunks {
            store.insert(chunk.id, chunk.clone());
        }
        *self.last_updated.write().await = Some(Utc::now());

        debug!("Upserted {} chunks", chunks.len());
        Ok(())
    }

    async fn search(&self, query: SearchQuery) -> Result<Vec<RetrievedChunk>, IndexError> {
        self.check_dimension(query.embedding.len())?;

        let chunks = self.chunks.read().await;
        let mut results: Vec<(f32, &EmbeddedChunk)> = chunks
            .values()
            .map(|chunk| (query.metric.score(&query.embedding, &chunk.vector), chunk))
            .collect();

        // Score descending, then original chunk order
        results.sort_by(|a, b| match b.0.total_cmp(&a.0) {
            Ordering::Equal => a.1.chunk.order_key().cmp(&b.1.chunk.order_key()),
            other => other,
        });

        Ok(results
            .into_iter()
            .take(query.limit)
            .map(|(score, chunk)| RetrievedChunk {
                chunk: chunk.chunk.clone(),
                score,
            })
            .collect())
    }

    async fn all_chunks(&self) -> Result<Vec<EmbeddedChunk>, IndexError> {
        let chunks = self.chunks.read().await;
        let mut all: Vec<EmbeddedChunk> = chunks.values().cloned().collect();
        all.sort_by_key(|c| c.chunk.order_key());
        Ok(all)
    }

    async fn stats(&self) -> Result<StoreStats, IndexError> {
        let chunks = self.chunks.read().await;
        Ok(StoreStats {
            total_chunks: chunks.len() as u64,
            dimension: Some(self.dimension),
            last_updated: *self.last_updated.read().await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperrag_core::{Chunk, DistanceMetric, DocumentId};

    fn embedded(page: u32, index: u32, vector: Vec<f32>) -> EmbeddedChunk {
        let text = format!("page {page} chunk {index}");
        let len = text.len();
        EmbeddedChunk::new(
            DocumentId::from_bytes(b"paper"),
            Chunk {
                text,
                source_page: page,
                chunk_index: index,
                char_range: 0..len,
            },
            vector,
        )
    }

    fn query(embedding: Vec<f32>, limit: usize, metric: DistanceMetric) -> SearchQuery {
        SearchQuery {
            embedding,
            limit,
            metric,
        }
    }

    // ===== Upsert Tests =====

    #[tokio::test]
    async fn test_upsert_and_stats() {
        let store = MemoryStore::new(2);
        store
            .upsert_chunks(&[embedded(0, 0, vec![1.0, 0.0]), embedded(0, 1, vec![0.0, 1.0])])
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.dimension, Some(2));
        assert!(stats.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_upsert_same_id_replaces() {
        let store = MemoryStore::new(2);
        store
            .upsert_chunks(&[embedded(0, 0, vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert_chunks(&[embedded(0, 0, vec![0.0, 1.0])])
            .await
            .unwrap();

        let all = store.all_chunks().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].vector, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_upsert_wrong_dimension_rejected() {
        let store = MemoryStore::new(3);
        let err = store
            .upsert_chunks(&[embedded(0, 0, vec![1.0, 0.0, 0.0]), embedded(0, 1, vec![1.0])])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        ));
        assert_eq!(store.stats().await.unwrap().total_chunks, 0);
    }

    #[tokio::test]
    async fn test_all_chunks_in_original_order() {
        let store = MemoryStore::new(1);
        store
            .upsert_chunks(&[
                embedded(2, 0, vec![1.0]),
                embedded(0, 1, vec![1.0]),
                embedded(0, 0, vec![1.0]),
                embedded(1, 0, vec![1.0]),
            ])
            .await
            .unwrap();

        let keys: Vec<(u32, u32)> = store
            .all_chunks()
            .await
            .unwrap()
            .iter()
            .map(|c| c.chunk.order_key())
            .collect();
        assert_eq!(keys, vec![(0, 0), (0, 1), (1, 0), (2, 0)]);
    }

    // ===== Search Tests =====

    #[tokio::test]
    async fn test_search_cosine_ranks_by_similarity() {
        let store = MemoryStore::new(2);
        store
            .upsert_chunks(&[
                embedded(0, 0, vec![0.0, 1.0]),
                embedded(0, 1, vec![1.0, 0.0]),
                embedded(1, 0, vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = store
            .search(query(vec![1.0, 0.0], 2, DistanceMetric::Cosine))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.order_key(), (0, 1));
        assert_eq!(results[1].chunk.order_key(), (1, 0));
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_search_l2_ascending_distance() {
        let store = MemoryStore::new(1);
        store
            .upsert_chunks(&[
                embedded(0, 0, vec![10.0]),
                embedded(0, 1, vec![2.0]),
                embedded(0, 2, vec![5.0]),
            ])
            .await
            .unwrap();

        let results = store
            .search(query(vec![0.0], 3, DistanceMetric::L2))
            .await
            .unwrap();

        let order: Vec<u32> = results.iter().map(|r| r.chunk.chunk_index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[tokio::test]
    async fn test_search_ties_keep_chunk_order() {
        let store = MemoryStore::new(2);
        // Inserted out of order; all equidistant from the query
        store
            .upsert_chunks(&[
                embedded(1, 0, vec![1.0, 0.0]),
                embedded(0, 3, vec![1.0, 0.0]),
                embedded(0, 1, vec![1.0, 0.0]),
                embedded(0, 2, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store
            .search(query(vec![1.0, 0.0], 3, DistanceMetric::Cosine))
            .await
            .unwrap();

        let keys: Vec<(u32, u32)> = results.iter().map(|r| r.chunk.order_key()).collect();
        assert_eq!(keys, vec![(0, 1), (0, 2), (0, 3)]);
    }

    #[tokio::test]
    async fn test_search_limit_larger_than_store() {
        let store = MemoryStore::new(1);
        store
            .upsert_chunks(&[embedded(0, 0, vec![1.0])])
            .await
            .unwrap();

        let results = store
            .search(query(vec![1.0], 10, DistanceMetric::Dot))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_search_wrong_query_dimension() {
        let store = MemoryStore::new(3);
        let err = store
            .search(query(vec![1.0], 1, DistanceMetric::Cosine))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let store = MemoryStore::new(2);
        let results = store
            .search(query(vec![1.0, 0.0], 4, DistanceMetric::Cosine))
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
