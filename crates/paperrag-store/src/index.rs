//! Document-scoped vector index with on-disk snapshots.

use chrono::Utc;
use paperrag_core::{
    Chunk, ChunkConfig, DistanceMetric, DocumentId, EmbeddedChunk, Embedding, Error,
    IndexError, IndexManifest, ProviderError, RetrievedChunk, SearchQuery, VectorStore,
};
use paperrag_embed::EmbedderPool;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::memory::MemoryStore;

/// Snapshot file name inside a document directory.
pub const INDEX_FILE: &str = "index.json";

const TEMP_SUFFIX: &str = "tmp";

/// On-disk form of a built index.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    manifest: IndexManifest,
    entries: Vec<EmbeddedChunk>,
}

/// A fully built, queryable index for one document.
///
/// Only produced by [`VectorIndex::build`] or [`VectorIndex::open`], so
/// holding one means the snapshot is complete on disk.
#[derive(Clone)]
pub struct IndexHandle {
    manifest: IndexManifest,
    store: Arc<MemoryStore>,
}

impl IndexHandle {
    /// Manifest describing the index.
    #[must_use]
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Document the index was built from.
    #[must_use]
    pub fn document_id(&self) -> &DocumentId {
        &self.manifest.document_id
    }

    /// Number of indexed chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.manifest.chunk_count
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("document_id", &self.manifest.document_id)
            .field("chunk_count", &self.manifest.chunk_count)
            .field("dimension", &self.manifest.dimension)
            .finish()
    }
}

/// Builds, opens and queries per-document indices below a root directory.
pub struct VectorIndex {
    root: PathBuf,
    metric: DistanceMetric,
}

impl VectorIndex {
    /// Create an index manager rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, metric: DistanceMetric) -> Self {
        Self {
            root: root.into(),
            metric,
        }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Distance metric used by [`VectorIndex::query`].
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Storage directory of a document.
    #[must_use]
    pub fn location(&self, document_id: &DocumentId) -> PathBuf {
        self.root.join(document_id.short())
    }

    fn snapshot_path(&self, document_id: &DocumentId) -> PathBuf {
        self.location(document_id).join(INDEX_FILE)
    }

    /// Embed `chunks` and persist them as the index of `document_id`.
    ///
    /// Any previous index of the same document is replaced; the new index is
    /// always built from scratch. Fails with [`IndexError::EmptyBuild`] when
    /// there is nothing to index, and with [`IndexError::Collision`] when the
    /// storage location belongs to another document.
    pub async fn build(
        &self,
        document_id: &DocumentId,
        source_path: &Path,
        chunks: Vec<Chunk>,
        pool: &EmbedderPool,
        chunk_config: Option<ChunkConfig>,
    ) -> Result<IndexHandle, Error> {
        if chunks.is_empty() {
            return Err(IndexError::EmptyBuild.into());
        }

        let location = self.location(document_id);
        if let Some(existing) = self.read_snapshot(document_id).await? {
            if &existing.manifest.document_id != document_id {
                return Err(IndexError::Collision {
                    location,
                    existing: existing.manifest.document_id.to_string(),
                }
                .into());
            }
            debug!("Replacing existing index at {:?}", location);
        }

        info!(
            "Building index for {} ({} chunks)",
            document_id.short(),
            chunks.len()
        );

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = pool.embed_all(&texts).await?;
        let dimension = common_dimension(&vectors)?;

        let entries: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk::new(document_id.clone(), chunk, vector))
            .collect();

        let manifest = IndexManifest {
            document_id: document_id.clone(),
            source_path: source_path.to_path_buf(),
            embedding_model: pool.model_name().to_string(),
            dimension,
            chunk_count: entries.len(),
            chunk_config,
            built_at: Utc::now(),
        };

        let store = MemoryStore::new(dimension);
        store.upsert_chunks(&entries).await?;

        let snapshot = Snapshot {
            manifest: manifest.clone(),
            entries,
        };
        self.write_snapshot(&location, &snapshot).await?;

        info!(
            "Index for {} written to {:?}",
            document_id.short(),
            location
        );

        Ok(IndexHandle {
            manifest,
            store: Arc::new(store),
        })
    }

    /// Open the persisted index of `document_id`, if a complete one exists.
    pub async fn open(&self, document_id: &DocumentId) -> Result<Option<IndexHandle>, Error> {
        let Some(snapshot) = self.read_snapshot(document_id).await? else {
            return Ok(None);
        };

        if &snapshot.manifest.document_id != document_id {
            return Err(IndexError::Collision {
                location: self.location(document_id),
                existing: snapshot.manifest.document_id.to_string(),
            }
            .into());
        }
        if snapshot
            .entries
            .iter()
            .any(|entry| &entry.document_id != document_id)
        {
            return Err(IndexError::Storage(format!(
                "index at {:?} contains chunks of another document",
                self.location(document_id)
            ))
            .into());
        }

        let store = MemoryStore::new(snapshot.manifest.dimension);
        store.upsert_chunks(&snapshot.entries).await?;

        debug!(
            "Opened index for {} ({} chunks)",
            document_id.short(),
            snapshot.entries.len()
        );

        Ok(Some(IndexHandle {
            manifest: snapshot.manifest,
            store: Arc::new(store),
        }))
    }

    /// Retrieve the `k` chunks closest to `query_vector`.
    ///
    /// Results are ordered by descending score; ties keep the original chunk
    /// order.
    pub async fn query(
        &self,
        handle: &IndexHandle,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        handle
            .store
            .search(SearchQuery {
                embedding: query_vector.to_vec(),
                limit: k,
                metric: self.metric,
            })
            .await
    }

    /// Delete the persisted index of `document_id`. Returns whether one existed.
    pub async fn remove(&self, document_id: &DocumentId) -> Result<bool, Error> {
        let location = self.location(document_id);
        match tokio::fs::remove_dir_all(&location).await {
            Ok(()) => {
                info!("Removed index at {:?}", location);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_snapshot(&self, document_id: &DocumentId) -> Result<Option<Snapshot>, Error> {
        let path = self.snapshot_path(document_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!("Ignoring unreadable index at {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    async fn write_snapshot(&self, location: &Path, snapshot: &Snapshot) -> Result<(), Error> {
        tokio::fs::create_dir_all(location).await?;

        let target = location.join(INDEX_FILE);
        let temp = target.with_extension(format!("json.{TEMP_SUFFIX}"));
        let bytes = serde_json::to_vec(snapshot)?;

        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &target).await?;
        Ok(())
    }
}

/// Dimension shared by all vectors.
fn common_dimension(vectors: &[Embedding]) -> Result<usize, Error> {
    let dimension = vectors.first().map_or(0, Vec::len);
    if dimension == 0 {
        return Err(ProviderError::MalformedResponse("empty embedding vector".to_string()).into());
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(IndexError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        }
        .into());
    }
    Ok(dimension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use paperrag_core::Embedder;
    use paperrag_embed::HashEmbedder;
    use tempfile::tempdir;

    fn chunk(page: u32, index: u32, text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_page: page,
            chunk_index: index,
            char_range: 0..text.chars().count(),
        }
    }

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            chunk(0, 0, "transformers use self attention"),
            chunk(0, 1, "attention weights are learned"),
            chunk(1, 0, "results on the translation benchmark"),
            chunk(2, 0, "we thank the reviewers"),
        ]
    }

    fn hash_pool() -> EmbedderPool {
        EmbedderPool::new(Arc::new(HashEmbedder::with_dimension(64)), 2).with_batch_size(2)
    }

    /// Returns vectors whose length depends on the text, to provoke mismatches.
    struct RaggedEmbedder;

    #[async_trait]
    impl Embedder for RaggedEmbedder {
        async fn embed_text(
            &self,
            texts: &[&str],
        ) -> Result<Vec<Embedding>, ProviderError> {
            Ok(texts.iter().map(|t| vec![1.0; t.len()]).collect())
        }
    }

    // ===== Build Tests =====

    #[tokio::test]
    async fn test_build_writes_snapshot() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), DistanceMetric::Cosine);
        let doc = DocumentId::from_bytes(b"paper one");

        let handle = index
            .build(&doc, Path::new("paper.pdf"), sample_chunks(), &hash_pool(), None)
            .await
            .unwrap();

        assert_eq!(handle.chunk_count(), 4);
        assert_eq!(handle.manifest().dimension, 64);
        assert_eq!(handle.manifest().embedding_model, "blake3-hash-64");
        assert_eq!(handle.document_id(), &doc);

        let location = index.location(&doc);
        assert!(location.join(INDEX_FILE).exists());
        assert!(!location.join("index.json.tmp").exists());
        assert!(location.ends_with(doc.short()));
    }

    #[tokio::test]
    async fn test_build_empty_fails() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), DistanceMetric::Cosine);
        let doc = DocumentId::from_bytes(b"empty");

        let err = index
            .build(&doc, Path::new("empty.pdf"), vec![], &hash_pool(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Index(IndexError::EmptyBuild)));
        assert!(!index.location(&doc).exists());
    }

    #[tokio::test]
    async fn test_build_inconsistent_dimensions_fails() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), DistanceMetric::Cosine);
        let doc = DocumentId::from_bytes(b"ragged");
        let pool = EmbedderPool::new(Arc::new(RaggedEmbedder), 1);

        let err = index
            .build(
                &doc,
                Path::new("ragged.pdf"),
                vec![chunk(0, 0, "short"), chunk(0, 1, "much longer text")],
                &pool,
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Index(IndexError::DimensionMismatch { .. })
        ));
        assert!(index.open(&doc).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_build_detects_collision() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), DistanceMetric::Cosine);
        let doc = DocumentId::from_bytes(b"original");
        index
            .build(&doc, Path::new("a.pdf"), sample_chunks(), &hash_pool(), None)
            .await
            .unwrap();

        // Rewrite the manifest as if another document owned the directory
        let path = index.location(&doc).join(INDEX_FILE);
        let mut snapshot: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        snapshot["manifest"]["document_id"] = serde_json::json!("ffff");
        std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

        let err = index
            .build(&doc, Path::new("a.pdf"), sample_chunks(), &hash_pool(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Index(IndexError::Collision { .. })));

        let err = index.open(&doc).await.unwrap_err();
        assert!(matches!(err, Error::Index(IndexError::Collision { .. })));
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_index() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), DistanceMetric::Cosine);
        let doc = DocumentId::from_bytes(b"paper");

        index
            .build(&doc, Path::new("p.pdf"), sample_chunks(), &hash_pool(), None)
            .await
            .unwrap();
        index
            .build(
                &doc,
                Path::new("p.pdf"),
                vec![chunk(0, 0, "only chunk")],
                &hash_pool(),
                Some(ChunkConfig::new(500, 50)),
            )
            .await
            .unwrap();

        let reopened = index.open(&doc).await.unwrap().unwrap();
        assert_eq!(reopened.chunk_count(), 1);
        assert_eq!(
            reopened.manifest().chunk_config,
            Some(ChunkConfig::new(500, 50))
        );
        assert_eq!(reopened.store().all_chunks().await.unwrap().len(), 1);
    }

    // ===== Open Tests =====

    #[tokio::test]
    async fn test_open_missing_returns_none() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), DistanceMetric::Cosine);
        assert!(index
            .open(&DocumentId::from_bytes(b"never built"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_open_ignores_partial_write() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), DistanceMetric::Cosine);
        let doc = DocumentId::from_bytes(b"partial");

        let location = index.location(&doc);
        std::fs::create_dir_all(&location).unwrap();
        std::fs::write(location.join("index.json.tmp"), b"{\"manifest\":").unwrap();

        assert!(index.open(&doc).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_round_trip_query_matches() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), DistanceMetric::Cosine);
        let doc = DocumentId::from_bytes(b"paper");
        let pool = hash_pool();

        let built = index
            .build(&doc, Path::new("p.pdf"), sample_chunks(), &pool, None)
            .await
            .unwrap();
        let opened = index.open(&doc).await.unwrap().unwrap();

        let q = pool.embed_query("how are attention weights learned").await.unwrap();
        let a = index.query(&built, &q, 3).await.unwrap();
        let b = index.query(&opened, &q, 3).await.unwrap();

        let keys = |r: &Vec<RetrievedChunk>| {
            r.iter().map(|c| c.chunk.order_key()).collect::<Vec<_>>()
        };
        assert_eq!(keys(&a), keys(&b));
        assert_eq!(a[0].chunk.order_key(), (0, 1));
    }

    // ===== Query Tests =====

    #[tokio::test]
    async fn test_query_wrong_dimension() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), DistanceMetric::Cosine);
        let doc = DocumentId::from_bytes(b"paper");
        let handle = index
            .build(&doc, Path::new("p.pdf"), sample_chunks(), &hash_pool(), None)
            .await
            .unwrap();

        let err = index.query(&handle, &[1.0, 2.0], 4).await.unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 64,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_documents_are_isolated() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), DistanceMetric::Cosine);
        let pool = hash_pool();
        let doc_a = DocumentId::from_bytes(b"upload one of paper.pdf");
        let doc_b = DocumentId::from_bytes(b"upload two of paper.pdf");

        let handle_a = index
            .build(&doc_a, Path::new("paper.pdf"), vec![chunk(0, 0, "alpha study")], &pool, None)
            .await
            .unwrap();
        index
            .build(&doc_b, Path::new("paper.pdf"), vec![chunk(0, 0, "beta study")], &pool, None)
            .await
            .unwrap();

        assert_ne!(index.location(&doc_a), index.location(&doc_b));

        let q = pool.embed_query("beta study").await.unwrap();
        let results = index.query(&handle_a, &q, 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "alpha study");
    }

    // ===== Remove Tests =====

    #[tokio::test]
    async fn test_remove() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::new(dir.path(), DistanceMetric::Cosine);
        let doc = DocumentId::from_bytes(b"paper");
        index
            .build(&doc, Path::new("p.pdf"), sample_chunks(), &hash_pool(), None)
            .await
            .unwrap();

        assert!(index.remove(&doc).await.unwrap());
        assert!(!index.remove(&doc).await.unwrap());
        assert!(index.open(&doc).await.unwrap().is_none());
    }

    #[test]
    fn test_common_dimension() {
        assert_eq!(common_dimension(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap(), 2);
        assert!(matches!(
            common_dimension(&[vec![]]),
            Err(Error::Provider(ProviderError::MalformedResponse(_)))
        ));
    }
}
