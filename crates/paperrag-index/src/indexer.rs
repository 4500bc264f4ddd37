//! Document indexing pipeline.

use paperrag_core::{Chunk, ChunkConfig, Chunker, DocumentId, IndexManifest, Result};
use paperrag_embed::EmbedderPool;
use paperrag_extract::{document_id, LoaderRegistry};
use paperrag_store::{IndexHandle, VectorIndex};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const DIMENSION_CHECK_TEXT: &str = "dimension check";

/// A loaded and chunked document, ready to be embedded.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    /// Content-derived identity
    pub document_id: DocumentId,
    /// Path the document was loaded from
    pub source_path: PathBuf,
    /// Number of pages loaded
    pub page_count: usize,
    /// Chunks in original order
    pub chunks: Vec<Chunk>,
}

/// Outcome of [`DocumentIndexer::open_or_build`].
#[derive(Debug, Clone)]
pub struct IndexBuild {
    /// The queryable index
    pub handle: IndexHandle,
    /// Whether an existing index was reused instead of rebuilt
    pub reused: bool,
}

/// Builds document indices.
pub struct DocumentIndexer {
    /// Loaders by file type
    loaders: Arc<LoaderRegistry>,
    /// Chunking strategy
    chunker: Arc<dyn Chunker>,
    /// Chunking parameters
    chunk_config: ChunkConfig,
    /// Embedder pool
    embedder: Arc<EmbedderPool>,
    /// Index storage
    index: Arc<VectorIndex>,
}

impl DocumentIndexer {
    /// Create a new indexer. Fails if the chunking parameters are invalid.
    pub fn new(
        loaders: Arc<LoaderRegistry>,
        chunker: Arc<dyn Chunker>,
        chunk_config: ChunkConfig,
        embedder: Arc<EmbedderPool>,
        index: Arc<VectorIndex>,
    ) -> Result<Self> {
        chunk_config.validate()?;
        Ok(Self {
            loaders,
            chunker,
            chunk_config,
            embedder,
            index,
        })
    }

    /// Chunking parameters.
    #[must_use]
    pub fn chunk_config(&self) -> ChunkConfig {
        self.chunk_config
    }

    /// Index storage.
    #[must_use]
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Embedder pool.
    #[must_use]
    pub fn embedder(&self) -> &Arc<EmbedderPool> {
        &self.embedder
    }

    /// Load and chunk a document without embedding it.
    pub async fn prepare(&self, path: &Path) -> Result<PreparedDocument> {
        let id = document_id(path).await?;
        self.prepare_with_id(id, path).await
    }

    async fn prepare_with_id(&self, document_id: DocumentId, path: &Path) -> Result<PreparedDocument> {
        let pages = self.loaders.load(path).await?;
        let chunks = self.chunker.chunk(&pages, &self.chunk_config)?;

        debug!(
            "Prepared {:?}: {} pages, {} chunks ({})",
            path,
            pages.len(),
            chunks.len(),
            self.chunker.name()
        );

        Ok(PreparedDocument {
            document_id,
            source_path: path.to_path_buf(),
            page_count: pages.len(),
            chunks,
        })
    }

    /// Return the index of the document at `path`, building it if needed.
    ///
    /// An existing index of the same document is reused when it was built
    /// with the current chunking parameters and embedding model, and the
    /// embedder still produces vectors of the stored dimension, unless
    /// `force` is set. Otherwise the index is rebuilt from scratch.
    pub async fn open_or_build(&self, path: &Path, force: bool) -> Result<IndexBuild> {
        let id = document_id(path).await?;

        if !force {
            if let Some(handle) = self.index.open(&id).await? {
                if self.is_current(handle.manifest()).await? {
                    info!(
                        "Reusing index for {:?} ({} chunks)",
                        path,
                        handle.chunk_count()
                    );
                    return Ok(IndexBuild {
                        handle,
                        reused: true,
                    });
                }
                info!("Existing index for {:?} is outdated, rebuilding", path);
            }
        }

        let prepared = self.prepare_with_id(id, path).await?;
        let handle = self
            .index
            .build(
                &prepared.document_id,
                &prepared.source_path,
                prepared.chunks,
                &self.embedder,
                Some(self.chunk_config),
            )
            .await?;

        Ok(IndexBuild {
            handle,
            reused: false,
        })
    }

    async fn is_current(&self, manifest: &IndexManifest) -> Result<bool> {
        if manifest.chunk_config != Some(self.chunk_config)
            || manifest.embedding_model != self.embedder.model_name()
        {
            return Ok(false);
        }

        // Same model name can still mean another dimension (different server)
        let dimension = self.embedder.embed_query(DIMENSION_CHECK_TEXT).await?.len();
        if dimension != manifest.dimension {
            debug!(
                "Embedder dimension {} differs from stored {}",
                dimension, manifest.dimension
            );
            return Ok(false);
        }
        Ok(true)
    }
}
