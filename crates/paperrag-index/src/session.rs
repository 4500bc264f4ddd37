//! Per-document session state.

use paperrag_core::{IndexError, QueryResult, Result};
use paperrag_query::AnswerGenerator;
use paperrag_store::IndexHandle;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::indexer::{DocumentIndexer, IndexBuild};

/// Whether a session has a queryable index.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No index yet, or the last build failed
    #[default]
    Unbuilt,
    /// A complete index is available
    Built(IndexHandle),
}

/// A caller-owned session over one document.
///
/// Questions are only accepted once [`DocumentSession::build`] has
/// succeeded. A failed build leaves the session `Unbuilt`; a failed question
/// leaves it `Built`.
pub struct DocumentSession {
    indexer: Arc<DocumentIndexer>,
    answerer: Arc<AnswerGenerator>,
    state: SessionState,
}

impl DocumentSession {
    /// Create an unbuilt session.
    pub fn new(indexer: Arc<DocumentIndexer>, answerer: Arc<AnswerGenerator>) -> Self {
        Self {
            indexer,
            answerer,
            state: SessionState::Unbuilt,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether questions can be asked.
    #[must_use]
    pub fn is_built(&self) -> bool {
        matches!(self.state, SessionState::Built(_))
    }

    /// The index, once built.
    #[must_use]
    pub fn handle(&self) -> Option<&IndexHandle> {
        match &self.state {
            SessionState::Built(handle) => Some(handle),
            SessionState::Unbuilt => None,
        }
    }

    /// Build (or reuse) the index of the document at `path`.
    pub async fn build(&mut self, path: &Path, force: bool) -> Result<IndexBuild> {
        self.state = SessionState::Unbuilt;

        match self.indexer.open_or_build(path, force).await {
            Ok(build) => {
                self.state = SessionState::Built(build.handle.clone());
                Ok(build)
            }
            Err(e) => {
                warn!("Build failed for {:?}: {}", path, e);
                Err(e)
            }
        }
    }

    /// Summarize the document.
    pub async fn summarize(&self) -> Result<QueryResult> {
        let handle = self.require_built()?;
        self.answerer.summarize(handle).await
    }

    /// Answer a question about the document.
    pub async fn ask(&self, question: &str) -> Result<QueryResult> {
        let handle = self.require_built()?;
        self.answerer.answer(handle, question).await
    }

    /// Drop the index and return to `Unbuilt`.
    pub fn reset(&mut self) {
        self.state = SessionState::Unbuilt;
    }

    fn require_built(&self) -> Result<&IndexHandle> {
        self.handle().ok_or_else(|| IndexError::NotBuilt.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use paperrag_chunker::FixedSizeChunker;
    use paperrag_core::{ChunkConfig, DistanceMetric, Error, Generator, ProviderError};
    use paperrag_embed::{EmbedderPool, HashEmbedder};
    use paperrag_extract::LoaderRegistry;
    use paperrag_store::VectorIndex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::{tempdir, TempDir};

    /// Echoes a fixed reply; fails while `fail` is set.
    struct ToggleGenerator {
        fail: AtomicBool,
    }

    #[async_trait]
    impl Generator for ToggleGenerator {
        async fn generate(&self, _prompt: &str) -> std::result::Result<String, ProviderError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(ProviderError::Network("connection reset".to_string()))
            } else {
                Ok("Introduction. Methodology. Results. Conclusion.".to_string())
            }
        }
    }

    fn session(dir: &TempDir, generator: Arc<ToggleGenerator>) -> DocumentSession {
        let pool = Arc::new(EmbedderPool::new(Arc::new(HashEmbedder::new()), 2));
        let index = Arc::new(VectorIndex::new(dir.path().join("indices"), DistanceMetric::Cosine));
        let indexer = DocumentIndexer::new(
            Arc::new(LoaderRegistry::with_defaults()),
            Arc::new(FixedSizeChunker::new()),
            ChunkConfig::default(),
            pool.clone(),
            index.clone(),
        )
        .unwrap();
        let answerer = AnswerGenerator::new(index, pool, generator);
        DocumentSession::new(Arc::new(indexer), Arc::new(answerer))
    }

    fn ok_generator() -> Arc<ToggleGenerator> {
        Arc::new(ToggleGenerator {
            fail: AtomicBool::new(false),
        })
    }

    #[tokio::test]
    async fn test_query_before_build_is_not_built() {
        let dir = tempdir().unwrap();
        let session = session(&dir, ok_generator());

        assert!(!session.is_built());
        assert!(matches!(
            session.ask("anything").await.unwrap_err(),
            Error::Index(IndexError::NotBuilt)
        ));
        assert!(matches!(
            session.summarize().await.unwrap_err(),
            Error::Index(IndexError::NotBuilt)
        ));
    }

    #[tokio::test]
    async fn test_build_then_ask() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paper.txt");
        std::fs::write(&path, "We evaluate on three datasets.").unwrap();

        let mut session = session(&dir, ok_generator());
        let build = session.build(&path, false).await.unwrap();

        assert!(!build.reused);
        assert!(session.is_built());
        let result = session.summarize().await.unwrap();
        assert_eq!(result.cited_chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_build_leaves_unbuilt() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("paper.txt");
        std::fs::write(&good, "content").unwrap();

        let mut session = session(&dir, ok_generator());
        session.build(&good, false).await.unwrap();
        assert!(session.is_built());

        let err = session
            .build(&dir.path().join("missing.txt"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Load(_)));
        assert!(!session.is_built());

        // Retrying the whole build works
        session.build(&good, false).await.unwrap();
        assert!(session.is_built());
    }

    #[tokio::test]
    async fn test_failed_query_keeps_built() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paper.txt");
        std::fs::write(&path, "content").unwrap();

        let generator = ok_generator();
        let mut session = session(&dir, generator.clone());
        session.build(&path, false).await.unwrap();

        generator.fail.store(true, Ordering::SeqCst);
        let err = session.ask("question").await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(session.is_built());

        generator.fail.store(false, Ordering::SeqCst);
        assert!(session.ask("question").await.is_ok());
    }

    #[tokio::test]
    async fn test_reset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paper.txt");
        std::fs::write(&path, "content").unwrap();

        let mut session = session(&dir, ok_generator());
        session.build(&path, false).await.unwrap();
        session.reset();

        assert!(!session.is_built());
        assert!(session.handle().is_none());
        assert!(matches!(session.state(), SessionState::Unbuilt));
    }
}
