//! Embedder pool for batched, concurrent embedding.

use futures::stream::{self, StreamExt, TryStreamExt};
use paperrag_core::{Embedder, Embedding, ProviderError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Default number of texts per provider request.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default number of requests in flight.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Pool of embedding requests with concurrency control.
pub struct EmbedderPool {
    /// Embedder used for both chunks and queries
    embedder: Arc<dyn Embedder>,
    /// Semaphore to limit concurrent requests
    semaphore: Semaphore,
    /// Maximum concurrent requests
    max_concurrent: usize,
    /// Texts per request
    batch_size: usize,
}

impl EmbedderPool {
    /// Create a new embedder pool.
    pub fn new(embedder: Arc<dyn Embedder>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            embedder,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the number of texts sent per request.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Get the model name.
    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Get the underlying embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    /// Embed a single batch, holding one permit for the duration of the request.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, ProviderError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ProviderError::Network(format!("semaphore error: {e}")))?;

        let vectors = self.embedder.embed_text(texts).await?;
        if vectors.len() != texts.len() {
            return Err(ProviderError::MalformedResponse(format!(
                "{} embeddings returned for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    /// Embed any number of texts, splitting them into batches.
    ///
    /// Up to `max_concurrent` batches are in flight at once. The output has
    /// one vector per input, in input order. The first failing batch aborts
    /// the whole call.
    pub async fn embed_all(&self, texts: &[&str]) -> Result<Vec<Embedding>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Embedding {} texts in batches of {} ({} concurrent)",
            texts.len(),
            self.batch_size,
            self.max_concurrent
        );

        let batches: Vec<Vec<Embedding>> = stream::iter(texts.chunks(self.batch_size))
            .map(|batch| self.embed_batch(batch))
            .buffered(self.max_concurrent)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    /// Embed a single query.
    pub async fn embed_query(&self, query: &str) -> Result<Embedding, ProviderError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ProviderError::Network(format!("semaphore error: {e}")))?;

        self.embedder.embed_query(query).await
    }

    /// Get pool statistics.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get max concurrent operations.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Get the batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}
