//! Retrieval-augmented answer generation.

use paperrag_core::{ConfigError, Error, GenerationError, Generator, QueryResult};
use paperrag_embed::EmbedderPool;
use paperrag_store::{IndexHandle, VectorIndex};
use std::sync::Arc;
use tracing::{debug, info};

use crate::prompt::{PromptComposer, SUMMARY_QUERY};

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 4;

/// Answers questions about an indexed document.
///
/// Each call embeds the question, retrieves the `top_k` closest chunks,
/// composes a prompt and calls the generator exactly once. Calls are
/// independent; nothing is remembered between them.
pub struct AnswerGenerator {
    index: Arc<VectorIndex>,
    embedder: Arc<EmbedderPool>,
    generator: Arc<dyn Generator>,
    composer: PromptComposer,
    top_k: usize,
}

impl AnswerGenerator {
    /// Create an answer generator with the built-in prompts.
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<EmbedderPool>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            index,
            embedder,
            generator,
            composer: PromptComposer::new(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set how many chunks are retrieved per question.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Use a custom prompt composer.
    #[must_use]
    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Chunks retrieved per question.
    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer `question` from the document behind `handle`.
    pub async fn answer(&self, handle: &IndexHandle, question: &str) -> Result<QueryResult, Error> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ConfigError::Invalid {
                field: "question",
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        debug!("Answering question: {}", question);

        let query_vector = self
            .embedder
            .embed_query(question)
            .await
            .map_err(GenerationError::Provider)?;

        let retrieved = self.index.query(handle, &query_vector, self.top_k).await?;
        let cited_chunks: Vec<_> = retrieved.into_iter().map(|r| r.chunk).collect();
        debug!("Retrieved {} chunks", cited_chunks.len());

        let prompt = self.composer.compose(&cited_chunks, question);
        let answer_text = self
            .generator
            .generate(&prompt)
            .await
            .map_err(GenerationError::Provider)?;

        if answer_text.trim().is_empty() {
            return Err(GenerationError::EmptyAnswer.into());
        }

        info!(
            "Generated answer with {} ({} chunks cited)",
            self.generator.model_name(),
            cited_chunks.len()
        );

        Ok(QueryResult {
            answer_text,
            cited_chunks,
        })
    }

    /// Summarize the document behind `handle` in the four standard sections.
    pub async fn summarize(&self, handle: &IndexHandle) -> Result<QueryResult, Error> {
        self.answer(handle, SUMMARY_QUERY).await
    }
}
