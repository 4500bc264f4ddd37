//! Core types for paperrag.
//!
//! ## Documents
//! - [`DocumentId`]: Content-derived identity of a source document
//! - [`PageRecord`]: Text of a single page
//!
//! ## Chunks
//! - [`Chunk`]: A window of page text, the unit of retrieval
//! - [`ChunkConfig`]: Window size and overlap
//! - [`EmbeddedChunk`]: A chunk with its embedding vector
//!
//! ## Search
//! - [`SearchQuery`]: Parameters for a vector search
//! - [`RetrievedChunk`]: A matching chunk with similarity score
//! - [`DistanceMetric`]: Vector distance calculation method
//!
//! ## Index
//! - [`IndexManifest`]: Description of a persisted index
//! - [`StoreStats`]: Store statistics
//!
//! ## Answers
//! - [`QueryResult`]: Generated answer and cited chunks
//! - [`CitedChunk`]: Page number and excerpt shown to the user

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::ConfigError;

/// An embedding vector.
pub type Embedding = Vec<f32>;

// ============================================================================
// Documents
// ============================================================================

/// Identity of a source document: the blake3 digest of its bytes.
///
/// Two files uploaded under the same name but with different contents get
/// different ids, so their indices never share a storage location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Length of the prefix used for directory names.
    pub const SHORT_LEN: usize = 16;

    /// Compute the id of a document from its raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Full hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened digest, used to name the storage directory.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..Self::SHORT_LEN.min(self.0.len())]
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text of one page of a loaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Page number (0-indexed)
    pub page_number: u32,
    /// Extracted page text
    pub text: String,
}

impl PageRecord {
    /// Create a page record.
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

// ============================================================================
// Chunks
// ============================================================================

/// A contiguous window of text taken from a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk text
    pub text: String,
    /// Page the text comes from (0-indexed)
    pub source_page: u32,
    /// Position of the chunk within its page (0-indexed)
    pub chunk_index: u32,
    /// Character range within the page text
    pub char_range: Range<usize>,
}

impl Chunk {
    /// Number of characters in the chunk.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.char_range.end - self.char_range.start
    }

    /// Ordering key reflecting the original emission order.
    #[must_use]
    pub fn order_key(&self) -> (u32, u32) {
        (self.source_page, self.chunk_index)
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum chunk length in characters
    pub max_chunk_length: usize,
    /// Characters shared by consecutive chunks of a page
    pub overlap_length: usize,
}

impl ChunkConfig {
    /// Create a config without validating it.
    #[must_use]
    pub fn new(max_chunk_length: usize, overlap_length: usize) -> Self {
        Self {
            max_chunk_length,
            overlap_length,
        }
    }

    /// Check that the window advances on every step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chunk_length == 0 {
            return Err(ConfigError::InvalidChunking(
                "max_chunk_length must be > 0".to_string(),
            ));
        }
        if self.overlap_length >= self.max_chunk_length {
            return Err(ConfigError::InvalidChunking(format!(
                "overlap_length ({}) must be smaller than max_chunk_length ({})",
                self.overlap_length, self.max_chunk_length
            )));
        }
        Ok(())
    }

    /// Distance the window moves between two chunks.
    #[must_use]
    pub fn step(&self) -> usize {
        self.max_chunk_length - self.overlap_length
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: 1000,
            overlap_length: 200,
        }
    }
}

/// A chunk paired with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// Stable identifier derived from the document id and chunk position
    pub id: Uuid,
    /// Document the chunk belongs to
    pub document_id: DocumentId,
    /// The chunk itself
    pub chunk: Chunk,
    /// Embedding vector, stored as returned by the provider
    pub vector: Embedding,
}

impl EmbeddedChunk {
    /// Pair a chunk with its vector.
    #[must_use]
    pub fn new(document_id: DocumentId, chunk: Chunk, vector: Embedding) -> Self {
        let id = chunk_uuid(&document_id, &chunk);
        Self {
            id,
            document_id,
            chunk,
            vector,
        }
    }
}

/// Deterministic chunk id: the same document and position always map to the same id.
#[must_use]
pub fn chunk_uuid(document_id: &DocumentId, chunk: &Chunk) -> Uuid {
    let name = format!(
        "{}:{}:{}",
        document_id.as_str(),
        chunk.source_page,
        chunk.chunk_index
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

// ============================================================================
// Search
// ============================================================================

/// Distance metric for vector search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
    Dot,
}

impl DistanceMetric {
    /// Score of `candidate` against `query`. Higher is always better.
    ///
    /// For [`DistanceMetric::L2`] this is the negated Euclidean distance, so
    /// sorting by descending score is sorting by ascending distance.
    #[must_use]
    pub fn score(self, query: &[f32], candidate: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(query, candidate),
            Self::Dot => query.iter().zip(candidate).map(|(a, b)| a * b).sum(),
            Self::L2 => -query
                .iter()
                .zip(candidate)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>()
                .sqrt(),
        }
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// A search query.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Query embedding
    pub embedding: Embedding,
    /// Maximum results to return
    pub limit: usize,
    /// Distance metric
    pub metric: DistanceMetric,
}

/// A chunk returned by a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// The matching chunk
    pub chunk: Chunk,
    /// Similarity score (higher is closer)
    pub score: f32,
}

// ============================================================================
// Index
// ============================================================================

/// Description of a persisted index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Document the index was built from
    pub document_id: DocumentId,
    /// Path the document was loaded from
    pub source_path: PathBuf,
    /// Embedding model used for every vector
    pub embedding_model: String,
    /// Vector dimension
    pub dimension: usize,
    /// Number of chunks stored
    pub chunk_count: usize,
    /// Chunking parameters used to produce the chunks
    pub chunk_config: Option<ChunkConfig>,
    /// When the build completed
    pub built_at: DateTime<Utc>,
}

/// Vector store statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total number of chunks
    pub total_chunks: u64,
    /// Vector dimension, once known
    pub dimension: Option<usize>,
    /// Last update time
    pub last_updated: Option<DateTime<Utc>>,
}

// ============================================================================
// Answers
// ============================================================================

/// Default number of characters shown per cited excerpt.
pub const DEFAULT_EXCERPT_CHARS: usize = 500;

/// Answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Text produced by the language model
    pub answer_text: String,
    /// Chunks the answer was conditioned on, in retrieval order
    pub cited_chunks: Vec<Chunk>,
}

impl QueryResult {
    /// Page numbers and truncated excerpts of the cited chunks.
    #[must_use]
    pub fn citations(&self, excerpt_chars: usize) -> Vec<CitedChunk> {
        self.cited_chunks
            .iter()
            .map(|chunk| CitedChunk {
                page_number: chunk.source_page,
                excerpt: excerpt(&chunk.text, excerpt_chars),
            })
            .collect()
    }
}

/// A cited passage as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedChunk {
    /// Page number (0-indexed)
    pub page_number: u32,
    /// Leading part of the chunk text
    pub excerpt: String,
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
#[must_use]
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
