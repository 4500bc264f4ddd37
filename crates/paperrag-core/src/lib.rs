//! # paperrag-core
//!
//! Core types and traits for paperrag, a retrieval-augmented question answering
//! tool for a single academic paper.
//!
//! This crate provides the foundational abstractions used throughout paperrag:
//!
//! - **Document Loading**: [`DocumentLoader`] trait for turning a file into pages
//! - **Chunking**: [`Chunker`] trait for splitting pages into overlapping chunks
//! - **Embedding**: [`Embedder`] capability for converting text to vectors
//! - **Vector Storage**: [`VectorStore`] trait for storing and searching embeddings
//! - **Generation**: [`Generator`] capability for calling a language model
//!
//! ## Architecture
//!
//! ```text
//! PDF -> DocumentLoader -> Chunker -> Embedder -> VectorStore
//!                                                     |
//!                     question -> Embedder -> top-k chunks -> prompt -> Generator
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PageRecord`] | Text of one page of the source document |
//! | [`Chunk`] | A bounded window of page text, the unit of retrieval |
//! | [`EmbeddedChunk`] | A chunk together with its embedding vector |
//! | [`DocumentId`] | Content-derived identity of a source document |
//! | [`RetrievedChunk`] | A chunk returned by a search, with its score |
//! | [`QueryResult`] | Generated answer plus the chunks it was grounded on |
//!
//! ## Related Crates
//!
//! - `paperrag-extract`: PDF and text loaders
//! - `paperrag-chunker`: fixed-size sliding-window chunker
//! - `paperrag-embed`: embedding providers and the embedder pool
//! - `paperrag-store`: document-scoped vector index
//! - `paperrag-query`: prompt composition and answer generation
//! - `paperrag-index`: build pipeline and session state machine

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ConfigError, Error, GenerationError, IndexError, LoadError, ProviderError, Result};
pub use traits::*;
pub use types::*;
