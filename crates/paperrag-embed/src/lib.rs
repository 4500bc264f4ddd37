//! # paperrag-embed
//!
//! Embedding providers for paperrag.
//!
//! Embeddings come from a hosted, OpenAI-compatible `/embeddings` endpoint.
//! A deterministic hash embedder is available for offline runs and tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paperrag_embed::{EmbedderPool, OpenAiEmbedder};
//! use std::sync::Arc;
//!
//! let embedder = OpenAiEmbedder::new(std::env::var("OPENAI_API_KEY")?)?;
//! let pool = EmbedderPool::new(Arc::new(embedder), 4).with_batch_size(64);
//!
//! let vectors = pool.embed_all(&["first chunk", "second chunk"]).await?;
//! ```
//!
//! ## Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`OpenAiEmbedder`] | HTTP client for OpenAI-compatible embedding APIs |
//! | [`HashEmbedder`] | Deterministic content-hash vectors, no network |
//! | [`EmbedderPool`] | Batching and concurrency limits over any embedder |

pub mod hash;
pub mod openai;
pub mod pool;

pub use hash::HashEmbedder;
pub use openai::{OpenAiEmbedder, DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL};
pub use pool::EmbedderPool;
