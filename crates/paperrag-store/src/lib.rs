//! Vector index storage for paperrag.
//!
//! Search is exact: every stored vector is scored against the query. A paper
//! has at most a few thousand chunks, so brute force is fast and gives fully
//! deterministic results.
//!
//! # Layout
//!
//! Each document gets its own directory under the index root, named after the
//! first 16 hex characters of its [`DocumentId`](paperrag_core::DocumentId):
//!
//! ```text
//! <root>/
//!   3f2a9c0e1b7d4a55/
//!     index.json      manifest + embedded chunks
//! ```
//!
//! The snapshot is written to `index.json.tmp` and renamed into place, so a
//! reader never sees a partially written index.
//!
//! # Example
//!
//! ```rust,ignore
//! use paperrag_store::VectorIndex;
//! use paperrag_core::DistanceMetric;
//!
//! let index = VectorIndex::new(data_dir.join("indices"), DistanceMetric::Cosine);
//! let handle = index.build(&doc_id, &path, chunks, &pool, Some(config)).await?;
//! let top = index.query(&handle, &query_vector, 4).await?;
//! ```

pub mod index;
pub mod memory;

pub use index::{IndexHandle, VectorIndex, INDEX_FILE};
pub use memory::MemoryStore;
