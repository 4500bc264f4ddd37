//! Document indexing pipeline and sessions for paperrag.
//!
//! The pipeline runs load → chunk → embed → store:
//!
//! - [`DocumentIndexer`]: turns a file into a persisted, queryable index,
//!   reusing an existing index of the same document unless forced
//! - [`DocumentSession`]: the caller-owned `Unbuilt`/`Built` state machine
//!   that gates questions on a completed build
//!
//! # Example
//!
//! ```rust,ignore
//! use paperrag_index::{DocumentIndexer, DocumentSession};
//!
//! let mut session = DocumentSession::new(indexer, answerer);
//! session.build(Path::new("paper.pdf"), false).await?;
//!
//! let summary = session.summarize().await?;
//! let answer = session.ask("Which dataset is used?").await?;
//! ```

pub mod indexer;
pub mod session;

pub use indexer::{DocumentIndexer, IndexBuild, PreparedDocument};
pub use session::{DocumentSession, SessionState};
