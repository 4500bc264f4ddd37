//! # paperrag-extract
//!
//! Document loaders that turn a file into ordered [`PageRecord`](paperrag_core::PageRecord)s
//! for downstream chunking.
//!
//! | Loader | Formats | Pages |
//! |--------|---------|-------|
//! | [`PdfLoader`] | `.pdf` | One record per PDF page, via `lopdf` |
//! | [`TextLoader`] | `.txt`, `.md` | Form feed (`\x0C`) separates pages |
//!
//! ```rust,ignore
//! use paperrag_extract::LoaderRegistry;
//!
//! let registry = LoaderRegistry::with_defaults();
//! let pages = registry.load(Path::new("paper.pdf")).await?;
//! ```

pub mod pdf;
pub mod registry;
pub mod text;

pub use pdf::PdfLoader;
pub use registry::{document_id, LoaderRegistry};
pub use text::TextLoader;
