//! Page chunking for paperrag.
//!
//! Chunks never span a page boundary, so every chunk can be cited by the
//! page it came from.

pub mod fixed;

pub use fixed::FixedSizeChunker;
