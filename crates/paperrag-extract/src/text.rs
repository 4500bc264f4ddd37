//! Plain text document loader.

use async_trait::async_trait;
use paperrag_core::{DocumentLoader, LoadError, PageRecord};
use std::path::Path;
use tracing::debug;

use crate::registry::read_document;

/// Page separator in plain text exports (form feed).
const PAGE_BREAK: char = '\x0C';

/// Loader for UTF-8 text files.
///
/// Text exported from PDFs (e.g. by `pdftotext`) separates pages with a form
/// feed; each segment becomes one page. A file without form feeds is a
/// single page.
pub struct TextLoader;

impl TextLoader {
    /// Create a new text loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentLoader for TextLoader {
    fn extensions(&self) -> &[&str] {
        &["txt", "text", "md", "markdown"]
    }

    async fn load(&self, path: &Path) -> Result<Vec<PageRecord>, LoadError> {
        debug!("Loading text document: {:?}", path);

        let bytes = read_document(path).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| LoadError::Failed(format!("file is not valid UTF-8: {e}")))?;

        Ok(split_pages(&text))
    }
}

/// Split text into pages at form feeds.
fn split_pages(text: &str) -> Vec<PageRecord> {
    text.split(PAGE_BREAK)
        .enumerate()
        .map(|(i, page)| PageRecord::new(i as u32, page))
        .collect()
}
