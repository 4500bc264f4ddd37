//! PDF document loader.
//!
//! Uses lopdf to parse the document and extract the text of each page.

use async_trait::async_trait;
use lopdf::Document;
use paperrag_core::{DocumentLoader, LoadError, PageRecord};
use std::path::Path;
use tracing::{debug, warn};

use crate::registry::read_document;

/// Loader for PDF files.
pub struct PdfLoader;

impl PdfLoader {
    /// Create a new PDF loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    async fn load(&self, path: &Path) -> Result<Vec<PageRecord>, LoadError> {
        debug!("Loading PDF: {:?}", path);

        let bytes = read_document(path).await?;

        // lopdf parsing is CPU bound
        let pages = tokio::task::spawn_blocking(move || extract_pages(&bytes))
            .await
            .map_err(|e| LoadError::Failed(format!("Task join error: {e}")))??;

        debug!("Loaded {} pages from {:?}", pages.len(), path);
        Ok(pages)
    }
}

/// Parse PDF bytes and extract the text of every page, in page order.
pub(crate) fn extract_pages(bytes: &[u8]) -> Result<Vec<PageRecord>, LoadError> {
    let doc = Document::load_mem(bytes).map_err(|e| LoadError::InvalidPdf(e.to_string()))?;

    // BTreeMap keyed by 1-based page number
    let pages = doc.get_pages();
    let mut records = Vec::with_capacity(pages.len());

    for page_num in pages.keys() {
        let text = match doc.extract_text(&[*page_num]) {
            Ok(text) => text.trim_end().to_string(),
            Err(e) => {
                warn!("Failed to extract text from page {}: {}", page_num, e);
                String::new()
            }
        };
        records.push(PageRecord::new(page_num.saturating_sub(1), text));
    }

    Ok(records)
}
