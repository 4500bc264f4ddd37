//! Fixed-size chunking strategy with overlap.

use paperrag_core::{Chunk, ChunkConfig, Chunker, ConfigError, PageRecord};
use tracing::debug;

/// Sliding-window chunker.
///
/// Each page is cut into windows of `max_chunk_length` characters that start
/// `max_chunk_length - overlap_length` characters apart. The last window of a
/// page is clipped to the end of the text. Lengths count Unicode scalar
/// values, not bytes.
pub struct FixedSizeChunker;

impl FixedSizeChunker {
    /// Create a new fixed-size chunker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for FixedSizeChunker {
    fn name(&self) -> &str {
        "fixed_size"
    }

    fn chunk(
        &self,
        pages: &[PageRecord],
        config: &ChunkConfig,
    ) -> Result<Vec<Chunk>, ConfigError> {
        config.validate()?;

        let mut chunks = Vec::new();
        for page in pages {
            chunk_page(page, config, &mut chunks);
        }

        debug!(
            "Chunked {} pages into {} chunks ({}/{})",
            pages.len(),
            chunks.len(),
            config.max_chunk_length,
            config.overlap_length
        );
        Ok(chunks)
    }
}

fn chunk_page(page: &PageRecord, config: &ChunkConfig, out: &mut Vec<Chunk>) {
    if page.text.trim().is_empty() {
        return;
    }

    let chars: Vec<char> = page.text.chars().collect();
    let total_chars = chars.len();
    let step = config.step();

    let mut start = 0;
    let mut chunk_index = 0;
    loop {
        let end = (start + config.max_chunk_length).min(total_chars);

        out.push(Chunk {
            text: chars[start..end].iter().collect(),
            source_page: page.page_number,
            chunk_index,
            char_range: start..end,
        });
        chunk_index += 1;

        if end >= total_chars {
            break;
        }
        start += step;
    }
}
