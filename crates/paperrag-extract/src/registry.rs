//! Loader registry and document identity.

use paperrag_core::{DocumentId, DocumentLoader, LoadError, PageRecord};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use crate::pdf::PdfLoader;
use crate::text::TextLoader;

/// Registry of document loaders, selected by file extension.
pub struct LoaderRegistry {
    loaders: Vec<Arc<dyn DocumentLoader>>,
}

impl LoaderRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    /// Registry with the PDF and text loaders.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PdfLoader::new());
        registry.register(TextLoader::new());
        registry
    }

    /// Register a loader. Earlier registrations win on overlapping extensions.
    pub fn register<L: DocumentLoader + 'static>(&mut self, loader: L) {
        self.loaders.push(Arc::new(loader));
    }

    /// Get a loader that can handle a file.
    #[must_use]
    pub fn get_for_file(&self, path: &Path) -> Option<Arc<dyn DocumentLoader>> {
        self.loaders
            .iter()
            .find(|loader| loader.can_load(path))
            .cloned()
    }

    /// Load a document into pages.
    pub async fn load(&self, path: &Path) -> Result<Vec<PageRecord>, LoadError> {
        let loader = self.get_for_file(path).ok_or_else(|| {
            LoadError::UnsupportedType(
                path.extension()
                    .map_or_else(|| path.display().to_string(), |ext| ext.to_string_lossy().to_string()),
            )
        })?;

        loader.load(path).await
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Compute the identity of the document at `path` from its contents.
pub async fn document_id(path: &Path) -> Result<DocumentId, LoadError> {
    let bytes = read_document(path).await?;
    Ok(DocumentId::from_bytes(&bytes))
}

/// Read a whole document, reporting a missing file as [`LoadError::NotFound`].
pub(crate) async fn read_document(path: &Path) -> Result<Vec<u8>, LoadError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(LoadError::NotFound(path.to_path_buf())),
        Err(e) => Err(LoadError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::tests::build_pdf;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_registry_routes_pdf() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, build_pdf(&["a", "b"])).unwrap();

        let pages = LoaderRegistry::with_defaults().load(&path).await.unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[tokio::test]
    async fn test_registry_routes_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paper.txt");
        std::fs::write(&path, "only page").unwrap();

        let pages = LoaderRegistry::default().load(&path).await.unwrap();
        assert_eq!(pages, vec![PageRecord::new(0, "only page")]);
    }

    #[tokio::test]
    async fn test_registry_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paper.docx");
        std::fs::write(&path, "irrelevant").unwrap();

        let err = LoaderRegistry::with_defaults().load(&path).await.unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedType(ext) if ext == "docx"));
    }

    #[tokio::test]
    async fn test_empty_registry_has_no_loader() {
        let registry = LoaderRegistry::new();
        assert!(registry.get_for_file(Path::new("paper.pdf")).is_none());
    }

    #[tokio::test]
    async fn test_document_id_same_name_different_content() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        let a = first.path().join("paper.pdf");
        let b = second.path().join("paper.pdf");
        std::fs::write(&a, build_pdf(&["version one"])).unwrap();
        std::fs::write(&b, build_pdf(&["version two"])).unwrap();

        let id_a = document_id(&a).await.unwrap();
        let id_b = document_id(&b).await.unwrap();
        assert_ne!(id_a, id_b);
        assert_eq!(id_a, document_id(&a).await.unwrap());
    }

    #[tokio::test]
    async fn test_document_id_missing_file() {
        let err = document_id(Path::new("/nonexistent/paper.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }
}
