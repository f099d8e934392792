// Boundary between text extraction (file -> pages) and the clause pipeline
// (pages -> records). PDF rendering and OCR live outside this crate; a
// source only has to hand back per-page text.

use crate::error::ExtractError;
use crate::types::Document;
use std::path::Path;

/// Converts a file into per-page text.
pub trait TextSource: Send + Sync {
    /// Decode raw file bytes into pages, in reading order.
    fn extract_pages(&self, path: &Path, bytes: &[u8]) -> Result<Vec<String>, ExtractError>;

    /// Read the file and join its pages into a document.
    ///
    /// Any failure here is fatal for this document only.
    fn load_document(&self, path: &Path) -> Result<Document, ExtractError> {
        if !self.supports_file_type(path) {
            return Err(ExtractError::UnsupportedSource(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).map_err(|source| ExtractError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let pages = self.extract_pages(path, &bytes)?;
        tracing::debug!(source = self.name(), path = %path.display(), pages = pages.len(), "loaded document");
        Ok(Document::from_pages(path.display().to_string(), &pages))
    }

    /// Source name for logging
    fn name(&self) -> &str;

    fn supports_file_type(&self, path: &Path) -> bool;
}
