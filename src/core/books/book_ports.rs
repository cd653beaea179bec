// Ports the pipeline depends on.
// The core defines WHAT it needs from the content store and the document
// parser; infra provides the Google Drive and PDF implementations, and tests
// provide in-memory fakes.

use super::book_models::{CatalogEntry, Session};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Hard failures of the fetch pipeline.
#[derive(Debug, Error)]
pub enum BookError {
    #[error("No credentials available")]
    MissingCredentials,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while reading text out of a downloaded document.
/// These never leave the extraction stage.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to open document: {0}")]
    Open(String),

    #[error("Failed to extract page {index}: {reason}")]
    Page { index: usize, reason: String },

    #[error("Extraction task failed: {0}")]
    Join(String),
}

// ============================================================================
// REMOTE CONTENT STORE
// ============================================================================

/// A download in progress, consumed chunk by chunk.
#[async_trait]
pub trait ChunkStream: Send {
    /// Next chunk of bytes, or `None` once the transfer is complete.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, BookError>;
}

/// Listing and downloading files from the remote store.
#[async_trait]
pub trait BookCatalog: Send + Sync {
    /// Files in `folder_id` with the given MIME type, in the store's order.
    async fn list_files(
        &self,
        session: &Session,
        folder_id: &str,
        mime_type: &str,
    ) -> Result<Vec<CatalogEntry>, BookError>;

    /// Starts downloading `file_id` in chunks of at most `chunk_size` bytes.
    async fn open_download(
        &self,
        session: &Session,
        file_id: &str,
        chunk_size: usize,
    ) -> Result<Box<dyn ChunkStream>, BookError>;
}

// ============================================================================
// DOCUMENT PARSER
// ============================================================================

/// An opened document with addressable pages.
pub trait PagedDocument {
    fn page_count(&mut self) -> Result<usize, ExtractionError>;

    /// Text of one page. `Ok(None)` means the page has no text layer.
    fn page_text(&mut self, index: usize) -> Result<Option<String>, ExtractionError>;
}

/// Opens documents from local storage.
///
/// Parsing is blocking work, so callers run it off the async executor.
pub trait DocumentReader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn PagedDocument>, ExtractionError>;
}
