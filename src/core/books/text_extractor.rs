// Reads text out of a retrieved document.
//
// Only the first `max_pages` pages are read. Pages without text contribute
// nothing; a page that errors is logged and skipped. If the document can't be
// opened at all, the stage's failure policy decides: Recoverable records the
// failure once and yields empty text.

use super::book_models::{ExtractionResult, FailurePolicy, PipelineStage, RetrievedDocument};
use super::book_ports::{DocumentReader, ExtractionError, PagedDocument};
use crate::core::diagnostics::{DiagnosticEvent, DiagnosticSink};
use serde_json::json;
use std::sync::Arc;

/// Pages 0..=25, i.e. the first 26 pages.
pub const DEFAULT_MAX_PAGES: usize = 26;

const PAGE_SEPARATOR: &str = "\n";

/// Text collected from the page window, plus the pages that failed.
#[derive(Debug, Default)]
pub struct PageText {
    pub text: String,
    pub pages_read: usize,
    pub page_failures: Vec<ExtractionError>,
}

/// Walks pages in order, stopping once the index passes `max_pages - 1`.
pub fn collect_pages(
    document: &mut dyn PagedDocument,
    max_pages: usize,
) -> Result<PageText, ExtractionError> {
    let page_count = document.page_count()?;
    let mut parts: Vec<String> = Vec::new();
    let mut page_failures = Vec::new();
    let mut pages_read = 0;

    for index in 0..page_count {
        if index >= max_pages {
            break;
        }
        pages_read += 1;

        match document.page_text(index) {
            Ok(Some(text)) if !text.is_empty() => parts.push(text),
            Ok(_) => {}
            Err(e) => page_failures.push(e),
        }
    }

    Ok(PageText {
        text: parts.join(PAGE_SEPARATOR),
        pages_read,
        page_failures,
    })
}

pub struct TextExtractor {
    reader: Arc<dyn DocumentReader>,
    max_pages: usize,
}

impl TextExtractor {
    pub fn new(reader: Arc<dyn DocumentReader>, max_pages: usize) -> Self {
        Self { reader, max_pages }
    }

    #[allow(dead_code)]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Opens the document and reads the page window, off the async executor.
    pub async fn try_extract(
        &self,
        document: &RetrievedDocument,
    ) -> Result<PageText, ExtractionError> {
        let reader = Arc::clone(&self.reader);
        let path = document.local_path.clone();
        let max_pages = self.max_pages;

        tokio::task::spawn_blocking(move || {
            let mut opened = reader.open(&path)?;
            collect_pages(opened.as_mut(), max_pages)
        })
        .await
        .map_err(|e| ExtractionError::Join(e.to_string()))?
    }

    /// Extracts text, applying the extraction stage's failure policy.
    ///
    /// With the Recoverable policy this never returns `Err`: a document that
    /// can't be opened becomes an empty-text result, visible as a failure only
    /// in `diagnostics`.
    pub async fn extract(
        &self,
        document: &RetrievedDocument,
        diagnostics: &dyn DiagnosticSink,
    ) -> Result<ExtractionResult, ExtractionError> {
        let text = match self.try_extract(document).await {
            Ok(pages) => {
                for failure in &pages.page_failures {
                    tracing::warn!(file = %document.source_name, "{}", failure);
                    diagnostics.record(DiagnosticEvent::new(
                        "page_extract_failed",
                        json!({ "file": document.source_name, "error": failure.to_string() }),
                    ));
                }

                tracing::info!(
                    file = %document.source_name,
                    pages = pages.pages_read,
                    chars = pages.text.chars().count(),
                    "Text extraction complete"
                );
                diagnostics.record(DiagnosticEvent::new(
                    "extract_complete",
                    json!({
                        "file": document.source_name,
                        "pages_read": pages.pages_read,
                        "empty": pages.text.is_empty(),
                    }),
                ));
                pages.text
            }
            Err(e) => {
                diagnostics.record(DiagnosticEvent::new(
                    "extract_failed",
                    json!({ "file": document.source_name, "error": e.to_string() }),
                ));

                match PipelineStage::Extract.policy() {
                    FailurePolicy::Recoverable => {
                        tracing::warn!(
                            file = %document.source_name,
                            error = %e,
                            "Text extraction failed; continuing with empty text"
                        );
                        String::new()
                    }
                    FailurePolicy::Fatal => return Err(e),
                }
            }
        };

        Ok(ExtractionResult {
            text,
            source_document: document.clone(),
        })
    }
}
