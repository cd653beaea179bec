use std::path::Path;

use pdf_oxide::PdfDocument;

use crate::core::books::{DocumentReader, ExtractionError, PagedDocument};

/// Opens PDFs with `pdf_oxide` and reads text page by page.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfOxideReader;

impl PdfOxideReader {
    pub fn new() -> Self {
        Self
    }
}

struct OxidePages {
    doc: PdfDocument,
}

impl PagedDocument for OxidePages {
    fn page_count(&mut self) -> Result<usize, ExtractionError> {
        self.doc
            .page_count()
            .map_err(|e| ExtractionError::Open(format!("failed to read page count: {e}")))
    }

    fn page_text(&mut self, index: usize) -> Result<Option<String>, ExtractionError> {
        let text = self
            .doc
            .extract_text(index)
            .map_err(|e| ExtractionError::Page {
                index,
                reason: e.to_string(),
            })?;

        // Image-only pages come back empty.
        Ok(Some(text).filter(|t| !t.is_empty()))
    }
}

impl DocumentReader for PdfOxideReader {
    fn open(&self, path: &Path) -> Result<Box<dyn PagedDocument>, ExtractionError> {
        let doc = PdfDocument::open(path)
            .map_err(|e| ExtractionError::Open(format!("failed to parse PDF: {e}")))?;
        Ok(Box::new(OxidePages { doc }))
    }
}
