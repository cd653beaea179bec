// The book pipeline: tokenize → list → match → download → extract.
//
// Stages run strictly one after another. Every failure is turned into a
// `BookOutcome` instead of being raised, and every failure is also written to
// the diagnostic sink. Listing and download failures are fatal; extraction
// applies its own `FailurePolicy` inside `TextExtractor::extract`.

use super::book_config::BookConfig;
use super::book_models::{
    BookOutcome, ClassificationInput, MatchResult, PipelineStage, Session,
};
use super::book_ports::BookCatalog;
use super::matcher::match_candidates;
use super::retriever::retrieve;
use super::text_extractor::TextExtractor;
use super::tokenizer::tokenize_input;
use crate::core::diagnostics::{DiagnosticEvent, DiagnosticSink};
use serde_json::json;
use std::sync::Arc;

pub struct BookService<C: BookCatalog> {
    catalog: C,
    extractor: TextExtractor,
    diagnostics: Arc<dyn DiagnosticSink>,
    config: BookConfig,
}

impl<C: BookCatalog> BookService<C> {
    pub fn new(
        catalog: C,
        extractor: TextExtractor,
        diagnostics: Arc<dyn DiagnosticSink>,
        config: BookConfig,
    ) -> Self {
        Self {
            catalog,
            extractor,
            diagnostics,
            config,
        }
    }

    fn record(&self, name: &str, payload: serde_json::Value) {
        self.diagnostics.record(DiagnosticEvent::new(name, payload));
    }

    fn fail(&self, stage: PipelineStage, reason: String) -> BookOutcome {
        tracing::error!(stage = %stage, reason = %reason, "Book pipeline failed");
        BookOutcome::RetrievalFailure { stage, reason }
    }

    /// Runs the whole pipeline for one classification.
    ///
    /// Without a session nothing remote is touched.
    pub async fn fetch_book(
        &self,
        session: Option<&Session>,
        input: &ClassificationInput,
    ) -> BookOutcome {
        let Some(session) = session else {
            tracing::warn!("No credentials; skipping book lookup");
            self.record("missing_credentials", json!({}));
            return BookOutcome::NoCredentials;
        };

        let tokens = tokenize_input(input);
        tracing::info!(tokens = %tokens, "Resolved classification tokens");
        self.record(
            "tokens_resolved",
            json!({
                "stage": input.stage,
                "grade": input.grade,
                "language": input.language,
                "tokens": tokens.as_slice(),
                "missing": tokens.missing_dimensions(),
            }),
        );

        let candidates = match self
            .catalog
            .list_files(session, &self.config.folder_id, &self.config.mime_type)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                self.record(
                    "catalog_failed",
                    json!({ "folder": self.config.folder_id, "error": e.to_string() }),
                );
                return self.fail(PipelineStage::Query, e.to_string());
            }
        };
        self.record(
            "catalog_listed",
            json!({ "folder": self.config.folder_id, "count": candidates.len() }),
        );

        let entry = match match_candidates(&tokens, &candidates) {
            MatchResult::Found(entry) => entry,
            MatchResult::NoMatch {
                tokens,
                candidate_names,
            } => {
                tracing::info!(
                    tokens = %tokens,
                    candidates = candidate_names.len(),
                    "No book matched"
                );
                self.record(
                    "no_match",
                    json!({ "tokens": tokens.as_slice(), "candidates": candidate_names }),
                );
                return BookOutcome::NoMatch {
                    tokens,
                    candidate_names,
                };
            }
        };
        tracing::info!(file = %entry.name, id = %entry.id, "Matched book");
        self.record("match_found", json!({ "id": entry.id, "name": entry.name }));

        let document = match retrieve(
            &self.catalog,
            session,
            &entry,
            &self.config.download_dir,
            self.config.chunk_size,
        )
        .await
        {
            Ok(document) => document,
            Err(e) => {
                self.record(
                    "download_failed",
                    json!({ "id": entry.id, "name": entry.name, "error": e.to_string() }),
                );
                return self.fail(PipelineStage::Retrieve, e.to_string());
            }
        };
        self.record(
            "download_complete",
            json!({
                "name": document.source_name,
                "path": document.local_path.display().to_string(),
                "bytes": document.size_bytes,
            }),
        );

        match self
            .extractor
            .extract(&document, self.diagnostics.as_ref())
            .await
        {
            Ok(result) => BookOutcome::Success(result),
            Err(e) => self.fail(PipelineStage::Extract, e.to_string()),
        }
    }
}
