// Domain models for the textbook pipeline.
// Nothing here knows about Google Drive or PDFs; the infra layer maps its own
// types into these. Every value is created once and never mutated afterwards.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// INPUT
// ============================================================================

/// Free-form classification text as a human typed it.
///
/// Nothing is validated here: unrecognised text just produces fewer tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationInput {
    pub stage: String,
    pub grade: String,
    pub language: String,
}

impl ClassificationInput {
    pub fn new(
        stage: impl Into<String>,
        grade: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            grade: grade.into(),
            language: language.into(),
        }
    }
}

/// The dimensions a token can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dimension {
    Stage,
    Grade,
    #[allow(dead_code)]
    Language,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Stage => "stage",
            Dimension::Grade => "grade",
            Dimension::Language => "language",
        };
        f.write_str(name)
    }
}

// ============================================================================
// TOKENS
// ============================================================================

pub const ARABIC_TOKEN: &str = "Ar";
pub const ENGLISH_TOKEN: &str = "En";

/// Ordered canonical tokens, e.g. `["Sec1", "Ar"]`.
///
/// Matching ignores the order; it's kept so diagnostics read naturally.
/// The stage and grade always collapse into a single token (`Sec1`, `Prep2`,
/// `Grade6`), so it is either present or absent as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSet {
    tokens: Vec<String>,
}

impl TokenSet {
    pub(crate) fn new(level: Option<&str>, language: &str) -> Self {
        let mut tokens = Vec::with_capacity(2);
        if let Some(level) = level {
            tokens.push(level.to_string());
        }
        tokens.push(language.to_string());

        Self { tokens }
    }

    /// Builds a token set straight from strings, bypassing the tokenizer.
    #[allow(dead_code)]
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Dimensions that failed to contribute a token.
    ///
    /// Stage and grade share one token, so when it's missing both are reported.
    /// Language always resolves (it falls back to `En`).
    pub fn missing_dimensions(&self) -> Vec<Dimension> {
        if self.has_level_token() {
            Vec::new()
        } else {
            vec![Dimension::Stage, Dimension::Grade]
        }
    }
}

impl TokenSet {
    /// Anything that isn't a language token is the stage/grade token.
    fn has_level_token(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| t != ARABIC_TOKEN && t != ENGLISH_TOKEN)
    }
}

impl fmt::Display for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.tokens.join(", "))
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// Metadata for one remote file. Only lives as long as one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Outcome of matching a token set against the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// First entry in listing order whose name holds every token.
    /// Other entries may match too; the first one wins.
    Found(CatalogEntry),
    NoMatch {
        tokens: TokenSet,
        candidate_names: Vec<String>,
    },
}

// ============================================================================
// DOCUMENTS
// ============================================================================

/// A file that was downloaded in full.
///
/// The local file is left in place; cleaning it up is the caller's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedDocument {
    pub local_path: PathBuf,
    pub size_bytes: u64,
    pub source_name: String,
}

/// Extracted text plus the document it came from.
///
/// Empty `text` is a valid result (scanned books have no text layer). Whether
/// extraction itself failed is only visible in the diagnostic log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub text: String,
    pub source_document: RetrievedDocument,
}

// ============================================================================
// SESSION
// ============================================================================

/// Authenticated session handed in by whoever owns the credentials.
///
/// The pipeline never looks inside; only the infra adapters read the token.
#[derive(Clone)]
pub struct Session {
    access_token: String,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// PIPELINE STAGES & OUTCOME
// ============================================================================

/// What a stage failure means for the rest of the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the pipeline and report a failure.
    Fatal,
    /// Record the failure and carry on with a fallback value.
    Recoverable,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    Tokenize,
    Query,
    Match,
    Retrieve,
    Extract,
}

impl PipelineStage {
    /// Only extraction is recoverable: a downloaded but unreadable book still
    /// counts as found.
    pub fn policy(self) -> FailurePolicy {
        match self {
            PipelineStage::Extract => FailurePolicy::Recoverable,
            PipelineStage::Tokenize
            | PipelineStage::Query
            | PipelineStage::Match
            | PipelineStage::Retrieve => FailurePolicy::Fatal,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Tokenize => "tokenize",
            PipelineStage::Query => "catalog query",
            PipelineStage::Match => "match",
            PipelineStage::Retrieve => "download",
            PipelineStage::Extract => "text extraction",
        };
        f.write_str(name)
    }
}

/// The single result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookOutcome {
    NoCredentials,
    NoMatch {
        tokens: TokenSet,
        candidate_names: Vec<String>,
    },
    RetrievalFailure {
        stage: PipelineStage,
        reason: String,
    },
    Success(ExtractionResult),
}

impl BookOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BookOutcome::Success(_))
    }

    /// One-line description suitable for showing to a person.
    pub fn summary(&self) -> String {
        match self {
            BookOutcome::NoCredentials => "No credentials available; nothing was fetched".into(),
            BookOutcome::NoMatch {
                tokens,
                candidate_names,
            } => format!(
                "No book matched {} among {} candidate(s): {}",
                tokens,
                candidate_names.len(),
                candidate_names.join(", ")
            ),
            BookOutcome::RetrievalFailure { stage, reason } => {
                format!("Failed during {}: {}", stage, reason)
            }
            BookOutcome::Success(result) => format!(
                "Fetched '{}' ({} bytes, {} chars of text)",
                result.source_document.source_name,
                result.source_document.size_bytes,
                result.text.chars().count()
            ),
        }
    }
}
