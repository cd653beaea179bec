// Textbook lookup: classification tokens, catalog matching, download and
// text extraction.
#![allow(unused_imports)]

pub mod book_config;
pub mod book_models;
pub mod book_ports;
pub mod book_service;
pub mod matcher;
pub mod retriever;
pub mod text_extractor;
pub mod tokenizer;

pub use book_config::{BookConfig, ConfigError};
pub use book_models::{
    BookOutcome, CatalogEntry, ClassificationInput, Dimension, ExtractionResult, FailurePolicy,
    MatchResult, PipelineStage, RetrievedDocument, Session, TokenSet,
};
pub use book_ports::{
    BookCatalog, BookError, ChunkStream, DocumentReader, ExtractionError, PagedDocument,
};
pub use book_service::BookService;
pub use text_extractor::TextExtractor;
pub use tokenizer::{tokenize, validate_classification, ClassificationError};
