// Entry point of the textbook fetcher.
//
// **Architecture Overview:**
// - `core/` = Pipeline logic and the ports it depends on (platform-agnostic)
// - `infra/` = Implementations of those ports (Google Drive, PDF parsing)
//
// This file's job is to:
// 1. Load configuration
// 2. Acquire credentials (a missing key is a normal "no credentials" outcome)
// 3. Wire the services together
// 4. Run one lookup and report the result

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use crate::core::books::{
    validate_classification, BookConfig, BookOutcome, BookService, ClassificationInput,
    TextExtractor,
};
use crate::core::diagnostics::RingBufferLog;
use crate::infra::google_drive::{acquire_session, GoogleDriveClient, ServiceAccountAuth};
use crate::infra::pdf::PdfOxideReader;

const USAGE: &str = "usage: textbook_fetcher <stage> <grade> <language>";

/// Positional arguments win; `BOOK_STAGE`, `BOOK_GRADE` and `BOOK_LANGUAGE`
/// fill in whatever is missing.
fn read_input() -> anyhow::Result<ClassificationInput> {
    let mut args = std::env::args().skip(1);
    let mut next = |env_key: &str| {
        args.next()
            .or_else(|| std::env::var(env_key).ok())
            .unwrap_or_default()
    };

    let stage = next("BOOK_STAGE");
    let grade = next("BOOK_GRADE");
    let language = next("BOOK_LANGUAGE");

    if stage.is_empty() && grade.is_empty() && language.is_empty() {
        bail!("no classification given\n{}", USAGE);
    }

    Ok(ClassificationInput::new(stage, grade, language))
}

async fn run() -> anyhow::Result<BookOutcome> {
    let config = BookConfig::from_env().context("Invalid book configuration")?;
    let input = read_input()?;

    if config.strict_classification {
        let tokens = validate_classification(&input)?;
        tracing::info!(tokens = %tokens, "Classification validated");
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let diagnostics = Arc::new(RingBufferLog::new(config.diagnostics_capacity));
    let extractor = TextExtractor::new(Arc::new(PdfOxideReader::new()), config.max_pages);
    let diagnostics_file = config.diagnostics_file.clone();
    let service = BookService::new(
        GoogleDriveClient::new(),
        extractor,
        diagnostics.clone(),
        config,
    );

    // Credentials are optional: their absence becomes `BookOutcome::NoCredentials`.
    let credentials = ServiceAccountAuth::from_env().await;
    let session = acquire_session(credentials, diagnostics.as_ref()).await;
    let outcome = service.fetch_book(session.as_ref(), &input).await;

    // Best-effort: a failed dump never changes the outcome.
    if let Some(path) = diagnostics_file {
        match diagnostics.to_json() {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(&path, json).await {
                    tracing::warn!("Failed to write diagnostics to {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialise diagnostics: {}", e),
        }
    }
    tracing::debug!(events = diagnostics.len(), "Diagnostic log size");

    Ok(outcome)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(outcome) => {
            eprintln!("{}", outcome.summary());
            if let BookOutcome::Success(result) = &outcome {
                println!("{}", result.text);
            }
            if outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
