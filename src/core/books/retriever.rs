// Streams a matched catalog entry to local storage.
//
// The destination is overwritten unconditionally and there is no resume or
// retry: any error in the chunk loop fails the whole retrieval. A partially
// written file can be left behind on failure.

use super::book_models::{CatalogEntry, RetrievedDocument, Session};
use super::book_ports::{BookCatalog, BookError};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Local file path for `entry` inside `dir`.
///
/// Path separators in the remote name are replaced so the file always lands
/// directly in `dir`; an empty name falls back to the file id.
pub fn destination_path(dir: &Path, entry: &CatalogEntry) -> PathBuf {
    let cleaned: String = entry
        .name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect();

    let file_name = match cleaned.as_str() {
        "" | "." | ".." => format!("{}.pdf", entry.id),
        _ => cleaned,
    };

    dir.join(file_name)
}

pub async fn retrieve<C: BookCatalog + ?Sized>(
    catalog: &C,
    session: &Session,
    entry: &CatalogEntry,
    download_dir: &Path,
    chunk_size: usize,
) -> Result<RetrievedDocument, BookError> {
    let local_path = destination_path(download_dir, entry);

    let mut stream = catalog
        .open_download(session, &entry.id, chunk_size)
        .await?;

    tokio::fs::create_dir_all(download_dir).await?;
    // The handle is closed when `file` drops, on every exit path.
    let mut file = File::create(&local_path).await?;

    let mut size_bytes: u64 = 0;
    while let Some(chunk) = stream.next_chunk().await? {
        file.write_all(&chunk).await?;
        size_bytes += chunk.len() as u64;
        tracing::debug!(file = %entry.name, bytes = size_bytes, "Downloaded chunk");
    }
    file.flush().await?;

    tracing::info!(
        file = %entry.name,
        path = %local_path.display(),
        bytes = size_bytes,
        "Download complete"
    );

    Ok(RetrievedDocument {
        local_path,
        size_bytes,
        source_name: entry.name.clone(),
    })
}
