use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::core::books::{BookCatalog, BookError, CatalogEntry, ChunkStream, Session};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const LIST_PAGE_SIZE: &str = "1000";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

/// Drive v3 client covering the two calls the book pipeline needs.
pub struct GoogleDriveClient {
    client: Client,
    base_url: String,
}

impl GoogleDriveClient {
    pub fn new() -> Self {
        Self::with_base_url(DRIVE_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Drive search query for non-trashed files of one type in one folder.
    pub fn folder_query(folder_id: &str, mime_type: &str) -> String {
        format!(
            "'{}' in parents and mimeType = '{}' and trashed = false",
            escape_query_literal(folder_id),
            escape_query_literal(mime_type)
        )
    }

    async fn error_from(response: reqwest::Response, what: &str) -> BookError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        BookError::Transfer(format!("Drive {} failed ({}): {}", what, status, text))
    }
}

impl Default for GoogleDriveClient {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn transfer(e: reqwest::Error) -> BookError {
    BookError::Transfer(e.to_string())
}

#[async_trait]
impl BookCatalog for GoogleDriveClient {
    async fn list_files(
        &self,
        session: &Session,
        folder_id: &str,
        mime_type: &str,
    ) -> Result<Vec<CatalogEntry>, BookError> {
        let url = format!("{}/files", self.base_url);
        let query = Self::folder_query(folder_id, mime_type);

        tracing::debug!(folder = %folder_id, mime = %mime_type, "Listing Drive folder");

        let response = self
            .client
            .get(&url)
            .bearer_auth(session.access_token())
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name),nextPageToken"),
                ("pageSize", LIST_PAGE_SIZE),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await
            .map_err(transfer)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, "listing").await);
        }

        let list: FileList = response.json().await.map_err(transfer)?;
        if list.next_page_token.is_some() {
            tracing::warn!(
                folder = %folder_id,
                "Drive listing has more pages; only the first {} files are considered",
                LIST_PAGE_SIZE
            );
        }

        tracing::info!(folder = %folder_id, files = list.files.len(), "Listed Drive folder");

        Ok(list
            .files
            .into_iter()
            .map(|f| CatalogEntry::new(f.id, f.name))
            .collect())
    }

    async fn open_download(
        &self,
        session: &Session,
        file_id: &str,
        chunk_size: usize,
    ) -> Result<Box<dyn ChunkStream>, BookError> {
        Ok(Box::new(DriveDownload {
            client: self.client.clone(),
            url: format!("{}/files/{}?alt=media", self.base_url, file_id),
            access_token: session.access_token().to_string(),
            chunk_size: chunk_size.max(1) as u64,
            offset: 0,
            total: None,
            done: false,
        }))
    }
}

// =============================================================================
// CHUNKED DOWNLOAD
// =============================================================================

/// Downloads a file with successive `Range` requests.
///
/// The first `206` response reveals the total size through `Content-Range`;
/// the stream is done once `offset` reaches it. A server that ignores `Range`
/// and answers `200` sends the whole body at once, which also ends the stream.
struct DriveDownload {
    client: Client,
    url: String,
    access_token: String,
    chunk_size: u64,
    offset: u64,
    total: Option<u64>,
    done: bool,
}

#[async_trait]
impl ChunkStream for DriveDownload {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, BookError> {
        if self.done || self.total.is_some_and(|total| self.offset >= total) {
            self.done = true;
            return Ok(None);
        }

        let end = self.offset + self.chunk_size - 1;
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.access_token)
            .header(RANGE, format!("bytes={}-{}", self.offset, end))
            .send()
            .await
            .map_err(transfer)?;

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        match response.status() {
            StatusCode::PARTIAL_CONTENT => {
                let body = response.bytes().await.map_err(transfer)?;

                if body.is_empty() {
                    self.done = true;
                    return Ok(None);
                }

                self.offset += body.len() as u64;
                self.total = total.or(self.total);
                if let Some(total) = self.total {
                    tracing::debug!(
                        downloaded = self.offset,
                        total,
                        percent = self.offset * 100 / total.max(1),
                        "Download progress"
                    );
                }
                Ok(Some(body.to_vec()))
            }
            // A full body is only usable before anything was written.
            StatusCode::OK if self.offset == 0 => {
                let body = response.bytes().await.map_err(transfer)?;
                self.offset = body.len() as u64;
                self.done = true;
                Ok(if body.is_empty() { None } else { Some(body.to_vec()) })
            }
            StatusCode::OK => {
                self.done = true;
                Err(BookError::Transfer(format!(
                    "Drive download restarted from byte 0 after {} bytes",
                    self.offset
                )))
            }
            // Range starts at or past the end: either the previous chunk was
            // the last one, or the file is empty (`bytes */0`).
            StatusCode::RANGE_NOT_SATISFIABLE
                if self.offset > 0 || total.is_some_and(|total| self.offset >= total) =>
            {
                self.done = true;
                Ok(None)
            }
            _ => Err(GoogleDriveClient::error_from(response, "download").await),
        }
    }
}

/// Total size from a `Content-Range: bytes 0-99/1234` header. `*` means unknown.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::books::retriever::retrieve;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct StubRequest {
        target: String,
        headers: Vec<(String, String)>,
    }

    impl StubRequest {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }

        /// Start offset of a `Range: bytes=a-b` header.
        fn range_start(&self) -> u64 {
            self.header("range")
                .and_then(|v| v.strip_prefix("bytes="))
                .and_then(|v| v.split_once('-'))
                .and_then(|(start, _)| start.parse().ok())
                .unwrap_or(0)
        }

        fn range_end(&self) -> Option<u64> {
            self.header("range")
                .and_then(|v| v.split_once('-'))
                .and_then(|(_, end)| end.parse().ok())
        }
    }

    struct StubResponse {
        status: &'static str,
        headers: Vec<(&'static str, String)>,
        body: Vec<u8>,
    }

    impl StubResponse {
        fn new(status: &'static str, body: impl Into<Vec<u8>>) -> Self {
            Self {
                status,
                headers: Vec::new(),
                body: body.into(),
            }
        }

        fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
            self.headers.push((name, value.into()));
            self
        }
    }

    /// Minimal HTTP/1.1 server: one request per connection, answered by `handler`.
    /// Returns the base URL and a counter of requests served.
    async fn start_stub_drive<F>(handler: F) -> (String, Arc<AtomicUsize>)
    where
        F: Fn(&StubRequest) -> StubResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handler = Arc::new(handler);
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let handler = Arc::clone(&handler);
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let mut head = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        let n = socket.read(&mut buf).await.unwrap();
                        if n == 0 {
                            return;
                        }
                        head.extend_from_slice(&buf[..n]);
                    }

                    let head = String::from_utf8_lossy(&head).to_string();
                    let mut lines = head.split("\r\n");
                    let target = lines
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                        .unwrap_or_default()
                        .to_string();
                    let headers = lines
                        .take_while(|line| !line.is_empty())
                        .filter_map(|line| line.split_once(':'))
                        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
                        .collect();

                    counter.fetch_add(1, Ordering::SeqCst);
                    let response = (*handler)(&StubRequest { target, headers });

                    let mut out = format!(
                        "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n",
                        response.status,
                        response.body.len()
                    );
                    for (name, value) in &response.headers {
                        out.push_str(&format!("{name}: {value}\r\n"));
                    }
                    out.push_str("\r\n");

                    socket.write_all(out.as_bytes()).await.unwrap();
                    socket.write_all(&response.body).await.unwrap();
                    let _ = socket.shutdown().await;
                });
            }
        });

        (base_url, requests)
    }

    /// Serves `body` honouring `Range`, like Drive's `alt=media` endpoint.
    fn ranged(body: &'static [u8]) -> impl Fn(&StubRequest) -> StubResponse {
        move |req| {
            let len = body.len() as u64;
            let start = req.range_start();
            if start >= len {
                return StubResponse::new("416 Range Not Satisfiable", Vec::new())
                    .header("content-range", format!("bytes */{len}"));
            }
            let end = req.range_end().unwrap_or(len - 1).min(len - 1);
            StubResponse::new("206 Partial Content", &body[start as usize..=end as usize])
                .header("content-range", format!("bytes {start}-{end}/{len}"))
        }
    }

    async fn drain(stream: &mut Box<dyn ChunkStream>) -> Result<Vec<Vec<u8>>, BookError> {
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next_chunk().await? {
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    async fn download(base_url: &str, chunk_size: usize) -> Box<dyn ChunkStream> {
        GoogleDriveClient::with_base_url(base_url)
            .open_download(&Session::new("t"), "file1", chunk_size)
            .await
            .unwrap()
    }

    #[test]
    fn folder_query_filters_by_parent_and_type() {
        assert_eq!(
            GoogleDriveClient::folder_query("abc123", "application/pdf"),
            "'abc123' in parents and mimeType = 'application/pdf' and trashed = false"
        );
    }

    #[test]
    fn folder_query_escapes_quotes() {
        assert_eq!(
            GoogleDriveClient::folder_query("it's", "application/pdf"),
            "'it\\'s' in parents and mimeType = 'application/pdf' and trashed = false"
        );
    }

    #[test]
    fn content_range_total_is_parsed() {
        assert_eq!(parse_content_range_total("bytes 0-1023/4096"), Some(4096));
        assert_eq!(parse_content_range_total("bytes 4000-4095/4096"), Some(4096));
        assert_eq!(parse_content_range_total("bytes 0-1023/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GoogleDriveClient::with_base_url("http://localhost:8080/drive/v3/");
        assert_eq!(client.base_url, "http://localhost:8080/drive/v3");
    }

    #[test]
    fn file_list_parses_drive_response() {
        let list: FileList = serde_json::from_str(
            r#"{"files": [{"id": "1", "name": "Math_Sec1_Ar.pdf"}], "nextPageToken": "p2"}"#,
        )
        .unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].name, "Math_Sec1_Ar.pdf");
        assert_eq!(list.next_page_token.as_deref(), Some("p2"));

        let empty: FileList = serde_json::from_str("{}").unwrap();
        assert!(empty.files.is_empty());
    }

    #[tokio::test]
    async fn open_download_does_not_touch_the_network() {
        let client = GoogleDriveClient::with_base_url("http://127.0.0.1:9");
        let stream = client
            .open_download(&Session::new("t"), "file1", 0)
            .await;
        assert!(stream.is_ok());
    }

    #[tokio::test]
    async fn download_is_chunked_and_stops_at_content_range_total() {
        let (base_url, requests) = start_stub_drive(ranged(b"0123456789")).await;

        let mut stream = download(&base_url, 4).await;
        let chunks = drain(&mut stream).await.unwrap();

        assert_eq!(chunks, vec![b"0123".to_vec(), b"4567".to_vec(), b"89".to_vec()]);
        assert_eq!(requests.load(Ordering::SeqCst), 3);
        assert!(stream.next_chunk().await.unwrap().is_none());
        assert_eq!(requests.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn download_sends_bearer_token_and_media_query() {
        let (base_url, _) = start_stub_drive(|req: &StubRequest| {
            assert_eq!(req.target, "/files/file1?alt=media");
            assert_eq!(req.header("authorization"), Some("Bearer t"));
            assert_eq!(req.header("range"), Some("bytes=0-1023"));
            StubResponse::new("206 Partial Content", "%PDF")
                .header("content-range", "bytes 0-3/4")
        })
        .await;

        let mut stream = download(&base_url, 1024).await;
        assert_eq!(drain(&mut stream).await.unwrap(), vec![b"%PDF".to_vec()]);
    }

    #[tokio::test]
    async fn empty_remote_file_downloads_as_zero_bytes() {
        let (base_url, _) = start_stub_drive(ranged(b"")).await;

        let mut stream = download(&base_url, 4).await;
        assert!(drain(&mut stream).await.unwrap().is_empty());

        let dir = tempfile::tempdir().unwrap();
        let client = GoogleDriveClient::with_base_url(&base_url);
        let document = retrieve(
            &client,
            &Session::new("t"),
            &CatalogEntry::new("file1", "Empty_Sec1_Ar.pdf"),
            dir.path(),
            4,
        )
        .await
        .unwrap();

        assert_eq!(document.size_bytes, 0);
        assert_eq!(std::fs::read(&document.local_path).unwrap(), b"");
    }

    #[tokio::test]
    async fn server_ignoring_range_sends_whole_body_once() {
        let (base_url, requests) =
            start_stub_drive(|_: &StubRequest| StubResponse::new("200 OK", "whole book")).await;

        let mut stream = download(&base_url, 4).await;

        assert_eq!(drain(&mut stream).await.unwrap(), vec![b"whole book".to_vec()]);
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsatisfiable_range_after_data_ends_download() {
        // No total in Content-Range, so the end is only found by overshooting.
        let (base_url, requests) = start_stub_drive(|req: &StubRequest| {
            if req.range_start() == 0 {
                StubResponse::new("206 Partial Content", "abcd")
                    .header("content-range", "bytes 0-3/*")
            } else {
                StubResponse::new("416 Range Not Satisfiable", Vec::new())
            }
        })
        .await;

        let mut stream = download(&base_url, 4).await;

        assert_eq!(drain(&mut stream).await.unwrap(), vec![b"abcd".to_vec()]);
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn full_body_after_partial_chunks_is_rejected() {
        let (base_url, _) = start_stub_drive(|req: &StubRequest| {
            if req.range_start() == 0 {
                StubResponse::new("206 Partial Content", "abcd")
                    .header("content-range", "bytes 0-3/*")
            } else {
                StubResponse::new("200 OK", "abcdefgh")
            }
        })
        .await;

        let mut stream = download(&base_url, 4).await;

        assert_eq!(stream.next_chunk().await.unwrap(), Some(b"abcd".to_vec()));
        let err = stream.next_chunk().await.unwrap_err();
        assert!(matches!(err, BookError::Transfer(_)), "{err}");
        assert!(stream.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unsatisfiable_first_range_without_total_is_an_error() {
        let (base_url, _) = start_stub_drive(|_: &StubRequest| {
            StubResponse::new("416 Range Not Satisfiable", Vec::new())
        })
        .await;

        let mut stream = download(&base_url, 4).await;
        let err = stream.next_chunk().await.unwrap_err();

        assert!(err.to_string().contains("416"), "{err}");
    }

    #[tokio::test]
    async fn missing_file_is_a_transfer_error() {
        let (base_url, _) =
            start_stub_drive(|_: &StubRequest| StubResponse::new("404 Not Found", "gone")).await;

        let mut stream = download(&base_url, 4).await;
        let err = stream.next_chunk().await.unwrap_err();

        assert!(matches!(err, BookError::Transfer(ref msg) if msg.contains("404")), "{err}");
    }

    #[tokio::test]
    async fn listing_sends_folder_query_and_parses_files() {
        let (base_url, _) = start_stub_drive(|req: &StubRequest| {
            assert!(req.target.starts_with("/files?"), "{}", req.target);
            assert!(req.target.contains("%27folder1%27+in+parents"), "{}", req.target);
            assert!(req.target.contains("pageSize=1000"), "{}", req.target);
            assert_eq!(req.header("authorization"), Some("Bearer t"));
            StubResponse::new(
                "200 OK",
                r#"{"files": [{"id": "a", "name": "Math_Sec1_Ar.pdf"}, {"id": "b", "name": "Physics.pdf"}]}"#,
            )
            .header("content-type", "application/json")
        })
        .await;

        let entries = GoogleDriveClient::with_base_url(&base_url)
            .list_files(&Session::new("t"), "folder1", "application/pdf")
            .await
            .unwrap();

        assert_eq!(
            entries,
            vec![
                CatalogEntry::new("a", "Math_Sec1_Ar.pdf"),
                CatalogEntry::new("b", "Physics.pdf"),
            ]
        );
    }

    #[tokio::test]
    async fn listing_error_status_is_a_transfer_error() {
        let (base_url, _) = start_stub_drive(|_: &StubRequest| {
            StubResponse::new("403 Forbidden", r#"{"error": "insufficientPermissions"}"#)
        })
        .await;

        let err = GoogleDriveClient::with_base_url(&base_url)
            .list_files(&Session::new("t"), "folder1", "application/pdf")
            .await
            .unwrap_err();

        match err {
            BookError::Transfer(msg) => {
                assert!(msg.contains("403"), "{msg}");
                assert!(msg.contains("insufficientPermissions"), "{msg}");
            }
            other => panic!("expected transfer error, got {other:?}"),
        }
    }
}
