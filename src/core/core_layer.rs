// The core module contains the book pipeline logic and the ports it needs.
// Nothing in here talks to Google Drive or parses PDFs directly.

#[path = "books/mod.rs"]
pub mod books;

#[path = "diagnostics/mod.rs"]
pub mod diagnostics;
