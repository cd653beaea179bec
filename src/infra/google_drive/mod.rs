// =============================================================================
// GOOGLE DRIVE MODULE
// =============================================================================
//
// Remote content store for the textbook pipeline. This lives in the infra
// layer because it does HTTP against Google APIs; the core only knows about
// the `BookCatalog` port and an opaque `Session`.
//
// **Calls used:**
// - `files.list` filtered by parent folder and MIME type (single page)
// - `files.get?alt=media` with `Range` requests for chunked downloads
//
// Authentication is a service account whose email has Viewer access to the
// textbook folder (see `service_account.rs`).

pub mod drive_client;
pub mod service_account;

pub use drive_client::GoogleDriveClient;
pub use service_account::{acquire_session, ServiceAccountAuth};
