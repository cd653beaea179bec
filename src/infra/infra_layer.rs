// The infra module contains implementations of core traits.
// Each external system gets its own submodule.

#[path = "google_drive/mod.rs"]
pub mod google_drive;

#[path = "pdf/mod.rs"]
pub mod pdf;
