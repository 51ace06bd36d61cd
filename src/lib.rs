//! Versioned document store backed by a git working tree.
//!
//! Pages, uploaded files and settings blobs are plain files in a git
//! repository; every write is a commit, so every prior revision, its author
//! and its message stay reachable.
//!
//! - `git::paths`: sandboxed, case-insensitive name resolution
//! - `git::store`: the lock-guarded content store
//! - `git::history` / `git::diff`: log walks, recent changes, page diffs
//! - `git::search`: full-text scan of pages
//! - `capabilities`: narrow traits for consumers of the store

pub mod capabilities;
pub mod config;
pub mod error;
pub mod git;
pub mod models;

pub use capabilities::{ConfigBackend, DocumentReader, DocumentWriter, HistoryReader, Searcher};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use git::ContentStore;
