//! Plain data types returned by the store.
//!
//! These structs are serializable so an outer layer (or the CLI) can hand
//! them straight to JSON.
//! - `commit`: LogEntry, History, RecentChange, ChangedArtifact, pages
//! - `document`: Document, FileInfo
//! - `diff`: DiffSegment, DiffOp
//! - `search`: SearchResult

pub mod commit;
pub mod diff;
pub mod document;
pub mod search;

pub use commit::*;
pub use diff::*;
pub use document::*;
pub use search::*;
