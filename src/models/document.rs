use serde::{Deserialize, Serialize};

use super::LogEntry;

/// Document bytes together with the commit that produced them.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: Vec<u8>,
    pub last_modified: LogEntry,
}

/// A non-page file in the working tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
}
