use serde::{Deserialize, Serialize};

/// A page with at least one line matching the query, lines verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    pub lines: Vec<String>,
}
