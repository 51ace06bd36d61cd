//! Full-text page search.
//!
//! A straight scan of every page on disk per query: no index, no ranking.
//! Matching is a case-insensitive substring test per line; matched lines
//! are returned as written.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Result;
use crate::git::list::{tree_files, web_path};
use crate::git::paths::page_title;
use crate::git::store::ContentStore;
use crate::models::SearchResult;

impl ContentStore {
    pub fn search(&self, pattern: &str) -> Result<Vec<SearchResult>> {
        self.with_worktree(|worktree| Ok(search_directory(worktree.root(), pattern)))
    }
}

/// Search every page under `root`. Unreadable files count as no match.
pub fn search_directory(root: &Path, pattern: &str) -> Vec<SearchResult> {
    let needle = pattern.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut results = Vec::new();
    for entry in tree_files(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry during search: {}", e);
                continue;
            }
        };
        let Some(web_path) = web_path(root, entry.path()) else {
            continue;
        };
        let Some(title) = page_title(&web_path) else {
            continue;
        };

        match search_file(entry.path(), &needle) {
            Ok(lines) if !lines.is_empty() => results.push(SearchResult {
                name: title.to_string(),
                lines,
            }),
            Ok(_) => {}
            Err(e) => tracing::warn!("Unable to search {}: {}", web_path, e),
        }
    }
    results
}

/// Lines of `path` containing `needle`, which must already be lower-case.
fn search_file(path: &Path, needle: &str) -> std::io::Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut found = Vec::new();
    for line in reader.split(b'\n') {
        let line = line?;
        let line = line.strip_suffix(b"\r").unwrap_or(&line);
        let text = String::from_utf8_lossy(line);
        if line_matches(&text, needle) {
            found.push(text.into_owned());
        }
    }
    Ok(found)
}

fn line_matches(line: &str, needle: &str) -> bool {
    line.to_lowercase().contains(needle)
}
