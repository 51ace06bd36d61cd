use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::error::Result;
use crate::git::paths::{is_reserved_segment, page_title};
use crate::git::store::ContentStore;
use crate::models::FileInfo;

impl ContentStore {
    /// Titles of every page in the working tree, sorted.
    pub fn list_documents(&self) -> Result<Vec<String>> {
        self.with_worktree(|worktree| {
            let mut pages = Vec::new();
            walk_files(worktree.root(), |_entry, web_path| {
                if let Some(title) = page_title(web_path) {
                    pages.push(title.to_string());
                }
                Ok(())
            })?;
            pages.sort();
            Ok(pages)
        })
    }

    /// Every non-page file with its size, sorted by name.
    pub fn list_files(&self) -> Result<Vec<FileInfo>> {
        self.with_worktree(|worktree| {
            let mut files = Vec::new();
            walk_files(worktree.root(), |entry, web_path| {
                if page_title(web_path).is_none() {
                    let metadata = entry.metadata().map_err(std::io::Error::from)?;
                    files.push(FileInfo {
                        name: web_path.to_string(),
                        size: metadata.len(),
                    });
                }
                Ok(())
            })?;
            files.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(files)
        })
    }
}

/// Regular files under `root`, skipping the reserved directories, in file
/// name order.
pub(crate) fn tree_files(root: &Path) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.depth() > 0
                && e.file_type().is_dir()
                && e.file_name().to_str().is_some_and(is_reserved_segment))
        })
        .filter(|e| e.as_ref().map_or(true, |e| e.file_type().is_file()))
}

/// `/`-separated path of `path` relative to `root`.
pub(crate) fn web_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Call `handler` for each file with its walk entry and web path. Walk
/// errors abort the listing.
fn walk_files<F>(root: &Path, mut handler: F) -> Result<()>
where
    F: FnMut(&DirEntry, &str) -> Result<()>,
{
    for entry in tree_files(root) {
        let entry = entry.map_err(std::io::Error::from)?;
        if let Some(web_path) = web_path(root, entry.path()) {
            handler(&entry, &web_path)?;
        }
    }
    Ok(())
}
