//! Logical name → on-disk path resolution.
//!
//! Every name a caller hands the store passes through here before any
//! filesystem access. Names are cleaned lexically (`.` and `..` collapsed),
//! lower-cased, and checked against the worktree root and the reserved
//! control directories. The result carries both the absolute filesystem
//! path and the forward-slash path git uses inside the repository.

use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// Extension given to page documents on disk.
pub const PAGE_EXTENSION: &str = "md";
/// Version control metadata directory.
pub const GIT_DIR: &str = ".git";
/// Internal configuration directory, versioned like pages.
pub const CONFIG_DIR: &str = ".wiki";
/// Suffix of every settings blob in `CONFIG_DIR`.
pub const CONFIG_SUFFIX: &str = ".json.enc";

pub const RESERVED_DIRS: [&str; 2] = [GIT_DIR, CONFIG_DIR];

/// Characters the routing layer decodes or splits on.
const ROUTING_CHARS: [char; 5] = ['%', '?', '#', '\\', '\0'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Absolute (or base-relative, if the base was relative) path on disk.
    pub fs_path: PathBuf,
    /// Repository-relative path, always `/`-separated.
    pub repo_path: String,
}

/// Which class of blob a name addresses. All three share the commit
/// machinery; they differ only in how a name maps to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Markdown pages; the extension is appended to the logical name.
    Page,
    /// Uploaded files; the name is used as given.
    File,
    /// Settings blobs under the reserved configuration directory.
    Config,
}

impl Namespace {
    pub fn resolve(self, base: &Path, name: &str) -> Result<ResolvedPath> {
        match self {
            Namespace::Page => resolve_page(base, name),
            Namespace::File => resolve(base, name),
            Namespace::Config => resolve_config(base, name),
        }
    }
}

/// Resolve a raw name (no extension added) inside `base`.
pub fn resolve(base: &Path, name: &str) -> Result<ResolvedPath> {
    let segments = normalize(name)?;
    Ok(build(base, &segments))
}

/// Resolve a page title, appending the page extension to its leaf.
pub fn resolve_page(base: &Path, title: &str) -> Result<ResolvedPath> {
    let mut segments = normalize(title)?;
    if let Some(leaf) = segments.last_mut() {
        leaf.push('.');
        leaf.push_str(PAGE_EXTENSION);
    }
    Ok(build(base, &segments))
}

/// Resolve a settings key to `<base>/.wiki/<key>.json.enc`.
///
/// Keys are a single segment and keep their case.
pub fn resolve_config(base: &Path, key: &str) -> Result<ResolvedPath> {
    check_chars(key)?;
    if key.is_empty() || key == "." || key == ".." || key.contains('/') {
        return Err(StoreError::InvalidName(key.to_string()));
    }

    let file_name = format!("{}{}", key, CONFIG_SUFFIX);
    Ok(ResolvedPath {
        fs_path: base.join(CONFIG_DIR).join(&file_name),
        repo_path: format!("{}/{}", CONFIG_DIR, file_name),
    })
}

/// Strip the page extension from a repository path, if it has one.
pub fn page_title(repo_path: &str) -> Option<&str> {
    repo_path
        .strip_suffix(PAGE_EXTENSION)
        .and_then(|p| p.strip_suffix('.'))
        .filter(|p| !p.is_empty() && !p.ends_with('/'))
}

pub fn is_reserved_segment(segment: &str) -> bool {
    RESERVED_DIRS.iter().any(|r| segment.eq_ignore_ascii_case(r))
}

fn check_chars(name: &str) -> Result<()> {
    if name.contains(ROUTING_CHARS) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Clean, lower-case and validate a slash-separated logical name.
///
/// Works purely on the string; the filesystem is never consulted, so a
/// symlink or a concurrent rename cannot influence where a name lands.
fn normalize(name: &str) -> Result<Vec<String>> {
    check_chars(name)?;

    let mut segments: Vec<String> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(StoreError::DirectoryEscape(name.to_string()));
                }
            }
            s => segments.push(s.to_lowercase()),
        }
    }

    if segments.is_empty() {
        return Err(StoreError::InvalidName(name.to_string()));
    }

    // Checked after cleaning: `a/../.git` must fail, `.git/../a` is fine.
    if segments.iter().any(|s| is_reserved_segment(s)) {
        return Err(StoreError::ReservedPath(name.to_string()));
    }

    Ok(segments)
}

fn build(base: &Path, segments: &[String]) -> ResolvedPath {
    let mut fs_path = base.to_path_buf();
    fs_path.extend(segments);
    ResolvedPath {
        fs_path,
        repo_path: segments.join("/"),
    }
}
