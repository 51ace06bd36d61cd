//! Content store: versioned reads and writes of pages, files and settings.
//!
//! Every public operation takes the store's reader/writer lock exactly once
//! for its whole duration. Reads share the lock; anything that touches the
//! working tree or creates a commit holds it exclusively, so no reader can
//! see a half-written file or a file whose commit has not landed yet.
//!
//! Writes never amend: each put, delete, rename or revert is a new commit
//! on the current branch.

use git2::{Oid, Repository};
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use crate::config::{StoreConfig, WELCOME_CONTENT};
use crate::error::{Result, StoreError};
use crate::git::history::last_commit_for_path;
use crate::git::paths::{Namespace, ResolvedPath};
use crate::git::repository::{author_signature, blob_at, commit_index, resolve_revision, Worktree};
use crate::models::{Document, LogEntry};

pub struct ContentStore {
    worktree: RwLock<Worktree>,
}

impl ContentStore {
    /// Open (or initialize) the store described by `config`, creating the
    /// welcome page if asked to.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let store = Self::open_dir(&config.workdir)?;
        if config.create_main_page && !store.exists(&config.main_page) {
            tracing::info!("Creating default main page {}", config.main_page);
            store.put(
                &config.main_page,
                WELCOME_CONTENT.as_bytes(),
                "system",
                "Create welcome page",
            )?;
        }
        Ok(store)
    }

    /// Open (or initialize) a bare store at `dir`, with no welcome page.
    pub fn open_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let worktree = Worktree::open_or_init(dir)?;
        Ok(Self {
            worktree: RwLock::new(worktree),
        })
    }

    /// Run `f` under the shared lock with a fresh repository object.
    pub(crate) fn with_read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Worktree, &Repository) -> Result<T>,
    {
        let worktree = self
            .worktree
            .read()
            .map_err(|_| StoreError::Internal("Lock poisoned".to_string()))?;
        let repo = worktree.repo()?;
        f(&worktree, &repo)
    }

    /// Run `f` under the shared lock without opening the repository.
    pub(crate) fn with_worktree<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Worktree) -> Result<T>,
    {
        let worktree = self
            .worktree
            .read()
            .map_err(|_| StoreError::Internal("Lock poisoned".to_string()))?;
        f(&worktree)
    }

    /// Run `f` under the exclusive lock.
    pub(crate) fn with_write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Worktree, &Repository) -> Result<T>,
    {
        let worktree = self
            .worktree
            .write()
            .map_err(|_| StoreError::Internal("Lock poisoned".to_string()))?;
        let repo = worktree.repo()?;
        f(&worktree, &repo)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.with_worktree(|worktree| {
            let target = Namespace::Page.resolve(worktree.root(), name)?;
            Ok(fs::metadata(&target.fs_path).map(|m| m.is_file()).unwrap_or(false))
        })
        .unwrap_or(false)
    }

    /// Current page content with the latest commit that touched it.
    pub fn get(&self, name: &str) -> Result<Document> {
        self.with_read(|worktree, repo| {
            tracing::debug!("Reading page {}", name);
            let target = Namespace::Page.resolve(worktree.root(), name)?;

            let commit = last_commit_for_path(repo, &target.repo_path)?
                .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
            let content = read_file(&target, name)?;

            Ok(Document {
                content,
                last_modified: LogEntry::from_commit(&commit),
            })
        })
    }

    /// Page content as recorded at `revision` (empty or `HEAD` = tip).
    pub fn get_at(&self, name: &str, revision: &str) -> Result<Document> {
        self.with_read(|worktree, repo| {
            tracing::debug!("Reading page {} at {}", name, revision);
            let target = Namespace::Page.resolve(worktree.root(), name)?;
            content_at(repo, &target, revision)
        })
    }

    pub fn put(&self, name: &str, content: &[u8], author: &str, message: &str) -> Result<()> {
        self.put_in(Namespace::Page, name, content, author, message)
    }

    pub fn delete(&self, name: &str, message: &str, author: &str) -> Result<()> {
        self.delete_in(Namespace::Page, name, message, author)
    }

    /// Move a page and commit the move. An existing destination is
    /// overwritten.
    pub fn rename(&self, old_name: &str, new_name: &str, message: &str, author: &str) -> Result<()> {
        self.with_write(|worktree, repo| {
            let from = Namespace::Page.resolve(worktree.root(), old_name).inspect_err(|e| {
                tracing::warn!("Unable to resolve old path: {} -> {}: {}", old_name, new_name, e)
            })?;
            let to = Namespace::Page.resolve(worktree.root(), new_name).inspect_err(|e| {
                tracing::warn!("Unable to resolve new path: {} -> {}: {}", old_name, new_name, e)
            })?;
            move_blob(worktree, repo, &from, &to, author, message).map(|_| ())
        })
    }

    /// Write the bytes a page had at `revision` as a new commit.
    pub fn revert(&self, name: &str, revision: &str, author: &str, message: &str) -> Result<()> {
        self.with_write(|worktree, repo| {
            let target = Namespace::Page.resolve(worktree.root(), name)?;
            let old = content_at(repo, &target, revision)?;
            write_blob(repo, &target, &old.content, author, message).map(|_| ())
        })
    }

    /// Raw bytes of an uploaded file in the working tree.
    pub fn get_file(&self, name: &str) -> Result<Vec<u8>> {
        self.with_worktree(|worktree| {
            let target = Namespace::File.resolve(worktree.root(), name)?;
            read_file(&target, name)
        })
    }

    pub fn put_file(&self, name: &str, content: &[u8], author: &str, message: &str) -> Result<()> {
        self.put_in(Namespace::File, name, content, author, message)
    }

    pub fn delete_file(&self, name: &str, message: &str, author: &str) -> Result<()> {
        self.delete_in(Namespace::File, name, message, author)
    }

    /// Encrypted settings blob `name` from the configuration directory.
    pub fn get_config(&self, name: &str) -> Result<Vec<u8>> {
        self.with_worktree(|worktree| {
            let target = Namespace::Config.resolve(worktree.root(), name)?;
            read_file(&target, name)
        })
    }

    pub fn put_config(&self, name: &str, content: &[u8], author: &str, message: &str) -> Result<()> {
        self.put_in(Namespace::Config, name, content, author, message)
    }

    fn put_in(
        &self,
        namespace: Namespace,
        name: &str,
        content: &[u8],
        author: &str,
        message: &str,
    ) -> Result<()> {
        self.with_write(|worktree, repo| {
            let target = namespace.resolve(worktree.root(), name)?;
            write_blob(repo, &target, content, author, message).map(|_| ())
        })
    }

    fn delete_in(&self, namespace: Namespace, name: &str, message: &str, author: &str) -> Result<()> {
        self.with_write(|worktree, repo| {
            let target = namespace.resolve(worktree.root(), name)?;
            remove_blob(worktree, repo, &target, author, message).map(|_| ())
        })
    }
}

fn read_file(target: &ResolvedPath, name: &str) -> Result<Vec<u8>> {
    fs::read(&target.fs_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(name.to_string())
        } else {
            e.into()
        }
    })
}

/// Committed bytes of `target` at `revision`, with that commit's metadata.
pub(crate) fn content_at(repo: &Repository, target: &ResolvedPath, revision: &str) -> Result<Document> {
    let commit = resolve_revision(repo, revision)?;
    let content = blob_at(repo, &commit, &target.repo_path)?;
    Ok(Document {
        content,
        last_modified: LogEntry::from_commit(&commit),
    })
}

/// Write, stage and commit one file.
///
/// A failed commit leaves the file written and staged; the next
/// successful commit picks it up.
fn write_blob(
    repo: &Repository,
    target: &ResolvedPath,
    content: &[u8],
    author: &str,
    message: &str,
) -> Result<Oid> {
    let signature = author_signature(author)?;
    if let Some(parent) = target.fs_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target.fs_path, content)?;

    let mut index = repo.index()?;
    index.add_path(Path::new(&target.repo_path))?;
    index.write()?;

    commit_index(repo, &mut index, &signature, message).inspect_err(|e| {
        tracing::warn!("Commit of {} failed, working tree left dirty: {}", target.repo_path, e)
    })
}

fn remove_blob(
    worktree: &Worktree,
    repo: &Repository,
    target: &ResolvedPath,
    author: &str,
    message: &str,
) -> Result<Oid> {
    let signature = author_signature(author)?;
    let mut index = repo.index()?;
    let repo_path = Path::new(&target.repo_path);
    if index.get_path(repo_path, 0).is_none() {
        return Err(StoreError::NotFound(target.repo_path.clone()));
    }

    remove_if_present(&target.fs_path)?;
    prune_empty_dirs(worktree.root(), &target.fs_path);

    index.remove_path(repo_path)?;
    index.write()?;
    commit_index(repo, &mut index, &signature, message)
}

fn move_blob(
    worktree: &Worktree,
    repo: &Repository,
    from: &ResolvedPath,
    to: &ResolvedPath,
    author: &str,
    message: &str,
) -> Result<Option<Oid>> {
    let signature = author_signature(author)?;
    let mut index = repo.index()?;
    let from_path = Path::new(&from.repo_path);
    if index.get_path(from_path, 0).is_none() {
        return Err(StoreError::NotFound(from.repo_path.clone()));
    }
    if from.repo_path == to.repo_path {
        tracing::debug!("Rename of {} onto itself, nothing to do", from.repo_path);
        return Ok(None);
    }
    if to.fs_path.exists() {
        tracing::warn!("Rename {} -> {} overwrites the destination", from.repo_path, to.repo_path);
    }

    if let Some(parent) = to.fs_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(&from.fs_path, &to.fs_path)?;
    prune_empty_dirs(worktree.root(), &from.fs_path);

    index.remove_path(from_path)?;
    index.add_path(Path::new(&to.repo_path))?;
    index.write()?;
    commit_index(repo, &mut index, &signature, message).map(Some)
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Remove directories left empty by a delete or move, up to (not
/// including) the root. Git does not track directories, so nothing else
/// would ever clean them up.
fn prune_empty_dirs(root: &Path, removed: &Path) {
    let mut dir = removed.parent();
    while let Some(d) = dir {
        if d == root || !d.starts_with(root) {
            break;
        }
        // Fails on non-empty directories, which ends the walk.
        if fs::remove_dir(d).is_err() {
            break;
        }
        dir = d.parent();
    }
}
