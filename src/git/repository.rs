use git2::{Commit, ErrorCode, Index, Oid, Repository, Signature};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// Domain of the e-mail address synthesized for commit authors.
pub const AUTHOR_EMAIL_DOMAIN: &str = "wiki";

/// On-disk working tree plus the git repository that tracks it.
///
/// `git2::Repository` is `Send` but not `Sync`, so the handle keeps only
/// the location and opens a repository object per transaction. The
/// store's reader/writer lock is what serializes access to the tree.
#[derive(Debug, Clone)]
pub struct Worktree {
    root: PathBuf,
}

impl Worktree {
    /// Open the repository at `dir`, initializing one if none exists.
    pub fn open_or_init<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let root = dir.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        match Repository::open(&root) {
            Ok(repo) => {
                if repo.is_bare() {
                    return Err(StoreError::Internal(format!(
                        "{} is a bare repository",
                        root.display()
                    )));
                }
                tracing::debug!("Opened repository at {}", root.display());
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                Repository::init(&root)?;
                tracing::info!("Initialized repository at {}", root.display());
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo(&self) -> Result<Repository> {
        Ok(Repository::open(&self.root)?)
    }
}

/// The commit HEAD points at, or `None` for a repository with no commits.
pub fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Resolve a revision string to a commit. Empty and `HEAD` mean the tip.
pub fn resolve_revision<'r>(repo: &'r Repository, revision: &str) -> Result<Commit<'r>> {
    let revision = if revision.is_empty() { "HEAD" } else { revision };

    if revision == "HEAD" {
        return head_commit(repo)?.ok_or_else(|| StoreError::NotFound("HEAD".to_string()));
    }

    let object = repo
        .revparse_single(revision)
        .map_err(|_| StoreError::NotFound(format!("revision {}", revision)))?;
    object
        .peel_to_commit()
        .map_err(|_| StoreError::Malformed(format!("{} is not a commit", revision)))
}

/// Like `resolve_revision`, but an empty revision on a repository without
/// commits yields `None` instead of an error.
pub fn resolve_start<'r>(repo: &'r Repository, revision: &str) -> Result<Option<Commit<'r>>> {
    if revision.is_empty() || revision == "HEAD" {
        return head_commit(repo);
    }
    resolve_revision(repo, revision).map(Some)
}

/// Commit identity for `author`: the name with a synthesized
/// `<name>@wiki` address and the current wall-clock time.
///
/// Built before anything touches the working tree, so a name git refuses
/// (empty, or containing `<` or `>`) fails the write up front.
pub fn author_signature(author: &str) -> Result<Signature<'static>> {
    let email = format!("{}@{}", author, AUTHOR_EMAIL_DOMAIN);
    Signature::now(author, &email)
        .map_err(|e| StoreError::InvalidAuthor(format!("{:?}: {}", author, e.message())))
}

/// Write the index as a tree and commit it on top of HEAD, with
/// `signature` as both author and committer.
pub fn commit_index(
    repo: &Repository,
    index: &mut Index,
    signature: &Signature,
    message: &str,
) -> Result<Oid> {
    let tree_oid = index.write_tree()?;
    let tree = repo.find_tree(tree_oid)?;

    let parent = head_commit(repo)?;
    let parents: Vec<&Commit> = parent.iter().collect();

    let oid = repo.commit(Some("HEAD"), signature, signature, message, &tree, &parents)?;
    tracing::info!(
        author = signature.name().unwrap_or_default(),
        oid = %short_id(&oid),
        "Committed: {}",
        message.trim()
    );
    Ok(oid)
}

pub fn short_id(oid: &Oid) -> String {
    let mut id = oid.to_string();
    id.truncate(8);
    id
}

/// Bytes of `repo_path` as recorded in `commit`'s tree.
pub fn blob_at(repo: &Repository, commit: &Commit, repo_path: &str) -> Result<Vec<u8>> {
    let tree = commit.tree()?;
    let entry = tree.get_path(Path::new(repo_path)).map_err(|e| {
        if e.code() == ErrorCode::NotFound {
            StoreError::NotFound(format!("{} at {}", repo_path, short_id(&commit.id())))
        } else {
            e.into()
        }
    })?;

    let object = entry.to_object(repo)?;
    let blob = object
        .as_blob()
        .ok_or_else(|| StoreError::Malformed(format!("{} is not a file", repo_path)))?;
    Ok(blob.content().to_vec())
}
