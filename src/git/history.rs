//! Commit log walks: per-page history, whole-tree recent changes, and the
//! cursor pagination both share.
//!
//! Walks are topological (children before parents) with commit time as the
//! tie-breaker, so a cursor taken from one page always lands at the same
//! position on the next request.

use git2::{Commit, DiffOptions, ObjectType, Oid, Repository, Revwalk, Sort, TreeWalkMode, TreeWalkResult};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::git::paths::{page_title, Namespace, CONFIG_DIR, CONFIG_SUFFIX};
use crate::git::repository::{head_commit, resolve_start};
use crate::git::store::ContentStore;
use crate::models::{ChangedArtifact, ChangesPage, History, HistoryPage, LogEntry, RecentChange};

impl ContentStore {
    /// Up to `count` commits touching page `name`, newest first, starting
    /// at (and including) `start` (empty = tip).
    pub fn history(&self, name: &str, start: &str, count: usize) -> Result<History> {
        self.with_read(|worktree, repo| {
            let target = Namespace::Page.resolve(worktree.root(), name)?;
            let Some(start) = resolve_start(repo, start)? else {
                return Ok(History::default());
            };

            let entries = log_for_path(repo, &start, &target.repo_path, count)?
                .iter()
                .map(LogEntry::from_commit)
                .collect();
            Ok(History { entries })
        })
    }

    /// Up to `count` commits of the whole repository, newest first, each
    /// attributed to the first path it changed.
    pub fn recent_changes(&self, start: &str, count: usize) -> Result<Vec<RecentChange>> {
        self.with_read(|_worktree, repo| {
            let Some(start) = resolve_start(repo, start)? else {
                return Ok(Vec::new());
            };

            let mut changes = Vec::new();
            if count == 0 {
                return Ok(changes);
            }

            for oid in walk_from(repo, start.id())? {
                let commit = repo.find_commit(oid?)?;
                changes.push(RecentChange {
                    entry: LogEntry::from_commit(&commit),
                    change: changed_artifact(&commit)?,
                });
                if changes.len() == count {
                    break;
                }
            }

            tracing::debug!("Collected {} recent changes", changes.len());
            Ok(changes)
        })
    }

    /// One page of `name`'s history. `after` is the `next` cursor of the
    /// previous page, `None` for the first page.
    pub fn history_page(&self, name: &str, after: Option<&str>, page_size: usize) -> Result<HistoryPage> {
        if page_size == 0 {
            return Ok(HistoryPage::default());
        }
        let (start, number) = request_window(after, page_size);
        let history = self.history(name, start, number)?;
        let (entries, next) = paginate(history.entries, |e| &e.change_id, after, page_size, number);
        Ok(HistoryPage { entries, next })
    }

    /// One page of recent changes, same cursor convention as `history_page`.
    pub fn changes_page(&self, after: Option<&str>, page_size: usize) -> Result<ChangesPage> {
        if page_size == 0 {
            return Ok(ChangesPage::default());
        }
        let (start, number) = request_window(after, page_size);
        let changes = self.recent_changes(start, number)?;
        let (changes, next) = paginate(changes, |c| &c.entry.change_id, after, page_size, number);
        Ok(ChangesPage { changes, next })
    }
}

/// When resuming, ask for the cursor entry itself plus one extra beyond
/// the page to learn whether another page follows.
fn request_window(after: Option<&str>, page_size: usize) -> (&str, usize) {
    match after {
        Some(cursor) => (cursor, page_size + 2),
        None => ("", page_size + 1),
    }
}

fn paginate<T, F>(
    items: Vec<T>,
    id: F,
    after: Option<&str>,
    page_size: usize,
    number: usize,
) -> (Vec<T>, Option<String>)
where
    F: Fn(&T) -> &String,
{
    let has_more = items.len() == number;
    let page: Vec<T> = items
        .into_iter()
        .filter(|item| Some(id(item).as_str()) != after)
        .take(page_size)
        .collect();
    let next = if has_more { page.last().map(|item| id(item).clone()) } else { None };
    (page, next)
}

fn walk_from(repo: &Repository, start: Oid) -> Result<Revwalk<'_>> {
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    revwalk.push(start)?;
    Ok(revwalk)
}

/// Commits reachable from `start` that touched `path`, at most `limit`.
pub(crate) fn log_for_path<'r>(
    repo: &'r Repository,
    start: &Commit,
    path: &str,
    limit: usize,
) -> Result<Vec<Commit<'r>>> {
    let mut commits = Vec::new();
    if limit == 0 {
        return Ok(commits);
    }

    for oid in walk_from(repo, start.id())? {
        let commit = repo.find_commit(oid?)?;
        if commit_touches_path(repo, &commit, path)? {
            commits.push(commit);
            if commits.len() == limit {
                break;
            }
        }
    }
    Ok(commits)
}

/// Most recent commit from HEAD that touched `path`.
pub(crate) fn last_commit_for_path<'r>(repo: &'r Repository, path: &str) -> Result<Option<Commit<'r>>> {
    let Some(head) = head_commit(repo)? else {
        return Ok(None);
    };
    Ok(log_for_path(repo, &head, path, 1)?.into_iter().next())
}

fn commit_touches_path(repo: &Repository, commit: &Commit, path: &str) -> Result<bool> {
    let tree = commit.tree()?;

    let parent_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let mut opts = DiffOptions::new();
    opts.pathspec(path).disable_pathspec_match(true);

    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

    Ok(diff.deltas().len() > 0)
}

/// Every blob in `tree` keyed by its full path.
fn tree_leaves(tree: &git2::Tree) -> Result<BTreeMap<String, Oid>> {
    let mut leaves = BTreeMap::new();
    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(ObjectType::Blob) {
            let name = String::from_utf8_lossy(entry.name_bytes());
            leaves.insert(format!("{}{}", root, name), entry.id());
        }
        TreeWalkResult::Ok
    })?;
    Ok(leaves)
}

/// Attribute a commit to the first path (in path order) whose content
/// differs from its first parent. A root commit is compared to nothing.
fn changed_artifact(commit: &Commit) -> Result<Option<ChangedArtifact>> {
    let current = tree_leaves(&commit.tree()?)?;
    let parent = if commit.parent_count() > 0 {
        tree_leaves(&commit.parent(0)?.tree()?)?
    } else {
        BTreeMap::new()
    };

    let mut changed: BTreeSet<&str> = current
        .iter()
        .filter(|(path, id)| parent.get(*path) != Some(*id))
        .map(|(path, _)| path.as_str())
        .collect();
    changed.extend(
        parent
            .keys()
            .filter(|path| !current.contains_key(*path))
            .map(String::as_str),
    );

    Ok(changed.into_iter().next().map(classify_path))
}

/// Settings blob, page, or plain file, judged by where the path lives.
pub fn classify_path(path: &str) -> ChangedArtifact {
    if let Some(rest) = path.strip_prefix(CONFIG_DIR).and_then(|r| r.strip_prefix('/')) {
        if !rest.contains('/') {
            let key = rest.strip_suffix(CONFIG_SUFFIX).unwrap_or(rest);
            return ChangedArtifact::Config(key.to_string());
        }
    }
    match page_title(path) {
        Some(title) => ChangedArtifact::Page(title.to_string()),
        None => ChangedArtifact::File(path.to_string()),
    }
}
