//! Integration tests for the content store.
//!
//! Each test runs against a real git repository created in a temporary
//! directory, exercising the store through its public API only.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use wiki_store::models::{ChangedArtifact, DiffOp, FileInfo, SearchResult};
use wiki_store::{ConfigBackend, ContentStore, DocumentReader, StoreConfig, StoreError};

/// Test fixture: an empty store in a temp dir.
struct TestStore {
    dir: TempDir,
    store: ContentStore,
}

impl TestStore {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let store = ContentStore::open_dir(dir.path()).expect("failed to open store");
        Self { dir, store }
    }

    /// Id of the newest commit touching `name`.
    fn latest(&self, name: &str) -> String {
        self.store.history(name, "", 1).unwrap().entries[0].change_id.clone()
    }
}

#[test]
fn put_then_get_round_trips() {
    let t = TestStore::new();
    t.store.put("alpha", b"# Hello", "alice", "init").unwrap();

    let doc = t.store.get("alpha").unwrap();
    assert_eq!(doc.content, b"# Hello");
    assert_eq!(doc.last_modified.user, "alice");
    assert_eq!(doc.last_modified.message, "init");
    assert!(t.dir.path().join("alpha.md").is_file());
}

#[test]
fn history_is_newest_first() {
    let t = TestStore::new();
    t.store.put("alpha", b"# Hello", "alice", "init").unwrap();
    t.store.put("alpha", b"# Hello, world", "bob", "edit").unwrap();

    let history = t.store.history("alpha", "", 10).unwrap();
    assert_eq!(history.entries.len(), 2);
    assert_eq!(history.entries[0].user, "bob");
    assert_eq!(history.entries[0].message, "edit");
    assert_eq!(history.entries[1].user, "alice");
    assert_eq!(history.entries[1].message, "init");

    let doc = t.store.get("alpha").unwrap();
    assert_eq!(doc.content, b"# Hello, world");
    assert_eq!(doc.last_modified.change_id, history.entries[0].change_id);
}

#[test]
fn history_ignores_other_pages() {
    let t = TestStore::new();
    t.store.put("alpha", b"a", "alice", "a1").unwrap();
    t.store.put("beta", b"b", "alice", "b1").unwrap();
    t.store.put("alpha", b"aa", "alice", "a2").unwrap();

    let messages: Vec<String> = t
        .store
        .history("alpha", "", 10)
        .unwrap()
        .entries
        .into_iter()
        .map(|e| e.message)
        .collect();
    assert_eq!(messages, vec!["a2", "a1"]);

    // Latest commit for beta is its own, not the newer alpha edit.
    assert_eq!(t.store.get("beta").unwrap().last_modified.message, "b1");
}

#[test]
fn history_from_start_revision_includes_it() {
    let t = TestStore::new();
    for i in 0..4 {
        t.store.put("p", format!("v{i}").as_bytes(), "alice", &format!("m{i}")).unwrap();
    }
    let all = t.store.history("p", "", 10).unwrap().entries;
    let from_second = t.store.history("p", &all[1].change_id, 10).unwrap().entries;
    assert_eq!(from_second, all[1..].to_vec());

    let short = t.store.history("p", "", 2).unwrap().entries;
    assert_eq!(short, all[..2].to_vec());
}

#[test]
fn names_are_case_insensitive() {
    let t = TestStore::new();
    t.store.put("Foo/Bar", b"content", "alice", "create").unwrap();

    assert!(t.store.exists("foo/bar"));
    assert!(t.store.exists("FOO/BAR"));
    assert_eq!(t.store.get("foo/BAR").unwrap().content, b"content");
    assert!(t.dir.path().join("foo").join("bar.md").is_file());
}

#[test]
fn missing_page_is_not_found() {
    let t = TestStore::new();
    assert!(!t.store.exists("nope"));
    let err = t.store.get("nope").unwrap_err();
    assert!(err.is_not_found(), "{err}");

    t.store.put("other", b"x", "alice", "x").unwrap();
    assert!(t.store.get("nope").unwrap_err().is_not_found());
}

#[test]
fn unsafe_names_are_rejected() {
    let t = TestStore::new();
    for name in ["../secret", "a/../../secret", "a/.git/x", "A/.GIT/x", ".wiki/users", "50%off"] {
        let err = t.store.put(name, b"x", "mallory", "attack").unwrap_err();
        assert!(err.is_client_error(), "{name}: {err}");
        assert!(!t.store.exists(name));
    }
    assert!(!t.dir.path().parent().unwrap().join("secret.md").exists());
}

#[test]
fn get_at_reads_committed_blobs() {
    let t = TestStore::new();
    t.store.put("page", b"first", "alice", "one").unwrap();
    let first = t.latest("page");
    t.store.put("page", b"second", "bob", "two").unwrap();

    let old = t.store.get_at("page", &first).unwrap();
    assert_eq!(old.content, b"first");
    assert_eq!(old.last_modified.change_id, first);
    assert_eq!(old.last_modified.user, "alice");

    assert_eq!(t.store.get_at("page", "").unwrap().content, b"second");
    assert_eq!(t.store.get_at("page", "HEAD").unwrap().content, b"second");

    // Uncommitted edits in the working tree are invisible to revision reads.
    std::fs::write(t.dir.path().join("page.md"), b"scribbled").unwrap();
    assert_eq!(t.store.get_at("page", "HEAD").unwrap().content, b"second");
}

#[test]
fn get_at_missing_revision_or_path() {
    let t = TestStore::new();
    t.store.put("page", b"x", "alice", "one").unwrap();
    let first = t.latest("page");
    t.store.put("later", b"y", "alice", "two").unwrap();

    assert!(t.store.get_at("page", "0123456789abcdef0123456789abcdef01234567").unwrap_err().is_not_found());
    assert!(t.store.get_at("page", "no-such-branch").unwrap_err().is_not_found());
    assert!(t.store.get_at("later", &first).unwrap_err().is_not_found());
}

#[test]
fn delete_keeps_old_revisions() {
    let t = TestStore::new();
    t.store.put("gone", b"keep me", "alice", "create").unwrap();
    let before = t.latest("gone");
    t.store.delete("gone", "remove", "bob").unwrap();

    assert!(!t.store.exists("gone"));
    assert!(t.store.get("gone").unwrap_err().is_not_found());
    assert_eq!(t.store.get_at("gone", &before).unwrap().content, b"keep me");

    let history = t.store.history("gone", "", 10).unwrap();
    assert_eq!(history.entries.len(), 2);
    assert_eq!(history.entries[0].message, "remove");
    assert_eq!(history.entries[0].user, "bob");
}

#[test]
fn delete_prunes_empty_directories() {
    let t = TestStore::new();
    t.store.put("deep/nested/page", b"x", "alice", "create").unwrap();
    t.store.delete("deep/nested/page", "remove", "alice").unwrap();
    assert!(!t.dir.path().join("deep").exists());
}

#[test]
fn delete_missing_page_is_not_found() {
    let t = TestStore::new();
    t.store.put("here", b"x", "alice", "create").unwrap();
    assert!(t.store.delete("absent", "remove", "alice").unwrap_err().is_not_found());
}

#[test]
fn rename_moves_content() {
    let t = TestStore::new();
    t.store.put("old", b"moving", "alice", "create").unwrap();
    t.store.rename("old", "sub/New", "move it", "bob").unwrap();

    assert!(!t.store.exists("old"));
    let doc = t.store.get("sub/new").unwrap();
    assert_eq!(doc.content, b"moving");
    assert_eq!(doc.last_modified.message, "move it");
    assert_eq!(doc.last_modified.user, "bob");
    assert_eq!(t.store.list_documents().unwrap(), vec!["sub/new"]);
}

#[test]
fn rename_overwrites_existing_destination() {
    let t = TestStore::new();
    t.store.put("a", b"from a", "alice", "a").unwrap();
    t.store.put("b", b"from b", "alice", "b").unwrap();
    t.store.rename("a", "b", "clobber", "alice").unwrap();

    assert_eq!(t.store.get("b").unwrap().content, b"from a");
    assert_eq!(t.store.list_documents().unwrap(), vec!["b"]);
}

#[test]
fn rename_rejects_bad_names() {
    let t = TestStore::new();
    t.store.put("a", b"x", "alice", "a").unwrap();
    assert!(t.store.rename("a", "../escape", "m", "alice").unwrap_err().is_client_error());
    assert!(t.store.rename("missing", "b", "m", "alice").unwrap_err().is_not_found());
    assert!(t.store.exists("a"));
}

#[test]
fn revert_then_diff_is_empty() {
    let t = TestStore::new();
    t.store.put("doc", b"line one\nline two\n", "alice", "v1").unwrap();
    let v1 = t.latest("doc");
    t.store.put("doc", b"line one\nline 2\nline three\n", "bob", "v2").unwrap();

    t.store.revert("doc", &v1, "carol", "revert to v1").unwrap();

    let doc = t.store.get("doc").unwrap();
    assert_eq!(doc.content, b"line one\nline two\n");
    assert_eq!(doc.last_modified.user, "carol");
    assert_eq!(t.store.history("doc", "", 10).unwrap().entries.len(), 3);

    let diff = t.store.diff("doc", &v1, "HEAD").unwrap();
    assert!(diff.iter().all(|s| !s.is_change()), "{diff:?}");
}

#[test]
fn diff_between_revisions() {
    let t = TestStore::new();
    t.store.put("doc", b"keep\nold\n", "alice", "v1").unwrap();
    let v1 = t.latest("doc");
    t.store.put("doc", b"keep\nnew\n", "alice", "v2").unwrap();
    let v2 = t.latest("doc");

    let diff = t.store.diff("doc", &v1, &v2).unwrap();
    let ops: Vec<DiffOp> = diff.iter().map(|s| s.op).collect();
    assert_eq!(ops, vec![DiffOp::Equal, DiffOp::Delete, DiffOp::Insert]);
    assert_eq!(diff[0].text, "keep\n");
    assert_eq!(diff[1].text, "old\n");
    assert_eq!(diff[2].text, "new\n");

    assert!(t.store.diff("doc", "not-a-rev", &v2).unwrap_err().is_not_found());
}

#[test]
fn recent_changes_classify_each_commit() {
    let t = TestStore::new();
    t.store.put("page", b"text", "alice", "page").unwrap();
    t.store.put_file("images/logo.png", b"\x89PNG", "bob", "upload").unwrap();
    t.store.put_config("users", b"ciphertext", "system", "settings").unwrap();
    t.store.delete("page", "drop page", "carol").unwrap();

    let changes = t.store.recent_changes("", 10).unwrap();
    let seen: Vec<(String, Option<ChangedArtifact>)> = changes
        .into_iter()
        .map(|c| (c.entry.message, c.change))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("drop page".to_string(), Some(ChangedArtifact::Page("page".into()))),
            ("settings".to_string(), Some(ChangedArtifact::Config("users".into()))),
            ("upload".to_string(), Some(ChangedArtifact::File("images/logo.png".into()))),
            ("page".to_string(), Some(ChangedArtifact::Page("page".into()))),
        ]
    );
}

#[test]
fn recent_changes_respect_start_and_count() {
    let t = TestStore::new();
    for i in 0..5 {
        t.store.put(&format!("p{i}"), b"x", "alice", &format!("m{i}")).unwrap();
    }
    let all = t.store.recent_changes("", 100).unwrap();
    assert_eq!(all.len(), 5);

    let tail = t.store.recent_changes(&all[2].entry.change_id, 2).unwrap();
    let ids: Vec<&str> = tail.iter().map(|c| c.entry.change_id.as_str()).collect();
    assert_eq!(ids, vec![all[2].entry.change_id.as_str(), all[3].entry.change_id.as_str()]);

    assert!(t.store.recent_changes("", 0).unwrap().is_empty());
}

#[test]
fn history_pages_cover_everything_once() {
    let t = TestStore::new();
    for i in 0..7 {
        t.store.put("paged", format!("v{i}").as_bytes(), "alice", &format!("m{i}")).unwrap();
    }
    let full = t.store.history("paged", "", 100).unwrap().entries;

    let mut collected = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = t.store.history_page("paged", cursor.as_deref(), 3).unwrap();
        assert!(page.entries.len() <= 3);
        collected.extend(page.entries);
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    assert_eq!(collected, full);
}

#[test]
fn changes_pages_cover_everything_once() {
    let t = TestStore::new();
    for i in 0..5 {
        t.store.put(&format!("p{i}"), b"x", "alice", &format!("m{i}")).unwrap();
    }

    let first = t.store.changes_page(None, 2).unwrap();
    assert_eq!(first.changes.len(), 2);
    let second = t.store.changes_page(first.next.as_deref(), 2).unwrap();
    assert_eq!(second.changes.len(), 2);
    let third = t.store.changes_page(second.next.as_deref(), 2).unwrap();
    assert_eq!(third.changes.len(), 1);
    assert!(third.next.is_none());

    let ids: HashSet<String> = first
        .changes
        .iter()
        .chain(&second.changes)
        .chain(&third.changes)
        .map(|c| c.entry.change_id.clone())
        .collect();
    assert_eq!(ids.len(), 5);
}

#[test]
fn listing_splits_pages_and_files() {
    let t = TestStore::new();
    t.store.put("zeta", b"z", "alice", "z").unwrap();
    t.store.put("Alpha/Beta", b"ab", "alice", "ab").unwrap();
    t.store.put_file("docs/manual.pdf", b"12345", "alice", "upload").unwrap();
    t.store.put_config("site", b"secret", "system", "settings").unwrap();

    assert_eq!(t.store.list_documents().unwrap(), vec!["alpha/beta", "zeta"]);
    assert_eq!(
        t.store.list_files().unwrap(),
        vec![FileInfo {
            name: "docs/manual.pdf".to_string(),
            size: 5
        }]
    );
}

#[test]
fn files_round_trip_and_delete() {
    let t = TestStore::new();
    t.store.put_file("Images/Cat.JPG", b"meow", "alice", "upload").unwrap();
    assert_eq!(t.store.get_file("images/cat.jpg").unwrap(), b"meow");

    t.store.delete_file("images/cat.jpg", "remove", "alice").unwrap();
    assert!(t.store.get_file("images/cat.jpg").unwrap_err().is_not_found());
}

#[test]
fn config_blobs_are_versioned_but_hidden() {
    let t = TestStore::new();
    t.store.put_config("users", b"v1", "system", "users v1").unwrap();
    t.store.put_config("users", b"v2", "system", "users v2").unwrap();

    let backend: &dyn ConfigBackend = &t.store;
    assert_eq!(backend.get_config("users").unwrap(), b"v2");
    assert!(backend.get_config("missing").unwrap_err().is_not_found());
    assert!(backend.put_config("../escape", b"x", "system", "m").unwrap_err().is_client_error());

    assert!(t.dir.path().join(".wiki").join("users.json.enc").is_file());
    assert!(t.store.list_documents().unwrap().is_empty());
    assert!(t.store.list_files().unwrap().is_empty());
    assert_eq!(t.store.recent_changes("", 10).unwrap().len(), 2);
}

#[test]
fn search_finds_lines_verbatim() {
    let t = TestStore::new();
    t.store.put("greeting", b"Hello there\nunrelated\n", "alice", "hi").unwrap();
    t.store.put("other", b"nothing to see\n", "alice", "other").unwrap();
    t.store.put_config("hello", b"hello hello", "system", "cfg").unwrap();

    let results = t.store.search("hello").unwrap();
    assert_eq!(
        results,
        vec![SearchResult {
            name: "greeting".to_string(),
            lines: vec!["Hello there".to_string()],
        }]
    );
    assert!(t.store.search("absent").unwrap().is_empty());
}

#[cfg(unix)]
#[test]
fn search_skips_unreadable_pages() {
    use std::os::unix::fs::PermissionsExt;

    let t = TestStore::new();
    t.store.put("greeting", b"hello world\n", "alice", "hi").unwrap();
    t.store.put("locked", b"hello from a locked page\n", "alice", "lock").unwrap();
    let locked = t.dir.path().join("locked.md");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    // Permission bits do not stop a privileged user from reading.
    let readable = std::fs::read(&locked).is_ok();

    let names: Vec<String> = t.store.search("hello").unwrap().into_iter().map(|r| r.name).collect();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o644)).unwrap();

    assert!(names.contains(&"greeting".to_string()));
    assert_eq!(names.contains(&"locked".to_string()), readable);
}

#[test]
fn put_with_invalid_author_leaves_tree_clean() {
    let t = TestStore::new();
    t.store.put("base", b"x", "alice", "base").unwrap();

    for author in ["", "mallory <m>", "eve>"] {
        let err = t.store.put("secret", b"from mallory", author, "sneak").unwrap_err();
        assert!(matches!(err, StoreError::InvalidAuthor(_)), "{author:?}: {err}");
        assert!(err.is_client_error());
    }
    assert!(!t.store.exists("secret"));
    assert!(!t.dir.path().join("secret.md").exists());

    let err = t.store.delete("base", "drop", "").unwrap_err();
    assert!(matches!(err, StoreError::InvalidAuthor(_)));
    let err = t.store.rename("base", "moved", "move", "<>").unwrap_err();
    assert!(matches!(err, StoreError::InvalidAuthor(_)));
    assert_eq!(t.store.get("base").unwrap().content, b"x");
    assert!(!t.store.exists("moved"));

    t.store.put("other", b"y", "bob", "bob edits other").unwrap();
    let changes = t.store.recent_changes("", 10).unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].change, Some(ChangedArtifact::Page("other".to_string())));
    assert!(t.store.history("secret", "", 10).unwrap().entries.is_empty());
}

#[test]
fn failed_commit_leaves_file_staged_for_next_commit() {
    let t = TestStore::new();
    t.store.put("base", b"x", "alice", "base").unwrap();

    // Hold the branch ref lock so the commit cannot move the branch.
    let repo = git2::Repository::open(t.dir.path()).unwrap();
    let branch = repo.head().unwrap().name().unwrap().to_string();
    let lock = t.dir.path().join(".git").join(format!("{branch}.lock"));
    std::fs::write(&lock, b"").unwrap();

    assert!(t.store.put("draft", b"pending", "carol", "draft").is_err());
    std::fs::remove_file(&lock).unwrap();

    assert!(t.store.exists("draft"));
    assert!(t.store.get("draft").unwrap_err().is_not_found());
    assert_eq!(t.store.history("draft", "", 10).unwrap().entries.len(), 0);

    t.store.put("other", b"y", "dave", "unrelated").unwrap();
    let doc = t.store.get("draft").unwrap();
    assert_eq!(doc.content, b"pending");
    assert_eq!(doc.last_modified.user, "dave");
}

#[test]
fn commit_messages_are_kept_verbatim() {
    let t = TestStore::new();
    t.store.put("page", b"x", "alice", "line1\n\nbody\n").unwrap();
    let doc = t.store.get("page").unwrap();
    assert_eq!(doc.last_modified.message, "line1\n\nbody\n");
}

#[test]
fn empty_repository_has_no_history() {
    let t = TestStore::new();
    assert!(t.store.history("anything", "", 10).unwrap().entries.is_empty());
    assert!(t.store.recent_changes("", 10).unwrap().is_empty());
    assert!(t.store.list_documents().unwrap().is_empty());
    assert!(t.store.get_at("anything", "").unwrap_err().is_not_found());
}

#[test]
fn open_creates_main_page_once() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::new(dir.path());

    let store = ContentStore::open(&config).unwrap();
    let doc = store.get("MainPage").unwrap();
    assert_eq!(doc.last_modified.user, "system");
    assert_eq!(doc.last_modified.message, "Create welcome page");
    drop(store);

    let store = ContentStore::open(&config).unwrap();
    assert_eq!(store.history("mainpage", "", 10).unwrap().entries.len(), 1);
}

#[test]
fn reopening_keeps_data() {
    let dir = TempDir::new().unwrap();
    {
        let store = ContentStore::open_dir(dir.path()).unwrap();
        store.put("persist", b"still here", "alice", "save").unwrap();
    }
    let store = ContentStore::open_dir(dir.path()).unwrap();
    assert_eq!(store.get("persist").unwrap().content, b"still here");
}

#[test]
fn concurrent_writers_and_readers() {
    let t = TestStore::new();
    let store = Arc::new(t.store);
    store.put("shared", b"start", "init", "init").unwrap();

    let mut handles = Vec::new();
    for w in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..5 {
                let body = format!("writer {w} edit {i}");
                store.put("shared", body.as_bytes(), &format!("w{w}"), &body).unwrap();
            }
        }));
    }
    for _ in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for _ in 0..10 {
                let doc = store.get("shared").unwrap();
                // A reader never sees content without its commit.
                let at_commit = store.get_at("shared", &doc.last_modified.change_id);
                if let Ok(at_commit) = at_commit {
                    assert!(!at_commit.content.is_empty());
                }
                assert!(!doc.content.is_empty());
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let history = store.history("shared", "", 100).unwrap();
    assert_eq!(history.entries.len(), 21);
    let reader: &dyn DocumentReader = store.as_ref();
    let doc = reader.get("shared").unwrap();
    assert_eq!(doc.last_modified.change_id, history.entries[0].change_id);
    assert_eq!(doc.content, history.entries[0].message.as_bytes());
}

#[test]
fn errors_are_categorised() {
    assert!(StoreError::NotFound("x".into()).is_not_found());
    assert!(StoreError::DirectoryEscape("x".into()).is_client_error());
    assert!(!StoreError::Internal("x".into()).is_client_error());
}
