//! Capability traits over the content store.
//!
//! Each consumer depends on the narrowest trait it needs: a page renderer
//! takes `&dyn DocumentReader`, the settings layer takes
//! `&dyn ConfigBackend`, and so on. `ContentStore` implements all of them.
//!
//! # Example
//!
//! ```no_run
//! use wiki_store::{ContentStore, HistoryReader};
//!
//! fn latest_author(pages: &dyn HistoryReader, title: &str) -> Option<String> {
//!     let history = pages.history(title, "", 1).ok()?;
//!     history.entries.first().map(|e| e.user.clone())
//! }
//!
//! let store = ContentStore::open_dir("./data")?;
//! if store.exists("MainPage") {
//!     println!("{:?}", latest_author(&store, "MainPage"));
//! }
//! # Ok::<(), wiki_store::StoreError>(())
//! ```

use crate::error::Result;
use crate::git::ContentStore;
use crate::models::{DiffSegment, Document, FileInfo, History, RecentChange, SearchResult};

pub trait DocumentReader: Send + Sync {
    fn exists(&self, name: &str) -> bool;
    fn get(&self, name: &str) -> Result<Document>;
    fn get_at(&self, name: &str, revision: &str) -> Result<Document>;
    fn list_documents(&self) -> Result<Vec<String>>;
    fn list_files(&self) -> Result<Vec<FileInfo>>;
}

pub trait DocumentWriter: Send + Sync {
    fn put(&self, name: &str, content: &[u8], author: &str, message: &str) -> Result<()>;
    fn delete(&self, name: &str, message: &str, author: &str) -> Result<()>;
    fn rename(&self, old_name: &str, new_name: &str, message: &str, author: &str) -> Result<()>;
    fn revert(&self, name: &str, revision: &str, author: &str, message: &str) -> Result<()>;
}

pub trait HistoryReader: Send + Sync {
    fn history(&self, name: &str, start: &str, count: usize) -> Result<History>;
    fn recent_changes(&self, start: &str, count: usize) -> Result<Vec<RecentChange>>;
    fn diff(&self, name: &str, start_revision: &str, end_revision: &str) -> Result<Vec<DiffSegment>>;
}

/// Storage for the (already encrypted) settings blobs.
pub trait ConfigBackend: Send + Sync {
    fn get_config(&self, name: &str) -> Result<Vec<u8>>;
    fn put_config(&self, name: &str, content: &[u8], author: &str, message: &str) -> Result<()>;
}

pub trait Searcher: Send + Sync {
    fn search(&self, pattern: &str) -> Result<Vec<SearchResult>>;
}

impl DocumentReader for ContentStore {
    fn exists(&self, name: &str) -> bool {
        ContentStore::exists(self, name)
    }

    fn get(&self, name: &str) -> Result<Document> {
        ContentStore::get(self, name)
    }

    fn get_at(&self, name: &str, revision: &str) -> Result<Document> {
        ContentStore::get_at(self, name, revision)
    }

    fn list_documents(&self) -> Result<Vec<String>> {
        ContentStore::list_documents(self)
    }

    fn list_files(&self) -> Result<Vec<FileInfo>> {
        ContentStore::list_files(self)
    }
}

impl DocumentWriter for ContentStore {
    fn put(&self, name: &str, content: &[u8], author: &str, message: &str) -> Result<()> {
        ContentStore::put(self, name, content, author, message)
    }

    fn delete(&self, name: &str, message: &str, author: &str) -> Result<()> {
        ContentStore::delete(self, name, message, author)
    }

    fn rename(&self, old_name: &str, new_name: &str, message: &str, author: &str) -> Result<()> {
        ContentStore::rename(self, old_name, new_name, message, author)
    }

    fn revert(&self, name: &str, revision: &str, author: &str, message: &str) -> Result<()> {
        ContentStore::revert(self, name, revision, author, message)
    }
}

impl HistoryReader for ContentStore {
    fn history(&self, name: &str, start: &str, count: usize) -> Result<History> {
        ContentStore::history(self, name, start, count)
    }

    fn recent_changes(&self, start: &str, count: usize) -> Result<Vec<RecentChange>> {
        ContentStore::recent_changes(self, start, count)
    }

    fn diff(&self, name: &str, start_revision: &str, end_revision: &str) -> Result<Vec<DiffSegment>> {
        ContentStore::diff(self, name, start_revision, end_revision)
    }
}

impl ConfigBackend for ContentStore {
    fn get_config(&self, name: &str) -> Result<Vec<u8>> {
        ContentStore::get_config(self, name)
    }

    fn put_config(&self, name: &str, content: &[u8], author: &str, message: &str) -> Result<()> {
        ContentStore::put_config(self, name, content, author, message)
    }
}

impl Searcher for ContentStore {
    fn search(&self, pattern: &str) -> Result<Vec<SearchResult>> {
        ContentStore::search(self, pattern)
    }
}
