//! Store configuration.
//!
//! The binary fills this from command-line flags and `WIKI_*` environment
//! variables; library users construct it directly or deserialize it.

use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_WORKDIR: &str = "./data";
pub const DEFAULT_MAIN_PAGE: &str = "MainPage";

/// Content of the page created in a fresh store.
pub const WELCOME_CONTENT: &str = "# Welcome\n\nWelcome to the wiki.\n";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Working tree root; created and `git init`-ed if missing.
    pub workdir: PathBuf,
    /// Title of the landing page.
    pub main_page: String,
    /// Commit a welcome page on open when the main page does not exist.
    pub create_main_page: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from(DEFAULT_WORKDIR),
            main_page: DEFAULT_MAIN_PAGE.to_string(),
            create_main_page: true,
        }
    }
}

impl StoreConfig {
    pub fn new<P: Into<PathBuf>>(workdir: P) -> Self {
        Self {
            workdir: workdir.into(),
            ..Self::default()
        }
    }
}
