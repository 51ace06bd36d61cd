pub mod diff;
pub mod history;
pub mod list;
pub mod paths;
pub mod repository;
pub mod search;
pub mod store;

pub use paths::{Namespace, ResolvedPath};
pub use repository::Worktree;
pub use store::ContentStore;
