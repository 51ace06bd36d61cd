//! Store error types.
//!
//! Defines `StoreError` for every failure the core can surface. Nothing in
//! the core retries or recovers; errors go straight back to the caller.
//!
//! Suggested outer mappings:
//! - `NotFound` → 404
//! - `DirectoryEscape`, `ReservedPath`, `InvalidName`, `InvalidAuthor` → 400
//! - `Malformed`, `Git`, `Io`, `Internal` → 500

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Attempt to escape directory: {0}")]
    DirectoryEscape(String),

    #[error("Attempt to access reserved directory: {0}")]
    ReservedPath(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid author: {0}")]
    InvalidAuthor(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed object: {0}")]
    Malformed(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound(_) => true,
            StoreError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            StoreError::Git(e) => e.code() == git2::ErrorCode::NotFound,
            _ => false,
        }
    }

    /// True when the caller supplied a name or author the store refuses.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::DirectoryEscape(_)
                | StoreError::ReservedPath(_)
                | StoreError::InvalidName(_)
                | StoreError::InvalidAuthor(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
