//! Controller error handling
//!
//! Every failure reported by the controller names the resource and path
//! involved. Recoverable failures (collision, IO, persistence) are always
//! reported after the tree has been reverted; fatal ones are not.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::document::DocumentError;

/// Errors that can occur while operating on the topic tree
#[derive(Error, Debug)]
pub enum TreeError {
    /// The operation would break title uniqueness or node identity
    #[error("Collision: {0}")]
    Collision(String),

    /// A title is empty or normalizes to nothing
    #[error("Invalid title '{0}': titles must contain at least one visible character")]
    InvalidTitle(String),

    /// A content file does not match the extensions allowed for its type
    #[error("File '{path}' is not a valid {kind} file (allowed: {allowed})")]
    UnsupportedExtension {
        path: PathBuf,
        kind: &'static str,
        allowed: String,
    },

    /// A filesystem primitive failed
    #[error("Failed to {op} '{path}': {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The index could not be encoded, decoded or written
    #[error("Failed to persist index '{path}': {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: PersistenceError,
    },

    /// The in-memory tree no longer matches what the caller validated
    #[error("Internal consistency violation: {0}")]
    Consistency(String),

    /// The top-level content directory is absent at load time
    #[error("Content directory '{path}' does not exist")]
    StorageMissing { path: PathBuf },

    /// Neither the index nor its backup could be loaded
    #[error("Index '{path}' could not be loaded ({primary}) and restoring from backup failed: {restore}")]
    LoadFailed {
        path: PathBuf,
        primary: Box<TreeError>,
        restore: Box<TreeError>,
    },

    /// A previous consistency violation stopped all further mutations
    #[error("Controller halted after an earlier consistency violation; restart and restore from backup")]
    Halted,
}

/// Underlying cause of a persistence failure
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TreeError {
    /// Wrap an I/O error with the operation and path it concerned
    pub fn from_io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        TreeError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Wrap a persistence failure for the given index path
    pub fn persistence(path: impl Into<PathBuf>, source: impl Into<PersistenceError>) -> Self {
        TreeError::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Fatal errors mean the tree and index may already disagree
    pub fn is_fatal(&self) -> bool {
        matches!(self, TreeError::Consistency(_) | TreeError::Halted)
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            TreeError::Io { source, .. }
            | TreeError::Persistence {
                source: PersistenceError::Io(source),
                ..
            } => io_suggestion(source),
            TreeError::StorageMissing { .. } | TreeError::LoadFailed { .. } => {
                Some("Run `topicbase init` to recreate an empty catalog. Existing files are kept with an .old suffix.")
            }
            TreeError::Consistency(_) | TreeError::Halted => {
                Some("Restart the application. If the problem persists, restore the index from its backup.")
            }
            TreeError::Collision(_) => Some("Choose a different title."),
            _ => None,
        }
    }
}

fn io_suggestion(error: &io::Error) -> Option<&'static str> {
    match error.kind() {
        io::ErrorKind::PermissionDenied => {
            Some("Check file and directory permissions of the data directory.")
        }
        io::ErrorKind::NotFound => Some("Check that the path exists."),
        io::ErrorKind::AlreadyExists => {
            Some("A leftover file or directory occupies the target path. Move it away and try again.")
        }
        _ if is_disk_full_error(error) => Some("Free up disk space and try again."),
        _ => None,
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;
