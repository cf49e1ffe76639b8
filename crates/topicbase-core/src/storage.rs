//! Index persistence
//!
//! Handles saving and loading the index document to/from the filesystem.
//! Uses atomic writes (write to temp file, then rename) so a failed save
//! never leaves a truncated index behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::document;
use crate::error::{TreeError, TreeResult};
use crate::tree::TopicTree;

/// Loads and stores the index document
pub trait IndexStore: Send + Sync {
    fn load(&self, path: &Path) -> TreeResult<TopicTree>;

    fn save(&self, tree: &TopicTree, path: &Path) -> TreeResult<()>;
}

/// [`IndexStore`] writing the JSON index document
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonIndexStore;

impl IndexStore for JsonIndexStore {
    fn load(&self, path: &Path) -> TreeResult<TopicTree> {
        let bytes = fs::read(path).map_err(|e| TreeError::persistence(path, e))?;
        document::decode(&bytes).map_err(|e| TreeError::persistence(path, e))
    }

    fn save(&self, tree: &TopicTree, path: &Path) -> TreeResult<()> {
        let bytes = document::encode(tree).map_err(|e| TreeError::persistence(path, e))?;
        atomic_write(path, &bytes).map_err(|e| TreeError::persistence(path, e))
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}
