//! Compensation journal
//!
//! Every mutating controller operation records one [`Undo`] entry after each
//! forward step succeeds. If a later step fails, the journal replays the
//! entries in reverse order, restoring the tree first-in-last-out and
//! removing whatever the operation already wrote to disk.
//!
//! Filesystem compensation is best effort: a failure is logged and leaves an
//! orphan behind, never a dangling index entry.

use std::path::PathBuf;

use tracing::{error, warn};

use crate::fs::FileSystem;
use crate::models::Content;
use crate::tree::{NodeId, Slot, TopicTree};

/// Reverse of one forward step
#[derive(Debug)]
pub(crate) enum Undo {
    /// Drop a node that was created by the operation
    Unlink(NodeId),
    /// Put a node back at the slot it was detached from
    Relink { node: NodeId, slot: Slot },
    /// Restore a node's previous title
    Retitle { node: NodeId, title: String },
    /// Remove a content entry added by the operation
    RemoveContent { node: NodeId, filename: String },
    /// Re-insert a removed content entry at its old position
    InsertContent {
        node: NodeId,
        position: usize,
        content: Content,
    },
    /// Overwrite a modified content entry with its previous value
    ReplaceContent {
        node: NodeId,
        position: usize,
        content: Content,
    },
    /// Swap two content entries back
    SwapContents { node: NodeId, a: usize, b: usize },
    /// Delete a directory tree created by the operation
    RemoveDir(PathBuf),
    /// Delete a file created by the operation
    RemoveFile(PathBuf),
    /// Move a file back to where it was
    MoveFile { from: PathBuf, to: PathBuf },
}

impl Undo {
    fn apply(self, tree: &mut TopicTree, fs: &dyn FileSystem) {
        match self {
            Undo::Unlink(node) => {
                tree.detach(node);
                tree.release(node);
            }
            Undo::Relink { node, slot } => {
                tree.detach(node);
                if tree.attach_at(slot, node).is_none() {
                    error!("Could not re-attach topic {:?} at {:?}", node, slot);
                }
            }
            Undo::Retitle { node, title } => {
                if tree.set_title(node, title).is_none() {
                    error!("Could not restore title of topic {:?}", node);
                }
            }
            Undo::RemoveContent { node, filename } => {
                let position = tree.content_position(node, &filename);
                match (position, tree.contents_mut(node)) {
                    (Some(position), Some(contents)) => {
                        contents.remove(position);
                    }
                    _ => error!("Could not remove content '{}' from topic {:?}", filename, node),
                }
            }
            Undo::InsertContent {
                node,
                position,
                content,
            } => match tree.contents_mut(node) {
                Some(contents) => contents.insert(position.min(contents.len()), content),
                None => error!("Could not restore content '{}' of topic {:?}", content.filename, node),
            },
            Undo::ReplaceContent {
                node,
                position,
                content,
            } => match tree.contents_mut(node).and_then(|c| c.get_mut(position)) {
                Some(slot) => *slot = content,
                None => error!("Could not restore content '{}' of topic {:?}", content.filename, node),
            },
            Undo::SwapContents { node, a, b } => match tree.contents_mut(node) {
                Some(contents) if a < contents.len() && b < contents.len() => contents.swap(a, b),
                _ => error!("Could not swap contents of topic {:?} back", node),
            },
            Undo::RemoveDir(path) => {
                if let Err(e) = fs.remove_dir_all(&path) {
                    warn!("Directory {:?} is no longer needed but could not be deleted: {}", path, e);
                }
            }
            Undo::RemoveFile(path) => {
                if let Err(e) = fs.remove_file(&path) {
                    warn!("File {:?} is no longer needed but could not be deleted: {}", path, e);
                }
            }
            Undo::MoveFile { from, to } => {
                if let Err(e) = fs.rename(&from, &to) {
                    warn!("Could not move {:?} back to {:?}: {}", from, to, e);
                }
            }
        }
    }
}

/// Ordered list of compensating steps for one operation
#[derive(Debug, Default)]
pub(crate) struct Journal {
    steps: Vec<Undo>,
}

impl Journal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, undo: Undo) {
        self.steps.push(undo);
    }

    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    /// Apply every recorded step, most recent first
    pub(crate) fn rollback(self, tree: &mut TopicTree, fs: &dyn FileSystem) {
        for undo in self.steps.into_iter().rev() {
            undo.apply(tree, fs);
        }
    }
}
