//! Topic tree controller
//!
//! The `TopicTreeController` is the only writer of the topic tree. It keeps
//! three resources in agreement:
//! - the in-memory [`TopicTree`]
//! - the index document on disk (via [`IndexStore`])
//! - the content directory mirror (via [`FileSystem`])
//!
//! Every mutation runs as: change the tree, change the filesystem, persist
//! the index. Each successful step records its inverse in a [`Journal`]; a
//! failing step rolls the journal back so the caller only ever sees a clean
//! failure. Cleanup after the index is durably written (deleting the old copy
//! of a moved directory, deleting a removed file) is log-only: a failure
//! there leaves an orphan on disk but never a wrong index.
//!
//! ## Usage
//!
//! ```ignore
//! let mut controller = TopicTreeController::open(Config::load()?)?;
//!
//! controller.add_node("Algebra", None)?;
//! controller.add_node("Linear Equations", Some("Algebra"))?;
//! controller.move_node("Linear Equations", None)?;
//! ```

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{TreeError, TreeResult};
use crate::fs::{FileSystem, LocalFileSystem};
use crate::journal::{Journal, Undo};
use crate::models::{file_extension, normalize, Content};
use crate::storage::{IndexStore, JsonIndexStore};
use crate::tree::{NodeId, TopicTree};

/// Owner of the topic tree and its on-disk mirror
pub struct TopicTreeController {
    tree: TopicTree,
    config: Config,
    fs: Box<dyn FileSystem>,
    store: Box<dyn IndexStore>,
    /// Set after a consistency violation; blocks further mutations
    halted: bool,
}

impl std::fmt::Debug for TopicTreeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicTreeController")
            .field("data_dir", &self.config.data_dir)
            .field("topics", &self.tree.len())
            .field("halted", &self.halted)
            .finish()
    }
}

impl TopicTreeController {
    // ==================== Lifecycle ====================

    /// Load the catalog and refresh the backup if `backup_on_open` is set
    ///
    /// A failing backup is logged and does not prevent opening.
    pub fn open(config: Config) -> TreeResult<Self> {
        let controller = Self::load(config)?;
        if controller.config.backup_on_open {
            if let Err(e) = controller.backup() {
                warn!("Could not refresh index backup: {}", e);
            }
        }
        Ok(controller)
    }

    /// Load the catalog from the local filesystem
    pub fn load(config: Config) -> TreeResult<Self> {
        Self::load_with(config, Box::new(LocalFileSystem), Box::new(JsonIndexStore))
    }

    /// Load the catalog through the given collaborators
    ///
    /// Requires the content directory to exist. If the primary index cannot
    /// be loaded, it is restored from the backup and loaded again.
    pub fn load_with(
        config: Config,
        fs: Box<dyn FileSystem>,
        store: Box<dyn IndexStore>,
    ) -> TreeResult<Self> {
        let topics_dir = config.topics_dir();
        if !fs.exists(&topics_dir) {
            return Err(TreeError::StorageMissing { path: topics_dir });
        }

        let index_path = config.index_path();
        let tree = match store.load(&index_path) {
            Ok(tree) => {
                info!("Loaded index {:?} ({} topics)", index_path, tree.len());
                tree
            }
            Err(primary) => {
                warn!("Index {:?} could not be loaded: {}", index_path, primary);
                match restore_from_backup(&config, fs.as_ref(), store.as_ref()) {
                    Ok(tree) => {
                        info!(
                            "Restored index {:?} from {:?}",
                            index_path,
                            config.backup_path()
                        );
                        tree
                    }
                    Err(restore) => {
                        error!("Index {:?} could not be restored: {}", index_path, restore);
                        return Err(TreeError::LoadFailed {
                            path: index_path,
                            primary: Box::new(primary),
                            restore: Box::new(restore),
                        });
                    }
                }
            }
        };

        Ok(Self {
            tree,
            config,
            fs,
            store,
            halted: false,
        })
    }

    /// Start over with an empty catalog on the local filesystem
    pub fn recreate(config: &Config) -> TreeResult<()> {
        Self::recreate_with(config, &LocalFileSystem, &JsonIndexStore)
    }

    /// Start over with an empty catalog
    ///
    /// An existing index or content directory is renamed to a free
    /// `<name>.old` recovery name, never deleted. Works without a loaded
    /// controller so a missing or unreadable catalog can be recovered.
    pub fn recreate_with(
        config: &Config,
        fs: &dyn FileSystem,
        store: &dyn IndexStore,
    ) -> TreeResult<()> {
        if !fs.exists(&config.data_dir) {
            fs.create_dir_all(&config.data_dir)?;
        }

        let index_path = config.index_path();
        if fs.exists(&index_path) {
            let old = recovery_path(fs, &index_path);
            fs.rename(&index_path, &old)?;
            warn!("Existing index {:?} moved to {:?}", index_path, old);
        }
        store.save(&TopicTree::new(), &index_path)?;
        info!("Created empty index {:?}", index_path);

        let topics_dir = config.topics_dir();
        if fs.exists(&topics_dir) {
            let old = recovery_path(fs, &topics_dir);
            fs.rename(&topics_dir, &old)?;
            warn!("Existing content directory {:?} moved to {:?}", topics_dir, old);
        }
        fs.create_dir(&topics_dir)?;
        info!("Created content directory {:?}", topics_dir);
        Ok(())
    }

    /// Copy the primary index over its backup
    pub fn backup(&self) -> TreeResult<()> {
        let from = self.config.index_path();
        let to = self.config.backup_path();
        self.fs.copy_file(&from, &to)?;
        info!("Backed up {:?} to {:?}", from, to);
        Ok(())
    }

    // ==================== Queries ====================

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read access to the underlying tree
    pub fn tree(&self) -> &TopicTree {
        &self.tree
    }

    /// True once a consistency violation stopped all mutations
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Check whether a topic with the same normalized title exists
    ///
    /// Empty titles never match.
    pub fn exists(&self, title: &str) -> bool {
        let exists = self.tree.contains_title(title);
        debug!("Topic '{}' exists: {}", title, exists);
        exists
    }

    /// Stored title of the topic matching `input` after normalization
    pub fn resolve_title(&self, input: &str) -> Option<String> {
        self.tree
            .find_normalized(input)
            .and_then(|id| self.tree.get(id))
            .map(|node| node.title().to_string())
    }

    /// Titles of the children of a topic, or of the root for `None`
    pub fn children(&self, title: Option<&str>) -> TreeResult<Vec<String>> {
        let id = self.lookup(title)?;
        Ok(self.tree.child_titles(id))
    }

    /// Directory mirroring a topic, or the content directory for `None`
    pub fn locate_directory(&self, title: Option<&str>) -> TreeResult<PathBuf> {
        let id = self.lookup(title)?;
        self.directory_of(id)
    }

    /// Content items of a topic, in stored order
    pub fn contents(&self, title: &str) -> TreeResult<Vec<Content>> {
        let id = self.lookup(Some(title))?;
        Ok(self.tree.contents(id).map(<[Content]>::to_vec).unwrap_or_default())
    }

    /// Absolute path of a content file
    pub fn content_path(&self, title: &str, filename: &str) -> TreeResult<PathBuf> {
        let id = self.lookup(Some(title))?;
        self.content_position(id, filename)?;
        Ok(self.directory_of(id)?.join(filename))
    }

    // ==================== Topic mutations ====================

    /// Add a topic under `parent` (the root for `None`)
    pub fn add_node(&mut self, title: &str, parent: Option<&str>) -> TreeResult<()> {
        self.transact(|c, journal| {
            check_title(title)?;
            if c.tree.contains_title(title) {
                return Err(TreeError::Collision(format!(
                    "topic '{}' already exists",
                    title
                )));
            }
            let parent_id = c.lookup(parent)?;

            let id = c.tree.create(title);
            journal.record(Undo::Unlink(id));
            c.tree
                .attach_sorted(parent_id, id)
                .ok_or_else(|| inconsistent(format!("could not attach topic '{}'", title)))?;

            let dir = c.directory_of(id)?;
            c.fs.create_dir(&dir)?;
            journal.record(Undo::RemoveDir(dir));

            c.persist()?;
            info!("Added topic '{}' under {}", title, describe(parent));
            Ok(())
        })
    }

    /// Move a topic and its subtree under `to` (the root for `None`)
    ///
    /// Moving a topic onto itself, into its own subtree, or moving the root
    /// is a collision. Moving a topic to its current parent changes nothing.
    pub fn move_node(&mut self, from: &str, to: Option<&str>) -> TreeResult<()> {
        self.transact(|c, journal| {
            if Some(from) == to {
                return Err(TreeError::Collision(format!(
                    "cannot move '{}' under itself",
                    from
                )));
            }
            let node = c.lookup(Some(from))?;
            let target = c.lookup(to)?;
            if c.tree.is_root(node) {
                return Err(TreeError::Collision("the root cannot be moved".to_string()));
            }
            if c.tree.is_ancestor_or_self(node, target) {
                return Err(TreeError::Collision(format!(
                    "cannot move '{}' into its own subtree",
                    from
                )));
            }
            if c.tree.get(node).and_then(|n| n.parent()) == Some(target) {
                debug!("Topic '{}' is already under {}", from, describe(to));
                return Ok(());
            }

            let old_dir = c.directory_of(node)?;
            let slot = c
                .tree
                .detach(node)
                .ok_or_else(|| inconsistent(format!("topic '{}' has no parent", from)))?;
            journal.record(Undo::Relink { node, slot });
            c.tree
                .attach_sorted(target, node)
                .ok_or_else(|| inconsistent(format!("could not attach topic '{}'", from)))?;

            let new_dir = c.directory_of(node)?;
            c.fs.copy_dir_all(&old_dir, &new_dir)?;
            journal.record(Undo::RemoveDir(new_dir));

            c.persist()?;
            c.discard_dir(&old_dir);
            info!("Moved topic '{}' under {}", from, describe(to));
            Ok(())
        })
    }

    /// Change a topic's title, relocating its directory
    ///
    /// The new title must not collide with another topic. If only the
    /// display form changes (same normalized title) no directory work is done.
    pub fn rename_node(&mut self, from: &str, to: &str) -> TreeResult<()> {
        self.transact(|c, journal| {
            check_title(to)?;
            let node = c.lookup(Some(from))?;
            if let Some(other) = c.tree.find_normalized(to) {
                if other != node {
                    return Err(TreeError::Collision(format!(
                        "topic '{}' already exists",
                        to
                    )));
                }
            }
            if from == to {
                return Ok(());
            }

            let relocate = normalize(from) != normalize(to);
            let old_dir = c.directory_of(node)?;

            // Detach first so the sorted re-insert only compares against the
            // other siblings, never against the node's own old title.
            let slot = c
                .tree
                .detach(node)
                .ok_or_else(|| inconsistent(format!("topic '{}' has no parent", from)))?;
            journal.record(Undo::Relink { node, slot });
            let old_title = c
                .tree
                .set_title(node, to)
                .ok_or_else(|| inconsistent(format!("topic '{}' vanished", from)))?;
            journal.record(Undo::Retitle {
                node,
                title: old_title,
            });
            c.tree
                .attach_sorted(slot.parent, node)
                .ok_or_else(|| inconsistent(format!("could not attach topic '{}'", to)))?;

            if relocate {
                let new_dir = c.directory_of(node)?;
                c.fs.copy_dir_all(&old_dir, &new_dir)?;
                journal.record(Undo::RemoveDir(new_dir));
            }

            c.persist()?;
            if relocate {
                c.discard_dir(&old_dir);
            }
            info!("Renamed topic '{}' to '{}'", from, to);
            Ok(())
        })
    }

    /// Remove a topic, its whole subtree and its directory
    pub fn remove_node(&mut self, title: &str) -> TreeResult<()> {
        self.transact(|c, journal| {
            let node = c.lookup(Some(title))?;
            if c.tree.is_root(node) {
                return Err(TreeError::Collision("the root cannot be removed".to_string()));
            }
            let dir = c.directory_of(node)?;

            let slot = c
                .tree
                .detach(node)
                .ok_or_else(|| inconsistent(format!("topic '{}' has no parent", title)))?;
            journal.record(Undo::Relink { node, slot });

            c.persist()?;
            c.tree.release(node);
            c.discard_dir(&dir);
            info!("Removed topic '{}'", title);
            Ok(())
        })
    }

    // ==================== Content mutations ====================

    /// Import a file as content of a topic
    ///
    /// `content.filename` names the source file. It is copied into the
    /// topic's directory under a name derived from the caption (or the kind
    /// when there is none) plus the source extension; a numeric suffix is
    /// appended while that name is taken. Returns the stored entry.
    pub fn add_content(&mut self, content: &Content, parent: &str) -> TreeResult<Content> {
        self.transact(|c, journal| {
            let node = c.lookup(Some(parent))?;
            let source = PathBuf::from(&content.filename);
            if !content.kind.accepts(&source) {
                return Err(TreeError::UnsupportedExtension {
                    path: source,
                    kind: content.kind.as_str(),
                    allowed: content.kind.extensions().join(", "),
                });
            }
            if !c.fs.exists(&source) {
                return Err(TreeError::from_io(
                    "read",
                    source,
                    io::Error::new(io::ErrorKind::NotFound, "source file does not exist"),
                ));
            }

            let dir = c.directory_of(node)?;
            let base = match content.caption.as_deref().map(normalize) {
                Some(name) if !name.is_empty() => name,
                _ => content.kind.as_str().to_string(),
            };
            let filename = c.free_filename(node, &dir, &base, &file_extension(&source));
            let stored = Content {
                kind: content.kind,
                filename: filename.clone(),
                caption: content.caption.clone(),
            };

            c.contents_of(node)?.push(stored.clone());
            journal.record(Undo::RemoveContent {
                node,
                filename: filename.clone(),
            });

            // `dest` was free, so whatever a failed copy left there is partial
            let dest = dir.join(&filename);
            let copied = c.fs.copy_file(&source, &dest);
            if copied.is_ok() || c.fs.exists(&dest) {
                journal.record(Undo::RemoveFile(dest));
            }
            copied?;

            c.persist()?;
            info!("Added {} to topic '{}'", stored, parent);
            Ok(stored)
        })
    }

    /// Give a content item a new caption, renaming its file to match
    ///
    /// The file keeps its extension. Returns the updated entry.
    pub fn rename_content(
        &mut self,
        parent: &str,
        filename: &str,
        caption: &str,
    ) -> TreeResult<Content> {
        self.transact(|c, journal| {
            check_title(caption)?;
            let node = c.lookup(Some(parent))?;
            let position = c.content_position(node, filename)?;
            let old = c.contents_of(node)?[position].clone();

            let renamed = Content {
                kind: old.kind,
                filename: format!("{}{}", normalize(caption), old.extension()),
                caption: Some(caption.to_string()),
            };
            if renamed.filename != old.filename
                && c.tree.content_position(node, &renamed.filename).is_some()
            {
                return Err(TreeError::Collision(format!(
                    "topic '{}' already has a file named '{}'",
                    parent, renamed.filename
                )));
            }
            let dir = c.directory_of(node)?;

            c.contents_of(node)?[position] = renamed.clone();
            journal.record(Undo::ReplaceContent {
                node,
                position,
                content: old.clone(),
            });

            if renamed.filename != old.filename {
                let from = dir.join(&old.filename);
                let to = dir.join(&renamed.filename);
                if c.fs.exists(&to) {
                    return Err(TreeError::from_io(
                        "move file to",
                        to,
                        io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
                    ));
                }
                c.fs.rename(&from, &to)?;
                journal.record(Undo::MoveFile { from: to, to: from });
            }

            c.persist()?;
            info!("Renamed {} in topic '{}' to {}", old, parent, renamed);
            Ok(renamed)
        })
    }

    /// Remove a content item and delete its file
    pub fn remove_content(&mut self, parent: &str, filename: &str) -> TreeResult<()> {
        self.transact(|c, journal| {
            let node = c.lookup(Some(parent))?;
            let position = c.content_position(node, filename)?;
            let path = c.directory_of(node)?.join(filename);

            let removed = c.contents_of(node)?.remove(position);
            journal.record(Undo::InsertContent {
                node,
                position,
                content: removed.clone(),
            });

            c.persist()?;
            if let Err(e) = c.fs.remove_file(&path) {
                warn!("File {:?} is no longer needed but could not be deleted: {}", path, e);
            }
            info!("Removed {} from topic '{}'", removed, parent);
            Ok(())
        })
    }

    /// Exchange the positions of two content items of the same topic
    pub fn swap_contents(&mut self, parent: &str, first: &str, second: &str) -> TreeResult<()> {
        self.transact(|c, journal| {
            let node = c.lookup(Some(parent))?;
            let a = c.content_position(node, first)?;
            let b = c.content_position(node, second)?;
            if a == b {
                return Ok(());
            }

            c.contents_of(node)?.swap(a, b);
            journal.record(Undo::SwapContents { node, a, b });

            c.persist()?;
            info!("Swapped '{}' and '{}' in topic '{}'", first, second, parent);
            Ok(())
        })
    }

    // ==================== Internals ====================

    /// Run one mutation with rollback on failure
    ///
    /// Refuses to run once halted. A fatal error halts the controller.
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Self, &mut Journal) -> TreeResult<T>,
    ) -> TreeResult<T> {
        if self.halted {
            return Err(TreeError::Halted);
        }

        let mut journal = Journal::new();
        match op(self, &mut journal) {
            Ok(value) => Ok(value),
            Err(err) => {
                if journal.len() > 0 {
                    warn!("Rolling back {} step(s) after: {}", journal.len(), err);
                }
                journal.rollback(&mut self.tree, self.fs.as_ref());
                if err.is_fatal() {
                    error!("{}; refusing further changes", err);
                    self.halted = true;
                }
                Err(err)
            }
        }
    }

    /// Resolve a title to a node. A miss is a consistency violation because
    /// callers only pass titles they obtained from this controller.
    fn lookup(&self, title: Option<&str>) -> TreeResult<NodeId> {
        self.tree.find(title).ok_or_else(|| {
            inconsistent(format!(
                "topic '{}' was requested but does not exist",
                title.unwrap_or_default()
            ))
        })
    }

    fn directory_of(&self, id: NodeId) -> TreeResult<PathBuf> {
        self.tree
            .directory(id, &self.config.topics_dir())
            .ok_or_else(|| inconsistent(format!("topic {:?} is not attached to the tree", id)))
    }

    fn contents_of(&mut self, id: NodeId) -> TreeResult<&mut Vec<Content>> {
        self.tree
            .contents_mut(id)
            .ok_or_else(|| inconsistent(format!("topic {:?} vanished", id)))
    }

    fn content_position(&self, id: NodeId, filename: &str) -> TreeResult<usize> {
        self.tree.content_position(id, filename).ok_or_else(|| {
            let title = self.tree.get(id).map(|n| n.title()).unwrap_or_default();
            inconsistent(format!(
                "content '{}' was requested in topic '{}' but does not exist",
                filename, title
            ))
        })
    }

    fn persist(&self) -> TreeResult<()> {
        let path = self.config.index_path();
        self.store.save(&self.tree, &path).inspect_err(|e| {
            warn!("Saving {:?} failed: {}", path, e);
        })?;
        debug!("Saved {:?}", path);
        Ok(())
    }

    /// Delete a directory that the committed index no longer references
    fn discard_dir(&self, path: &Path) {
        if let Err(e) = self.fs.remove_dir_all(path) {
            warn!("Directory {:?} is no longer needed but could not be deleted: {}", path, e);
        }
    }

    /// First of `base.ext`, `base0.ext`, `base1.ext`, ... free on disk and in the index
    fn free_filename(&self, id: NodeId, dir: &Path, base: &str, extension: &str) -> String {
        let taken = |name: &str| {
            self.fs.exists(&dir.join(name)) || self.tree.content_position(id, name).is_some()
        };
        let mut candidate = format!("{}{}", base, extension);
        let mut suffix = 0u32;
        while taken(&candidate) {
            candidate = format!("{}{}{}", base, suffix, extension);
            suffix += 1;
        }
        candidate
    }
}

fn restore_from_backup(
    config: &Config,
    fs: &dyn FileSystem,
    store: &dyn IndexStore,
) -> TreeResult<TopicTree> {
    let backup = config.backup_path();
    if !fs.exists(&backup) {
        return Err(TreeError::from_io(
            "read",
            backup,
            io::Error::new(io::ErrorKind::NotFound, "no backup available"),
        ));
    }
    fs.copy_file(&backup, &config.index_path())?;
    store.load(&config.index_path())
}

/// First of `<path>.old`, `<path>.old.1`, `<path>.old.2`, ... that does not exist
fn recovery_path(fs: &dyn FileSystem, path: &Path) -> PathBuf {
    let with_suffix = |suffix: &str| {
        let mut name = OsString::from(path.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    };
    let mut candidate = with_suffix(".old");
    let mut n = 1;
    while fs.exists(&candidate) {
        candidate = with_suffix(&format!(".old.{}", n));
        n += 1;
    }
    candidate
}

fn check_title(title: &str) -> TreeResult<()> {
    if normalize(title).is_empty() {
        return Err(TreeError::InvalidTitle(title.to_string()));
    }
    Ok(())
}

fn inconsistent(message: String) -> TreeError {
    error!("Consistency violation: {}", message);
    TreeError::Consistency(message)
}

fn describe(title: Option<&str>) -> String {
    match title {
        Some(title) => format!("'{}'", title),
        None => "the root".to_string(),
    }
}
