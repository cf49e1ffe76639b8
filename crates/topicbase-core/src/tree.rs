//! Topic tree
//!
//! Arena of topic nodes addressed by [`NodeId`]. Each node keeps its parent
//! id and an ordered list of child ids, so detaching and re-attaching a
//! subtree only touches two child lists and one parent field.
//!
//! Invariants kept by the mutators here:
//! - titles are unique across the whole tree after normalization
//! - children are sorted by case-insensitive title
//! - content filenames are unique within a node
//!
//! The tree itself never touches the filesystem; the controller pairs every
//! change here with the matching directory operation.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::models::{normalize, Content};

/// Stable handle to a node in a [`TopicTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One topic
#[derive(Debug, Clone)]
pub struct TopicNode {
    title: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    contents: Vec<Content>,
}

impl TopicNode {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn contents(&self) -> &[Content] {
        &self.contents
    }
}

/// Where a detached node used to live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub parent: NodeId,
    pub position: usize,
}

/// The topic hierarchy
#[derive(Debug, Clone)]
pub struct TopicTree {
    nodes: Vec<Option<TopicNode>>,
    free: Vec<usize>,
}

impl Default for TopicTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicTree {
    /// Create a tree holding only the root
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(TopicNode {
                title: String::new(),
                parent: None,
                children: Vec::new(),
                contents: Vec::new(),
            })],
            free: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id.0 == 0
    }

    pub fn get(&self, id: NodeId) -> Option<&TopicNode> {
        self.nodes.get(id.0).and_then(|n| n.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut TopicNode> {
        self.nodes.get_mut(id.0).and_then(|n| n.as_mut())
    }

    /// Number of topics, root excluded. Detached nodes still count until released.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all nodes reachable from the root, depth first, root excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.get(id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.get(next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Find a node by exact title. `None` selects the root.
    pub fn find(&self, title: Option<&str>) -> Option<NodeId> {
        match title {
            None => Some(self.root()),
            Some(title) => self
                .descendants(self.root())
                .into_iter()
                .find(|&id| self.get(id).is_some_and(|n| n.title == title)),
        }
    }

    /// Find the attached node whose normalized title equals the normalized input
    pub fn find_normalized(&self, title: &str) -> Option<NodeId> {
        let wanted = normalize(title);
        if wanted.is_empty() {
            return None;
        }
        self.descendants(self.root())
            .into_iter()
            .find(|&id| self.get(id).is_some_and(|n| normalize(&n.title) == wanted))
    }

    /// True iff some attached node's normalized title equals the normalized input
    pub fn contains_title(&self, title: &str) -> bool {
        self.find_normalized(title).is_some()
    }

    /// Titles of the direct children of a node, in stored order
    pub fn child_titles(&self, id: NodeId) -> Vec<String> {
        self.get(id)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|&c| self.get(c).map(|n| n.title.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True if `ancestor` is `id` or lies on the path from `id` to the root
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.get(cur).and_then(|n| n.parent);
        }
        false
    }

    /// Directory of a node below `topics_dir`: one normalized segment per ancestor
    pub fn directory(&self, id: NodeId, topics_dir: &Path) -> Option<PathBuf> {
        let mut segments = Vec::new();
        let mut current = id;
        loop {
            let node = self.get(current)?;
            match node.parent {
                Some(parent) => {
                    segments.push(normalize(&node.title));
                    current = parent;
                }
                None if self.is_root(current) => break,
                None => return None,
            }
        }
        let mut path = topics_dir.to_path_buf();
        path.extend(segments.iter().rev());
        Some(path)
    }

    /// Create a detached node. It becomes part of the tree once attached.
    pub fn create(&mut self, title: impl Into<String>) -> NodeId {
        let node = TopicNode {
            title: title.into(),
            parent: None,
            children: Vec::new(),
            contents: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Attach a detached node under `parent` keeping siblings sorted
    ///
    /// Inserts before the first sibling whose title compares greater than or
    /// equal (case-insensitively), else appends. Returns the position used.
    pub fn attach_sorted(&mut self, parent: NodeId, id: NodeId) -> Option<usize> {
        let title = self.get(id)?.title.clone();
        let siblings = &self.get(parent)?.children;
        let position = siblings
            .iter()
            .position(|&s| {
                self.get(s)
                    .is_some_and(|n| compare_titles(&n.title, &title) != Ordering::Less)
            })
            .unwrap_or(siblings.len());
        self.attach_at(Slot { parent, position }, id)?;
        Some(position)
    }

    /// Attach a detached node at an exact position (used to undo a detach)
    pub fn attach_at(&mut self, slot: Slot, id: NodeId) -> Option<()> {
        if self.get(id)?.parent.is_some() || self.is_root(id) {
            return None;
        }
        let parent = self.node_mut(slot.parent)?;
        let position = slot.position.min(parent.children.len());
        parent.children.insert(position, id);
        self.node_mut(id)?.parent = Some(slot.parent);
        Some(())
    }

    /// Detach a node (with its subtree) from its parent, returning its old slot
    pub fn detach(&mut self, id: NodeId) -> Option<Slot> {
        let parent = self.get(id)?.parent?;
        let parent_node = self.node_mut(parent)?;
        let position = parent_node.children.iter().position(|&c| c == id)?;
        parent_node.children.remove(position);
        self.node_mut(id)?.parent = None;
        Some(Slot { parent, position })
    }

    /// Free a detached node and its whole subtree
    pub fn release(&mut self, id: NodeId) {
        if self.is_root(id) || self.get(id).map_or(true, |n| n.parent.is_some()) {
            return;
        }
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for NodeId(index) in doomed {
            self.nodes[index] = None;
            self.free.push(index);
        }
    }

    /// Replace a node's title, returning the previous one
    pub fn set_title(&mut self, id: NodeId, title: impl Into<String>) -> Option<String> {
        let node = self.node_mut(id)?;
        Some(std::mem::replace(&mut node.title, title.into()))
    }

    pub fn contents(&self, id: NodeId) -> Option<&[Content]> {
        self.get(id).map(|n| n.contents.as_slice())
    }

    pub fn contents_mut(&mut self, id: NodeId) -> Option<&mut Vec<Content>> {
        self.node_mut(id).map(|n| &mut n.contents)
    }

    /// Position of a content item by filename
    pub fn content_position(&self, id: NodeId, filename: &str) -> Option<usize> {
        self.get(id)?
            .contents
            .iter()
            .position(|c| c.filename == filename)
    }

    /// Check the sibling-ordering invariant for every attached node
    pub fn is_sorted(&self) -> bool {
        std::iter::once(self.root())
            .chain(self.descendants(self.root()))
            .all(|id| {
                let titles = self.child_titles(id);
                titles
                    .windows(2)
                    .all(|w| compare_titles(&w[0], &w[1]) != Ordering::Greater)
            })
    }
}

/// Case-insensitive title comparison used for sibling order
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(tree: &mut TopicTree, title: &str, parent: Option<&str>) -> NodeId {
        let parent = tree.find(parent).unwrap();
        let id = tree.create(title);
        tree.attach_sorted(parent, id).unwrap();
        id
    }

    #[test]
    fn test_new_tree_has_only_root() {
        let tree = TopicTree::new();
        assert!(tree.is_empty());
        assert!(tree.child_titles(tree.root()).is_empty());
        assert_eq!(tree.find(None), Some(tree.root()));
    }

    #[test]
    fn test_attach_sorted_case_insensitive() {
        let mut tree = TopicTree::new();
        add(&mut tree, "geometry", None);
        add(&mut tree, "Algebra", None);
        add(&mut tree, "Calculus", None);
        add(&mut tree, "analysis", None);

        assert_eq!(
            tree.child_titles(tree.root()),
            vec!["Algebra", "analysis", "Calculus", "geometry"]
        );
        assert!(tree.is_sorted());
    }

    #[test]
    fn test_contains_title_uses_normalized_form() {
        let mut tree = TopicTree::new();
        add(&mut tree, "Linear Equations", None);

        assert!(tree.contains_title("Linear   Equations"));
        assert!(tree.contains_title(" Linear Equations "));
        assert!(!tree.contains_title("linear equations"));
        assert!(!tree.contains_title(""));
        assert!(!tree.contains_title("   "));
    }

    #[test]
    fn test_directory_concatenates_ancestors() {
        let mut tree = TopicTree::new();
        add(&mut tree, "Algebra", None);
        let child = add(&mut tree, "Linear  Equations", Some("Algebra"));

        let dir = tree.directory(child, Path::new("topics")).unwrap();
        assert_eq!(dir, Path::new("topics/Algebra/Linear Equations"));
        assert_eq!(
            tree.directory(tree.root(), Path::new("topics")).unwrap(),
            Path::new("topics")
        );
    }

    #[test]
    fn test_detach_and_reattach_restores_position() {
        let mut tree = TopicTree::new();
        add(&mut tree, "A", None);
        let b = add(&mut tree, "B", None);
        add(&mut tree, "C", None);

        let slot = tree.detach(b).unwrap();
        assert_eq!(slot.position, 1);
        assert_eq!(tree.child_titles(tree.root()), vec!["A", "C"]);
        assert!(!tree.contains_title("B"));
        assert!(tree.directory(b, Path::new("t")).is_none());

        tree.attach_at(slot, b).unwrap();
        assert_eq!(tree.child_titles(tree.root()), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_attach_rejects_attached_node() {
        let mut tree = TopicTree::new();
        let a = add(&mut tree, "A", None);
        let root = tree.root();
        assert!(tree.attach_sorted(root, a).is_none());
        assert!(tree.detach(root).is_none());
    }

    #[test]
    fn test_release_frees_subtree_and_reuses_slots() {
        let mut tree = TopicTree::new();
        let algebra = add(&mut tree, "Algebra", None);
        add(&mut tree, "Groups", Some("Algebra"));
        add(&mut tree, "Rings", Some("Algebra"));
        assert_eq!(tree.len(), 3);

        tree.detach(algebra).unwrap();
        tree.release(algebra);
        assert_eq!(tree.len(), 0);
        assert!(tree.find(Some("Groups")).is_none());

        let reused = tree.create("Geometry");
        assert!(reused.0 >= 1 && reused.0 <= 3);
    }

    #[test]
    fn test_is_ancestor_or_self() {
        let mut tree = TopicTree::new();
        let a = add(&mut tree, "A", None);
        let b = add(&mut tree, "B", Some("A"));
        let c = add(&mut tree, "C", Some("B"));

        assert!(tree.is_ancestor_or_self(a, c));
        assert!(tree.is_ancestor_or_self(c, c));
        assert!(!tree.is_ancestor_or_self(c, a));
        assert!(tree.is_ancestor_or_self(tree.root(), b));
    }

    #[test]
    fn test_set_title_and_content_position() {
        let mut tree = TopicTree::new();
        let a = add(&mut tree, "A", None);
        assert_eq!(tree.set_title(a, "Z").as_deref(), Some("A"));
        assert!(tree.find(Some("Z")).is_some());

        tree.contents_mut(a)
            .unwrap()
            .push(Content::new(crate::models::ContentKind::Image, "IMAGE.png"));
        assert_eq!(tree.content_position(a, "IMAGE.png"), Some(0));
        assert_eq!(tree.content_position(a, "other.png"), None);
    }
}
