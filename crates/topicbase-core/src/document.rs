//! Index document handling
//!
//! This module converts between the in-memory [`TopicTree`] and the JSON
//! index document stored on disk:
//!
//! ```text
//! {
//!   "schema_version": 1,
//!   "topic_tree": {
//!     "nodes": [
//!       { "title": "Algebra",
//!         "contents": [{ "type": "IMAGE", "filename": "IMAGE.png" }],
//!         "nodes": [] }
//!     ]
//!   }
//! }
//! ```
//!
//! Decoding validates the tree invariants so a hand-edited or damaged index
//! is rejected instead of silently loaded.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::{normalize, Content};
use crate::tree::{compare_titles, NodeId, TopicTree};

/// Errors that can occur while encoding or decoding the index
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported schema version {found} (expected {})", CURRENT_SCHEMA_VERSION)]
    UnsupportedVersion { found: u64 },

    #[error("Topic with empty title under '{parent}'")]
    EmptyTitle { parent: String },

    #[error("Duplicate topic title '{0}'")]
    DuplicateTitle(String),

    #[error("Duplicate content filename '{filename}' in topic '{topic}'")]
    DuplicateFilename { topic: String, filename: String },

    #[error("Invalid content filename '{filename}' in topic '{topic}'")]
    InvalidFilename { topic: String, filename: String },

    #[error("Topic '{0}' could not be attached to the tree")]
    Unattached(String),
}

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: u64 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct IndexDocument {
    schema_version: u64,
    topic_tree: RootElement,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RootElement {
    #[serde(default)]
    nodes: Vec<NodeElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeElement {
    title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<NodeElement>,
}

/// Encode a tree as pretty-printed JSON bytes
///
/// Detached nodes are not part of the document.
pub fn encode(tree: &TopicTree) -> Result<Vec<u8>, DocumentError> {
    let doc = IndexDocument {
        schema_version: CURRENT_SCHEMA_VERSION,
        topic_tree: RootElement {
            nodes: encode_children(tree, tree.root()),
        },
    };
    let mut bytes = serde_json::to_vec_pretty(&doc)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn encode_children(tree: &TopicTree, id: NodeId) -> Vec<NodeElement> {
    let Some(node) = tree.get(id) else {
        return Vec::new();
    };
    node.children()
        .iter()
        .filter_map(|&child| {
            tree.get(child).map(|n| NodeElement {
                title: n.title().to_string(),
                contents: n.contents().to_vec(),
                nodes: encode_children(tree, child),
            })
        })
        .collect()
}

/// Decode JSON bytes into a tree, validating its invariants
pub fn decode(bytes: &[u8]) -> Result<TopicTree, DocumentError> {
    let doc: IndexDocument = serde_json::from_slice(bytes)?;
    if doc.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(DocumentError::UnsupportedVersion {
            found: doc.schema_version,
        });
    }

    let mut tree = TopicTree::new();
    let mut seen = HashSet::new();
    let root = tree.root();
    decode_children(&mut tree, root, "", doc.topic_tree.nodes, &mut seen)?;
    Ok(tree)
}

fn decode_children(
    tree: &mut TopicTree,
    parent: NodeId,
    parent_title: &str,
    elements: Vec<NodeElement>,
    seen: &mut HashSet<String>,
) -> Result<(), DocumentError> {
    let in_order = elements
        .windows(2)
        .all(|w| compare_titles(&w[0].title, &w[1].title) != Ordering::Greater);
    if !in_order {
        warn!("Children of '{}' were out of order in the index, re-sorting", parent_title);
    }

    for element in elements {
        let key = normalize(&element.title);
        if key.is_empty() {
            return Err(DocumentError::EmptyTitle {
                parent: parent_title.to_string(),
            });
        }
        if !seen.insert(key) {
            return Err(DocumentError::DuplicateTitle(element.title));
        }

        let mut filenames = HashSet::new();
        for content in &element.contents {
            if !is_plain_filename(&content.filename) {
                return Err(DocumentError::InvalidFilename {
                    topic: element.title.clone(),
                    filename: content.filename.clone(),
                });
            }
            if !filenames.insert(content.filename.as_str()) {
                return Err(DocumentError::DuplicateFilename {
                    topic: element.title.clone(),
                    filename: content.filename.clone(),
                });
            }
        }

        let id = tree.create(element.title.clone());
        if let Some(contents) = tree.contents_mut(id) {
            *contents = element.contents;
        }
        tree.attach_sorted(parent, id)
            .ok_or_else(|| DocumentError::Unattached(element.title.clone()))?;
        decode_children(tree, id, &element.title, element.nodes, seen)?;
    }
    Ok(())
}

/// A single normal path component, so it always names a file inside its
/// topic's directory
fn is_plain_filename(filename: &str) -> bool {
    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == filename
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentKind;

    fn sample_tree() -> TopicTree {
        let mut tree = TopicTree::new();
        let root = tree.root();
        let algebra = tree.create("Algebra");
        tree.attach_sorted(root, algebra).unwrap();
        let linear = tree.create("Linear Equations");
        tree.attach_sorted(algebra, linear).unwrap();
        tree.contents_mut(algebra).unwrap().push(
            Content::new(ContentKind::Image, "Unit circle.png").with_caption("Unit circle"),
        );
        tree
    }

    #[test]
    fn test_encode_layout() {
        let bytes = encode(&sample_tree()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["schema_version"], 1);
        let algebra = &value["topic_tree"]["nodes"][0];
        assert_eq!(algebra["title"], "Algebra");
        assert_eq!(algebra["contents"][0]["type"], "IMAGE");
        assert_eq!(algebra["contents"][0]["caption"], "Unit circle");
        assert_eq!(algebra["nodes"][0]["title"], "Linear Equations");
    }

    #[test]
    fn test_decode_restores_structure() {
        let tree = decode(&encode(&sample_tree()).unwrap()).unwrap();

        let algebra = tree.find(Some("Algebra")).unwrap();
        assert_eq!(tree.child_titles(algebra), vec!["Linear Equations"]);
        assert_eq!(tree.contents(algebra).unwrap()[0].filename, "Unit circle.png");
    }

    #[test]
    fn test_empty_document() {
        let tree = decode(br#"{"schema_version":1,"topic_tree":{}}"#).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_decode_sorts_out_of_order_children() {
        let json = br#"{"schema_version":1,"topic_tree":{"nodes":[
            {"title":"geometry"},{"title":"Algebra"},{"title":"calculus"}]}}"#;
        let tree = decode(json).unwrap();
        assert_eq!(
            tree.child_titles(tree.root()),
            vec!["Algebra", "calculus", "geometry"]
        );
    }

    #[test]
    fn test_decode_rejects_duplicate_titles() {
        let json = br#"{"schema_version":1,"topic_tree":{"nodes":[
            {"title":"Algebra","nodes":[{"title":"Algebra "}]}]}}"#;
        assert!(matches!(
            decode(json),
            Err(DocumentError::DuplicateTitle(_))
        ));
    }

    #[test]
    fn test_decode_rejects_duplicate_filenames() {
        let json = br#"{"schema_version":1,"topic_tree":{"nodes":[
            {"title":"Algebra","contents":[
                {"type":"IMAGE","filename":"a.png"},
                {"type":"OTHER","filename":"a.png"}]}]}}"#;
        assert!(matches!(
            decode(json),
            Err(DocumentError::DuplicateFilename { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_filenames_outside_the_topic() {
        for filename in ["../x.png", "sub/x.png", "/etc/passwd", ".", ""] {
            let json = format!(
                r#"{{"schema_version":1,"topic_tree":{{"nodes":[
                    {{"title":"Algebra","contents":[{{"type":"OTHER","filename":"{}"}}]}}]}}}}"#,
                filename
            );
            assert!(
                matches!(
                    decode(json.as_bytes()),
                    Err(DocumentError::InvalidFilename { .. })
                ),
                "accepted {:?}",
                filename
            );
        }
        assert!(is_plain_filename("Unit circle.png"));
        assert!(is_plain_filename("..png"));
    }

    #[test]
    fn test_decode_rejects_empty_title_and_bad_version() {
        let empty = br#"{"schema_version":1,"topic_tree":{"nodes":[{"title":"  "}]}}"#;
        assert!(matches!(decode(empty), Err(DocumentError::EmptyTitle { .. })));

        let future = br#"{"schema_version":7,"topic_tree":{}}"#;
        assert!(matches!(
            decode(future),
            Err(DocumentError::UnsupportedVersion { found: 7 })
        ));

        assert!(matches!(decode(b"not json"), Err(DocumentError::Json(_))));
    }
}
