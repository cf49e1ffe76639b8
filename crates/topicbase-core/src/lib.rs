//! Topicbase Core Library
//!
//! This crate provides the core functionality for Topicbase, a catalog of
//! hierarchical topics with attached content files.
//!
//! # Architecture
//!
//! The catalog lives in two places that are kept in agreement:
//!
//! - **Index document**: a JSON file holding the topic tree and the content
//!   entries of every topic
//! - **Content directory**: one directory per topic, nested like the tree,
//!   holding that topic's content files
//!
//! All changes go through [`TopicTreeController`], which applies each
//! mutation as a sequence of compensated steps.
//!
//! # Quick Start
//!
//! ```text
//! let mut controller = TopicTreeController::open(Config::load()?)?;
//!
//! controller.add_node("Algebra", None)?;
//! controller.add_content(&Content::new(ContentKind::Image, "circle.png"), "Algebra")?;
//!
//! let children = controller.children(None)?;
//! ```
//!
//! # Modules
//!
//! - `controller`: Topic tree controller (main entry point)
//! - `shared`: Thread-safe controller handle
//! - `tree`: In-memory topic tree
//! - `models`: Content entries and title normalization
//! - `document`: Index document encoding
//! - `storage`: Index persistence
//! - `fs`: Filesystem primitives
//! - `config`: Application configuration

pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod fs;
mod journal;
pub mod models;
pub mod shared;
pub mod storage;
pub mod tree;

pub use config::Config;
pub use controller::TopicTreeController;
pub use document::DocumentError;
pub use error::{PersistenceError, TreeError, TreeResult};
pub use fs::{FileSystem, LocalFileSystem};
pub use models::{normalize, Content, ContentKind};
pub use shared::SharedController;
pub use storage::{IndexStore, JsonIndexStore};
pub use tree::{NodeId, TopicTree};
