//! Shared controller handle
//!
//! Wraps a [`TopicTreeController`] in `Arc<RwLock<..>>` so a multi-threaded
//! application can hand it around. Queries take the read lock and may run
//! together; mutations take the write lock and run one at a time, so no one
//! observes the tree between the steps of a mutation.

use std::sync::{Arc, RwLock};

use crate::controller::TopicTreeController;
use crate::error::{TreeError, TreeResult};

/// Cloneable, thread-safe handle to one controller
#[derive(Debug, Clone)]
pub struct SharedController {
    inner: Arc<RwLock<TopicTreeController>>,
}

impl SharedController {
    pub fn new(controller: TopicTreeController) -> Self {
        Self {
            inner: Arc::new(RwLock::new(controller)),
        }
    }

    /// Run a query under the read lock
    pub fn read<T>(&self, f: impl FnOnce(&TopicTreeController) -> T) -> TreeResult<T> {
        let guard = self
            .inner
            .read()
            .map_err(|_| TreeError::Consistency("controller lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    /// Run a mutation under the write lock
    pub fn write<T>(
        &self,
        f: impl FnOnce(&mut TopicTreeController) -> TreeResult<T>,
    ) -> TreeResult<T> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| TreeError::Consistency("controller lock poisoned".to_string()))?;
        f(&mut guard)
    }
}
