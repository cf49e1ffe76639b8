//! Command handlers

pub mod catalog;
pub mod config;
pub mod content;
pub mod status;
pub mod topic;
