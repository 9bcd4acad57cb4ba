//! Shared test utilities for the Tree Janitor workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`tree`]: [`TestTree`] builder and write-detecting snapshots
//! - [`fixtures`]: a typical freshly extracted project

pub mod fixtures;
pub mod tree;

pub use tree::{Snapshot, TestTree};
