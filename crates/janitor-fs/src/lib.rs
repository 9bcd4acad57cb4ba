//! Filesystem primitives for Tree Janitor
//!
//! Provides forward-slash path handling, atomic writes, first-writer-wins
//! copies, recursive walking, and serde documents in TOML, JSON or YAML.

pub mod checksum;
pub mod document;
pub mod error;
pub mod io;
pub mod path;
pub mod walk;

pub use document::{DocumentStore, Format};
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::NormalizedPath;
