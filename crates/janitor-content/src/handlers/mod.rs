//! Manifest editing strategies

mod json;
mod lines;

pub use json::JsonEditor;
pub use lines::LineEditor;
