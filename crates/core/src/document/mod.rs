//! Layout document - the attributed element tree holding page geometry.
//!
//! This module contains:
//! - `tree` - arena storage, node creation/removal and attribute access (LayoutDocument)
//! - `select` - the path selector used to query the tree
//! - `elements` - typed helpers for pages, regions, lines, words and glyphs
//! - `custom` - parser for the structured `custom` attribute
//! - `process` - process metadata and change timestamps

pub mod custom;
pub mod elements;
pub mod process;
pub mod select;
pub mod tree;

pub use custom::CustomAttr;
pub use elements::ReadingDirection;
pub use process::ProcessHandle;
pub use select::Selector;
pub use tree::{ElementKind, InsertMode, LayoutDocument, NodeId};
