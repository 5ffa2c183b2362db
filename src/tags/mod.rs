//! # Tag Model
//!
//! Hierarchical, interned, dot-segmented identifiers used both as message
//! channels and as readiness state identifiers, plus a counted tag-stack
//! container.

pub mod stack;
pub mod tag;

// Re-export main types for convenient access
pub use stack::{TagStack, TagStackContainer};
pub use tag::{Ancestors, Tag, TagError};
