//! Container enumeration and the script-reference rewrite pass.

pub mod engine;
pub mod enumerate;

pub use engine::{rewrite_all, ReplacementMap, RewriteFailure, RewriteReport};
pub use enumerate::{Container, ContainerKind, Containers, SelectionScope};
