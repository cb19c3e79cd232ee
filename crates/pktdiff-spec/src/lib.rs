#![doc = include_str!("../README.md")]

//! Predicates, branch-condition trees, and condition artifacts.
//!
//! Predicates are closed recursive data — deserialized from test manifests,
//! never executed as code — and encode into solver terms via [`encode`].
//! Branch-condition trees come from the extraction tool's artifact and
//! enumerate into root-to-leaf paths for coverage-style test generation.

pub mod artifact;
pub mod ast;
pub mod encode;
pub mod errors;
pub mod tree;

pub use artifact::ConditionArtifact;
pub use ast::Predicate;
pub use encode::{encode, EncodeError, ADDR_WIDTH};
pub use errors::{ArtifactError, TreeError};
pub use tree::{CondTree, Path, PathStep};
