//! Data model for extended values.
//!
//! This module contains the in-memory representation the codec walks:
//! - Node kinds (primitives, temporal, pattern, binary, containers,
//!   collections, errors)
//! - The arena-backed [`ValueGraph`] with index-based node identity
//! - Property keys, including reduced-fidelity symbol keys

pub mod graph;
pub mod value;

pub use graph::{NodeId, ValueGraph};
pub use value::{ElementKind, ErrorValue, Node, PropKey, SymbolKey};
