//! Extended value codec over plain JSON.
//!
//! This crate serializes an in-memory value graph into JSON text enriched
//! with tagged wrapper objects, and reconstructs an equivalent graph from
//! that text. The wrappers carry the value kinds plain JSON cannot express:
//! binary payloads, arbitrary-precision integers, instants, patterns, unique
//! and ordered collections, error objects with custom properties, symbolic
//! keys, the non-finite numbers, explicit absent values, and sparse array
//! holes. With cycle preservation enabled, shared and cyclic object graphs
//! round-trip with identity intact.
//!
//! # Quick Start
//!
//! ```rust
//! use xjson::{stringify, parse, DecodeOptions, EncodeOptions, Node, ValueGraph};
//!
//! // Build { greeting: "hello", when: 2024-01-01T00:00:00Z }
//! let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
//! let root = graph.root();
//! let greeting = graph.alloc(Node::String("hello".to_string()));
//! let when = graph.alloc(Node::Date { epoch_ms: 1_704_067_200_000 });
//! graph.push_member(root, "greeting", greeting);
//! graph.push_member(root, "when", when);
//!
//! // Serialize to interchange text
//! let text = stringify(&mut graph, EncodeOptions::new()).unwrap();
//! assert!(text.contains("\"$$type\":\"Date\""));
//!
//! // Reconstruct an equivalent graph
//! let decoded = parse(&text, DecodeOptions::new()).unwrap();
//! assert!(graph.deep_eq(&decoded));
//! ```
//!
//! Cyclic graphs need the encoder's cycle preservation:
//!
//! ```rust
//! use xjson::{stringify, parse, DecodeOptions, EncodeOptions, Node, ValueGraph};
//!
//! let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
//! let root = graph.root();
//! graph.push_member(root, "self", root);
//!
//! let text = stringify(&mut graph, EncodeOptions::preserving_cycles()).unwrap();
//! let decoded = parse(&text, DecodeOptions::new()).unwrap();
//! // The decoded member is identity-equal to the decoded root itself.
//! # match decoded.node(decoded.root()).unwrap() {
//! #     Node::Object(members) => assert_eq!(members[0].1, decoded.root()),
//! #     _ => unreachable!(),
//! # }
//! ```
//!
//! # Modules
//!
//! - [`model`]: the arena-backed value graph and node kinds
//! - [`codec`]: encoding/decoding plus the tag scheme, binary codec and
//!   reference tables
//! - [`registry`]: name-to-constructor registry for decoding errors
//! - [`error`]: error types
//!
//! # Hazards
//!
//! The walk is synchronous and recursive; recursion depth equals graph
//! depth, and there is no depth guard. Transform hooks run caller code per
//! node and may mutate the graph being encoded; the codec copies child lists
//! before recursing but gives no further isolation guarantee.

pub mod codec;
pub mod error;
pub mod model;
pub mod registry;
pub mod util;

// Re-export commonly used types at crate root
pub use codec::{
    decode, encode, parse, stringify, DecodeOptions, EncodeOptions, RefTable, Replacer,
    Reviver, SeenTable, Tag,
};
pub use error::{DecodeError, EncodeError};
pub use model::{ElementKind, ErrorValue, Node, NodeId, PropKey, SymbolKey, ValueGraph};
pub use registry::{ErrorRegistry, DEFAULT_ERROR_REGISTRY};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
