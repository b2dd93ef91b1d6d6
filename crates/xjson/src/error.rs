//! Error types for extended-value encoding and decoding.

use thiserror::Error;

/// Error while encoding a value graph into the tagged wire tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// A value kind that has no wire representation was found at a value
    /// position: a symbol value, or a symbol key on a plain object.
    #[error("unsupported value kind: {kind}")]
    UnsupportedValueKind { kind: &'static str },

    /// A node was revisited while still on the active recursion stack and
    /// cycle preservation is disabled.
    #[error("circular reference detected (enable preserve_cycles to encode cyclic graphs)")]
    CircularReference,

    /// The value graph itself could not be introspected: a dangling node id,
    /// or a node whose stored payload is internally inconsistent.
    #[error("value introspection failed: {context}")]
    Introspection { context: String },
}

/// Error while decoding the tagged wire tree back into a value graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// A `reference` wrapper names an id that no decoded composite carries.
    #[error("unknown reference id: {id}")]
    UnknownReferenceId { id: u32 },

    /// A `TypedArray` wrapper names an element kind outside the known set.
    #[error("unknown typed array constructor: {name}")]
    UnknownTypedArrayConstructor { name: String },

    /// A wrapper node is structurally invalid: a required field is missing
    /// or carries the wrong kind of payload.
    #[error("malformed wrapper node: {context}")]
    MalformedNode { context: &'static str },

    /// The baseline interchange text could not be parsed at all.
    #[error("invalid interchange text: {0}")]
    Parse(String),
}
