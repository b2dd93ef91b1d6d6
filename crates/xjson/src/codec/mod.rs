//! Encoding and decoding between value graphs and interchange text.
//!
//! The codec is layered: [`encode`]/[`decode`] convert between a
//! [`ValueGraph`](crate::model::ValueGraph) and the tagged generic tree, and
//! [`stringify`]/[`parse`] additionally run the tree through the baseline
//! JSON printer/parser.

pub mod base64;
pub mod decode;
pub mod encode;
pub mod refs;
pub mod tags;

pub use decode::{decode, DecodeOptions, Reviver};
pub use encode::{encode, EncodeOptions, Replacer};
pub use refs::{RefTable, SeenTable};
pub use tags::Tag;

use serde_json::Value as JsonValue;

use crate::error::{DecodeError, EncodeError};
use crate::model::ValueGraph;

/// Serializes a value graph to interchange text.
pub fn stringify(graph: &mut ValueGraph, options: EncodeOptions<'_>) -> Result<String, EncodeError> {
    let tree = encode(graph, options)?;
    serde_json::to_string(&tree).map_err(|err| EncodeError::Introspection {
        context: format!("interchange printer failed: {}", err),
    })
}

/// Reconstructs a value graph from interchange text.
pub fn parse(text: &str, options: DecodeOptions<'_>) -> Result<ValueGraph, DecodeError> {
    let tree: JsonValue =
        serde_json::from_str(text).map_err(|err| DecodeError::Parse(err.to_string()))?;
    decode(&tree, options)
}
