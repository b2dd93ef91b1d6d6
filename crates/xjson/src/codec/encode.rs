//! Encoding: value graph to tagged wire tree.
//!
//! The encoder walks the graph depth-first in pre-order. Primitives pass
//! through (or gain a sentinel wrapper), composites are either tracked by id
//! (cycle preservation) or guarded by the active recursion stack (strict
//! mode). A caller-supplied replacer hook runs before each node is
//! interpreted and may substitute it; the substitute is encoded without being
//! re-offered to the hook, while its descendants remain eligible.

use serde_json::{Map, Value as JsonValue};

use crate::codec::base64;
use crate::codec::refs::SeenTable;
use crate::codec::tags::{self, Tag};
use crate::error::EncodeError;
use crate::model::{ErrorValue, Node, NodeId, PropKey, ValueGraph};
use crate::util::datetime;

/// Replacer hook: offered a node before interpretation, it may allocate a
/// replacement into the graph and return its id.
pub type Replacer<'a> = &'a mut dyn FnMut(&mut ValueGraph, NodeId) -> Option<NodeId>;

/// Options for encoding.
pub struct EncodeOptions<'a> {
    /// Assign stable ids to composites and emit back-references instead of
    /// re-encoding, so shared and cyclic structure round-trips. Off by
    /// default; a cyclic graph then fails with
    /// [`CircularReference`](EncodeError::CircularReference).
    pub preserve_cycles: bool,
    /// Transform hook applied to every node before interpretation.
    pub replacer: Option<Replacer<'a>>,
}

impl<'a> EncodeOptions<'a> {
    /// Creates default options: strict cycles, no replacer.
    pub fn new() -> Self {
        Self {
            preserve_cycles: false,
            replacer: None,
        }
    }

    /// Creates options with cycle preservation enabled.
    pub fn preserving_cycles() -> Self {
        Self {
            preserve_cycles: true,
            replacer: None,
        }
    }
}

impl Default for EncodeOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a value graph into the tagged wire tree.
///
/// The graph is taken mutably because a replacer may allocate replacement
/// nodes into it; without a replacer it is not modified.
pub fn encode(
    graph: &mut ValueGraph,
    options: EncodeOptions<'_>,
) -> Result<JsonValue, EncodeError> {
    let mut encoder = Encoder {
        preserve_cycles: options.preserve_cycles,
        replacer: options.replacer,
        stack: Vec::new(),
        seen: SeenTable::new(),
    };
    let root = graph.root();
    encoder.encode_node(graph, root, true)
}

struct Encoder<'a> {
    preserve_cycles: bool,
    replacer: Option<Replacer<'a>>,
    /// Active recursion stack, maintained in both modes, checked in strict.
    stack: Vec<NodeId>,
    seen: SeenTable,
}

impl Encoder<'_> {
    fn encode_node(
        &mut self,
        graph: &mut ValueGraph,
        id: NodeId,
        apply_replacer: bool,
    ) -> Result<JsonValue, EncodeError> {
        if apply_replacer {
            if let Some(replacer) = self.replacer.as_mut() {
                if let Some(replacement) = replacer(graph, id) {
                    // The replacement itself is not re-offered; its children,
                    // reached through normal recursion, still are.
                    return self.encode_node(graph, replacement, false);
                }
            }
        }

        // The replacer may have grown or rewritten the arena, so the node is
        // copied out before any recursion below.
        let node = graph
            .node(id)
            .ok_or_else(|| EncodeError::Introspection {
                context: format!("dangling node id {}", id),
            })?
            .clone();

        match node {
            Node::Undefined => Ok(JsonValue::Object(tags::wrapper(Tag::Undefined))),
            Node::Hole => Ok(JsonValue::Object(tags::wrapper(Tag::Hole))),
            Node::Null => Ok(JsonValue::Null),
            Node::Bool(b) => Ok(JsonValue::Bool(b)),
            Node::String(s) => Ok(JsonValue::String(s)),
            Node::Number(n) => Ok(encode_number(n)),
            Node::BigInt(big) => Ok(JsonValue::Object(tags::wrapper_with_value(
                Tag::BigInt,
                JsonValue::String(big.to_string()),
            ))),
            Node::Symbol(_) => Err(EncodeError::UnsupportedValueKind { kind: "symbol" }),
            composite => self.encode_composite(graph, id, composite),
        }
    }

    fn encode_composite(
        &mut self,
        graph: &mut ValueGraph,
        id: NodeId,
        node: Node,
    ) -> Result<JsonValue, EncodeError> {
        let assigned = if self.preserve_cycles {
            if let Some(wire_id) = self.seen.lookup(id) {
                return Ok(tags::reference(wire_id));
            }
            Some(self.seen.assign(id))
        } else {
            if self.stack.contains(&id) {
                return Err(EncodeError::CircularReference);
            }
            None
        };

        self.stack.push(id);
        let result = self.encode_composite_body(graph, node, assigned);
        // Popped unconditionally, on the error path included.
        self.stack.pop();
        result
    }

    fn encode_composite_body(
        &mut self,
        graph: &mut ValueGraph,
        node: Node,
        assigned: Option<u32>,
    ) -> Result<JsonValue, EncodeError> {
        match node {
            Node::Array(slots) => {
                let mut out = Vec::with_capacity(slots.len());
                for slot in slots {
                    // Hole slots are emitted directly and never offered to
                    // the replacer.
                    if matches!(graph.node(slot), Some(Node::Hole)) {
                        out.push(JsonValue::Object(tags::wrapper(Tag::Hole)));
                    } else {
                        out.push(self.encode_node(graph, slot, true)?);
                    }
                }
                let array = JsonValue::Array(out);
                Ok(match assigned {
                    Some(wire_id) => {
                        let mut map = tags::wrapper_with_id(Tag::Array, wire_id);
                        map.insert(tags::VALUE_KEY.to_string(), array);
                        JsonValue::Object(map)
                    }
                    None => array,
                })
            }

            Node::Object(members) => {
                let mut out = Map::with_capacity(members.len());
                for (key, child) in members {
                    let key = match key {
                        PropKey::String(key) => key,
                        PropKey::Symbol(_) => {
                            return Err(EncodeError::UnsupportedValueKind {
                                kind: "symbol key on a plain object",
                            });
                        }
                    };
                    let encoded = self.encode_node(graph, child, true)?;
                    out.insert(key, encoded);
                }
                let object = JsonValue::Object(out);
                Ok(match assigned {
                    Some(wire_id) => {
                        let mut map = tags::wrapper_with_id(Tag::Object, wire_id);
                        map.insert(tags::VALUE_KEY.to_string(), object);
                        JsonValue::Object(map)
                    }
                    None => object,
                })
            }

            Node::Buffer(bytes) => {
                let mut map = tags::wrapper_with_value(
                    Tag::Buffer,
                    JsonValue::String(base64::encode(&bytes)),
                );
                tags::set_id(&mut map, assigned);
                Ok(JsonValue::Object(map))
            }

            Node::ArrayBuffer(bytes) => {
                let mut map = tags::wrapper_with_value(
                    Tag::ArrayBuffer,
                    JsonValue::String(base64::encode(&bytes)),
                );
                tags::set_id(&mut map, assigned);
                Ok(JsonValue::Object(map))
            }

            Node::TypedArray { kind, bytes } => {
                let per_element = kind.bytes_per_element();
                if bytes.len() % per_element != 0 {
                    return Err(EncodeError::Introspection {
                        context: format!(
                            "{} payload of {} bytes is not a whole number of elements",
                            kind.name(),
                            bytes.len()
                        ),
                    });
                }
                let length = bytes.len() / per_element;
                let mut map = tags::wrapper(Tag::TypedArray);
                map.insert(
                    tags::ARRAY_TYPE_KEY.to_string(),
                    JsonValue::String(kind.name().to_string()),
                );
                map.insert(
                    tags::VALUE_KEY.to_string(),
                    JsonValue::String(base64::encode(&bytes)),
                );
                map.insert(tags::BYTE_OFFSET_KEY.to_string(), JsonValue::from(0u32));
                map.insert(tags::LENGTH_KEY.to_string(), JsonValue::from(length));
                tags::set_id(&mut map, assigned);
                Ok(JsonValue::Object(map))
            }

            Node::DataView { bytes } => {
                let mut map = tags::wrapper(Tag::DataView);
                map.insert(
                    tags::VALUE_KEY.to_string(),
                    JsonValue::String(base64::encode(&bytes)),
                );
                map.insert(tags::BYTE_OFFSET_KEY.to_string(), JsonValue::from(0u32));
                map.insert(tags::LENGTH_KEY.to_string(), JsonValue::from(bytes.len()));
                tags::set_id(&mut map, assigned);
                Ok(JsonValue::Object(map))
            }

            Node::Date { epoch_ms } => {
                let mut map = tags::wrapper_with_value(
                    Tag::Date,
                    JsonValue::String(datetime::format_instant(epoch_ms)),
                );
                tags::set_id(&mut map, assigned);
                Ok(JsonValue::Object(map))
            }

            Node::RegExp { source, flags } => {
                let mut payload = Map::with_capacity(2);
                payload.insert(tags::SOURCE_KEY.to_string(), JsonValue::String(source));
                payload.insert(tags::FLAGS_KEY.to_string(), JsonValue::String(flags));
                let mut map =
                    tags::wrapper_with_value(Tag::RegExp, JsonValue::Object(payload));
                tags::set_id(&mut map, assigned);
                Ok(JsonValue::Object(map))
            }

            Node::Error(error) => {
                let payload = self.encode_error_payload(graph, error)?;
                let mut map = tags::wrapper_with_value(Tag::Error, payload);
                tags::set_id(&mut map, assigned);
                Ok(JsonValue::Object(map))
            }

            Node::Set(members) => {
                let mut out = Vec::with_capacity(members.len());
                for member in members {
                    out.push(self.encode_node(graph, member, true)?);
                }
                let mut map = tags::wrapper_with_value(Tag::Set, JsonValue::Array(out));
                tags::set_id(&mut map, assigned);
                Ok(JsonValue::Object(map))
            }

            Node::Map(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.encode_node(graph, key, true)?;
                    let value = self.encode_node(graph, value, true)?;
                    out.push(JsonValue::Array(vec![key, value]));
                }
                let mut map = tags::wrapper_with_value(Tag::Map, JsonValue::Array(out));
                tags::set_id(&mut map, assigned);
                Ok(JsonValue::Object(map))
            }

            // Non-composite kinds are dispatched in encode_node.
            other => Err(EncodeError::Introspection {
                context: format!("{} reached composite encoding", other.kind_name()),
            }),
        }
    }

    fn encode_error_payload(
        &mut self,
        graph: &mut ValueGraph,
        error: ErrorValue,
    ) -> Result<JsonValue, EncodeError> {
        let mut payload = Map::new();
        if let Some(name) = error.name {
            payload.insert(tags::NAME_KEY.to_string(), JsonValue::String(name));
        }
        if let Some(message) = error.message {
            payload.insert(tags::MESSAGE_KEY.to_string(), JsonValue::String(message));
        }
        if let Some(stack) = error.stack {
            payload.insert(tags::STACK_KEY.to_string(), JsonValue::String(stack));
        }

        // Props replay in enumeration order, name/message/stack collisions
        // included; deduplicating here would change what decode replays.
        let mut props = Vec::with_capacity(error.props.len());
        for (key, value) in error.props {
            let key = match &key {
                PropKey::String(s) => tags::prop_key_string(s),
                PropKey::Symbol(sym) => tags::prop_key_symbol(sym),
            };
            let value = self.encode_node(graph, value, true)?;
            props.push(JsonValue::Array(vec![key, value]));
        }
        payload.insert(tags::PROPS_KEY.to_string(), JsonValue::Array(props));

        Ok(JsonValue::Object(payload))
    }
}

/// Encodes a number: finite values pass through, the non-finite values
/// become sentinel wrappers.
fn encode_number(n: f64) -> JsonValue {
    match serde_json::Number::from_f64(n) {
        Some(number) => JsonValue::Number(number),
        None => {
            let sentinel = if n.is_nan() {
                tags::NUM_NAN
            } else if n > 0.0 {
                tags::NUM_INF
            } else {
                tags::NUM_NEG_INF
            };
            JsonValue::Object(tags::wrapper_with_value(
                Tag::Number,
                JsonValue::String(sentinel.to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use serde_json::json;

    use crate::model::SymbolKey;

    fn encode_graph(graph: &mut ValueGraph) -> JsonValue {
        encode(graph, EncodeOptions::new()).unwrap()
    }

    #[test]
    fn test_primitives_pass_through() {
        assert_eq!(encode_graph(&mut ValueGraph::with_root(Node::Null)), json!(null));
        assert_eq!(
            encode_graph(&mut ValueGraph::with_root(Node::Bool(true))),
            json!(true)
        );
        assert_eq!(
            encode_graph(&mut ValueGraph::with_root(Node::String("hi".into()))),
            json!("hi")
        );
        assert_eq!(
            encode_graph(&mut ValueGraph::with_root(Node::Number(1.5))),
            json!(1.5)
        );
    }

    #[test]
    fn test_undefined_and_nonfinite_wrappers() {
        assert_eq!(
            encode_graph(&mut ValueGraph::with_root(Node::Undefined)),
            json!({ "$$type": "Undefined" })
        );
        assert_eq!(
            encode_graph(&mut ValueGraph::with_root(Node::Number(f64::NAN))),
            json!({ "$$type": "Number", "value": "NaN" })
        );
        assert_eq!(
            encode_graph(&mut ValueGraph::with_root(Node::Number(f64::INFINITY))),
            json!({ "$$type": "Number", "value": "Infinity" })
        );
        assert_eq!(
            encode_graph(&mut ValueGraph::with_root(Node::Number(f64::NEG_INFINITY))),
            json!({ "$$type": "Number", "value": "-Infinity" })
        );
    }

    #[test]
    fn test_bigint_wrapper() {
        let big = BigInt::parse_bytes(b"123456789012345678901234567890", 10).unwrap();
        assert_eq!(
            encode_graph(&mut ValueGraph::with_root(Node::BigInt(big))),
            json!({ "$$type": "BigInt", "value": "123456789012345678901234567890" })
        );
    }

    #[test]
    fn test_array_holes() {
        let mut graph = ValueGraph::with_root(Node::Array(Vec::new()));
        let root = graph.root();
        let first = graph.alloc(Node::Number(0.0));
        let hole = graph.alloc(Node::Hole);
        let last = graph.alloc(Node::Number(2.0));
        if let Some(Node::Array(slots)) = graph.node_mut(root) {
            slots.extend([first, hole, last]);
        }
        assert_eq!(
            encode_graph(&mut graph),
            json!([0.0, { "$$type": "Hole" }, 2.0])
        );
    }

    #[test]
    fn test_plain_object_preserves_member_order() {
        let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
        let root = graph.root();
        let b = graph.alloc(Node::Number(2.0));
        let a = graph.alloc(Node::Number(1.0));
        graph.push_member(root, "b", b);
        graph.push_member(root, "a", a);

        let encoded = encode_graph(&mut graph);
        let keys: Vec<&String> = encoded.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_unsupported_kinds() {
        let mut graph = ValueGraph::with_root(Node::Symbol(SymbolKey::Local {
            description: Some("x".into()),
        }));
        assert_eq!(
            encode(&mut graph, EncodeOptions::new()),
            Err(EncodeError::UnsupportedValueKind { kind: "symbol" })
        );

        let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
        let root = graph.root();
        let value = graph.alloc(Node::Number(1.0));
        if let Some(Node::Object(members)) = graph.node_mut(root) {
            members.push((
                PropKey::Symbol(SymbolKey::Local { description: None }),
                value,
            ));
        }
        assert!(matches!(
            encode(&mut graph, EncodeOptions::new()),
            Err(EncodeError::UnsupportedValueKind { .. })
        ));
    }

    #[test]
    fn test_cycle_fails_without_preservation() {
        let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
        let root = graph.root();
        graph.push_member(root, "self", root);
        assert_eq!(
            encode(&mut graph, EncodeOptions::new()),
            Err(EncodeError::CircularReference)
        );
    }

    #[test]
    fn test_cycle_preservation_emits_reference() {
        let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
        let root = graph.root();
        graph.push_member(root, "self", root);

        let encoded = encode(&mut graph, EncodeOptions::preserving_cycles()).unwrap();
        assert_eq!(
            encoded,
            json!({
                "$$type": "object",
                "$$id": 1,
                "value": { "self": { "$$type": "reference", "$$id": 1 } }
            })
        );
    }

    #[test]
    fn test_diamond_sharing_duplicates_in_strict_mode() {
        // Shared but acyclic: both members encode independently.
        let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
        let root = graph.root();
        let shared = graph.alloc(Node::Object(Vec::new()));
        graph.push_member(root, "x", shared);
        graph.push_member(root, "y", shared);

        assert_eq!(encode_graph(&mut graph), json!({ "x": {}, "y": {} }));
    }

    #[test]
    fn test_diamond_sharing_references_in_cycle_mode() {
        let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
        let root = graph.root();
        let shared = graph.alloc(Node::Object(Vec::new()));
        graph.push_member(root, "x", shared);
        graph.push_member(root, "y", shared);

        let encoded = encode(&mut graph, EncodeOptions::preserving_cycles()).unwrap();
        assert_eq!(
            encoded,
            json!({
                "$$type": "object",
                "$$id": 1,
                "value": {
                    "x": { "$$type": "object", "$$id": 2, "value": {} },
                    "y": { "$$type": "reference", "$$id": 2 }
                }
            })
        );
    }

    #[test]
    fn test_binary_kinds() {
        let mut graph = ValueGraph::with_root(Node::Buffer(b"hello".to_vec()));
        assert_eq!(
            encode_graph(&mut graph),
            json!({ "$$type": "Buffer", "value": "aGVsbG8=" })
        );

        let mut graph = ValueGraph::with_root(Node::TypedArray {
            kind: crate::model::ElementKind::Uint16,
            bytes: vec![0xF4, 0x01, 0xE8, 0x03], // 500, 1000 little-endian
        });
        assert_eq!(
            encode_graph(&mut graph),
            json!({
                "$$type": "TypedArray",
                "arrayType": "Uint16Array",
                "value": "9AHoAw==",
                "byteOffset": 0,
                "length": 2
            })
        );

        let mut graph = ValueGraph::with_root(Node::DataView { bytes: vec![7, 9] });
        assert_eq!(
            encode_graph(&mut graph),
            json!({ "$$type": "DataView", "value": "Bwk=", "byteOffset": 0, "length": 2 })
        );
    }

    #[test]
    fn test_typed_array_ragged_payload_rejected() {
        let mut graph = ValueGraph::with_root(Node::TypedArray {
            kind: crate::model::ElementKind::Uint32,
            bytes: vec![1, 2, 3], // not a whole element
        });
        assert!(matches!(
            encode(&mut graph, EncodeOptions::new()),
            Err(EncodeError::Introspection { .. })
        ));
    }

    #[test]
    fn test_date_and_regexp() {
        let mut graph = ValueGraph::with_root(Node::Date { epoch_ms: 0 });
        assert_eq!(
            encode_graph(&mut graph),
            json!({ "$$type": "Date", "value": "1970-01-01T00:00:00.000Z" })
        );

        let mut graph = ValueGraph::with_root(Node::RegExp {
            source: "a+b".into(),
            flags: "gi".into(),
        });
        assert_eq!(
            encode_graph(&mut graph),
            json!({ "$$type": "RegExp", "value": { "source": "a+b", "flags": "gi" } })
        );
    }

    #[test]
    fn test_set_and_map() {
        let mut graph = ValueGraph::with_root(Node::Set(Vec::new()));
        let root = graph.root();
        let one = graph.alloc(Node::Number(1.0));
        let two = graph.alloc(Node::Number(2.0));
        if let Some(Node::Set(members)) = graph.node_mut(root) {
            members.extend([one, two]);
        }
        assert_eq!(
            encode_graph(&mut graph),
            json!({ "$$type": "Set", "value": [1.0, 2.0] })
        );

        let mut graph = ValueGraph::with_root(Node::Map(Vec::new()));
        let root = graph.root();
        let key = graph.alloc(Node::String("k".into()));
        let value = graph.alloc(Node::Number(2.0));
        if let Some(Node::Map(entries)) = graph.node_mut(root) {
            entries.push((key, value));
        }
        assert_eq!(
            encode_graph(&mut graph),
            json!({ "$$type": "Map", "value": [["k", 2.0]] })
        );
    }

    #[test]
    fn test_error_payload_with_props() {
        let mut graph = ValueGraph::with_root(Node::Null);
        let code = graph.alloc(Node::Number(404.0));
        let mut error = ErrorValue::with_name("TypeError", Some("boom".into()));
        error.stack = Some("TypeError: boom\n    at <anonymous>".into());
        error.props.push((PropKey::String("code".into()), code));
        let root = graph.alloc(Node::Error(error));
        graph.set_root(root);

        assert_eq!(
            encode_graph(&mut graph),
            json!({
                "$$type": "Error",
                "value": {
                    "name": "TypeError",
                    "message": "boom",
                    "stack": "TypeError: boom\n    at <anonymous>",
                    "props": [
                        [{ "$$type": "PropKeyString", "value": "code" }, 404.0]
                    ]
                }
            })
        );
    }

    #[test]
    fn test_replacer_substitutes_once() {
        // Replace every string with its uppercase form; the replacement
        // string must not be re-offered (or this would loop forever on
        // already-uppercase output... it would still terminate here, but the
        // wire must show exactly one transformation).
        let mut offered = Vec::new();
        let mut replacer = |graph: &mut ValueGraph, id: NodeId| -> Option<NodeId> {
            if let Some(Node::String(s)) = graph.node(id) {
                offered.push(s.clone());
                let upper = s.to_uppercase();
                return Some(graph.alloc(Node::String(upper)));
            }
            None
        };

        let mut graph = ValueGraph::with_root(Node::Array(Vec::new()));
        let root = graph.root();
        let a = graph.alloc(Node::String("a".into()));
        let b = graph.alloc(Node::String("b".into()));
        if let Some(Node::Array(slots)) = graph.node_mut(root) {
            slots.extend([a, b]);
        }

        let options = EncodeOptions {
            preserve_cycles: false,
            replacer: Some(&mut replacer),
        };
        let encoded = encode(&mut graph, options).unwrap();
        assert_eq!(encoded, json!(["A", "B"]));
        // Each original offered exactly once; uppercase results never were.
        assert_eq!(offered, ["a", "b"]);
    }

    #[test]
    fn test_replacer_children_of_substitute_still_eligible() {
        // A marker object is replaced by an array whose element is a string;
        // the string child of the substitute must still reach the hook.
        let mut replacer = |graph: &mut ValueGraph, id: NodeId| -> Option<NodeId> {
            let nonempty_object =
                matches!(graph.node(id), Some(Node::Object(members)) if !members.is_empty());
            if nonempty_object {
                let child = graph.alloc(Node::String("inner".into()));
                return Some(graph.alloc(Node::Array(vec![child])));
            }
            if matches!(graph.node(id), Some(Node::String(s)) if s == "inner") {
                return Some(graph.alloc(Node::String("INNER".into())));
            }
            None
        };

        let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
        let root = graph.root();
        let marker = graph.alloc(Node::Null);
        graph.push_member(root, "marker", marker);

        let options = EncodeOptions {
            preserve_cycles: false,
            replacer: Some(&mut replacer),
        };
        let encoded = encode(&mut graph, options).unwrap();
        assert_eq!(encoded, json!(["INNER"]));
    }
}
