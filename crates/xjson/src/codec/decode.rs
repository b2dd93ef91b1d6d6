//! Decoding: tagged wire tree back to a value graph.
//!
//! The decoder mirrors the encoder's walk. Composites are allocated and
//! registered in the reference table *before* their children decode, so a
//! `reference` wrapper pointing at its own ancestor resolves to the node
//! still being filled in. Unknown `$$type` strings make a node an ordinary
//! container.

use std::str::FromStr;

use num_bigint::BigInt;
use serde_json::{Map, Value as JsonValue};

use crate::codec::base64;
use crate::codec::refs::RefTable;
use crate::codec::tags::{self, Tag};
use crate::error::DecodeError;
use crate::model::{ElementKind, Node, NodeId, PropKey, SymbolKey, ValueGraph};
use crate::registry::{ErrorRegistry, DEFAULT_ERROR_REGISTRY};
use crate::util::datetime;

/// Reviver hook: offered each raw wire node before interpretation, it may
/// return a substitute tree to decode in its place.
pub type Reviver<'a> = &'a mut dyn FnMut(&JsonValue) -> Option<JsonValue>;

/// Options for decoding.
pub struct DecodeOptions<'a> {
    /// Transform hook applied to every wire node before interpretation. A
    /// substitute is decoded without being re-offered; its children are.
    pub reviver: Option<Reviver<'a>>,
    /// Registry resolving error names to constructors. Defaults to the
    /// process-wide registry of standard error names.
    pub registry: Option<&'a ErrorRegistry>,
}

impl<'a> DecodeOptions<'a> {
    /// Creates default options: no reviver, default registry.
    pub fn new() -> Self {
        Self {
            reviver: None,
            registry: None,
        }
    }
}

impl Default for DecodeOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a tagged wire tree into a value graph.
pub fn decode(tree: &JsonValue, options: DecodeOptions<'_>) -> Result<ValueGraph, DecodeError> {
    let mut decoder = Decoder {
        graph: ValueGraph::new(),
        refs: RefTable::new(),
        reviver: options.reviver,
        registry: options.registry.unwrap_or(&*DEFAULT_ERROR_REGISTRY),
    };
    let root = decoder.decode_node(tree, true)?;
    let mut graph = decoder.graph;
    graph.set_root(root);
    Ok(graph)
}

struct Decoder<'a> {
    graph: ValueGraph,
    refs: RefTable,
    reviver: Option<Reviver<'a>>,
    registry: &'a ErrorRegistry,
}

impl Decoder<'_> {
    fn decode_node(
        &mut self,
        tree: &JsonValue,
        apply_reviver: bool,
    ) -> Result<NodeId, DecodeError> {
        if apply_reviver {
            if let Some(reviver) = self.reviver.as_mut() {
                if let Some(substitute) = reviver(tree) {
                    return self.decode_node(&substitute, false);
                }
            }
        }

        match tree {
            JsonValue::Null => Ok(self.graph.alloc(Node::Null)),
            JsonValue::Bool(b) => Ok(self.graph.alloc(Node::Bool(*b))),
            JsonValue::Number(n) => {
                let value = n
                    .as_f64()
                    .ok_or(DecodeError::MalformedNode { context: "numeric literal" })?;
                Ok(self.graph.alloc(Node::Number(value)))
            }
            JsonValue::String(s) => Ok(self.graph.alloc(Node::String(s.clone()))),
            JsonValue::Array(items) => {
                let slots = self.decode_slots(items)?;
                Ok(self.graph.alloc(Node::Array(slots)))
            }
            JsonValue::Object(map) => match tags::wrapper_tag(tree) {
                Some(tag) => self.decode_wrapper(tag, map),
                None => self.decode_plain_object(map),
            },
        }
    }

    /// Decodes array elements, turning `Hole` wrappers into hole slots
    /// without offering them to the reviver.
    fn decode_slots(&mut self, items: &[JsonValue]) -> Result<Vec<NodeId>, DecodeError> {
        let mut slots = Vec::with_capacity(items.len());
        for item in items {
            if tags::is_wrapper_of(item, Tag::Hole) {
                slots.push(self.graph.alloc(Node::Hole));
            } else {
                slots.push(self.decode_node(item, true)?);
            }
        }
        Ok(slots)
    }

    fn decode_plain_object(&mut self, map: &Map<String, JsonValue>) -> Result<NodeId, DecodeError> {
        let mut members = Vec::with_capacity(map.len());
        for (key, value) in map {
            let child = self.decode_node(value, true)?;
            members.push((PropKey::String(key.clone()), child));
        }
        Ok(self.graph.alloc(Node::Object(members)))
    }

    fn decode_wrapper(
        &mut self,
        tag: Tag,
        map: &Map<String, JsonValue>,
    ) -> Result<NodeId, DecodeError> {
        let wire_id = map
            .get(tags::ID_KEY)
            .and_then(JsonValue::as_u64)
            .map(|id| id as u32);

        match tag {
            Tag::Reference => {
                let id = wire_id.unwrap_or(0);
                self.refs
                    .resolve(id)
                    .ok_or(DecodeError::UnknownReferenceId { id })
            }

            Tag::Undefined => Ok(self.graph.alloc(Node::Undefined)),
            Tag::Hole => Ok(self.graph.alloc(Node::Hole)),

            Tag::Number => {
                let value = map
                    .get(tags::VALUE_KEY)
                    .ok_or(DecodeError::MalformedNode { context: "Number.value missing" })?;
                let number = match value {
                    JsonValue::String(repr) => match repr.as_str() {
                        tags::NUM_NAN => f64::NAN,
                        tags::NUM_INF => f64::INFINITY,
                        tags::NUM_NEG_INF => f64::NEG_INFINITY,
                        literal => literal.trim().parse().map_err(|_| {
                            DecodeError::MalformedNode { context: "Number.value literal" }
                        })?,
                    },
                    JsonValue::Number(n) => n.as_f64().ok_or(DecodeError::MalformedNode {
                        context: "Number.value literal",
                    })?,
                    _ => {
                        return Err(DecodeError::MalformedNode {
                            context: "Number.value must be a string",
                        });
                    }
                };
                Ok(self.graph.alloc(Node::Number(number)))
            }

            Tag::BigInt => {
                let text = self.required_str(map, "BigInt.value")?;
                let trimmed = text.trim();
                // Empty text is the zero value, as the host's constructor
                // treats it.
                let big = if trimmed.is_empty() {
                    BigInt::from(0)
                } else {
                    BigInt::from_str(trimmed).map_err(|_| DecodeError::MalformedNode {
                        context: "BigInt.value is not a decimal integer",
                    })?
                };
                Ok(self.graph.alloc(Node::BigInt(big)))
            }

            Tag::Date => {
                let text = self.required_str(map, "Date.value")?;
                let epoch_ms = datetime::parse_instant(&text)
                    .map_err(|_| DecodeError::MalformedNode { context: "Date.value" })?;
                let id = self.graph.alloc(Node::Date { epoch_ms });
                self.register(wire_id, id);
                Ok(id)
            }

            Tag::RegExp => {
                let payload = self.required_object(map, "RegExp.value")?;
                let source = payload
                    .get(tags::SOURCE_KEY)
                    .and_then(JsonValue::as_str)
                    .ok_or(DecodeError::MalformedNode { context: "RegExp.source" })?
                    .to_string();
                let flags = payload
                    .get(tags::FLAGS_KEY)
                    .and_then(JsonValue::as_str)
                    .unwrap_or("")
                    .to_string();
                let id = self.graph.alloc(Node::RegExp { source, flags });
                self.register(wire_id, id);
                Ok(id)
            }

            Tag::Object => {
                let payload = self.required_object(map, "object.value")?;
                // Register the empty container first so descendant
                // references to this id resolve.
                let id = self.graph.alloc(Node::Object(Vec::new()));
                self.register(wire_id, id);
                let mut members = Vec::with_capacity(payload.len());
                for (key, value) in payload {
                    let child = self.decode_node(value, true)?;
                    members.push((PropKey::String(key.clone()), child));
                }
                if let Some(Node::Object(slot)) = self.graph.node_mut(id) {
                    *slot = members;
                }
                Ok(id)
            }

            Tag::Array => {
                let payload = match map.get(tags::VALUE_KEY) {
                    Some(JsonValue::Array(items)) => items,
                    _ => return Err(DecodeError::MalformedNode { context: "array.value" }),
                };
                let id = self.graph.alloc(Node::Array(Vec::new()));
                self.register(wire_id, id);
                let slots = self.decode_slots(payload)?;
                if let Some(Node::Array(slot)) = self.graph.node_mut(id) {
                    *slot = slots;
                }
                Ok(id)
            }

            Tag::PropKeyString => match map.get(tags::VALUE_KEY) {
                Some(JsonValue::String(s)) => Ok(self.graph.alloc(Node::String(s.clone()))),
                None => Ok(self.graph.alloc(Node::Undefined)),
                Some(_) => Err(DecodeError::MalformedNode {
                    context: "PropKeyString.value must be a string",
                }),
            },

            Tag::PropKeySymbol => {
                let global = map
                    .get(tags::GLOBAL_KEY)
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false);
                let key = if global {
                    let key = map
                        .get(tags::KEY_KEY)
                        .and_then(JsonValue::as_str)
                        .ok_or(DecodeError::MalformedNode { context: "PropKeySymbol.key" })?;
                    SymbolKey::Global { key: key.to_string() }
                } else {
                    let description = map
                        .get(tags::DESCRIPTION_KEY)
                        .and_then(JsonValue::as_str)
                        .map(str::to_string);
                    SymbolKey::Local { description }
                };
                Ok(self.graph.alloc(Node::Symbol(key)))
            }

            Tag::Error => self.decode_error(map, wire_id),

            Tag::Set => {
                let members = match map.get(tags::VALUE_KEY) {
                    Some(JsonValue::Array(items)) => items,
                    _ => return Err(DecodeError::MalformedNode { context: "Set.value" }),
                };
                let id = self.graph.alloc(Node::Set(Vec::new()));
                self.register(wire_id, id);
                let mut decoded = Vec::with_capacity(members.len());
                for member in members {
                    decoded.push(self.decode_node(member, true)?);
                }
                if let Some(Node::Set(slot)) = self.graph.node_mut(id) {
                    *slot = decoded;
                }
                Ok(id)
            }

            Tag::Map => {
                let entries = match map.get(tags::VALUE_KEY) {
                    Some(JsonValue::Array(items)) => items,
                    _ => return Err(DecodeError::MalformedNode { context: "Map.value" }),
                };
                let id = self.graph.alloc(Node::Map(Vec::new()));
                self.register(wire_id, id);
                let mut decoded = Vec::with_capacity(entries.len());
                for entry in entries {
                    let pair = entry
                        .as_array()
                        .ok_or(DecodeError::MalformedNode { context: "Map entry" })?;
                    let key = match pair.first() {
                        Some(key) => self.decode_node(key, true)?,
                        None => self.graph.alloc(Node::Undefined),
                    };
                    let value = match pair.get(1) {
                        Some(value) => self.decode_node(value, true)?,
                        None => self.graph.alloc(Node::Undefined),
                    };
                    decoded.push((key, value));
                }
                if let Some(Node::Map(slot)) = self.graph.node_mut(id) {
                    *slot = decoded;
                }
                Ok(id)
            }

            Tag::Buffer => {
                let text = self.required_str(map, "Buffer.value")?;
                let id = self.graph.alloc(Node::Buffer(base64::decode(&text)));
                self.register(wire_id, id);
                Ok(id)
            }

            Tag::ArrayBuffer => {
                let text = self.required_str(map, "ArrayBuffer.value")?;
                let id = self.graph.alloc(Node::ArrayBuffer(base64::decode(&text)));
                self.register(wire_id, id);
                Ok(id)
            }

            Tag::TypedArray => {
                let name = map
                    .get(tags::ARRAY_TYPE_KEY)
                    .and_then(JsonValue::as_str)
                    .ok_or(DecodeError::MalformedNode { context: "TypedArray.arrayType" })?;
                let kind = ElementKind::from_name(name).ok_or_else(|| {
                    DecodeError::UnknownTypedArrayConstructor { name: name.to_string() }
                })?;
                let text = self.required_str(map, "TypedArray.value")?;
                let mut bytes = base64::decode(&text);
                let length = map
                    .get(tags::LENGTH_KEY)
                    .and_then(JsonValue::as_u64)
                    .unwrap_or(0) as usize;
                let byte_length = length * kind.bytes_per_element();
                if bytes.len() < byte_length {
                    return Err(DecodeError::MalformedNode {
                        context: "TypedArray payload shorter than declared length",
                    });
                }
                // The view is materialized as a fresh contiguous copy of
                // exactly the declared span.
                bytes.truncate(byte_length);
                let id = self.graph.alloc(Node::TypedArray { kind, bytes });
                self.register(wire_id, id);
                Ok(id)
            }

            Tag::DataView => {
                let text = self.required_str(map, "DataView.value")?;
                let mut bytes = base64::decode(&text);
                let length = map
                    .get(tags::LENGTH_KEY)
                    .and_then(JsonValue::as_u64)
                    .unwrap_or(0) as usize;
                if bytes.len() < length {
                    return Err(DecodeError::MalformedNode {
                        context: "DataView payload shorter than declared length",
                    });
                }
                bytes.truncate(length);
                let id = self.graph.alloc(Node::DataView { bytes });
                self.register(wire_id, id);
                Ok(id)
            }
        }
    }

    fn decode_error(
        &mut self,
        map: &Map<String, JsonValue>,
        wire_id: Option<u32>,
    ) -> Result<NodeId, DecodeError> {
        let payload = self.required_object(map, "Error.value")?;

        let name = payload
            .get(tags::NAME_KEY)
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        let message = payload
            .get(tags::MESSAGE_KEY)
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        let stack = payload
            .get(tags::STACK_KEY)
            .and_then(JsonValue::as_str)
            .map(str::to_string);

        // Construct through the registry, then reassign name and stack
        // explicitly from the wire.
        let mut error = self.registry.construct(name.as_deref(), message);
        if let Some(name) = name {
            error.name = Some(name);
        }
        if let Some(stack) = stack {
            error.stack = Some(stack);
        }

        let id = self.graph.alloc(Node::Error(error));
        self.register(wire_id, id);

        let mut props = Vec::new();
        if let Some(JsonValue::Array(pairs)) = payload.get(tags::PROPS_KEY) {
            for pair in pairs {
                let pair = match pair.as_array() {
                    Some(pair) if pair.len() >= 2 => pair,
                    _ => continue,
                };
                let key_node = self.decode_node(&pair[0], true)?;
                let value_node = self.decode_node(&pair[1], true)?;
                // Pairs whose decoded key is neither a string nor a symbol
                // are skipped.
                let key = match self.graph.node(key_node) {
                    Some(Node::String(s)) => PropKey::String(s.clone()),
                    Some(Node::Symbol(sym)) => PropKey::Symbol(sym.clone()),
                    _ => continue,
                };
                props.push((key, value_node));
            }
        }
        if let Some(Node::Error(slot)) = self.graph.node_mut(id) {
            slot.props = props;
        }
        Ok(id)
    }

    fn register(&mut self, wire_id: Option<u32>, node: NodeId) {
        if let Some(id) = wire_id {
            self.refs.store(id, node);
        }
    }

    fn required_str(
        &self,
        map: &Map<String, JsonValue>,
        context: &'static str,
    ) -> Result<String, DecodeError> {
        map.get(tags::VALUE_KEY)
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or(DecodeError::MalformedNode { context })
    }

    fn required_object<'t>(
        &self,
        map: &'t Map<String, JsonValue>,
        context: &'static str,
    ) -> Result<&'t Map<String, JsonValue>, DecodeError> {
        map.get(tags::VALUE_KEY)
            .and_then(JsonValue::as_object)
            .ok_or(DecodeError::MalformedNode { context })
    }
}
