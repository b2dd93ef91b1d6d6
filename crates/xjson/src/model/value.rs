//! Value kinds for the extended value model.
//!
//! A [`Node`] is one slot in a [`ValueGraph`](crate::model::ValueGraph) arena.
//! Composite kinds hold [`NodeId`](crate::model::NodeId) indices into the same
//! arena rather than owned children, which is what makes shared and cyclic
//! graphs representable.

use num_bigint::BigInt;

use crate::model::NodeId;

/// Element kinds for typed views over binary data.
///
/// These mirror the fixed set of typed-array constructors the wire format
/// names in its `arrayType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl ElementKind {
    /// Creates an ElementKind from its wire name.
    pub fn from_name(name: &str) -> Option<ElementKind> {
        match name {
            "Int8Array" => Some(ElementKind::Int8),
            "Uint8Array" => Some(ElementKind::Uint8),
            "Uint8ClampedArray" => Some(ElementKind::Uint8Clamped),
            "Int16Array" => Some(ElementKind::Int16),
            "Uint16Array" => Some(ElementKind::Uint16),
            "Int32Array" => Some(ElementKind::Int32),
            "Uint32Array" => Some(ElementKind::Uint32),
            "Float32Array" => Some(ElementKind::Float32),
            "Float64Array" => Some(ElementKind::Float64),
            "BigInt64Array" => Some(ElementKind::BigInt64),
            "BigUint64Array" => Some(ElementKind::BigUint64),
            _ => None,
        }
    }

    /// Returns the wire name for this element kind.
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Int8 => "Int8Array",
            ElementKind::Uint8 => "Uint8Array",
            ElementKind::Uint8Clamped => "Uint8ClampedArray",
            ElementKind::Int16 => "Int16Array",
            ElementKind::Uint16 => "Uint16Array",
            ElementKind::Int32 => "Int32Array",
            ElementKind::Uint32 => "Uint32Array",
            ElementKind::Float32 => "Float32Array",
            ElementKind::Float64 => "Float64Array",
            ElementKind::BigInt64 => "BigInt64Array",
            ElementKind::BigUint64 => "BigUint64Array",
        }
    }

    /// Returns the number of bytes one element occupies.
    pub fn bytes_per_element(self) -> usize {
        match self {
            ElementKind::Int8 | ElementKind::Uint8 | ElementKind::Uint8Clamped => 1,
            ElementKind::Int16 | ElementKind::Uint16 => 2,
            ElementKind::Int32 | ElementKind::Uint32 | ElementKind::Float32 => 4,
            ElementKind::Float64 | ElementKind::BigInt64 | ElementKind::BigUint64 => 8,
        }
    }
}

/// A unique symbolic key.
///
/// Global symbols are addressed by their process-wide registry key and
/// round-trip exactly. Local symbols carry only their description; a decoded
/// local symbol is a fresh identity that merely shares the description with
/// the original. This reduced fidelity is inherent to the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolKey {
    /// Registered in the process-wide symbol registry under `key`.
    Global { key: String },
    /// A local symbol, addressable only by its optional description.
    Local { description: Option<String> },
}

/// A property key on an error object: an ordinary string key or a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropKey {
    String(String),
    Symbol(SymbolKey),
}

/// An error object: the three well-known fields plus an ordered list of
/// additional own properties.
///
/// The props list is kept verbatim. It may contain pairs whose key collides
/// with `name`, `message`, or `stack`; both the dedicated field and the pair
/// are preserved so a decode/encode cycle reproduces the wire exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub name: Option<String>,
    pub message: Option<String>,
    pub stack: Option<String>,
    /// Additional own properties in enumeration order.
    pub props: Vec<(PropKey, NodeId)>,
}

impl ErrorValue {
    /// Creates an error with the given name and message and no extra state.
    pub fn with_name(name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            name: Some(name.into()),
            message,
            stack: None,
            props: Vec::new(),
        }
    }
}

/// One value in the extended model.
///
/// Composite kinds (`Array` through `Error`, plus `Date`, `RegExp` and the
/// binary kinds) participate in cycle preservation; primitive kinds never
/// receive wire ids.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// The explicit absent-value marker.
    Undefined,
    /// An absent array slot, distinct from `Undefined`.
    Hole,
    Null,
    Bool(bool),
    /// IEEE-754 double. NaN and the infinities are representable and
    /// round-trip through dedicated wire sentinels.
    Number(f64),
    String(String),
    /// Arbitrary-precision integer, decimal text on the wire.
    BigInt(BigInt),
    /// An instant in time, milliseconds since the Unix epoch.
    Date { epoch_ms: i64 },
    /// A pattern object: source text plus flags.
    RegExp { source: String, flags: String },
    /// A symbol at a value position. Representable in the model (symbols
    /// occur as error property keys) but rejected by the encoder.
    Symbol(SymbolKey),
    /// A byte blob (wire tag `Buffer`).
    Buffer(Vec<u8>),
    /// Raw byte storage (wire tag `ArrayBuffer`).
    ArrayBuffer(Vec<u8>),
    /// A typed view, always a fresh contiguous copy at byte offset 0.
    /// The element count is `bytes.len() / kind.bytes_per_element()`.
    TypedArray { kind: ElementKind, bytes: Vec<u8> },
    /// An untyped view, always a fresh contiguous copy at byte offset 0.
    DataView { bytes: Vec<u8> },
    /// Ordered slots; holes are slots pointing at a `Hole` node.
    Array(Vec<NodeId>),
    /// Ordered string-keyed members. Symbol keys are representable but the
    /// encoder rejects them on plain objects.
    Object(Vec<(PropKey, NodeId)>),
    /// Insertion-ordered unique collection.
    Set(Vec<NodeId>),
    /// Insertion-ordered key/value collection. Key uniqueness is the
    /// caller's responsibility; it is not checked.
    Map(Vec<(NodeId, NodeId)>),
    Error(ErrorValue),
}

impl Node {
    /// Returns a short lowercase name for this node's kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Undefined => "undefined",
            Node::Hole => "hole",
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::BigInt(_) => "bigint",
            Node::Date { .. } => "date",
            Node::RegExp { .. } => "regexp",
            Node::Symbol(_) => "symbol",
            Node::Buffer(_) => "buffer",
            Node::ArrayBuffer(_) => "arraybuffer",
            Node::TypedArray { .. } => "typedarray",
            Node::DataView { .. } => "dataview",
            Node::Array(_) => "array",
            Node::Object(_) => "object",
            Node::Set(_) => "set",
            Node::Map(_) => "map",
            Node::Error(_) => "error",
        }
    }

    /// Returns true for kinds that receive ids under cycle preservation.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Node::Date { .. }
                | Node::RegExp { .. }
                | Node::Buffer(_)
                | Node::ArrayBuffer(_)
                | Node::TypedArray { .. }
                | Node::DataView { .. }
                | Node::Array(_)
                | Node::Object(_)
                | Node::Set(_)
                | Node::Map(_)
                | Node::Error(_)
        )
    }
}
