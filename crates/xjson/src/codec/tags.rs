//! The wire tagging scheme.
//!
//! A wrapper is a JSON object whose `$$type` member holds one of the known
//! tag strings. Anything whose `$$type` is absent, non-string, or outside the
//! known set is an ordinary container, which is how caller data that happens
//! to contain a `$$type` member survives decoding untouched.

use serde_json::{Map, Value as JsonValue};

use crate::model::SymbolKey;

/// Sentinel member marking a wrapper object and naming its tag.
pub const TYPE_KEY: &str = "$$type";
/// Id member used by cycle preservation.
pub const ID_KEY: &str = "$$id";
/// Payload member carried by most wrappers.
pub const VALUE_KEY: &str = "value";
/// Element-kind member on `TypedArray` wrappers.
pub const ARRAY_TYPE_KEY: &str = "arrayType";
/// Byte-offset member on view wrappers (always 0).
pub const BYTE_OFFSET_KEY: &str = "byteOffset";
/// Length member on view wrappers.
pub const LENGTH_KEY: &str = "length";
pub const SOURCE_KEY: &str = "source";
pub const FLAGS_KEY: &str = "flags";
pub const NAME_KEY: &str = "name";
pub const MESSAGE_KEY: &str = "message";
pub const STACK_KEY: &str = "stack";
pub const PROPS_KEY: &str = "props";
pub const GLOBAL_KEY: &str = "global";
pub const KEY_KEY: &str = "key";
pub const DESCRIPTION_KEY: &str = "description";

/// Sentinel payloads for the non-finite numbers.
pub const NUM_NAN: &str = "NaN";
pub const NUM_INF: &str = "Infinity";
pub const NUM_NEG_INF: &str = "-Infinity";

/// The known wrapper tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Undefined,
    Hole,
    Number,
    BigInt,
    Date,
    RegExp,
    Set,
    Map,
    Error,
    Object,
    Array,
    Reference,
    PropKeyString,
    PropKeySymbol,
    Buffer,
    ArrayBuffer,
    TypedArray,
    DataView,
}

impl Tag {
    /// Returns the wire string for this tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Undefined => "Undefined",
            Tag::Hole => "Hole",
            Tag::Number => "Number",
            Tag::BigInt => "BigInt",
            Tag::Date => "Date",
            Tag::RegExp => "RegExp",
            Tag::Set => "Set",
            Tag::Map => "Map",
            Tag::Error => "Error",
            Tag::Object => "object",
            Tag::Array => "array",
            Tag::Reference => "reference",
            Tag::PropKeyString => "PropKeyString",
            Tag::PropKeySymbol => "PropKeySymbol",
            Tag::Buffer => "Buffer",
            Tag::ArrayBuffer => "ArrayBuffer",
            Tag::TypedArray => "TypedArray",
            Tag::DataView => "DataView",
        }
    }

    /// Creates a Tag from a wire string. None means the string is not a
    /// known tag and its carrier is an ordinary container.
    pub fn from_str(s: &str) -> Option<Tag> {
        match s {
            "Undefined" => Some(Tag::Undefined),
            "Hole" => Some(Tag::Hole),
            "Number" => Some(Tag::Number),
            "BigInt" => Some(Tag::BigInt),
            "Date" => Some(Tag::Date),
            "RegExp" => Some(Tag::RegExp),
            "Set" => Some(Tag::Set),
            "Map" => Some(Tag::Map),
            "Error" => Some(Tag::Error),
            "object" => Some(Tag::Object),
            "array" => Some(Tag::Array),
            "reference" => Some(Tag::Reference),
            "PropKeyString" => Some(Tag::PropKeyString),
            "PropKeySymbol" => Some(Tag::PropKeySymbol),
            "Buffer" => Some(Tag::Buffer),
            "ArrayBuffer" => Some(Tag::ArrayBuffer),
            "TypedArray" => Some(Tag::TypedArray),
            "DataView" => Some(Tag::DataView),
            _ => None,
        }
    }
}

/// Creates a bare wrapper map carrying only the tag.
pub fn wrapper(tag: Tag) -> Map<String, JsonValue> {
    let mut map = Map::new();
    map.insert(TYPE_KEY.to_string(), JsonValue::String(tag.as_str().to_string()));
    map
}

/// Creates a wrapper map with a `value` payload.
pub fn wrapper_with_value(tag: Tag, value: JsonValue) -> Map<String, JsonValue> {
    let mut map = wrapper(tag);
    map.insert(VALUE_KEY.to_string(), value);
    map
}

/// Creates a wrapper map carrying an id.
pub fn wrapper_with_id(tag: Tag, id: u32) -> Map<String, JsonValue> {
    let mut map = wrapper(tag);
    map.insert(ID_KEY.to_string(), JsonValue::from(id));
    map
}

/// Creates a `reference` wrapper pointing at a previously assigned id.
pub fn reference(id: u32) -> JsonValue {
    JsonValue::Object(wrapper_with_id(Tag::Reference, id))
}

/// Attaches `$$id` to a wrapper when cycle preservation assigned one.
pub fn set_id(map: &mut Map<String, JsonValue>, id: Option<u32>) {
    if let Some(id) = id {
        map.insert(ID_KEY.to_string(), JsonValue::from(id));
    }
}

/// Wraps a string property key (used for error custom properties).
pub fn prop_key_string(key: &str) -> JsonValue {
    JsonValue::Object(wrapper_with_value(
        Tag::PropKeyString,
        JsonValue::String(key.to_string()),
    ))
}

/// Wraps a symbol property key with its global flag and key or description.
pub fn prop_key_symbol(key: &SymbolKey) -> JsonValue {
    let mut map = wrapper(Tag::PropKeySymbol);
    match key {
        SymbolKey::Global { key } => {
            map.insert(GLOBAL_KEY.to_string(), JsonValue::Bool(true));
            map.insert(KEY_KEY.to_string(), JsonValue::String(key.clone()));
        }
        SymbolKey::Local { description } => {
            map.insert(GLOBAL_KEY.to_string(), JsonValue::Bool(false));
            if let Some(description) = description {
                map.insert(
                    DESCRIPTION_KEY.to_string(),
                    JsonValue::String(description.clone()),
                );
            }
        }
    }
    JsonValue::Object(map)
}

/// Returns the known tag a tree node is wrapped with, if any.
pub fn wrapper_tag(value: &JsonValue) -> Option<Tag> {
    value
        .as_object()
        .and_then(|map| map.get(TYPE_KEY))
        .and_then(JsonValue::as_str)
        .and_then(Tag::from_str)
}

/// Checks whether a tree node is a wrapper of one specific tag.
pub fn is_wrapper_of(value: &JsonValue, tag: Tag) -> bool {
    wrapper_tag(value) == Some(tag)
}
