//! Registry of error constructors.
//!
//! The wire format records an error's `name`; decoding resolves that name to
//! a constructor. Rather than looking names up in an ambient namespace, the
//! registry is an explicit name-to-factory table the host populates. An
//! unresolved name deterministically falls back to the single generic
//! factory; it is never invented.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::model::ErrorValue;

/// Constructs the base error value for a resolved name, given the wire
/// message. Name and stack are reassigned by the decoder afterwards.
pub type ErrorFactory = Box<dyn Fn(Option<String>) -> ErrorValue + Send + Sync>;

/// The standard error names every registry starts from.
pub const BUILTIN_ERROR_NAMES: &[&str] = &[
    "Error",
    "TypeError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "EvalError",
    "URIError",
    "AggregateError",
];

/// Name-to-factory table used when decoding `Error` wrappers.
pub struct ErrorRegistry {
    factories: FxHashMap<String, ErrorFactory>,
}

impl ErrorRegistry {
    /// Creates a registry with no entries. Every name falls back to the
    /// generic factory.
    pub fn empty() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// Creates a registry pre-populated with the standard error names.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for name in BUILTIN_ERROR_NAMES {
            registry.register(*name, Box::new(move |message| ErrorValue::with_name(*name, message)));
        }
        registry
    }

    /// Registers (or replaces) the factory for a name.
    pub fn register(&mut self, name: impl Into<String>, factory: ErrorFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Returns true if a factory is registered for the name.
    pub fn resolves(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Constructs the base error for a wire name, falling back to the
    /// generic kind when the name is absent or unregistered.
    pub fn construct(&self, name: Option<&str>, message: Option<String>) -> ErrorValue {
        match name.and_then(|name| self.factories.get(name)) {
            Some(factory) => factory(message),
            None => ErrorValue::with_name("Error", message),
        }
    }
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

lazy_static! {
    /// Process-wide default registry holding the standard error names.
    pub static ref DEFAULT_ERROR_REGISTRY: ErrorRegistry = ErrorRegistry::with_builtins();
}
