//! Interned payload encodings.
//!
//! An [`Encoding`] names a payload format such as `json` or `xml`. Encodings
//! are interned by an [`EncodingRegistry`]: asking twice for the same name
//! yields handles to the same descriptor. Most code uses the process-wide
//! [`EncodingRegistry::global`] instance; tests build isolated registries
//! with [`EncodingRegistry::new`].
//!
//! ```rust
//! use arrowhead_core::EncodingRegistry;
//!
//! let registry = EncodingRegistry::new();
//! let json = registry.intern("JSON");
//!
//! assert_eq!(json.name(), "json");
//! assert_eq!(registry.from_content_type("application/json; charset=utf-8"), Some(json.clone()));
//! assert_eq!(registry.from_content_type("application/problem+json"), Some(json));
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

/// Name of the JSON encoding.
pub const JSON: &str = "json";

/// An interned encoding descriptor.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Encoding {
    name: Arc<str>,
}

impl Encoding {
    /// Returns the lower-case encoding name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if both handles come from the same registry entry.
    #[must_use]
    pub fn is_same_descriptor(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.name, &other.name)
    }
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Encoding").field(&self.name()).finish()
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Thread-safe table of interned encodings.
#[derive(Debug, Default)]
pub struct EncodingRegistry {
    entries: DashMap<String, Encoding>,
}

impl EncodingRegistry {
    /// Creates an empty, isolated registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry, created on first use.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<EncodingRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Returns the descriptor for `name`, registering it if needed.
    ///
    /// Names are case-insensitive.
    pub fn intern(&self, name: &str) -> Encoding {
        let key = name.trim().to_ascii_lowercase();
        if let Some(found) = self.entries.get(&key) {
            return found.value().clone();
        }
        let name: Arc<str> = Arc::from(key.as_str());
        self.entries
            .entry(key)
            .or_insert_with(|| Encoding { name })
            .value()
            .clone()
    }

    /// Returns the descriptor for `name` if it was registered.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Encoding> {
        self.entries
            .get(&name.trim().to_ascii_lowercase())
            .map(|entry| entry.value().clone())
    }

    /// Resolves the encoding of a `Content-Type` value.
    ///
    /// The encoding is the media subtype, or its structured syntax suffix
    /// when present (`application/vnd.acme+json` is `json`). Parameters are
    /// ignored. Returns `None` for values without a subtype.
    pub fn from_content_type(&self, content_type: &str) -> Option<Encoding> {
        let media_type = content_type.split(';').next()?.trim();
        let (_, subtype) = media_type.split_once('/')?;
        let name = subtype.rsplit('+').next()?;
        if name.is_empty() {
            return None;
        }
        Some(self.intern(name))
    }

    /// Returns the number of registered encodings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no encoding was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_same_descriptor() {
        let registry = EncodingRegistry::new();
        let first = registry.intern("json");
        let second = registry.intern(" Json ");
        assert!(first.is_same_descriptor(&second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_isolated_registries() {
        let a = EncodingRegistry::new();
        let b = EncodingRegistry::new();
        a.intern("cbor");
        assert!(a.get("cbor").is_some());
        assert!(b.get("cbor").is_none());
        assert!(b.is_empty());
    }

    #[test]
    fn test_global_is_shared() {
        let interned = EncodingRegistry::global().intern("x-global-test");
        let found = EncodingRegistry::global().get("X-GLOBAL-TEST").unwrap();
        assert!(interned.is_same_descriptor(&found));
    }

    #[test]
    fn test_content_type_resolution() {
        let registry = EncodingRegistry::new();
        assert_eq!(
            registry.from_content_type("text/xml").map(|e| e.name().to_string()),
            Some("xml".to_string())
        );
        assert_eq!(
            registry
                .from_content_type("application/vnd.acme.order+json;version=2")
                .map(|e| e.name().to_string()),
            Some("json".to_string())
        );
        assert!(registry.from_content_type("garbage").is_none());
        assert!(registry.from_content_type("application/").is_none());
    }
}
